//! Query-string codec for the shareable investigation state.
//!
//! The encoder emits the human-readable (percent-decoded) form the original
//! tool pushes into the address bar: only characters that would corrupt
//! query parsing stay percent-encoded. The decoder accepts both that form
//! and fully percent-encoded input.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AppState, HEADER_SEPARATOR};

/// Fields recovered from a query string. Absent parameters stay `None`;
/// the caller layers defaults on top.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryState {
    pub url: Option<String>,
    pub app_name: Option<String>,
    pub profiles: Option<Vec<String>>,
    pub label: Option<String>,
    pub filter: Option<BTreeSet<String>>,
    pub headers: Option<BTreeMap<String, String>>,
}

/// Parses a query string (leading `?` optional). Never fails: unknown
/// parameters are ignored and a `headers[]` value without the key/value
/// separator is dropped silently.
pub fn decode(query: &str) -> QueryState {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut state = QueryState::default();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = decode_component(value);

        match key.as_str() {
            "url" => state.url = Some(value),
            "appName" => state.app_name = Some(value),
            "label" => state.label = Some(value),
            "profiles" => {
                state.profiles = Some(split_list(&value));
            }
            "filter" => {
                state.filter = Some(split_list(&value).into_iter().collect());
            }
            "headers[]" => {
                if let Some((header_key, header_value)) = value.split_once(HEADER_SEPARATOR) {
                    state
                        .headers
                        .get_or_insert_with(BTreeMap::new)
                        .insert(header_key.to_string(), header_value.to_string());
                }
            }
            _ => {}
        }
    }
    state
}

/// Serializes the state for the address bar. `profiles` and `label` are
/// always written; `url`, `appName` and `headers[]` only when
/// `include_identity` (portal mode suppresses caller identity); `filter`
/// only when non-empty.
pub fn encode(state: &AppState, include_identity: bool) -> String {
    let mut pairs: Vec<(String, String)> = vec![
        ("profiles".to_string(), state.profiles.join(",")),
        ("label".to_string(), state.label.clone()),
    ];

    if include_identity {
        pairs.push(("url".to_string(), state.server_url.clone()));
        pairs.push(("appName".to_string(), state.app_name.clone()));
        for (key, value) in &state.headers {
            pairs.push((
                "headers[]".to_string(),
                format!("{}{}{}", key, HEADER_SEPARATOR, value),
            ));
        }
    }

    if !state.filter.is_empty() {
        let filter: Vec<&str> = state.filter.iter().map(String::as_str).collect();
        pairs.push(("filter".to_string(), filter.join(",")));
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_component(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        // Stray `%` sequences stay as-is rather than failing the decode.
        Err(_) => raw.to_string(),
    }
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/share_tests.rs"]
mod tests;
