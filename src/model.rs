//! Shared data model: application state, dropdown options, status events.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Token substituted for `/` wherever a label is embedded into a path
/// segment. Labels like `feature/x` would otherwise split the path.
pub const LABEL_ESCAPE: &str = "(_)";

/// Separator between key and value inside a `headers[]` query parameter.
/// A key or value containing this literal token does not round-trip; the
/// original tool has the same limitation and we keep its wire format.
pub const HEADER_SEPARATOR: &str = "(_)";

/// Sentinel profile meaning "no overlay selected".
pub const DEFAULT_PROFILE: &str = "default";

pub const DEFAULT_LABEL: &str = "master";

/// The single source of truth owned by the controller. Recreated on start
/// from the navigation query string merged over caller defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppState {
    pub server_url: String,
    pub app_name: String,
    pub label: String,
    pub profiles: Vec<String>,
    pub headers: BTreeMap<String, String>,
    pub filter: BTreeSet<String>,
    pub transaction_id: String,
}

/// The two document URLs derived from the state. Never edited directly;
/// recomputed when any field other than `headers`/`filter` changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlPair {
    pub meta_url: String,
    pub conf_url: String,
}

impl UrlPair {
    pub fn derive(server_url: &str, app_name: &str, profiles: &[String], label: &str) -> Self {
        let profiles = profiles.join(",");
        let label = escape_label(label);
        Self {
            meta_url: format!("{}/{}/{}/{}", server_url, app_name, profiles, label),
            conf_url: format!("{}/{}/{}-{}", server_url, label, app_name, profiles),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Annotation {
    NotFound,
    Tag,
    Branch,
}

/// One entry in a label or profile dropdown. `value` is unique within a
/// list; `annotation` marks speculative or ref-kind entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub value: String,
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl OptionItem {
    pub fn plain(name: &str) -> Self {
        Self {
            value: name.to_string(),
            text: name.to_string(),
            annotation: None,
        }
    }

    pub fn annotated(name: &str, annotation: Annotation) -> Self {
        Self {
            value: name.to_string(),
            text: name.to_string(),
            annotation: Some(annotation),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoIdentity {
    pub user: String,
    pub repo: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Labels,
    Profiles,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Labels => write!(f, "labels"),
            Phase::Profiles => write!(f, "profiles"),
        }
    }
}

/// Progress and failure reports delivered to the status collaborator.
/// Failures are non-fatal; the triggering URL gives the UI actionable
/// context.
#[derive(Clone, Debug)]
pub struct StatusEvent {
    pub phase: Phase,
    pub url: String,
    pub at: OffsetDateTime,
    pub detail: StatusDetail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusDetail {
    Files(Vec<String>),
    Names(Vec<String>),
    Tags(Vec<String>),
    Branches(Vec<String>),
    Failure(String),
}

impl StatusEvent {
    pub fn progress(phase: Phase, url: &str, detail: StatusDetail) -> Self {
        Self {
            phase,
            url: url.to_string(),
            at: OffsetDateTime::now_utc(),
            detail,
        }
    }

    pub fn failure(phase: Phase, url: &str, error: &anyhow::Error) -> Self {
        Self {
            phase,
            url: url.to_string(),
            at: OffsetDateTime::now_utc(),
            detail: StatusDetail::Failure(format!("{:#}", error)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.detail, StatusDetail::Failure(_))
    }
}

/// Receiver for resolver/controller progress and failure reports. Errors
/// never propagate past this boundary and nothing retries automatically.
pub trait StatusSink {
    fn report(&mut self, event: StatusEvent);
}

pub fn escape_label(label: &str) -> String {
    label.replace('/', LABEL_ESCAPE)
}

/// Collapses a profile selection to the invariant form: an empty selection
/// or one whose last-added entry is `default` becomes exactly `[default]`;
/// otherwise `default` is dropped from alongside real profiles.
pub fn normalize_profiles(selection: &[String]) -> Vec<String> {
    if selection.is_empty() || selection.last().map(String::as_str) == Some(DEFAULT_PROFILE) {
        return vec![DEFAULT_PROFILE.to_string()];
    }
    selection
        .iter()
        .filter(|p| p.as_str() != DEFAULT_PROFILE)
        .cloned()
        .collect()
}

/// Mints a random hex transaction id for callers that do not supply one.
/// When the OS entropy source is unavailable the id falls back to the
/// current timestamp, which still distinguishes runs for request tracing.
pub fn mint_transaction_id() -> String {
    let mut bytes = [0u8; 16];
    if let Err(err) = getrandom::getrandom(&mut bytes) {
        log::warn!("system entropy unavailable ({}), using timestamp fallback", err);
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        bytes.copy_from_slice(&nanos.to_be_bytes());
    }
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
