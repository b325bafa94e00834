//! Turns a repository identity into label and profile option lists.
//!
//! Both operations are pure with respect to shared state: they fetch one
//! listing through the injected [`Fetcher`], report progress milestones to
//! the status collaborator, and return a sorted option list. Unknown
//! requested profiles are marked not-found instead of rejected. Failures
//! carry the phase and the attempted URL; nothing retries automatically.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::model::{
    Annotation, DEFAULT_PROFILE, OptionItem, Phase, StatusDetail, StatusEvent, StatusSink,
};

mod http;
pub use self::http::HttpFetcher;

pub const USER_AGENT: &str = "config-inspector";

/// Per-deployment authentication. Session mode relies on ambient cookie
/// credentials forwarded by the fetcher; token mode sends the hosting API
/// token header. Mutually exclusive by construction.
#[derive(Clone, Debug)]
pub enum AuthMode {
    Session,
    Token(String),
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Prepended verbatim to every hosting-API URL; empty when no proxy.
    pub proxy: String,
    /// e.g. `https://api.github.com/repos`.
    pub repos_api_base: String,
    pub auth: AuthMode,
    pub transaction_id: String,
    pub extra_headers: BTreeMap<String, String>,
}

/// Prepared request parameters handed to the fetcher alongside the URL.
#[derive(Clone, Debug, Default)]
pub struct ApiRequest {
    pub headers: Vec<(String, String)>,
    pub with_credentials: bool,
}

impl ApiConfig {
    pub fn request(&self) -> ApiRequest {
        let mut headers = vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("tid".to_string(), self.transaction_id.clone()),
        ];
        for (key, value) in &self.extra_headers {
            headers.push((key.clone(), value.clone()));
        }
        match &self.auth {
            AuthMode::Session => ApiRequest {
                headers,
                with_credentials: true,
            },
            AuthMode::Token(token) => {
                headers.push(("authorization".to_string(), format!("token {}", token)));
                ApiRequest {
                    headers,
                    with_credentials: false,
                }
            }
        }
    }

    fn refs_url(&self, user: &str, repo: &str) -> String {
        format!(
            "{}{}/{}/{}/git/refs?per_page=100",
            self.proxy, self.repos_api_base, user, repo
        )
    }

    fn contents_url(&self, user: &str, repo: &str, label: &str) -> String {
        format!(
            "{}{}/{}/{}/contents?ref={}",
            self.proxy, self.repos_api_base, user, repo, label
        )
    }
}

/// Fetch-like collaborator. Returns the response body; any transport
/// failure or non-2xx status is an error.
pub trait Fetcher {
    fn get(&self, url: &str, request: &ApiRequest) -> Result<String>;
}

/// Network or parse failure while resolving one phase. Reported to the
/// status collaborator with the attempted URL; never fatal.
#[derive(Debug)]
pub struct ResolutionError {
    pub phase: Phase,
    pub url: String,
    pub source: anyhow::Error,
}

impl std::fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resolving {} via {}: {:#}", self.phase, self.url, self.source)
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

#[derive(Debug, serde::Deserialize)]
struct RefEntry {
    #[serde(rename = "ref")]
    ref_path: String,
}

#[derive(Debug, serde::Deserialize)]
struct ContentEntry {
    name: String,
}

/// Lists the repository's refs and builds the label dropdown: branches and
/// tags annotated by kind, stable-sorted case-insensitively by name. A name
/// existing as both a branch and a tag yields two distinct options.
pub fn resolve_labels(
    cfg: &ApiConfig,
    user: &str,
    repo: &str,
    fetcher: &dyn Fetcher,
    status: &mut dyn StatusSink,
) -> Result<Vec<OptionItem>, ResolutionError> {
    let url = cfg.refs_url(user, repo);
    log::info!(
        "requesting ref listing from {}",
        url.replacen(&cfg.proxy, "", 1)
    );

    let refs: Vec<RefEntry> = fetch_listing(cfg, &url, Phase::Labels, fetcher)?;

    let mut branches = Vec::new();
    let mut tags = Vec::new();
    for entry in &refs {
        if let Some(name) = entry.ref_path.strip_prefix("refs/heads/") {
            // Only the two leading path segments are stripped; a branch
            // like `feature/x` keeps its short name verbatim.
            branches.push(OptionItem::annotated(name, Annotation::Branch));
        } else if let Some(name) = entry.ref_path.strip_prefix("refs/tags/") {
            tags.push(OptionItem::annotated(name, Annotation::Tag));
        }
    }

    status.report(StatusEvent::progress(
        Phase::Labels,
        &url,
        StatusDetail::Tags(tags.iter().map(|o| o.text.clone()).collect()),
    ));
    status.report(StatusEvent::progress(
        Phase::Labels,
        &url,
        StatusDetail::Branches(branches.iter().map(|o| o.text.clone()).collect()),
    ));

    let mut options = branches;
    options.extend(tags);
    options.sort_by(|a, b| a.value.to_lowercase().cmp(&b.value.to_lowercase()));
    Ok(options)
}

/// Lists the repository contents at `label` and builds the profile
/// dropdown: tokens parsed from `{app_name}-*` / `application-*` filenames,
/// the `default` sentinel, and a not-found-annotated entry for every
/// requested profile the listing lacks (so a selection survives a label
/// switch). Sorted case-insensitively by display text.
pub fn resolve_profiles(
    cfg: &ApiConfig,
    user: &str,
    repo: &str,
    label: &str,
    app_name: &str,
    requested: &[String],
    fetcher: &dyn Fetcher,
    status: &mut dyn StatusSink,
) -> Result<Vec<OptionItem>, ResolutionError> {
    let url = cfg.contents_url(user, repo, label);
    log::info!(
        "requesting content listing from {}",
        url.replacen(&cfg.proxy, "", 1)
    );

    let contents: Vec<ContentEntry> = fetch_listing(cfg, &url, Phase::Profiles, fetcher)?;

    let app_prefix = format!("{}-", app_name);
    let files: Vec<&str> = contents
        .iter()
        .map(|entry| entry.name.as_str())
        .filter(|name| name.starts_with(&app_prefix) || name.starts_with("application-"))
        .collect();
    log::info!("loaded config files for {}: {:?}", app_name, files);
    status.report(StatusEvent::progress(
        Phase::Profiles,
        &url,
        StatusDetail::Files(files.iter().map(|f| f.to_string()).collect()),
    ));

    let mut names: Vec<String> = Vec::new();
    for file in &files {
        // Profile token sits between the first `-` and the last `.`;
        // filenames lacking either are skipped.
        let Some(dash) = file.find('-') else { continue };
        let Some(dot) = file.rfind('.') else { continue };
        if dot <= dash + 1 {
            continue;
        }
        names.push(file[dash + 1..dot].to_string());
    }
    names.push(DEFAULT_PROFILE.to_string());
    log::info!("parsed profile names: {:?}", names);
    status.report(StatusEvent::progress(
        Phase::Profiles,
        &url,
        StatusDetail::Names(names.clone()),
    ));

    let mut options: Vec<OptionItem> = Vec::new();
    for name in &names {
        if !options.iter().any(|o| &o.value == name) {
            options.push(OptionItem::plain(name));
        }
    }
    for profile in requested {
        if !names.contains(profile) {
            options.push(OptionItem::annotated(profile, Annotation::NotFound));
        }
    }

    options.sort_by(|a, b| a.text.to_lowercase().cmp(&b.text.to_lowercase()));
    Ok(options)
}

fn fetch_listing<T: serde::de::DeserializeOwned>(
    cfg: &ApiConfig,
    url: &str,
    phase: Phase,
    fetcher: &dyn Fetcher,
) -> Result<Vec<T>, ResolutionError> {
    let body = fetcher
        .get(url, &cfg.request())
        .map_err(|source| ResolutionError {
            phase,
            url: url.to_string(),
            source,
        })?;
    serde_json::from_str(&body)
        .context("parse listing response")
        .map_err(|source| ResolutionError {
            phase,
            url: url.to_string(),
            source,
        })
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
