//! The application state controller: single owner of [`AppState`].
//!
//! All mutation flows through the update operations, which recompute the
//! derived [`UrlPair`] and rewrite the shareable query string through the
//! injected [`NavigationPort`]. Repo-identity changes hand out
//! identity-tagged resolution tickets; a ticket committed after its
//! identity was superseded is discarded, which stands in for cancellation
//! in an environment that has none.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    AppState, DEFAULT_LABEL, DEFAULT_PROFILE, Annotation, OptionItem, Phase, RepoIdentity,
    StatusEvent, StatusSink, UrlPair, mint_transaction_id, normalize_profiles,
};
use crate::resolver::{self, ApiConfig, Fetcher, ResolutionError};
use crate::share;

/// Abstraction over the ambient address-bar state, so the codec stays pure
/// and the controller is testable without a history substrate.
pub trait NavigationPort {
    fn read(&self) -> String;
    fn write(&mut self, query: &str);
}

/// Caller-supplied initial values; the navigation query string wins over
/// these field by field.
#[derive(Clone, Debug)]
pub struct Defaults {
    pub server_url: String,
    pub app_name: String,
    pub profiles: Vec<String>,
    pub label: String,
    pub headers: BTreeMap<String, String>,
    pub transaction_id: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            app_name: String::new(),
            profiles: vec![DEFAULT_PROFILE.to_string()],
            label: DEFAULT_LABEL.to_string(),
            headers: BTreeMap::new(),
            transaction_id: None,
        }
    }
}

/// Tags an in-flight resolution with the identity it was issued for.
#[derive(Clone, Debug)]
pub struct ResolutionTicket {
    phase: Phase,
    identity: RepoIdentity,
}

impl ResolutionTicket {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn identity(&self) -> &RepoIdentity {
        &self.identity
    }
}

pub struct Controller<N: NavigationPort, S: StatusSink> {
    state: AppState,
    urls: Option<UrlPair>,
    portal: bool,
    nav: N,
    status: S,
    identity: Option<RepoIdentity>,
    label_options: Vec<OptionItem>,
    profile_options: Vec<OptionItem>,
}

impl<N: NavigationPort, S: StatusSink> Controller<N, S> {
    /// Rebuilds state from the navigation query over `defaults`. When both
    /// server URL and app name are already known, identity binds
    /// immediately (the original's mount-time auto-submit) so the derived
    /// URLs and the shareable query exist from the first frame.
    pub fn new(defaults: Defaults, portal: bool, nav: N, status: S) -> Self {
        let decoded = share::decode(&nav.read());
        let state = AppState {
            server_url: decoded.url.unwrap_or(defaults.server_url),
            app_name: decoded.app_name.unwrap_or(defaults.app_name),
            profiles: decoded.profiles.unwrap_or(defaults.profiles),
            label: decoded.label.unwrap_or(defaults.label),
            headers: decoded.headers.unwrap_or(defaults.headers),
            filter: decoded.filter.unwrap_or_default(),
            transaction_id: defaults.transaction_id.unwrap_or_else(mint_transaction_id),
        };

        let mut controller = Self {
            state,
            urls: None,
            portal,
            nav,
            status,
            identity: None,
            label_options: default_label_options(),
            profile_options: default_profile_options(),
        };
        if !controller.state.server_url.is_empty() && !controller.state.app_name.is_empty() {
            let (url, app_name, headers) = (
                controller.state.server_url.clone(),
                controller.state.app_name.clone(),
                controller.state.headers.clone(),
            );
            let profiles = controller.state.profiles.clone();
            let label = controller.state.label.clone();
            controller.update_server_identity(&url, &app_name, &headers, Some(profiles), Some(&label));
        }
        controller
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn urls(&self) -> Option<&UrlPair> {
        self.urls.as_ref()
    }

    pub fn portal(&self) -> bool {
        self.portal
    }

    pub fn repo_identity(&self) -> Option<&RepoIdentity> {
        self.identity.as_ref()
    }

    pub fn label_options(&self) -> &[OptionItem] {
        &self.label_options
    }

    pub fn profile_options(&self) -> &[OptionItem] {
        &self.profile_options
    }

    /// The current query string in its shareable form, `?` included.
    pub fn share_link(&self) -> String {
        format!("?{}", share::encode(&self.state, !self.portal))
    }

    /// Sets the server identity; `profiles`/`label` reset to their
    /// defaults when not supplied (the submit path). Headers are only
    /// accepted outside portal mode.
    pub fn update_server_identity(
        &mut self,
        url: &str,
        app_name: &str,
        headers: &BTreeMap<String, String>,
        profiles: Option<Vec<String>>,
        label: Option<&str>,
    ) {
        self.state.server_url = url.to_string();
        self.state.app_name = app_name.to_string();
        self.state.label = label.unwrap_or(DEFAULT_LABEL).to_string();
        self.state.profiles =
            normalize_profiles(&profiles.unwrap_or_else(|| vec![DEFAULT_PROFILE.to_string()]));
        if !self.portal {
            self.state.headers = headers.clone();
        }
        self.refresh_urls();
    }

    pub fn update_profiles(&mut self, selection: Vec<String>) {
        self.state.profiles = normalize_profiles(&selection);
        self.refresh_urls();
    }

    /// Changes the label. Profile overlays differ per label, so when an
    /// identity is bound this hands back a ticket for re-resolving the
    /// profile list (current selection kept for not-found marking).
    pub fn update_label(&mut self, label: &str) -> Option<ResolutionTicket> {
        self.state.label = label.to_string();
        self.refresh_urls();
        self.identity.clone().map(|identity| ResolutionTicket {
            phase: Phase::Profiles,
            identity,
        })
    }

    /// Rewrites only the filter portion of the shareable state; the
    /// derived URLs are untouched.
    pub fn update_filter(&mut self, filter: BTreeSet<String>) {
        self.state.filter = filter;
        self.write_query();
    }

    /// Applies a repo-identity change derived from resolved metadata.
    /// Returns the resolution tickets to run (in any order); clearing the
    /// identity resets both option lists to their defaults instead.
    pub fn set_repo_identity(&mut self, identity: Option<RepoIdentity>) -> Vec<ResolutionTicket> {
        if identity == self.identity {
            return Vec::new();
        }
        self.identity = identity;
        match &self.identity {
            Some(identity) => vec![
                ResolutionTicket {
                    phase: Phase::Labels,
                    identity: identity.clone(),
                },
                ResolutionTicket {
                    phase: Phase::Profiles,
                    identity: identity.clone(),
                },
            ],
            None => {
                self.label_options = default_label_options();
                self.profile_options = default_profile_options();
                Vec::new()
            }
        }
    }

    /// Commits a label resolution. Stale tickets (issued for a superseded
    /// identity) are discarded; failures are reported and leave the
    /// previous list in place.
    pub fn commit_labels(
        &mut self,
        ticket: &ResolutionTicket,
        result: Result<Vec<OptionItem>, ResolutionError>,
    ) {
        if ticket.phase != Phase::Labels || Some(&ticket.identity) != self.identity.as_ref() {
            return;
        }
        match result {
            Ok(options) => self.label_options = options,
            Err(err) => self
                .status
                .report(StatusEvent::failure(err.phase, &err.url, &err.source)),
        }
    }

    /// Commits a profile resolution; same staleness and failure rules as
    /// [`Self::commit_labels`]. The two fields are independent: whichever
    /// resolution completed last wins for its own list only.
    pub fn commit_profiles(
        &mut self,
        ticket: &ResolutionTicket,
        result: Result<Vec<OptionItem>, ResolutionError>,
    ) {
        if ticket.phase != Phase::Profiles || Some(&ticket.identity) != self.identity.as_ref() {
            return;
        }
        match result {
            Ok(options) => self.profile_options = options,
            Err(err) => self
                .status
                .report(StatusEvent::failure(err.phase, &err.url, &err.source)),
        }
    }

    /// Runs both resolutions for the current identity in sequence. The CLI
    /// drive path; an event-driven embedder issues the tickets itself and
    /// commits completions as they arrive.
    pub fn resolve_with(&mut self, cfg: &ApiConfig, fetcher: &dyn Fetcher) {
        let Some(identity) = self.identity.clone() else {
            return;
        };

        let ticket = ResolutionTicket {
            phase: Phase::Labels,
            identity: identity.clone(),
        };
        let result =
            resolver::resolve_labels(cfg, &identity.user, &identity.repo, fetcher, &mut self.status);
        self.commit_labels(&ticket, result);

        let ticket = ResolutionTicket {
            phase: Phase::Profiles,
            identity: identity.clone(),
        };
        let requested = self.state.profiles.clone();
        let result = resolver::resolve_profiles(
            cfg,
            &identity.user,
            &identity.repo,
            &self.state.label,
            &self.state.app_name,
            &requested,
            fetcher,
            &mut self.status,
        );
        self.commit_profiles(&ticket, result);
    }

    fn refresh_urls(&mut self) {
        self.urls = Some(UrlPair::derive(
            &self.state.server_url,
            &self.state.app_name,
            &self.state.profiles,
            &self.state.label,
        ));
        self.write_query();
    }

    fn write_query(&mut self) {
        let query = share::encode(&self.state, !self.portal);
        self.nav.write(&format!("?{}", query));
    }
}

fn default_label_options() -> Vec<OptionItem> {
    vec![OptionItem::annotated(DEFAULT_LABEL, Annotation::Branch)]
}

fn default_profile_options() -> Vec<OptionItem> {
    vec![OptionItem::plain(DEFAULT_PROFILE)]
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
