use super::*;

use std::cell::RefCell;

use crate::model::{StatusEvent, StatusSink};

struct FakeFetcher {
    body: std::result::Result<String, String>,
    seen: RefCell<Vec<(String, ApiRequest)>>,
}

impl FakeFetcher {
    fn ok(body: &str) -> Self {
        Self {
            body: Ok(body.to_string()),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            body: Err(message.to_string()),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Fetcher for FakeFetcher {
    fn get(&self, url: &str, request: &ApiRequest) -> Result<String> {
        self.seen
            .borrow_mut()
            .push((url.to_string(), request.clone()));
        match &self.body {
            Ok(body) => Ok(body.clone()),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

#[derive(Default)]
struct CollectStatus(Vec<StatusEvent>);

impl StatusSink for CollectStatus {
    fn report(&mut self, event: StatusEvent) {
        self.0.push(event);
    }
}

fn token_cfg() -> ApiConfig {
    let mut extra_headers = BTreeMap::new();
    extra_headers.insert("x-extra".to_string(), "1".to_string());
    ApiConfig {
        proxy: String::new(),
        repos_api_base: "https://api.example.com/repos".to_string(),
        auth: AuthMode::Token("t0".to_string()),
        transaction_id: "tid-1".to_string(),
        extra_headers,
    }
}

fn values(options: &[OptionItem]) -> Vec<&str> {
    options.iter().map(|o| o.value.as_str()).collect()
}

#[test]
fn labels_sorted_case_insensitively() {
    let body = r#"[
        {"ref": "refs/heads/Zeta", "url": "ignored"},
        {"ref": "refs/heads/alpha"},
        {"ref": "refs/tags/v1"}
    ]"#;
    let fetcher = FakeFetcher::ok(body);
    let mut status = CollectStatus::default();

    let options = resolve_labels(&token_cfg(), "org", "config", &fetcher, &mut status).unwrap();
    assert_eq!(values(&options), vec!["alpha", "v1", "Zeta"]);
    assert_eq!(options[0].annotation, Some(Annotation::Branch));
    assert_eq!(options[1].annotation, Some(Annotation::Tag));
    assert_eq!(options[2].annotation, Some(Annotation::Branch));
}

#[test]
fn ref_short_names_keep_inner_slashes() {
    let body = r#"[{"ref": "refs/heads/feature/x"}]"#;
    let fetcher = FakeFetcher::ok(body);
    let mut status = CollectStatus::default();

    let options = resolve_labels(&token_cfg(), "org", "config", &fetcher, &mut status).unwrap();
    assert_eq!(values(&options), vec!["feature/x"]);
}

#[test]
fn name_existing_as_branch_and_tag_yields_two_options() {
    let body = r#"[{"ref": "refs/tags/v1"}, {"ref": "refs/heads/v1"}]"#;
    let fetcher = FakeFetcher::ok(body);
    let mut status = CollectStatus::default();

    let options = resolve_labels(&token_cfg(), "org", "config", &fetcher, &mut status).unwrap();
    assert_eq!(values(&options), vec!["v1", "v1"]);
    // Stable sort keeps branches ahead of tags for equal names.
    assert_eq!(options[0].annotation, Some(Annotation::Branch));
    assert_eq!(options[1].annotation, Some(Annotation::Tag));
}

#[test]
fn labels_failure_carries_phase_and_url() {
    let fetcher = FakeFetcher::failing("boom");
    let mut status = CollectStatus::default();

    let err = resolve_labels(&token_cfg(), "org", "config", &fetcher, &mut status).unwrap_err();
    assert_eq!(err.phase, Phase::Labels);
    assert_eq!(
        err.url,
        "https://api.example.com/repos/org/config/git/refs?per_page=100"
    );
}

#[test]
fn malformed_listing_body_is_a_resolution_error() {
    let fetcher = FakeFetcher::ok("not json");
    let mut status = CollectStatus::default();

    let err = resolve_labels(&token_cfg(), "org", "config", &fetcher, &mut status).unwrap_err();
    assert_eq!(err.phase, Phase::Labels);
}

#[test]
fn token_mode_request_carries_tid_and_auth() {
    let fetcher = FakeFetcher::ok("[]");
    let mut status = CollectStatus::default();
    resolve_labels(&token_cfg(), "org", "config", &fetcher, &mut status).unwrap();

    let seen = fetcher.seen.borrow();
    let (_, request) = &seen[0];
    assert!(!request.with_credentials);
    let has = |key: &str, value: &str| {
        request
            .headers
            .iter()
            .any(|(k, v)| k == key && v == value)
    };
    assert!(has("User-Agent", USER_AGENT));
    assert!(has("tid", "tid-1"));
    assert!(has("authorization", "token t0"));
    assert!(has("x-extra", "1"));
}

#[test]
fn session_mode_request_forwards_credentials_instead_of_token() {
    let mut cfg = token_cfg();
    cfg.auth = AuthMode::Session;
    let fetcher = FakeFetcher::ok("[]");
    let mut status = CollectStatus::default();
    resolve_labels(&cfg, "org", "config", &fetcher, &mut status).unwrap();

    let seen = fetcher.seen.borrow();
    let (_, request) = &seen[0];
    assert!(request.with_credentials);
    assert!(!request.headers.iter().any(|(k, _)| k == "authorization"));
}

#[test]
fn profiles_dedup_and_mark_missing_requests() {
    let body = r#"[
        {"name": "app-dev.properties"},
        {"name": "app-qa.yml"},
        {"name": "application-default.yml"}
    ]"#;
    let fetcher = FakeFetcher::ok(body);
    let mut status = CollectStatus::default();
    let requested = vec!["dev".to_string(), "missing".to_string()];

    let options = resolve_profiles(
        &token_cfg(),
        "org",
        "config",
        "master",
        "app",
        &requested,
        &fetcher,
        &mut status,
    )
    .unwrap();

    assert_eq!(values(&options), vec!["default", "dev", "missing", "qa"]);
    for option in &options {
        if option.value == "missing" {
            assert_eq!(option.annotation, Some(Annotation::NotFound));
        } else {
            assert_eq!(option.annotation, None);
        }
    }
}

#[test]
fn empty_listing_yields_default_only() {
    let fetcher = FakeFetcher::ok("[]");
    let mut status = CollectStatus::default();

    let options = resolve_profiles(
        &token_cfg(),
        "org",
        "config",
        "master",
        "app",
        &[],
        &fetcher,
        &mut status,
    )
    .unwrap();
    assert_eq!(values(&options), vec!["default"]);
}

#[test]
fn only_matching_filename_prefixes_are_considered() {
    let body = r#"[
        {"name": "other-dev.yml"},
        {"name": "app-dev.yml"},
        {"name": "README.md"}
    ]"#;
    let fetcher = FakeFetcher::ok(body);
    let mut status = CollectStatus::default();

    let options = resolve_profiles(
        &token_cfg(),
        "org",
        "config",
        "master",
        "app",
        &[],
        &fetcher,
        &mut status,
    )
    .unwrap();
    assert_eq!(values(&options), vec!["default", "dev"]);
}

#[test]
fn contents_request_targets_the_label() {
    let fetcher = FakeFetcher::ok("[]");
    let mut status = CollectStatus::default();
    resolve_profiles(
        &token_cfg(),
        "org",
        "config",
        "feature/x",
        "app",
        &[],
        &fetcher,
        &mut status,
    )
    .unwrap();

    let seen = fetcher.seen.borrow();
    assert_eq!(
        seen[0].0,
        "https://api.example.com/repos/org/config/contents?ref=feature/x"
    );
}

#[test]
fn resolution_is_idempotent_for_identical_server_state() {
    let body = r#"[{"name": "app-dev.yml"}]"#;
    let fetcher = FakeFetcher::ok(body);
    let mut status = CollectStatus::default();

    let run = |status: &mut CollectStatus| {
        resolve_profiles(
            &token_cfg(),
            "org",
            "config",
            "master",
            "app",
            &[],
            &fetcher,
            status,
        )
        .unwrap()
    };
    assert_eq!(run(&mut status), run(&mut status));
}
