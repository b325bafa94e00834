use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use time::format_description::well_known::Rfc3339;

use config_inspector::controller::{Controller, Defaults, NavigationPort};
use config_inspector::diff::{self, ChunkKind, DiffChunk};
use config_inspector::model::{
    Annotation, OptionItem, StatusDetail, StatusEvent, StatusSink, UrlPair, mint_transaction_id,
    normalize_profiles,
};
use config_inspector::resolver::{
    ApiConfig, AuthMode, Fetcher, HttpFetcher, resolve_labels, resolve_profiles,
};

#[derive(Parser)]
#[command(name = "config-inspector")]
#[command(about = "Inspect and compare config-server documents", long_about = None)]
struct Cli {
    /// Log resolver progress to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ApiOpts {
    /// Repository hosting API base
    #[arg(long, default_value = "https://api.github.com/repos")]
    api_base: String,

    /// Proxy prefix prepended to every hosting API URL
    #[arg(long, default_value = "")]
    proxy: String,

    /// Hosting API token (standalone mode); omit for session mode
    #[arg(long)]
    token: Option<String>,

    /// Additional request header (repeatable)
    #[arg(long = "header", value_name = "KEY=VALUE")]
    headers: Vec<String>,

    /// Transaction id; a random one is minted when omitted
    #[arg(long)]
    tid: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List branch and tag labels for a repository
    Labels {
        #[arg(long)]
        user: String,
        #[arg(long)]
        repo: String,
        /// Emit JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        api: ApiOpts,
    },

    /// List profile overlays available for an app at a label
    Profiles {
        #[arg(long)]
        user: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        app: String,
        #[arg(long, default_value = "master")]
        label: String,
        /// Profiles to keep selected; unknown ones are marked not found
        #[arg(long, value_delimiter = ',')]
        requested: Vec<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        api: ApiOpts,
    },

    /// Diff two config documents, from local files or a config server
    Diff {
        /// Base document file (with --compare-file; skips the server)
        #[arg(long)]
        base_file: Option<PathBuf>,
        /// Comparison document file
        #[arg(long)]
        compare_file: Option<PathBuf>,
        /// Config server URL
        #[arg(long)]
        url: Option<String>,
        /// App name on the config server
        #[arg(long)]
        app: Option<String>,
        #[arg(long, value_delimiter = ',')]
        profiles: Vec<String>,
        #[arg(long, default_value = "master")]
        label: String,
        /// Label of the comparison target (defaults to --label)
        #[arg(long)]
        compare_label: Option<String>,
        /// Profiles of the comparison target (defaults to --profiles)
        #[arg(long, value_delimiter = ',')]
        compare_profiles: Vec<String>,
        #[command(flatten)]
        api: ApiOpts,
    },

    /// Print the shareable query string for a given state
    Link {
        #[arg(long)]
        url: String,
        #[arg(long)]
        app: String,
        #[arg(long, value_delimiter = ',')]
        profiles: Vec<String>,
        #[arg(long, default_value = "master")]
        label: String,
        #[arg(long, value_delimiter = ',')]
        filter: Vec<String>,
        /// Header to embed in the link (repeatable)
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,
        /// Portal mode: suppress url, app name and headers from the link
        #[arg(long)]
        portal: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    match cli.command {
        Commands::Labels {
            user,
            repo,
            json,
            api,
        } => {
            let cfg = api.to_config()?;
            let fetcher = HttpFetcher::new()?;
            let mut status = TerminalStatus;
            let options = resolve_labels(&cfg, &user, &repo, &fetcher, &mut status)?;
            print_options(&options, json)
        }

        Commands::Profiles {
            user,
            repo,
            app,
            label,
            requested,
            json,
            api,
        } => {
            let cfg = api.to_config()?;
            let fetcher = HttpFetcher::new()?;
            let mut status = TerminalStatus;
            let options = resolve_profiles(
                &cfg, &user, &repo, &label, &app, &requested, &fetcher, &mut status,
            )?;
            print_options(&options, json)
        }

        Commands::Diff {
            base_file,
            compare_file,
            url,
            app,
            profiles,
            label,
            compare_label,
            compare_profiles,
            api,
        } => {
            let (base, compare) = match (base_file, compare_file) {
                (Some(base_path), Some(compare_path)) => {
                    let base = std::fs::read_to_string(&base_path)
                        .with_context(|| format!("read {}", base_path.display()))?;
                    let compare = std::fs::read_to_string(&compare_path)
                        .with_context(|| format!("read {}", compare_path.display()))?;
                    (base, compare)
                }
                (None, None) => {
                    let url = url.context("--url is required without --base-file")?;
                    let app = app.context("--app is required without --base-file")?;
                    let cfg = api.to_config()?;
                    let fetcher = HttpFetcher::new()?;

                    let base_profiles = normalize_profiles(&profiles);
                    let compare_profiles = if compare_profiles.is_empty() {
                        base_profiles.clone()
                    } else {
                        normalize_profiles(&compare_profiles)
                    };
                    let compare_label = compare_label.unwrap_or_else(|| label.clone());

                    let base_urls = UrlPair::derive(&url, &app, &base_profiles, &label);
                    let compare_urls = UrlPair::derive(&url, &app, &compare_profiles, &compare_label);
                    let base = fetch_document(&fetcher, &cfg, &base_urls.meta_url)?;
                    let compare = fetch_document(&fetcher, &cfg, &compare_urls.meta_url)?;
                    (base, compare)
                }
                _ => anyhow::bail!("--base-file and --compare-file must be used together"),
            };

            let chunks = diff::diff(&base, &compare);
            if chunks.is_empty() && base != compare {
                log::warn!("documents use different representations; no diff computed");
            }
            render_chunks(&chunks);
            Ok(())
        }

        Commands::Link {
            url,
            app,
            profiles,
            label,
            filter,
            headers,
            portal,
        } => {
            let defaults = Defaults {
                server_url: url,
                app_name: app,
                profiles: normalize_profiles(&profiles),
                label,
                headers: parse_headers(&headers)?,
                transaction_id: None,
            };
            let mut controller =
                Controller::new(defaults, portal, MemoryNavigation::default(), TerminalStatus);
            if !filter.is_empty() {
                controller.update_filter(filter.into_iter().collect::<BTreeSet<String>>());
            }
            println!("{}", controller.share_link());
            Ok(())
        }
    }
}

impl ApiOpts {
    fn to_config(&self) -> Result<ApiConfig> {
        let auth = match &self.token {
            Some(token) => AuthMode::Token(token.clone()),
            None => AuthMode::Session,
        };
        Ok(ApiConfig {
            proxy: self.proxy.clone(),
            repos_api_base: self.api_base.clone(),
            auth,
            transaction_id: self.tid.clone().unwrap_or_else(mint_transaction_id),
            extra_headers: parse_headers(&self.headers)?,
        })
    }
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut headers = BTreeMap::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("bad --header (expected KEY=VALUE): {}", entry))?;
        headers.insert(key.to_string(), value.to_string());
    }
    Ok(headers)
}

fn fetch_document(fetcher: &HttpFetcher, cfg: &ApiConfig, url: &str) -> Result<String> {
    log::info!("fetching config document {}", url);
    fetcher
        .get(url, &cfg.request())
        .with_context(|| format!("fetch config document {}", url))
}

fn print_options(options: &[OptionItem], json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(options).context("serialize options json")?
        );
        return Ok(());
    }
    for option in options {
        match option.annotation {
            Some(Annotation::NotFound) => println!("{} (not found)", option.text),
            Some(Annotation::Tag) => println!("{} (tag)", option.text),
            Some(Annotation::Branch) => println!("{} (branch)", option.text),
            None => println!("{}", option.text),
        }
    }
    Ok(())
}

fn render_chunks(chunks: &[DiffChunk]) {
    let mut out = String::new();
    for chunk in chunks {
        let sign = match chunk.kind {
            ChunkKind::Unchanged => ' ',
            ChunkKind::Added => '+',
            ChunkKind::Removed => '-',
        };
        for line in chunk.text.split_inclusive('\n') {
            out.push(sign);
            out.push_str(line);
            // An unterminated line only occurs at a chunk boundary; close
            // it so the next chunk's sign starts its own row.
            if !line.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    print!("{}", out);
}

/// Stand-in for the browser address bar: the query lives in memory and the
/// latest write is what `share_link` reflects.
#[derive(Default)]
struct MemoryNavigation {
    query: String,
}

impl NavigationPort for MemoryNavigation {
    fn read(&self) -> String {
        self.query.clone()
    }

    fn write(&mut self, query: &str) {
        self.query = query.to_string();
    }
}

struct TerminalStatus;

impl StatusSink for TerminalStatus {
    fn report(&mut self, event: StatusEvent) {
        let at = event.at.format(&Rfc3339).unwrap_or_default();
        match &event.detail {
            StatusDetail::Failure(message) => {
                log::warn!("[{}] {} failed for {}: {}", at, event.phase, event.url, message);
            }
            detail => {
                log::info!("[{}] {} progress for {}: {:?}", at, event.phase, event.url, detail);
            }
        }
    }
}
