mod cli;
mod config;
mod connect;
mod credentials;
mod error;
mod model;
mod operator;
mod providers;
mod sync;
mod util;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{ConfigFile, Settings};
use credentials::KeyringStore;
use operator::TerminalOperator;
use providers::jira::JiraRestClient;
use providers::versionone::VersionOneRestClient;
use sync::writer::{FieldLabels, IssueDefaults};
use sync::Reflector;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Build the log filter from `--loglevel`. A bare word must be a level;
/// `WARNING`, `CRITICAL` and `FATAL` are accepted as aliases. Anything
/// with `=` or `,` is passed to `EnvFilter` as directives.
fn log_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return EnvFilter::try_new(level)
            .with_context(|| format!("Invalid --loglevel '{level}'"));
    }
    let lower = level.to_ascii_lowercase();
    let name = match lower.as_str() {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        other => other,
    };
    if !LEVELS.contains(&name) {
        bail!("Invalid --loglevel '{level}'; expected one of {}", LEVELS.join(", "));
    }
    Ok(EnvFilter::new(name))
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = log_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.loglevel)?;

    // Load config
    let path = cli
        .configfile
        .clone()
        .unwrap_or_else(config::default_config_path);
    info!(path = %path.display(), "Loading configuration");
    let mut config = ConfigFile::load(&path)?;
    if config.ensure_defaults() {
        info!(version = config::CONFIG_VERSION, "Applied default settings");
    }

    let operator = TerminalOperator;
    let keyring = KeyringStore;

    if cli.reset_saved_passwords {
        credentials::reset_saved_passwords(&keyring)?;
        if cli.versionone_ids.is_empty() {
            config.save()?;
            return Ok(());
        }
    }

    let settings = Settings::from_config(&config)?;
    let schemas = sync::schema::resolve(&config)?;
    info!(story_types = schemas.len(), "Resolved story type schemas");

    // Connect
    let (v1_login, v1_diff) = connect::versionone_login(&settings.versionone, &operator, &keyring)?;
    let (jira_login, jira_diff) = connect::jira_login(&settings.jira, &operator, &keyring)?;
    for diff in [&v1_diff, &jira_diff] {
        if !diff.is_empty() {
            config.apply(diff);
        }
    }

    let v1 = VersionOneRestClient::new(
        &v1_login.instance_url,
        &v1_login.username,
        &v1_login.password,
    )?;
    let jira = JiraRestClient::new(&jira_login.domain, &jira_login.username, &jira_login.password);

    let defaults = IssueDefaults {
        assignee: jira_login.username.clone(),
        project: Some(jira_login.project.clone()),
    };
    let field_labels = FieldLabels::from_settings(&settings.jira);
    let reflector = Reflector::new(&v1, &jira, &operator, &schemas, &defaults, &field_labels);

    let report = reflector.run(&cli.versionone_ids, &cli.labels).await;

    if !cli.no_open {
        for synced in &report.synced {
            if let Err(e) = util::browser::open(&synced.permalink).await {
                warn!(url = %synced.permalink, error = %e, "Could not open browser");
            }
        }
    }

    // Save any settings the operator chose to keep
    info!(path = %config.path().display(), "Writing configuration");
    let saved = config.save();
    report.log_summary();
    saved?;

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
