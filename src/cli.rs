use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "v1tojira")]
#[command(about = "Copy/update JIRA issues to match your VersionOne stories")]
#[command(version)]
pub struct Cli {
    /// VersionOne story numbers to create/update JIRA issues for
    #[arg(required_unless_present = "reset_saved_passwords")]
    pub versionone_ids: Vec<String>,

    /// Configuration file [default: ~/.versionone-to-jira-reflector]
    #[arg(long)]
    pub configfile: Option<PathBuf>,

    /// Log level or tracing filter directive
    #[arg(long, default_value = "info")]
    pub loglevel: String,

    /// Label(s) to add to the created/updated JIRA issues
    #[arg(long = "label", num_args = 1..)]
    pub labels: Vec<String>,

    /// Do not open created/updated JIRA issues in the default browser
    #[arg(long)]
    pub no_open: bool,

    /// Delete the saved VersionOne and JIRA passwords
    #[arg(long)]
    pub reset_saved_passwords: bool,
}
