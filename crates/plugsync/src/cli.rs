//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use plugsync_update::InstallScope;

/// plugsync - keep repository-hosted plugins up to date
#[derive(Parser, Debug)]
#[command(name = "plugsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to plugins.yaml
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Path to the JSON state file
    #[arg(long, global = true, env = "PLUGSYNC_STATE_FILE")]
    pub state: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Check tracked plugins for new revisions
    Check(CheckArgs),

    /// Install new revisions of tracked plugins
    Update(UpdateArgs),

    /// Install a repository that is not tracked
    Install(InstallArgs),

    /// Show install records
    Status(StatusArgs),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only check this repository (owner/name)
    pub repository: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Only update this repository (owner/name)
    pub repository: Option<String>,

    /// Install even where auto-update is disabled
    #[arg(short, long)]
    pub force: bool,
}

// Install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Repository to install (owner/name)
    pub repository: String,

    /// Plugins directory to install into
    #[arg(short, long)]
    pub destination: Utf8PathBuf,

    /// Install scope (standard or shared)
    #[arg(short, long, default_value = "standard")]
    pub scope: InstallScope,

    /// Access token for the repository
    #[arg(short, long, env = "PLUGSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

// Status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
