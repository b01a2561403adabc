//! CLI argument definitions for anchorage-runner.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Anchorage end-to-end pipeline runner.
///
/// Provisions the test environment (bootstrap cluster, ingress,
/// platform, lifecycle controller, git server), executes the GitOps
/// import scenario, and tears everything down afterwards.
#[derive(Parser, Debug)]
#[command(name = "anchorage-runner")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to the anchorage.toml configuration file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate the configuration file and exit without running.
    #[arg(long)]
    pub validate: bool,

    /// Leave all provisioned resources standing after the run.
    ///
    /// Takes precedence over `scenario.skip_cleanup` in the config
    /// file.
    #[arg(long)]
    pub skip_cleanup: bool,
}
