//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Cancellation behavior for in-flight sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CancelPolicyArg {
    /// Mark pending nodes cancelled and abort their sends
    Abort,
    /// Mark pending nodes cancelled and let their sends finish
    Detach,
}

/// nodefan - fan one command out to a simulated cluster and report per node
#[derive(Parser, Debug)]
#[command(name = "nodefan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cluster file (TOML) describing dispatch, logging, and the simulated nodes
    #[arg(short = 'c', long, env = "NODEFAN_CONFIG")]
    pub config: PathBuf,

    /// Node selection: all, masters, replicas, slot:<n>, key:<key>, nodes:<a,b>
    #[arg(short = 's', long, default_value = "all")]
    pub selector: String,

    /// Command to dispatch
    #[arg(value_name = "COMMAND", default_value = "PING")]
    pub command: String,

    /// Command arguments, forwarded unchanged
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// Wait timeout (e.g., 500ms, 2s); overrides dispatch.timeout_ms
    #[arg(short = 't', long)]
    pub timeout: Option<String>,

    /// What cancelling does to in-flight sends; overrides dispatch.cancel_policy
    #[arg(long, value_enum)]
    pub cancel_policy: Option<CancelPolicyArg>,

    /// Cancel nodes still pending when the wait times out
    #[arg(long)]
    pub cancel_on_timeout: bool,

    /// Tracing filter directives; overrides logging.filter
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also write the report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Exit with an error if any node failed or stayed pending
    #[arg(long)]
    pub strict: bool,

    /// Validate configuration and show the selected nodes without dispatching
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.command.trim().is_empty() {
            anyhow::bail!("command must not be empty");
        }
        if let Some(timeout) = &self.timeout {
            let ms = super::cli_convert::parse_duration_ms(timeout)?;
            if ms == 0 {
                anyhow::bail!("timeout must be greater than zero");
            }
        }
        super::cli_convert::parse_selector(&self.selector)?;
        Ok(())
    }
}
