use clap::Parser;
use std::path::PathBuf;

/// Line-delimited JSON sidecar for the gradebook: one request per stdin line,
/// one response per stdout line.
#[derive(Debug, Clone, Parser)]
#[command(name = "gradebookd", version)]
pub struct Config {
    /// Workspace directory to open at startup (otherwise use `workspace.select`).
    #[arg(long, env = "GRADEBOOKD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// tracing filter directive; logs go to stderr.
    #[arg(long, env = "GRADEBOOKD_LOG", default_value = "gradebookd=info")]
    pub log_filter: String,
}
