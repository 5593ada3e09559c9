use std::path::PathBuf;
use clap::{Parser, Subcommand};
use ci_mode_core::hook::{HookModel, HookPhase};

/// Runs CI scripts under a simulated outcome chosen from the environment.
///
/// The mode of a script comes from `<PREFIX>_<script>`, then `<PREFIX>`,
/// then defaults to EXEC.
#[derive(Parser, Debug)]
#[command(name = "ci-mode")]
#[command(version)]
pub struct Cli {
    /// JSON runner configuration
    #[arg(long, global = true, env = "CI_MODE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix of the mode variables
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Directory scanned for external hooks (`<phase>-<order>-<name>`)
    #[arg(long, global = true)]
    pub hooks_dir: Option<PathBuf>,

    /// Marker file that lets an EXEC run be skipped as up to date
    #[arg(long, global = true)]
    pub cache_marker: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command under the resolved mode and exit with the resulting status
    Run {
        /// Script name used for the per-script key; defaults to the command's file name
        #[arg(long)]
        script: Option<String>,
        /// How the built-in handlers run
        #[arg(long, default_value_t = HookModel::InProcess)]
        model: HookModel,
        /// Command to wrap
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the mode a script resolves to, and where it came from
    Resolve {
        #[arg(long)]
        script: Option<String>,
    },
    /// Print `Continue` or `Skip` for the build cache
    CacheDecision {
        /// Marker file; defaults to the configured one
        #[arg(long)]
        marker: Option<PathBuf>,
        /// Build even when the marker exists
        #[arg(long)]
        force: bool,
    },
    /// Run one built-in handler and print its contract lines
    #[command(hide = true)]
    Hook {
        name: String,
        #[arg(long, default_value_t = HookPhase::Begin)]
        phase: HookPhase,
    },
}
