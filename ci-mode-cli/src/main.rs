use clap::Parser;
use tracing_subscriber::EnvFilter;
use crate::cli::Cli;

mod cli;
mod commands;

/// Status reported when ci-mode itself cannot start (bad arguments or configuration)
const USAGE_EXIT_CODE: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // stdout belongs to the wrapped command and to the hook contract
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("CI_MODE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            eprintln!("ci-mode: {e}");
            USAGE_EXIT_CODE
        }
    };
    std::process::exit(code);
}
