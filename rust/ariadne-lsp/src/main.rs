//! `ariadne-lsp` executable.
//!
//! Serves the protocol over stdio with the configuration found on disk.
//! Hosts that bring analysis engines embed the library instead: they
//! register engines on a [`Server`] and call [`run_stdio`] themselves.

use std::path::PathBuf;
use std::process::ExitCode;

use ariadne_lsp::{init_logging, run_stdio, Server, ServerConfig};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "ariadne-lsp",
    version,
    about = "Language server front end for static-analysis engines"
)]
struct Args {
    /// Configuration file (default: nearest ariadne.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter, overriding [logging].filter
    #[arg(long)]
    log: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let (path, mut config) = match ServerConfig::resolve(args.config.as_deref()) {
        Ok(found) => found,
        Err(err) => {
            eprintln!("ariadne-lsp: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(filter) = args.log {
        config.logging.filter = filter;
    }

    init_logging(&config.logging.filter);
    match &path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no ariadne.toml found; using defaults"),
    }

    match run_stdio(Server::new(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server stopped");
            ExitCode::FAILURE
        }
    }
}
