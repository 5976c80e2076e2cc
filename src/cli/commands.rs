use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use super::demo::demo_application;
use crate::hash::{HashVariant, KeyedHash};
use crate::logging::{init_logging, LogConfig};
use crate::runtime_config::AppConfig;
use crate::server::{HttpServer, ServerHandle};

/// Command-line interface for trellis
#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "trellis web framework CLI", long_about = None, version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo application over HTTP
    Serve {
        /// YAML or TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,

        /// Directory served for unmatched GET/HEAD requests
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Number of worker threads
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the keyed hash of INPUT as hex
    Hash {
        /// Secret key
        #[arg(short, long, env = "TRELLIS_HASH_KEY")]
        key: String,

        /// Digest: sha256, sha384 or sha512
        #[arg(long, default_value = "sha256")]
        variant: HashVariant,

        /// Text to hash
        input: String,
    },
    /// List the demo application's route table
    Routes,
}

/// Parse the process arguments and run the selected command.
///
/// # Errors
///
/// Returns any configuration, binding or logging setup failure.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

/// Run an already-parsed command line.
///
/// # Errors
///
/// See [`run_cli`].
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            addr,
            static_dir,
            workers,
        } => {
            let mut config = match config {
                Some(path) => AppConfig::load(&path)?,
                None => AppConfig::default(),
            };
            config.apply_env();
            if let Some(addr) = addr {
                config.http.addr = addr;
            }
            if let Some(dir) = static_dir {
                config.static_dir = Some(dir);
            }
            if let Some(workers) = workers {
                config.http.workers = workers;
            }

            init_logging(&LogConfig::from_env())?;

            let http = config.http.clone();
            let (app, _metrics) = demo_application(config)?;
            let handle = HttpServer::with_config(Arc::new(app), &http)
                .start(http.addr.as_str())
                .with_context(|| format!("failed to bind {}", http.addr))?;
            handle.wait_ready()?;
            println!("trellis listening on http://{}", handle.addr());
            wait_for_shutdown(handle)
        }
        Commands::Hash {
            key,
            variant,
            input,
        } => {
            println!("{}", KeyedHash::new(key, variant).make(&input));
            Ok(())
        }
        Commands::Routes => {
            let (app, _metrics) = demo_application(AppConfig::default())?;
            app.router().dump_routes();
            Ok(())
        }
    }
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    info!("Serving until the process is terminated");
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("HTTP worker panicked"))
}
