#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand};
use eyre::Context as _;
use std::io::Write as _;
use tracing_subscriber::prelude::*;

mod allowance;
mod amount;
mod balances;
mod chains;
mod cli_output;
mod config;
mod directory;
mod doctor;
mod errors;
mod flow;
mod manifest;
mod order;
mod paths;
mod quote;
mod request;
mod retry;
mod server;
mod slippage;
mod store;
mod tokens;

#[derive(Parser, Debug)]
#[command(name = "uniswap-agent", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP tool service until Ctrl-C / SIGTERM.
    Serve {
        /// Override `server.host` (and `HOST`).
        #[arg(long)]
        host: Option<String>,

        /// Override `server.port` (and `PORT`).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print a quick self-diagnostic report (safe to paste; contains no secrets).
    Doctor {
        /// Emit JSON to stdout (machine-readable).
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List supported chains with their router, wrapped native token, and quoter.
    Chains {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// JSON logs to stderr, plus an optional JSON file in the data dir. The guard must outlive
/// the process's logging.
fn init_logging(
    paths: &paths::AgentPaths,
    file_enabled: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());

    let (file_layer, guard) = if file_enabled {
        let file_name = paths
            .log_file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("uniswap-agent.log.jsonl");
        let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_filter(env_filter);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = paths::AgentPaths::discover()?;

    match cli.cmd {
        Command::Serve { host, port } => {
            let mut cfg = store::ConfigStore::new(&paths)
                .load()
                .context("load config")?;
            if let Some(h) = host {
                cfg.server.host = h;
            }
            if let Some(p) = port {
                cfg.server.port = p;
            }
            if cfg.log.file_enabled {
                std::fs::create_dir_all(&paths.data_dir).context("create data dir")?;
            }
            let _log_guard = init_logging(&paths, cfg.log.file_enabled);
            cli_output::print_serve_banner(
                env!("CARGO_PKG_VERSION"),
                &format!("{}:{}", cfg.server.host, cfg.server.port),
                &cfg.http.base_url,
                cfg.validate().len(),
            );
            server::serve(cfg).await.context("server failed")
        }
        Command::Doctor { json } => doctor::run(&paths, json).context("doctor failed"),
        Command::Chains { json } => {
            let mut out = std::io::stdout().lock();
            if json {
                let v: Vec<_> = chains::networks::CHAINS
                    .iter()
                    .map(cli_output::chain_json)
                    .collect();
                let s = serde_json::to_string_pretty(&v).context("serialize chains")?;
                writeln!(out, "{s}").context("write chains")?;
            } else {
                cli_output::write_chains_table(&mut out, chains::networks::CHAINS)
                    .context("write chains")?;
            }
            Ok(())
        }
    }
}
