//! conclave daemon: entry point for the governance service.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use conclave_rpc::{AppState, GovernanceMetrics, RpcServer};
use conclave_types::{Clock, Member, MemberId, Rank, SystemClock, VoteId};
use conclave_utils::{init_logging, LogFormat};
use tracing::info;

use crate::commands::{open_engine, run_job, Job};
use crate::config::DaemonConfig;
use crate::shutdown::ShutdownController;

#[derive(Parser)]
#[command(name = "conclave-daemon", about = "Ranked-community governance daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "CONCLAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the LMDB environment.
    #[arg(long, env = "CONCLAVE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level filter, e.g. "info" or "debug,conclave_governance=trace".
    #[arg(long, env = "CONCLAVE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CONCLAVE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the HTTP server until SIGINT/SIGTERM.
    Serve {
        #[arg(long, env = "CONCLAVE_RPC_PORT")]
        port: Option<u16>,

        #[arg(long, env = "CONCLAVE_BIND_ADDRESS")]
        bind_address: Option<String>,

        /// Expose Prometheus metrics at /metrics.
        #[arg(long, env = "CONCLAVE_ENABLE_METRICS")]
        metrics: bool,
    },
    /// Rotate the Inquisitor role and open a nomination vote.
    SelectInquisitor,
    /// Re-evaluate one vote against its deadlines.
    CloseVote { id: u64 },
    /// Close every vote whose deadline has passed.
    CloseDue,
    /// Retire top-rank members past their tenure.
    Retire,
    /// Add a member record.
    Enroll {
        id: String,

        /// Display name; defaults to the id.
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "MASON")]
        rank: Rank,
    },
    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Command::Serve {
            port,
            bind_address,
            metrics,
        } = &self.command
        {
            if let Some(port) = port {
                config.rpc_port = *port;
            }
            if let Some(addr) = bind_address {
                config.bind_address = addr.clone();
            }
            config.enable_metrics |= *metrics;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        info!(path = %path.display(), "loaded configuration");
    }

    let job = match cli.command {
        Command::Config => {
            print!("{}", config.effective().to_toml_string()?);
            return Ok(());
        }
        Command::Serve { .. } => return serve(config).await,
        Command::SelectInquisitor => Job::SelectInquisitor,
        Command::CloseVote { id } => Job::CloseVote(VoteId::new(id)),
        Command::CloseDue => Job::CloseDue,
        Command::Retire => Job::Retire,
        Command::Enroll { id, name, rank } => {
            let id = MemberId::parse(&id)?;
            let name = name.unwrap_or_else(|| id.to_string());
            Job::Enroll(Member::new(id, name, SystemClock.now()).with_rank(rank))
        }
    };

    let engine = open_engine(&config)?;
    let report = tokio::task::spawn_blocking(move || run_job(&engine, job)).await??;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn serve(config: DaemonConfig) -> anyhow::Result<()> {
    let engine = open_engine(&config)?;
    let metrics = config.enable_metrics.then(GovernanceMetrics::new);
    info!(
        bind_address = %config.bind_address,
        port = config.rpc_port,
        metrics = config.enable_metrics,
        trusted_proxies = config.trusted_proxies.len(),
        "starting conclave daemon"
    );

    let state = Arc::new(
        AppState::new(engine, metrics).with_trusted_proxies(config.trusted_proxies.clone()),
    );
    let server = RpcServer::new(config.bind_address.clone(), config.rpc_port, state);

    let controller = Arc::new(ShutdownController::new());
    let stopped = controller.signalled();
    let signals = Arc::clone(&controller);
    tokio::spawn(async move { signals.wait_for_signal().await });

    server.serve(stopped).await?;
    info!("conclave daemon exited cleanly");
    Ok(())
}
