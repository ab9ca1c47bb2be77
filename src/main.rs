use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use lookbuilding::config::Config;
use lookbuilding::docker::DockerEngine;
use lookbuilding::logging::{self, LogFormat};
use lookbuilding::registry::RegistryClient;
use lookbuilding::server;
use lookbuilding::worker::{self, Updater};

#[derive(Parser)]
#[command(name = "lookbuilding")]
#[command(version, about = "Keeps labeled Docker containers up to date")]
struct Cli {
    /// Listen address, overrides LOOKBUILDING_ADDR
    #[arg(long)]
    addr: Option<SocketAddr>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single scan and exit
    Scan,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_format, cli.log_file.as_deref())?;

    let mut config = Config::from_env()?;
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config, cli.command))
}

async fn run(config: Config, command: Option<Command>) -> anyhow::Result<()> {
    let engine = DockerEngine::connect().context("failed to connect to the Docker engine")?;
    let registry = RegistryClient::connect(&config.registry_url, config.credentials.clone());
    let updater = Updater::new(Arc::new(engine), registry, config.failure_policy);

    match command {
        Some(Command::Scan) => {
            let report = updater.scan().await?;
            info!(
                containers = report.containers,
                replaced = report.replaced.len(),
                failed = report.failed.len(),
                "single scan finished"
            );
            Ok(())
        }
        None => {
            let (trigger, coordinator) = worker::spawn(Arc::new(updater));
            if config.scan_on_start {
                trigger.trigger();
            }

            let router = server::router(trigger, &config.static_dir);
            server::serve(config.addr, router)
                .await
                .with_context(|| format!("failed to serve on {}", config.addr))?;

            // Let a running scan finish its replacements before exiting
            coordinator.await?;
            Ok(())
        }
    }
}
