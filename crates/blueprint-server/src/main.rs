use anyhow::{bail, Context};
use blueprint_core::config::{HubConfig, WarnLevel};
use blueprint_core::ledger::MemoryLedger;
use blueprint_server::AppState;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "blueprint-hub",
    about = "Real-time action notifications for blueprint workflows",
    version
)]
struct Cli {
    /// Hub configuration file (YAML)
    #[arg(long, env = "BLUEPRINT_HUB_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on; overrides the config file
    #[arg(long, env = "BLUEPRINT_HUB_PORT")]
    port: Option<u16>,

    /// Directory of blueprint definitions; overrides the config file
    #[arg(long)]
    blueprints: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<HubConfig> {
    let mut config = match &cli.config {
        Some(path) => HubConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HubConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = &cli.blueprints {
        config.blueprints_dir = Some(dir.clone());
    }

    let mut fatal = false;
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Warning => tracing::warn!("{}", warning.message),
            WarnLevel::Error => {
                tracing::error!("{}", warning.message);
                fatal = true;
            }
        }
    }
    if fatal {
        bail!("invalid hub configuration");
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    let ledger = Arc::new(MemoryLedger::new());
    if let Some(dir) = &config.blueprints_dir {
        let count = ledger
            .load_blueprints(dir)
            .with_context(|| format!("failed to load blueprints from {}", dir.display()))?;
        tracing::info!(count, dir = %dir.display(), "blueprints loaded");
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let state = AppState::new(config, ledger);

    tokio::select! {
        res = blueprint_server::serve_on(state, listener) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let result = tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|rt| rt.block_on(run(cli)));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
