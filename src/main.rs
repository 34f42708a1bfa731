use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use rockdis::config::Config;
use rockdis::conn;
use rockdis::engine::Engine;
use rockdis::state::{AppState, ServerInfo};
use rockdis::stats::Stats;

const DEFAULT_CONF: &str = "rockdis.conf";

#[derive(Parser)]
#[command(name = "rockdis", about = "A Redis-protocol key-value service backed by an embedded LSM engine")]
struct Cli {
    #[arg(long = "conf", default_value = DEFAULT_CONF)]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let is_default_path = cli.conf == PathBuf::from(DEFAULT_CONF);
    let config = Config::load_or_default(&cli.conf, is_default_path)?;

    let engine = Engine::open(&config.database)?;
    tracing::info!(dbdir = %config.database.dbdir, "engine opened");

    let info = ServerInfo::new(cli.conf.to_string_lossy().into_owned(), &config);
    let stats = std::sync::Arc::new(Stats::new());
    rockdis::stats::spawn_qps_reset_task(stats.clone());
    let state = std::sync::Arc::new(AppState { engine, stats, info });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_shutdown_signal(shutdown_tx));

    conn::run(&config.server, state, shutdown_rx).await?;
    Ok(())
}

async fn wait_for_shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");
    let mut abort = signal(SignalKind::from_raw(libc::SIGABRT)).expect("failed to install SIGABRT handler");

    tokio::select! {
        _ = hangup.recv() => tracing::info!("received SIGHUP"),
        _ = interrupt.recv() => tracing::info!("received SIGINT"),
        _ = terminate.recv() => tracing::info!("received SIGTERM"),
        _ = quit.recv() => tracing::info!("received SIGQUIT"),
        _ = abort.recv() => tracing::info!("received SIGABRT"),
    }
    let _ = shutdown_tx.send(true);
}
