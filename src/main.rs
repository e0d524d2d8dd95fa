mod collectors;
mod config;
mod dashboard;
mod health;
mod http;
mod metrics;
mod poller;
mod runner;
mod state;

use axum::serve;
use clap::Parser;
use config::Config;
use poller::Poller;
use runner::SystemCommandRunner;
use state::SnapshotStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pimonitord")]
#[command(version)]
struct Cli {
    /// YAML config file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    /// Overrides `listen` from the config file.
    #[arg(long)]
    listen: Option<String>,
    /// Overrides `interval_secs` from the config file.
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let addr = match cfg.listen_addr() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, "invalid listen address");
            std::process::exit(1);
        }
    };
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(err) => {
            error!(error = %err, listen = %addr, "failed to bind HTTP listener");
            std::process::exit(1);
        }
    };

    info!(
        listen = %addr,
        interval_secs = cfg.interval_secs,
        command_timeout_secs = cfg.command_timeout_secs,
        "starting pimonitord"
    );

    let cfg = Arc::new(cfg);
    let store = Arc::new(SnapshotStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poll_task = {
        let poller = Poller::new(cfg.clone(), Arc::new(SystemCommandRunner), store.clone());
        tokio::spawn(poller.run(shutdown_rx.clone()))
    };

    let http_task = {
        let mut shutdown_rx = shutdown_rx.clone();
        let app = http::build_router(store.clone());
        tokio::spawn(async move {
            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(err) = server.await {
                error!(error = %err, "HTTP server error");
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    let _ = poll_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(listen) = &cli.listen {
        cfg.listen = listen.clone();
    }
    if let Some(interval_secs) = cli.interval_secs {
        cfg.interval_secs = interval_secs;
    }
    cfg.validate()?;
    Ok(cfg)
}
