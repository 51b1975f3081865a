use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use backend_lib::{
    account_service,
    auth::AccountService,
    calendar::InMemoryCalendar,
    config::Settings,
    gateway_state,
    router::create_router,
    rpc::{account_router, RpcAccountClient},
    storage::{KvStore, MemoryKvStore, MemoryUserRepository},
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kalenderium", about = "Kalenderium account service and HTTP gateway")]
struct Cli {
    /// TOML config file; defaults to config/default.toml and kalenderium.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the account service
    Account,
    /// Run the public HTTP gateway
    Gateway,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    match cli.command {
        Command::Account => run_account(&settings, shutdown).await,
        Command::Gateway => run_gateway(&settings, shutdown).await,
    }
}

async fn run_account(settings: &Settings, shutdown: CancellationToken) -> anyhow::Result<()> {
    let store = Arc::new(MemoryKvStore::new());
    tokio::time::timeout(settings.account.store_ping_timeout(), store.ping())
        .await
        .context("session store did not answer in time")??;

    let users = Arc::new(MemoryUserRepository::new());
    let accounts: Arc<dyn AccountService> = Arc::new(account_service(settings, store, users)?);
    let app = account_router(accounts, tracing::info_span!("account_rpc"));

    let listener = TcpListener::bind(settings.account.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "account service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

async fn run_gateway(settings: &Settings, shutdown: CancellationToken) -> anyhow::Result<()> {
    let gateway = &settings.gateway;
    let accounts = RpcAccountClient::connect(
        &gateway.account_rpc_url,
        gateway.rpc_timeout(),
        gateway.rpc_connect_timeout(),
        tracing::info_span!("account_client"),
    )
    .await
    .map_err(|e| anyhow::anyhow!("connecting to account service: {e}"))?;

    let state = Arc::new(gateway_state(
        settings,
        Arc::new(accounts),
        Arc::new(InMemoryCalendar::new()),
    ));
    let sweeper = state.rate_limiter.as_ref().map(|limiter| {
        limiter.spawn_sweeper(settings.rate_limit.sweep_interval(), shutdown.clone())
    });

    let app = create_router(state);
    let listener = TcpListener::bind(gateway.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        sweeper.await?;
    }
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("received Ctrl+C, shutting down");
    shutdown.cancel();
}
