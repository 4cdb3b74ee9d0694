use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use authgate_lib::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    router, AppState,
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Credential registration, login and bearer-token verification server
#[derive(Parser, Debug)]
#[command(name = "authgate", version, about)]
struct Cli {
    /// TOML config file; `AUTHGATE_*` environment variables override it
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        settings.bind_addr = bind;
    }

    init_tracing(&settings.log_level, cli.json_logs);

    let addr = settings.bind_addr;
    let state = AppState::from_settings(settings).await?;

    // Setup a background task for login throttle cleanup
    let throttle = state.throttle.clone();
    tokio::spawn(async move {
        // Run cleanup every hour
        let mut interval = interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            throttle.cleanup();
            tracing::debug!(tracked = throttle.tracked(), "login throttle cleaned up");
        }
    });

    let app = router::create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
