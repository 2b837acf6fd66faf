use anyhow::Result;
use axum::serve;
use minestat_core::{config::AppConfig, runtime::ServiceContext};
use server::router;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence over `logging.level` when set.
fn init_logging(config: &AppConfig) {
    let level = config.logging.level.as_str();
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,minestat_core={level},server={level},minestat={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;
    init_logging(&config);

    let bind_addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;

    info!(
        node = %config.node_url(),
        database = %config.store.database_url,
        payouts_enabled = config.payout.enabled,
        "starting mining stats server"
    );

    let context = Arc::new(
        ServiceContext::connect(config)
            .await
            .map_err(|e| anyhow::anyhow!("Service initialization failed: {e}"))?,
    );

    let loaded = context
        .bootstrap()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load stored history: {e}"))?;
    info!(loaded, "bootstrap complete");

    let refresher = context.start_refresher();
    let app = router::create_app(context.clone());

    let listener = TcpListener::bind(bind_addr).await?;
    info!(address = %bind_addr, "listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    context.shutdown();
    ServiceContext::join_task("refresher", refresher).await;
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
