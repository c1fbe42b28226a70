use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sigexec::application::handlers::signal_handler::AppState;
use sigexec::application::router::build_router;
use sigexec::config::GatewayConfig;
use sigexec::domain::repositories::exchange_client::ExchangeClient;
use sigexec::infrastructure::bybit_client::{BybitClient, BybitConfig};
use sigexec::secrets::Credentials;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env file: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sigexec=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Signal execution gateway starting...");

    let config = GatewayConfig::from_env();
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Cannot start without exchange credentials: {}", e);
            return Err(e.into());
        }
    };

    let bybit_config = BybitConfig::new(credentials, config.network)
        .with_recv_window(config.recv_window_ms)
        .with_timeout(config.http_timeout());
    let client: Arc<dyn ExchangeClient> = Arc::new(BybitClient::new(bybit_config)?);

    if client.is_healthy().await {
        info!("✓ {} reachable ({:?})", client.name(), config.network);
    } else {
        warn!(
            "{} did not answer the startup probe; serving anyway",
            client.name()
        );
    }

    let app = build_router(AppState::new(client), config.rate_limit_per_minute);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("Server started successfully. Press Ctrl+C to stop.");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
