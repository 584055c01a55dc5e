//! Population Gateway - Main entry point

use anyhow::Result;
use gateway_common::logging::{init_logging, LogConfig};
use gateway_server::{
    api::{create_router, AppState},
    bus::KafkaBus,
    config::Config,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{signal, sync::oneshot};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("gateway-server")
        .filter_directives("gateway_server=debug,tower_http=info,rdkafka=warn")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    info!("Starting population gateway");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    tokio::fs::create_dir_all(&config.ingest.upload_dir).await?;

    let bus = Arc::new(KafkaBus::new(&config.kafka)?);
    let state = AppState::new(&config, bus)?;
    let connection = Arc::clone(&state.connection);

    // Failure here is not fatal; the first upload retries.
    {
        let connection = Arc::clone(&connection);
        tokio::spawn(async move {
            if let Err(e) = connection.ensure_connected().await {
                warn!(error = %e, "Initial Kafka connection failed");
            }
        });
    }

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            warn!("Server stopped without a shutdown signal");
        },
        () = shutdown_signal() => {
            let _ = stop_tx.send(());
            let drain = Duration::from_secs(config.server.shutdown_timeout_secs);
            info!("Waiting up to {} seconds for connections to close", drain.as_secs());
            match tokio::time::timeout(drain, &mut server).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!("Connections still open after shutdown timeout");
                    server.abort();
                },
            }
        },
    }

    if let Err(e) = connection.shutdown().await {
        warn!(error = %e, "Error disconnecting Kafka producer");
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
