//! Page server for Nimbus.
//!
//! Serves the home page, the forecast page and static assets. Forecast
//! failures never fail a request: the page renders without the forecast.

pub mod pages;
pub mod routes;
pub mod templates;

pub use routes::{router, AppState};

use nimbus_core::{AppError, Config};

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: Config) -> Result<(), AppError> {
    // Parse the embedded templates now so a broken one fails startup, not a request.
    templates::templates().map_err(|e| AppError::Server(e.to_string()))?;

    let state = AppState::from_config(&config);
    let app = router(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    tracing::info!("Web server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
