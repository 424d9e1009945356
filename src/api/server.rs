//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - Per-request trace IDs and HTTP tracing
//! - Health check endpoint

use crate::api::handlers::AppState;
use crate::api::middleware::trace_id_middleware;
use crate::api::routes::build_api_routes;
use crate::core::config::{Config, ServerConfig};
use crate::db::manager::DatabaseManager;
use crate::mail::Mailer;
use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server over the given store and mail transport
    pub fn new(config: Config, db: Arc<DatabaseManager>, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let server_config = config.server.clone();
        let state = AppState::new(config, db, mailer);

        Ok(Self {
            router: Self::build_router(state),
            config: server_config,
        })
    }

    /// Build the Axum router with all routes and middleware
    pub fn build_router(state: AppState) -> Router {
        build_api_routes(state)
            .route("/health", get(health_check))
            .layer(
                ServiceBuilder::new()
                    // Add tracing for all requests
                    .layer(TraceLayer::new_for_http())
                    // Add trace ID middleware for request tracking
                    .layer(middleware::from_fn(trace_id_middleware)),
            )
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");

        Ok(())
    }
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}
