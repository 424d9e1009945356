//! Feedback Backend server binary

use feedback_backend::{api, core, db, mail};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles .env, CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("Starting Feedback Backend v{}", feedback_backend::VERSION);
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(security = ?config.security, mail = ?config.mail, "Auth configuration");

    // Initialize database
    info!(path = ?config.database.path, "Initializing database...");
    let db = Arc::new(db::DatabaseManager::new(
        &config.database.path,
        config.database.connection_pool_size,
        std::time::Duration::from_millis(config.database.busy_timeout),
    )?);
    info!("Database initialized successfully");

    let mailer = Arc::new(mail::SmtpMailer::from_config(&config.mail)?);

    // Initialize API server
    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(config, db, mailer)?;

    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}
