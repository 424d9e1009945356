//! Configuration management

use clap::Parser;
use config::{Config as ConfigBuilder, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix for environment overrides, e.g. `FEEDBACK_SERVER__PORT=8080`
const ENV_PREFIX: &str = "FEEDBACK";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServer(String),

    #[error("Invalid database configuration: {0}")]
    InvalidDatabase(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid security configuration: {0}")]
    InvalidSecurity(String),

    #[error("Invalid mail configuration: {0}")]
    InvalidMail(String),

    #[error("Invalid application configuration: {0}")]
    InvalidApp(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub app: AppConfig,
}

impl Config {
    /// Load configuration with precedence: CLI args > Environment variables > Config file > Defaults
    ///
    /// A `.env` file in the working directory is read first and feeds the
    /// environment layer.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let cli_args = CliArgs::parse();

        // 1. Defaults (lowest priority)
        let mut builder = with_defaults(ConfigBuilder::builder())?;

        // 2. Config file if specified
        if let Some(config_path) = &cli_args.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound(config_path.display().to_string()));
            }
            builder = builder.add_source(File::from(config_path.as_path()));
        }

        // 3. Environment variables
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI arguments (highest priority)
        if let Some(host) = &cli_args.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(port) = cli_args.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(db_path) = &cli_args.database {
            builder = builder.set_override("database.path", db_path.display().to_string())?;
        }
        if let Some(log_level) = &cli_args.log_level {
            builder = builder.set_override("logging.level", log_level.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path, on top of the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = with_defaults(ConfigBuilder::builder())?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.security.validate()?;
        self.mail.validate()?;
        self.app.validate()?;
        Ok(())
    }
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

/// Apply default values. Secrets default to empty and must be supplied by the
/// file or environment layer, otherwise validation fails.
fn with_defaults(builder: Builder) -> Result<Builder, ConfigError> {
    Ok(builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("database.path", "./data/feedback.db")?
        .set_default("database.connection_pool_size", 10)?
        .set_default("database.busy_timeout", 5000)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "json")?
        .set_default("logging.output", "stdout")?
        .set_default("security.session_secret", "")?
        .set_default("security.reset_secret", "")?
        .set_default("security.session_token_ttl", 14_400)? // 4 hours
        .set_default("security.reset_token_ttl", 3_600)? // 1 hour
        .set_default("security.bcrypt_cost", 10)?
        .set_default("mail.host", "localhost")?
        .set_default("mail.port", 587)?
        .set_default("mail.username", "")?
        .set_default("mail.password", "")?
        .set_default("mail.from", "no-reply@feedback.fr")?
        .set_default("mail.starttls", false)?
        .set_default("app.public_base_url", "http://localhost:3000")?)
}

/// Defaults plus throwaway secrets and the cheapest bcrypt cost
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    with_defaults(ConfigBuilder::builder())
        .unwrap()
        .set_override("security.session_secret", "test-session-secret")
        .unwrap()
        .set_override("security.reset_secret", "test-reset-secret")
        .unwrap()
        .set_override("security.bcrypt_cost", 4)
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

/// Command-line arguments for configuration override
#[derive(Debug, Parser)]
#[command(name = "feedback-backend")]
#[command(about = "Feedback Backend Server", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host address
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database file path
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidServer("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidServer("port must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub connection_pool_size: u32,
    pub busy_timeout: u64, // milliseconds
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidDatabase("path cannot be empty".to_string()));
        }

        if self.connection_pool_size == 0 {
            return Err(ConfigError::InvalidDatabase(
                "connection_pool_size must be greater than 0".to_string(),
            ));
        }

        if self.busy_timeout == 0 {
            return Err(ConfigError::InvalidDatabase(
                "busy_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "level must be one of: {:?}",
                valid_levels
            )));
        }

        let valid_formats = ["json", "text"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "format must be one of: {:?}",
                valid_formats
            )));
        }

        let valid_outputs = ["stdout", "file"];
        if !valid_outputs.contains(&self.output.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "output must be one of: {:?}",
                valid_outputs
            )));
        }

        if self.output == "file" && self.log_file.is_none() {
            return Err(ConfigError::InvalidLogging(
                "log_file must be specified when output is 'file'".to_string(),
            ));
        }

        Ok(())
    }
}

/// Token signing secrets and password hashing parameters
#[derive(Clone, Deserialize)]
pub struct SecurityConfig {
    pub session_secret: String,
    pub reset_secret: String,
    pub session_token_ttl: u64, // seconds
    pub reset_token_ttl: u64,   // seconds
    pub bcrypt_cost: u32,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.is_empty() {
            return Err(ConfigError::InvalidSecurity(
                "session_secret must be provided".to_string(),
            ));
        }

        if self.reset_secret.is_empty() {
            return Err(ConfigError::InvalidSecurity(
                "reset_secret must be provided".to_string(),
            ));
        }

        if self.session_secret == self.reset_secret {
            return Err(ConfigError::InvalidSecurity(
                "session_secret and reset_secret must differ".to_string(),
            ));
        }

        if self.session_token_ttl == 0 || self.reset_token_ttl == 0 {
            return Err(ConfigError::InvalidSecurity(
                "token lifetimes must be greater than 0".to_string(),
            ));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidSecurity(
                "bcrypt_cost must be between 4 and 31".to_string(),
            ));
        }

        Ok(())
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("session_secret", &"<redacted>")
            .field("reset_secret", &"<redacted>")
            .field("session_token_ttl", &self.session_token_ttl)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// SMTP relay used for password reset emails
#[derive(Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub starttls: bool,
}

impl MailConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidMail("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidMail("port must be greater than 0".to_string()));
        }

        if !self.from.contains('@') {
            return Err(ConfigError::InvalidMail(
                "from must be an email address".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("starttls", &self.starttls)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Public URL of the front end, used to build password reset links
    pub public_base_url: String,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.public_base_url.starts_with("http://") && !self.public_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidApp(
                "public_base_url must be an http(s) URL".to_string(),
            ));
        }

        Ok(())
    }
}
