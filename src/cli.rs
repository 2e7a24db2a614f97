//! CLI argument parsing, logging setup, and startup helpers.

use clap::Parser;
use rand::RngCore;
use tracing::{error, info, warn};

use crate::db::Database;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "EventSpotter",
    about = "Event discovery backend with token authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for in-memory)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "eventspotter.db")]
    pub database: String,

    /// Access token signing secret (min 32 characters)
    #[arg(long, env = "ACCESS_JWT_SECRET", hide_env_values = true)]
    pub access_secret: Option<String>,

    /// Refresh token signing secret (min 32 characters)
    #[arg(long, env = "REFRESH_JWT_SECRET", hide_env_values = true)]
    pub refresh_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_EXPIRATION", default_value = "900")]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_EXPIRATION", default_value = "1209600")]
    pub refresh_ttl_secs: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Resolve one signing secret from its flag/env value.
///
/// A configured secret shorter than [`MIN_SECRET_LENGTH`] is refused
/// (returns `None` after logging). An absent secret falls back to a
/// freshly generated ephemeral one: the server still works, but tokens
/// signed before a restart stop verifying after it.
pub fn load_secret(name: &str, value: Option<String>) -> Option<Vec<u8>> {
    match value {
        Some(secret) if secret.len() < MIN_SECRET_LENGTH => {
            error!(
                "{} is shorter than {} characters. Use a longer secret",
                name, MIN_SECRET_LENGTH
            );
            None
        }
        Some(secret) => Some(secret.into_bytes()),
        None => {
            warn!(
                "{} not set; using an ephemeral secret, sessions will not survive a restart",
                name
            );
            let mut secret = vec![0u8; 48];
            rand::rng().fill_bytes(&mut secret);
            Some(secret)
        }
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
