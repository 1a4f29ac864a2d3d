//! Application configuration loaded from environment variables.

use crate::errors::{AuditError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Upper bound on pooled SQLite connections
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./campaign_audit.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| AuditError::Config("Invalid API_PORT".to_string()))?,
            max_connections: env_var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AuditError::Config("Invalid DB_MAX_CONNECTIONS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| AuditError::Config(format!("Missing env var: {key}")))
}
