// Store configuration
//
// Connection settings for the Message DB database, loaded from the DB_*
// environment variables with the conventional Message DB defaults.

use std::env;

/// Configuration for the Message DB connection pool.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "message_store".to_string(),
            user: "message_store".to_string(),
            password: String::new(),
            min_connections: 2,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreConfigError {
    #[error("DB_PORT must be a number 1-65535, got '{0}'")]
    InvalidPort(String),

    #[error("database {0} cannot be empty")]
    MissingField(&'static str),
}

impl StoreConfig {
    /// Load from `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`,
    /// falling back to Message DB's conventional defaults.
    pub fn from_env() -> Result<Self, StoreConfigError> {
        let defaults = Self::default();

        let port = match env::var("DB_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or(StoreConfigError::InvalidPort(raw))?,
            Err(_) => defaults.port,
        };

        let config = Self {
            host: env::var("DB_HOST").unwrap_or(defaults.host),
            port,
            database: env::var("DB_NAME").unwrap_or(defaults.database),
            user: env::var("DB_USER").unwrap_or(defaults.user),
            password: env::var("DB_PASSWORD").unwrap_or(defaults.password),
            min_connections: defaults.min_connections,
            max_connections: defaults.max_connections,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreConfigError> {
        if self.host.trim().is_empty() {
            return Err(StoreConfigError::MissingField("host"));
        }
        if self.database.trim().is_empty() {
            return Err(StoreConfigError::MissingField("name"));
        }
        if self.user.trim().is_empty() {
            return Err(StoreConfigError::MissingField("user"));
        }
        Ok(())
    }

    /// Connection URL for sqlx.
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}
