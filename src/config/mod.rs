use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// Configuration for the client directory
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Full connection URL; takes precedence over the discrete fields below
    pub database_url: Option<String>,
    #[serde(default = "default_host")]
    pub db_host: String,
    #[serde(default = "default_port")]
    pub db_port: u16,
    #[serde(default = "default_name")]
    pub db_name: String,
    #[serde(default = "default_user")]
    pub db_user: String,
    pub db_password: Option<String>,
    /// Schema placed on the session `search_path`
    pub database_schema: Option<String>,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_name() -> String {
    "client_db".to_string()
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    1
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Build driver connect options from either the URL or the discrete fields
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let options = match &self.database_url {
            Some(url) => PgConnectOptions::from_str(url)
                .context("DATABASE_URL is not a valid postgres URL")?,
            None => {
                let options = PgConnectOptions::new()
                    .host(&self.db_host)
                    .port(self.db_port)
                    .database(&self.db_name)
                    .username(&self.db_user);
                match &self.db_password {
                    Some(password) => options.password(password),
                    None => options,
                }
            }
        };

        Ok(match &self.database_schema {
            Some(schema) => options.options([("search_path", schema.as_str())]),
            None => options,
        })
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    // Ensure .env file is loaded
    dotenv().ok();

    let config = Config::load()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .expect("config parses")
    }

    #[test]
    fn defaults_point_at_local_client_db() {
        let config = from_pairs(&[]);
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_host, "localhost");
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.db_name, "client_db");
        assert_eq!(config.db_user, "postgres");
        assert_eq!(config.db_password, None);
        assert_eq!(config.db_max_connections, 1);
    }

    #[test]
    fn discrete_fields_are_read() {
        let config = from_pairs(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "crm"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "secret"),
            ("DATABASE_SCHEMA", "directory"),
            ("DB_MAX_CONNECTIONS", "3"),
        ]);
        assert_eq!(config.db_host, "db.internal");
        assert_eq!(config.db_port, 6543);
        assert_eq!(config.db_name, "crm");
        assert_eq!(config.db_user, "app");
        assert_eq!(config.db_password.as_deref(), Some("secret"));
        assert_eq!(config.database_schema.as_deref(), Some("directory"));
        assert_eq!(config.db_max_connections, 3);
        assert!(config.connect_options().is_ok());
    }

    #[test]
    fn bad_port_is_rejected() {
        let result = envy::from_iter::<_, Config>(vec![(
            "DB_PORT".to_string(),
            "not-a-port".to_string(),
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn url_is_parsed_and_validated() {
        let good = from_pairs(&[("DATABASE_URL", "postgres://postgres@localhost/client_db")]);
        assert!(good.connect_options().is_ok());

        let bad = from_pairs(&[("DATABASE_URL", "definitely not a url")]);
        assert!(bad.connect_options().is_err());
    }
}
