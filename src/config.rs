//! Configuration loader for the `esp8266-telemetry` service.
//!
//! Values come from command-line flags first; `APP_`-prefixed environment
//! variables (optionally from a `.env` file loaded by the caller) take
//! precedence over the flags. Keeping this in one place avoids scattering
//! `env::var` calls through the handlers.
//!
use std::{env, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;
use sqlx::postgres::PgConnectOptions;

/// Name reported to PostgreSQL in `pg_stat_activity`.
const APPLICATION_NAME: &str = "esp8266-web";

/// Replace a flag value with an environment override, if one is set.
macro_rules! override_env {
    ($lookup:expr, $var_name:expr, $field:expr) => {
        if let Some(v) = $lookup($var_name) {
            tracing::debug!(env = $var_name, value = %v, "flag overridden by env");
            $field = v.into();
        }
    };
    ($lookup:expr, $var_name:expr, $field:expr, parse) => {
        if let Some(v) = $lookup($var_name) {
            $field = v
                .parse()
                .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?;
            tracing::debug!(env = $var_name, value = %$field, "flag overridden by env");
        }
    };
}

/// Command-line flags. Every flag can be overridden by its `APP_` variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "esp8266-telemetry", version)]
#[command(about = "Ingests ESP8266 temperature/humidity readings into PostgreSQL", long_about = None)]
pub struct Cli {
    // ---
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Database host
    #[arg(long, default_value = "localhost")]
    pub db_host: String,

    /// Database port
    #[arg(long, default_value_t = 5432)]
    pub db_port: u16,

    /// Database user
    #[arg(long, default_value = "user")]
    pub db_user: String,

    /// Database password
    #[arg(long, default_value = "")]
    pub db_pass: String,

    /// Database name
    #[arg(long, default_value = "dbname")]
    pub db_name: String,

    /// Maximum number of pooled database connections
    #[arg(long, default_value_t = 5)]
    pub db_pool_max: u32,

    /// HTML document served at `/`
    #[arg(long, default_value = "index.html")]
    pub index_file: PathBuf,
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    pub host: String,
    pub port: u16,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_pass: String,
    pub db_name: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Static page served at `/`.
    pub index_file: PathBuf,

    /// Shared secret the device presents in `X-Secret-Key`.
    pub secret_key: String,
}

/// Resolve configuration from parsed flags and the process environment.
///
/// Required:
/// - `APP_SECRET_KEY` – shared secret for ingestion
///
/// Optional overrides:
/// - `APP_HOST`, `APP_PORT`, `APP_DB_HOST`, `APP_DB_PORT`, `APP_DB_USER`,
///   `APP_DB_PASS`, `APP_DB_NAME`, `APP_DB_POOL_MAX`, `APP_INDEX_FILE`
///
/// Returns an error if the secret is missing or a numeric override is invalid.
pub fn load(cli: Cli) -> Result<Config> {
    // ---
    load_with(cli, |name| env::var(name).ok())
}

fn load_with<F>(cli: Cli, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    // Empty values count as unset.
    let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());

    let Cli {
        mut host,
        mut port,
        mut db_host,
        mut db_port,
        mut db_user,
        mut db_pass,
        mut db_name,
        mut db_pool_max,
        mut index_file,
    } = cli;

    override_env!(lookup, "APP_HOST", host);
    override_env!(lookup, "APP_PORT", port, parse);
    override_env!(lookup, "APP_DB_HOST", db_host);
    override_env!(lookup, "APP_DB_PORT", db_port, parse);
    override_env!(lookup, "APP_DB_USER", db_user);
    if let Some(v) = lookup("APP_DB_PASS") {
        tracing::debug!(env = "APP_DB_PASS", value = "***", "flag overridden by env");
        db_pass = v;
    }
    override_env!(lookup, "APP_DB_NAME", db_name);
    override_env!(lookup, "APP_DB_POOL_MAX", db_pool_max, parse);
    override_env!(lookup, "APP_INDEX_FILE", index_file);

    let secret_key = lookup("APP_SECRET_KEY")
        .ok_or_else(|| anyhow!("APP_SECRET_KEY environment variable is required"))?;

    Ok(Config {
        host,
        port,
        db_host,
        db_port,
        db_user,
        db_pass,
        db_name,
        db_pool_max,
        index_file,
        secret_key,
    })
}

impl Config {
    // ---
    /// Connection options for the reading store.
    pub fn connect_options(&self) -> PgConnectOptions {
        // ---
        PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_pass)
            .database(&self.db_name)
            .application_name(APPLICATION_NAME)
    }

    /// Address the HTTP server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Database location with the password masked, for logs.
    pub fn masked_db_url(&self) -> String {
        format!(
            "postgres://{}:****@{}:{}/{}",
            self.db_user, self.db_host, self.db_port, self.db_name
        )
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and the shared secret.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  LISTEN_ADDR    : {}", self.listen_addr());
        tracing::info!("  DATABASE       : {}", self.masked_db_url());
        tracing::info!("  DB_POOL_MAX    : {}", self.db_pool_max);
        tracing::info!("  INDEX_FILE     : {}", self.index_file.display());
        tracing::info!("  SECRET_KEY     : ****");
    }
}
