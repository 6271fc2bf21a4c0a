use std::{path::PathBuf, sync::Arc};

use sqlx::PgPool;

use crate::{metrics::Metrics, Config};

// ---

/// Application context handed to every handler.
///
/// Cheap to clone: the pool is reference counted internally and the rest is
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub pool: PgPool,
    pub secret_key: Arc<str>,
    pub index_file: Arc<PathBuf>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    // ---
    pub fn new(pool: PgPool, config: &Config, metrics: Metrics) -> Self {
        AppState {
            pool,
            secret_key: Arc::from(config.secret_key.as_str()),
            index_file: Arc::new(config.index_file.clone()),
            metrics: Arc::new(metrics),
        }
    }

    /// Whether a presented `X-Secret-Key` matches the configured secret.
    pub fn secret_matches(&self, presented: Option<&str>) -> bool {
        presented == Some(&*self.secret_key)
    }
}
