//! Database schema management for `esp8266-telemetry`.
//!
//! Ensures the `readings` table exists in its current shape before serving
//! requests. Applied once on startup from `main.rs`; every step is safe to
//! re-run against an already-migrated database.

use anyhow::{Context, Result};
use sqlx::PgPool;

// ---

/// Base table as first deployed. Later columns are added by `ALTER` steps.
const CREATE_READINGS: &str = r#"
    CREATE TABLE IF NOT EXISTS readings (
        id         SERIAL PRIMARY KEY,
        temp_co    DOUBLE PRECISION,
        temp_room  DOUBLE PRECISION,
        timestamp  BIGINT,
        created_at TIMESTAMP DEFAULT NOW()
    )
"#;

const ADD_HUMIDITY: &str = r#"
    ALTER TABLE readings
        ADD COLUMN IF NOT EXISTS humidity DOUBLE PRECISION NOT NULL DEFAULT 0.0
"#;

/// Tighten the original nullable columns. `SET DEFAULT` and `SET NOT NULL`
/// are no-ops when already in place.
const ENFORCE_DEFAULTS: [&str; 6] = [
    "ALTER TABLE readings ALTER COLUMN temp_co SET DEFAULT 0.0",
    "ALTER TABLE readings ALTER COLUMN temp_co SET NOT NULL",
    "ALTER TABLE readings ALTER COLUMN temp_room SET DEFAULT 0.0",
    "ALTER TABLE readings ALTER COLUMN temp_room SET NOT NULL",
    "ALTER TABLE readings ALTER COLUMN timestamp SET DEFAULT 0",
    "ALTER TABLE readings ALTER COLUMN timestamp SET NOT NULL",
];

// Serves `ORDER BY timestamp DESC` and the range filters
const CREATE_TIMESTAMP_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_readings_timestamp
        ON readings (timestamp)
"#;

/// Apply all migrations (idempotent).
///
/// Runs in a single transaction, so a failing step leaves the schema as it
/// was. Errors are propagated and are fatal to startup.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    // ---
    tracing::debug!("Applying migrations");
    let mut tx = pool.begin().await?;

    sqlx::query(CREATE_READINGS)
        .execute(&mut *tx)
        .await
        .context("creating readings table")?;

    sqlx::query(ADD_HUMIDITY)
        .execute(&mut *tx)
        .await
        .context("adding humidity column")?;

    for stmt in ENFORCE_DEFAULTS {
        sqlx::query(stmt)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("enforcing column defaults: {stmt}"))?;
    }

    sqlx::query(CREATE_TIMESTAMP_INDEX)
        .execute(&mut *tx)
        .await
        .context("creating timestamp index")?;

    tx.commit().await?;
    tracing::debug!("Migrations applied successfully");
    Ok(())
}
