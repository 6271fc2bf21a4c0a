//! Data models for temperature/humidity readings.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// ---

/// Reading as posted by the device.
///
/// `timestamp` is Unix seconds (UTC). The device is the time source; when it
/// omits the field the server stamps the reading on arrival.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    // ---
    pub temp_co: f64,
    pub temp_room: f64,
    pub humidity: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Persisted reading as returned by the API.
///
/// `created_at` lives in the table but is never selected or exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    pub id: i32,
    pub temp_co: f64,
    pub temp_room: f64,
    pub humidity: f64,
    pub timestamp: i64,
}

impl NewReading {
    // ---
    /// Timestamp to persist: the device's value, or the current UTC time.
    pub fn resolved_timestamp(&self) -> i64 {
        self.timestamp.unwrap_or_else(|| Utc::now().timestamp())
    }
}
