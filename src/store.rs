//! Reading store: all SQL touching the `readings` table.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{NewReading, Reading};

// ---

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 500;

/// Raw query string for `GET /data`.
///
/// Kept as strings so malformed values can fall back to defaults instead of
/// rejecting the whole request.
#[derive(Debug, Default)]
pub struct ReadingsQuery {
    // ---
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Validated pagination and time-range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingsFilter {
    // ---
    pub limit: i64,
    pub offset: i64,
    /// Inclusive lower bound on `timestamp`.
    pub from: Option<i64>,
    /// Inclusive upper bound on `timestamp`.
    pub to: Option<i64>,
}

impl ReadingsQuery {
    // ---
    /// Collect the recognised keys from decoded query pairs. When a key is
    /// repeated the first value wins; unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // ---
        let mut q = ReadingsQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "limit" => &mut q.limit,
                "offset" => &mut q.offset,
                "from" => &mut q.from,
                "to" => &mut q.to,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        q
    }
}

impl Default for ReadingsFilter {
    fn default() -> Self {
        ReadingsFilter {
            limit: DEFAULT_LIMIT,
            offset: 0,
            from: None,
            to: None,
        }
    }
}

fn parse_i64(raw: Option<&str>) -> Option<i64> {
    raw.filter(|s| !s.is_empty())?.parse().ok()
}

impl ReadingsFilter {
    // ---
    /// Lenient parse: out-of-range or non-numeric values are dropped, never
    /// reported as errors.
    pub fn from_query(q: &ReadingsQuery) -> Self {
        // ---
        let limit = parse_i64(q.limit.as_deref())
            .filter(|l| *l > 0 && *l <= MAX_LIMIT)
            .unwrap_or(DEFAULT_LIMIT);
        let offset = parse_i64(q.offset.as_deref())
            .filter(|o| *o >= 0)
            .unwrap_or(0);
        let from = parse_i64(q.from.as_deref()).filter(|f| *f >= 0);
        let to = parse_i64(q.to.as_deref()).filter(|t| *t >= 0);

        ReadingsFilter {
            limit,
            offset,
            from,
            to,
        }
    }
}

/// Build the parameterized `SELECT` for a filter.
fn select_readings(filter: &ReadingsFilter) -> QueryBuilder<'static, Postgres> {
    // ---
    let mut qb = QueryBuilder::new(
        "SELECT id, temp_co, temp_room, humidity, timestamp FROM readings WHERE 1=1",
    );

    if let Some(from) = filter.from {
        qb.push(" AND timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND timestamp <= ").push_bind(to);
    }

    qb.push(" ORDER BY timestamp DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    qb
}

/// Insert one reading and return it as stored.
///
/// A missing device timestamp is replaced with the current UTC time.
pub async fn insert_reading(pool: &PgPool, reading: &NewReading) -> Result<Reading, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(
        r#"
        INSERT INTO readings (temp_co, temp_room, humidity, timestamp)
        VALUES ($1, $2, $3, $4)
        RETURNING id, temp_co, temp_room, humidity, timestamp
        "#,
    )
    .bind(reading.temp_co)
    .bind(reading.temp_room)
    .bind(reading.humidity)
    .bind(reading.resolved_timestamp())
    .fetch_one(pool)
    .await
}

/// Fetch readings newest-`timestamp`-first.
///
/// A row that fails to decode aborts the whole fetch.
pub async fn list_readings(
    pool: &PgPool,
    filter: &ReadingsFilter,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    let mut qb = select_readings(filter);
    qb.build_query_as::<Reading>().fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn query(limit: Option<&str>, offset: Option<&str>, from: Option<&str>, to: Option<&str>) -> ReadingsQuery {
        // ---
        ReadingsQuery {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
            from: from.map(String::from),
            to: to.map(String::from),
        }
    }

    #[test]
    fn test_defaults() {
        // ---
        let filter = ReadingsFilter::from_query(&ReadingsQuery::default());
        assert_eq!(filter, ReadingsFilter::default());
        assert_eq!(filter.limit, 10);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn test_limit_bounds() {
        // ---
        let limit_of = |raw: &str| ReadingsFilter::from_query(&query(Some(raw), None, None, None)).limit;

        assert_eq!(limit_of("1"), 1);
        assert_eq!(limit_of("500"), 500);
        assert_eq!(limit_of("501"), DEFAULT_LIMIT);
        assert_eq!(limit_of("0"), DEFAULT_LIMIT);
        assert_eq!(limit_of("-5"), DEFAULT_LIMIT);
        assert_eq!(limit_of("ten"), DEFAULT_LIMIT);
        assert_eq!(limit_of(""), DEFAULT_LIMIT);
    }

    #[test]
    fn test_offset_bounds() {
        // ---
        let offset_of = |raw: &str| ReadingsFilter::from_query(&query(None, Some(raw), None, None)).offset;

        assert_eq!(offset_of("0"), 0);
        assert_eq!(offset_of("25"), 25);
        assert_eq!(offset_of("-1"), 0);
        assert_eq!(offset_of("1.5"), 0);
    }

    #[test]
    fn test_invalid_range_is_ignored() {
        // ---
        let filter = ReadingsFilter::from_query(&query(None, None, Some("invalid"), Some("-100")));
        assert_eq!(filter.from, None);
        assert_eq!(filter.to, None);

        let filter = ReadingsFilter::from_query(&query(None, None, Some("0"), Some("1704067200")));
        assert_eq!(filter.from, Some(0));
        assert_eq!(filter.to, Some(1704067200));
    }

    #[test]
    fn test_repeated_keys_keep_first_value() {
        // ---
        let pairs = [
            ("from", "1"),
            ("from", "2"),
            ("limit", "oops"),
            ("limit", "3"),
            ("device", "esp-1"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));
        let q = ReadingsQuery::from_pairs(pairs);

        assert_eq!(q.from.as_deref(), Some("1"));
        assert_eq!(q.limit.as_deref(), Some("oops"));
        assert_eq!(q.offset, None);

        let filter = ReadingsFilter::from_query(&q);
        assert_eq!(filter.from, Some(1));
        assert_eq!(filter.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_sql_without_range() {
        // ---
        let qb = select_readings(&ReadingsFilter::default());
        assert_eq!(
            qb.sql(),
            "SELECT id, temp_co, temp_room, humidity, timestamp FROM readings WHERE 1=1 \
             ORDER BY timestamp DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_sql_with_range() {
        // ---
        let filter = ReadingsFilter {
            from: Some(100),
            to: Some(200),
            ..Default::default()
        };
        let qb = select_readings(&filter);
        assert_eq!(
            qb.sql(),
            "SELECT id, temp_co, temp_room, humidity, timestamp FROM readings WHERE 1=1 \
             AND timestamp >= $1 AND timestamp <= $2 ORDER BY timestamp DESC LIMIT $3 OFFSET $4"
        );

        let only_to = ReadingsFilter {
            to: Some(200),
            ..Default::default()
        };
        assert!(select_readings(&only_to)
            .sql()
            .contains("WHERE 1=1 AND timestamp <= $1 ORDER BY"));
    }

    // --- Database-backed tests

    async fn migrated(pool: &PgPool) {
        crate::schema::run_migrations(pool).await.unwrap();
    }

    async fn seed(pool: &PgPool, timestamps: &[i64]) {
        // ---
        for (i, ts) in timestamps.iter().enumerate() {
            sqlx::query("INSERT INTO readings (temp_co, temp_room, humidity, timestamp) VALUES ($1, $2, $3, $4)")
                .bind(20.0 + i as f64)
                .bind(18.0)
                .bind(50.0)
                .bind(*ts)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    fn range(from: Option<i64>, to: Option<i64>) -> ReadingsFilter {
        ReadingsFilter {
            from,
            to,
            ..Default::default()
        }
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires PostgreSQL via DATABASE_URL"]
    async fn test_insert_returns_row(pool: PgPool) {
        // ---
        migrated(&pool).await;

        let new = NewReading {
            temp_co: 25.5,
            temp_room: 22.0,
            humidity: 60.0,
            timestamp: Some(1761388101),
        };
        let stored = insert_reading(&pool, &new).await.unwrap();

        assert!(stored.id > 0);
        assert_eq!(stored.temp_co, 25.5);
        assert_eq!(stored.temp_room, 22.0);
        assert_eq!(stored.humidity, 60.0);
        assert_eq!(stored.timestamp, 1761388101);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires PostgreSQL via DATABASE_URL"]
    async fn test_ids_increase(pool: PgPool) {
        // ---
        migrated(&pool).await;

        let mut last = 0;
        for ts in [300, 100, 200] {
            let new = NewReading {
                temp_co: 1.0,
                temp_room: 2.0,
                humidity: 3.0,
                timestamp: Some(ts),
            };
            let stored = insert_reading(&pool, &new).await.unwrap();
            assert!(stored.id > last, "id {} not above {}", stored.id, last);
            last = stored.id;
        }
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires PostgreSQL via DATABASE_URL"]
    async fn test_range_filter_is_inclusive(pool: PgPool) {
        // ---
        migrated(&pool).await;
        let t = 1704067200; // 2024-01-01T00:00:00Z
        seed(&pool, &[t - 1000, t, t + 1000, t + 2000]).await;

        let cases = [
            (range(None, None), 4),
            (range(Some(t), None), 3),
            (range(None, Some(t + 1000)), 3),
            (range(Some(t), Some(t + 1000)), 2),
            (range(Some(t + 1500), Some(t + 1500)), 0),
        ];

        for (filter, expected) in cases {
            let rows = list_readings(&pool, &filter).await.unwrap();
            assert_eq!(rows.len(), expected, "filter {:?}", filter);
        }
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires PostgreSQL via DATABASE_URL"]
    async fn test_newest_first_with_pagination(pool: PgPool) {
        // ---
        migrated(&pool).await;
        let t = 1704067200;
        let timestamps: Vec<i64> = (0..10).map(|i| t + i * 1000).collect();
        seed(&pool, &timestamps).await;

        let filter = ReadingsFilter {
            limit: 3,
            offset: 1,
            from: Some(t),
            to: None,
        };
        let rows = list_readings(&pool, &filter).await.unwrap();

        let got: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(got, vec![t + 8000, t + 7000, t + 6000]);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires PostgreSQL via DATABASE_URL"]
    async fn test_empty_table(pool: PgPool) {
        // ---
        migrated(&pool).await;

        let rows = list_readings(&pool, &ReadingsFilter::default()).await.unwrap();
        assert!(rows.is_empty());
    }
}
