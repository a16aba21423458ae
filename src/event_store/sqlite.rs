// SQLite accessor. Uses sqlx for async + connection pooling; the database is opened read-only.
// The pool is the process's only shared state: established on the first query, bounded,
// and kept for the lifetime of the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::instrument;

use super::{EventQuery, EventStore, Order, StoreError};
use crate::models::{Event, SensorType};

/// Table layout expected from the ingestion side. `ts` is epoch milliseconds.
pub const SENSOR_DATA_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sensor_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sensor_type TEXT NOT NULL,
    ts INTEGER NOT NULL,
    traffic_density REAL,
    avg_speed REAL,
    occupancy REAL,
    station_id TEXT,
    current_kw REAL,
    charger_load REAL,
    ev_is_available INTEGER,
    vehicle_id TEXT,
    train_id TEXT,
    fuel_mpg REAL,
    is_online INTEGER,
    health_status TEXT,
    has_fault INTEGER,
    severity TEXT,
    incident_type TEXT,
    incident_location TEXT,
    lane_blocked INTEGER,
    condition TEXT,
    road_condition TEXT,
    temperature REAL,
    visibility REAL,
    latitude REAL,
    longitude REAL
);
CREATE INDEX IF NOT EXISTS idx_sensor_data_type_ts ON sensor_data(sensor_type, ts);
"#;

const SELECT_COLUMNS: &str = "SELECT id, sensor_type, ts, traffic_density, avg_speed, occupancy, \
     station_id, current_kw, charger_load, ev_is_available, vehicle_id, train_id, fuel_mpg, \
     is_online, health_status, has_fault, severity, incident_type, incident_location, \
     lane_blocked, condition, road_condition, temperature, visibility, latitude, longitude \
     FROM sensor_data WHERE ts <= ";

/// Pool sizing for the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub max_connections: u32,
    /// How long a query waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

pub struct SqliteEventStore {
    connect_options: SqliteConnectOptions,
    options: StoreOptions,
    pool: OnceCell<SqlitePool>,
}

impl SqliteEventStore {
    /// Prepares the accessor without touching the database.
    pub fn open(path: &str, options: StoreOptions) -> anyhow::Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(Duration::from_secs(5));
        Ok(Self {
            connect_options,
            options,
            pool: OnceCell::new(),
        })
    }

    /// True once the first query has established the pool.
    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    async fn pool(&self) -> Result<&SqlitePool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.options.max_connections)
                    .acquire_timeout(self.options.acquire_timeout)
                    .connect_with(self.connect_options.clone())
                    .await
                    .map_err(StoreError::Connect)?;
                tracing::info!(
                    max_connections = self.options.max_connections,
                    "event store pool established"
                );
                Ok(pool)
            })
            .await
    }

    fn parse_event_row(row: &SqliteRow) -> Result<Event, StoreError> {
        let id: i64 = row.try_get("id")?;
        let sensor_type: String = row.try_get("sensor_type")?;
        let ts: i64 = row.try_get("ts")?;
        let timestamp = DateTime::from_timestamp_millis(ts).ok_or_else(|| StoreError::Decode {
            id,
            reason: format!("timestamp {} out of range", ts),
        })?;

        Ok(Event {
            id,
            sensor_type: SensorType::from(sensor_type),
            timestamp,
            traffic_density: row.try_get("traffic_density")?,
            avg_speed: row.try_get("avg_speed")?,
            occupancy: row.try_get("occupancy")?,
            station_id: row.try_get("station_id")?,
            current_kw: row.try_get("current_kw")?,
            charger_load: row.try_get("charger_load")?,
            ev_is_available: row.try_get("ev_is_available")?,
            vehicle_id: row.try_get("vehicle_id")?,
            train_id: row.try_get("train_id")?,
            fuel_mpg: row.try_get("fuel_mpg")?,
            is_online: row.try_get("is_online")?,
            health_status: row.try_get("health_status")?,
            has_fault: row.try_get("has_fault")?,
            severity: row.try_get("severity")?,
            incident_type: row.try_get("incident_type")?,
            incident_location: row.try_get("incident_location")?,
            lane_blocked: row.try_get("lane_blocked")?,
            condition: row.try_get("condition")?,
            road_condition: row.try_get("road_condition")?,
            temperature: row.try_get("temperature")?,
            visibility: row.try_get("visibility")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        })
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(
        skip(self, query),
        fields(repo = "event_store", operation = "events", types = query.sensor_types.len())
    )]
    async fn events(&self, query: &EventQuery) -> Result<Vec<Event>, StoreError> {
        let pool = self.pool().await?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        qb.push_bind(query.until.timestamp_millis());
        if let Some(since) = query.since {
            qb.push(" AND ts >= ").push_bind(millis_ceil(since));
        }
        if !query.sensor_types.is_empty() {
            qb.push(" AND sensor_type IN (");
            let mut types = qb.separated(", ");
            for t in &query.sensor_types {
                types.push_bind(t.as_str().to_string());
            }
            types.push_unseparated(")");
        }
        if query.with_coordinates {
            qb.push(" AND latitude IS NOT NULL AND longitude IS NOT NULL");
        }
        qb.push(match query.order {
            Order::OldestFirst => " ORDER BY ts ASC, id ASC",
            Order::NewestFirst => " ORDER BY ts DESC, id DESC",
        });
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb.build().fetch_all(pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(Self::parse_event_row(row)?);
        }
        tracing::debug!(rows = out.len(), "events fetched");
        Ok(out)
    }
}

/// `ts` holds whole milliseconds, so a lower bound inside a millisecond is first met
/// by the next one. The upper bound truncates through `timestamp_millis`.
fn millis_ceil(t: DateTime<Utc>) -> i64 {
    let ms = t.timestamp_millis();
    if t.timestamp_subsec_nanos() % 1_000_000 == 0 {
        ms
    } else {
        ms + 1
    }
}
