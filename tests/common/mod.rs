// Shared test helpers: a throwaway sensor_data database seeded through its own writable pool

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use citypulse::event_store::{SENSOR_DATA_SCHEMA, SqliteEventStore, StoreOptions};
use citypulse::models::{Event, SensorType};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;

/// Fixed query time, deliberately not minute-aligned.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 8, 30, 45).unwrap()
}

pub fn secs_ago(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    now - TimeDelta::seconds(secs)
}

pub fn mins_ago(now: DateTime<Utc>, mins: i64) -> DateTime<Utc> {
    now - TimeDelta::minutes(mins)
}

pub fn event(sensor_type: SensorType, timestamp: DateTime<Utc>) -> Event {
    Event::new(0, sensor_type, timestamp)
}

pub fn store_options() -> StoreOptions {
    StoreOptions {
        max_connections: 4,
        acquire_timeout: Duration::from_secs(5),
    }
}

pub struct TestDb {
    _dir: TempDir,
    pub path: String,
    writer: SqlitePool,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensors.db").to_str().unwrap().to_string();
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))
            .unwrap()
            .create_if_missing(true);
        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .unwrap();
        for statement in SENSOR_DATA_SCHEMA.split(';') {
            if statement.trim().is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&writer).await.unwrap();
        }
        Self {
            _dir: dir,
            path,
            writer,
        }
    }

    pub fn store(&self) -> SqliteEventStore {
        SqliteEventStore::open(&self.path, store_options()).unwrap()
    }

    /// Appends `e`; its `id` is ignored and assigned by the table.
    pub async fn insert(&self, e: &Event) -> i64 {
        let result = sqlx::query(
            "INSERT INTO sensor_data (sensor_type, ts, traffic_density, avg_speed, occupancy, \
             station_id, current_kw, charger_load, ev_is_available, vehicle_id, train_id, fuel_mpg, \
             is_online, health_status, has_fault, severity, incident_type, incident_location, \
             lane_blocked, condition, road_condition, temperature, visibility, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             $18, $19, $20, $21, $22, $23, $24, $25)",
        )
        .bind(e.sensor_type.as_str())
        .bind(e.timestamp.timestamp_millis())
        .bind(e.traffic_density)
        .bind(e.avg_speed)
        .bind(e.occupancy)
        .bind(e.station_id.as_deref())
        .bind(e.current_kw)
        .bind(e.charger_load)
        .bind(e.ev_is_available)
        .bind(e.vehicle_id.as_deref())
        .bind(e.train_id.as_deref())
        .bind(e.fuel_mpg)
        .bind(e.is_online)
        .bind(e.health_status.as_deref())
        .bind(e.has_fault)
        .bind(e.severity.as_deref())
        .bind(e.incident_type.as_deref())
        .bind(e.incident_location.as_deref())
        .bind(e.lane_blocked)
        .bind(e.condition.as_deref())
        .bind(e.road_condition.as_deref())
        .bind(e.temperature)
        .bind(e.visibility)
        .bind(e.latitude)
        .bind(e.longitude)
        .execute(&self.writer)
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    pub async fn insert_all(&self, events: &[Event]) {
        for e in events {
            self.insert(e).await;
        }
    }
}
