// Event store accessor: the only way aggregation code reads sensor events.
// Read-only; the table is owned and appended to by the ingestion pipeline.

mod sqlite;

pub use sqlite::{SENSOR_DATA_SCHEMA, SqliteEventStore, StoreOptions};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Event, SensorType};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("event store unreachable: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("event query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("malformed event row {id}: {reason}")]
    Decode { id: i64, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Ascending timestamp, earlier insertion first on ties.
    #[default]
    OldestFirst,
    /// Descending timestamp, later insertion first on ties.
    NewestFirst,
}

/// One windowed read. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    /// Empty means every sensor type.
    pub sensor_types: Vec<SensorType>,
    pub since: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
    pub order: Order,
    pub limit: Option<u32>,
    /// Only rows with both latitude and longitude set.
    pub with_coordinates: bool,
}

impl EventQuery {
    pub fn new(sensor_types: impl IntoIterator<Item = SensorType>, until: DateTime<Utc>) -> Self {
        Self {
            sensor_types: sensor_types.into_iter().collect(),
            since: None,
            until,
            order: Order::OldestFirst,
            limit: None,
            with_coordinates: false,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_coordinates(mut self) -> Self {
        self.with_coordinates = true;
        self
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events matching `query`, in the requested order, truncated to its limit.
    async fn events(&self, query: &EventQuery) -> Result<Vec<Event>, StoreError>;
}
