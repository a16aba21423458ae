// Traffic widgets: congestion series and the per-minute operations pulse

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One congestion reading for the density chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionPoint {
    pub timestamp: DateTime<Utc>,
    pub traffic_density: f64,
}

/// One minute of the overview pulse. Averages are 0 for minutes without readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewBucket {
    pub bucket: DateTime<Utc>,
    pub avg_traffic_density: f64,
    pub avg_speed: f64,
    pub avg_bus_occupancy: f64,
    pub incident_count: u64,
}
