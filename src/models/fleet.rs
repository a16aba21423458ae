// Fleet summary, header counters and the live map feed

use serde::{Deserialize, Serialize};

use super::SensorType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub avg_fuel_mpg: f64,
    pub idle_vehicles: u64,
    pub health_alerts: u64,
}

/// Header cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub incidents: u64,
    pub fleet_online: u64,
    pub train_faults: u64,
    pub ev_usage: i64,
}

/// Latest position of one map entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRow {
    pub sensor_type: SensorType,
    pub latitude: f64,
    pub longitude: f64,
    pub incident_location: Option<String>,
    pub severity: Option<String>,
    pub vehicle_id: Option<String>,
    pub station_id: Option<String>,
}
