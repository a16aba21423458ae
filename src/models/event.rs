// Sensor events as stored in the append-only sensor_data table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event discriminant. Open set: unknown types are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SensorType {
    Traffic,
    Ev,
    Fleet,
    Incident,
    Weather,
    Bus,
    Train,
    Other(String),
}

impl SensorType {
    pub fn as_str(&self) -> &str {
        match self {
            SensorType::Traffic => "traffic",
            SensorType::Ev => "ev",
            SensorType::Fleet => "fleet",
            SensorType::Incident => "incident",
            SensorType::Weather => "weather",
            SensorType::Bus => "bus",
            SensorType::Train => "train",
            SensorType::Other(s) => s,
        }
    }
}

impl From<&str> for SensorType {
    fn from(s: &str) -> Self {
        match s {
            "traffic" => SensorType::Traffic,
            "ev" => SensorType::Ev,
            "fleet" => SensorType::Fleet,
            "incident" => SensorType::Incident,
            "weather" => SensorType::Weather,
            "bus" => SensorType::Bus,
            "train" => SensorType::Train,
            other => SensorType::Other(other.to_string()),
        }
    }
}

impl From<String> for SensorType {
    fn from(s: String) -> Self {
        SensorType::from(s.as_str())
    }
}

impl From<SensorType> for String {
    fn from(t: SensorType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable sensor reading.
///
/// `id` is the store row id and doubles as insertion order, which breaks ties
/// between events sharing a timestamp. Payload fields are type dependent and
/// `None` whenever the sensor does not report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub sensor_type: SensorType,
    pub timestamp: DateTime<Utc>,

    // traffic / bus
    pub traffic_density: Option<f64>,
    pub avg_speed: Option<f64>,
    pub occupancy: Option<f64>,

    // ev
    pub station_id: Option<String>,
    pub current_kw: Option<f64>,
    pub charger_load: Option<f64>,
    pub ev_is_available: Option<bool>,

    // fleet / train
    pub vehicle_id: Option<String>,
    pub train_id: Option<String>,
    pub fuel_mpg: Option<f64>,
    pub is_online: Option<bool>,
    pub health_status: Option<String>,
    pub has_fault: Option<bool>,

    // incident
    pub severity: Option<String>,
    pub incident_type: Option<String>,
    pub incident_location: Option<String>,
    pub lane_blocked: Option<bool>,

    // weather
    pub condition: Option<String>,
    pub road_condition: Option<String>,
    pub temperature: Option<f64>,
    pub visibility: Option<f64>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Event {
    /// Bare event with every payload field unset.
    pub fn new(id: i64, sensor_type: SensorType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sensor_type,
            timestamp,
            traffic_density: None,
            avg_speed: None,
            occupancy: None,
            station_id: None,
            current_kw: None,
            charger_load: None,
            ev_is_available: None,
            vehicle_id: None,
            train_id: None,
            fuel_mpg: None,
            is_online: None,
            health_status: None,
            has_fault: None,
            severity: None,
            incident_type: None,
            incident_location: None,
            lane_blocked: None,
            condition: None,
            road_condition: None,
            temperature: None,
            visibility: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Both coordinates, when present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Sort key for "newest": timestamp, then insertion order.
    pub fn recency(&self) -> (DateTime<Utc>, i64) {
        (self.timestamp, self.id)
    }
}
