// Weather and road condition snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::percentage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub timestamp: DateTime<Utc>,
    pub condition: Option<String>,
    pub road_condition: Option<String>,
    pub temperature: Option<f64>,
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadConditionCount {
    pub road_condition: String,
    pub cnt: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub latest: Option<WeatherReading>,
    #[serde(rename = "road30m")]
    pub road_30m: Vec<RoadConditionCount>,
}

impl WeatherSnapshot {
    /// WET share of all road-condition readings in the last 30 minutes.
    pub fn wet_road_pct(&self) -> u8 {
        let total: u64 = self.road_30m.iter().map(|r| r.cnt).sum();
        let wet: u64 = self
            .road_30m
            .iter()
            .filter(|r| r.road_condition.eq_ignore_ascii_case("WET"))
            .map(|r| r.cnt)
            .sum();
        percentage(wet, total)
    }
}
