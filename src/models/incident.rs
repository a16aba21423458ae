// Incident list and severity summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRow {
    pub incident_location: Option<String>,
    pub severity: Option<String>,
    pub incident_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCount {
    pub severity: String,
    pub cnt: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSummary {
    pub severity: Vec<SeverityCount>,
    pub lane_blocked_pct: u8,
}

impl IncidentSummary {
    /// Severity counts in display order: CRITICAL, HIGH, MEDIUM, LOW, then the rest.
    pub fn by_display_order(&self) -> Vec<SeverityCount> {
        let mut out = self.severity.clone();
        out.sort_by_key(|s| severity_rank(&s.severity));
        out
    }
}

pub fn severity_rank(severity: &str) -> u8 {
    match severity.to_ascii_uppercase().as_str() {
        "CRITICAL" => 0,
        "HIGH" => 1,
        "MEDIUM" => 2,
        "LOW" => 3,
        _ => 4,
    }
}
