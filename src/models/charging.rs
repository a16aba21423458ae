// EV charging and parking occupancy snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::percentage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvReading {
    pub timestamp: DateTime<Utc>,
    pub current_kw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationAvailability {
    pub available: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvChargingSnapshot {
    pub data: Vec<EvReading>,
    pub stations: StationAvailability,
}

impl EvChargingSnapshot {
    /// Share of stations in use, 0 when no stations are configured.
    pub fn utilization_pct(&self) -> u8 {
        let in_use = self
            .stations
            .total
            .saturating_sub(self.stations.available);
        percentage(in_use, self.stations.total)
    }
}

/// Parking occupancy. Not derived from sensor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSnapshot {
    pub occupied: u64,
    pub available: u64,
    pub total: u64,
    pub percentage: u8,
}

impl ParkingSnapshot {
    pub fn from_counts(occupied: u64, total: u64) -> Self {
        let occupied = occupied.min(total);
        Self {
            occupied,
            available: total - occupied,
            total,
            percentage: percentage(occupied, total),
        }
    }
}
