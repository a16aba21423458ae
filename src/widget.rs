// Widget inventory shared by the endpoint layer and the polling client

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{
    CongestionPoint, EvChargingSnapshot, FleetSnapshot, IncidentRow, IncidentSummary, LocationRow,
    OverviewBucket, ParkingSnapshot, StatsSnapshot, WeatherSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Widget {
    Congestion,
    EvCharging,
    Fleet,
    Incidents,
    IncidentSummary,
    Locations,
    Overview,
    Parking,
    Stats,
    Weather,
}

impl Widget {
    pub const ALL: [Widget; 10] = [
        Widget::Congestion,
        Widget::EvCharging,
        Widget::Fleet,
        Widget::Incidents,
        Widget::IncidentSummary,
        Widget::Locations,
        Widget::Overview,
        Widget::Parking,
        Widget::Stats,
        Widget::Weather,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Widget::Congestion => "congestion",
            Widget::EvCharging => "ev-charging",
            Widget::Fleet => "fleet",
            Widget::Incidents => "incidents",
            Widget::IncidentSummary => "incident-summary",
            Widget::Locations => "locations",
            Widget::Overview => "overview",
            Widget::Parking => "parking",
            Widget::Stats => "stats",
            Widget::Weather => "weather",
        }
    }

    /// Endpoint path, e.g. `/ev-charging`.
    pub fn path(self) -> &'static str {
        match self {
            Widget::Congestion => "/congestion",
            Widget::EvCharging => "/ev-charging",
            Widget::Fleet => "/fleet",
            Widget::Incidents => "/incidents",
            Widget::IncidentSummary => "/incident-summary",
            Widget::Locations => "/locations",
            Widget::Overview => "/overview",
            Widget::Parking => "/parking",
            Widget::Stats => "/stats",
            Widget::Weather => "/weather",
        }
    }

    /// Message sent to clients when this widget's aggregation fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Widget::Congestion => "Failed to fetch congestion",
            Widget::EvCharging => "Failed to fetch EV data",
            Widget::Fleet => "Failed to fetch fleet",
            Widget::Incidents => "Failed to fetch incidents",
            Widget::IncidentSummary => "Failed to fetch incident summary",
            Widget::Locations => "Failed to fetch locations",
            Widget::Overview => "Failed to fetch overview",
            Widget::Parking => "Failed to fetch parking",
            Widget::Stats => "Failed to fetch stats",
            Widget::Weather => "Failed to fetch weather",
        }
    }

    /// Parse a success body for this widget into its typed snapshot.
    pub fn decode(self, body: &[u8]) -> serde_json::Result<WidgetSnapshot> {
        Ok(match self {
            Widget::Congestion => WidgetSnapshot::Congestion(serde_json::from_slice(body)?),
            Widget::EvCharging => WidgetSnapshot::EvCharging(serde_json::from_slice(body)?),
            Widget::Fleet => WidgetSnapshot::Fleet(serde_json::from_slice(body)?),
            Widget::Incidents => WidgetSnapshot::Incidents(serde_json::from_slice(body)?),
            Widget::IncidentSummary => {
                WidgetSnapshot::IncidentSummary(serde_json::from_slice(body)?)
            }
            Widget::Locations => WidgetSnapshot::Locations(serde_json::from_slice(body)?),
            Widget::Overview => WidgetSnapshot::Overview(serde_json::from_slice(body)?),
            Widget::Parking => WidgetSnapshot::Parking(serde_json::from_slice(body)?),
            Widget::Stats => WidgetSnapshot::Stats(serde_json::from_slice(body)?),
            Widget::Weather => WidgetSnapshot::Weather(serde_json::from_slice(body)?),
        })
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Widget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches('/');
        Widget::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown widget: {}", s))
    }
}

/// Typed snapshot for any widget, as held by the polling client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WidgetSnapshot {
    Congestion(Vec<CongestionPoint>),
    EvCharging(EvChargingSnapshot),
    Fleet(FleetSnapshot),
    Incidents(Vec<IncidentRow>),
    IncidentSummary(IncidentSummary),
    Locations(Vec<LocationRow>),
    Overview(Vec<OverviewBucket>),
    Parking(ParkingSnapshot),
    Stats(StatsSnapshot),
    Weather(WeatherSnapshot),
}

impl WidgetSnapshot {
    pub fn widget(&self) -> Widget {
        match self {
            WidgetSnapshot::Congestion(_) => Widget::Congestion,
            WidgetSnapshot::EvCharging(_) => Widget::EvCharging,
            WidgetSnapshot::Fleet(_) => Widget::Fleet,
            WidgetSnapshot::Incidents(_) => Widget::Incidents,
            WidgetSnapshot::IncidentSummary(_) => Widget::IncidentSummary,
            WidgetSnapshot::Locations(_) => Widget::Locations,
            WidgetSnapshot::Overview(_) => Widget::Overview,
            WidgetSnapshot::Parking(_) => Widget::Parking,
            WidgetSnapshot::Stats(_) => Widget::Stats,
            WidgetSnapshot::Weather(_) => Widget::Weather,
        }
    }

    /// One-line digest for logs.
    pub fn summary(&self) -> String {
        match self {
            WidgetSnapshot::Congestion(rows) => format!("{} readings", rows.len()),
            WidgetSnapshot::EvCharging(ev) => format!(
                "{} readings, {}/{} stations available, {}% utilized",
                ev.data.len(),
                ev.stations.available,
                ev.stations.total,
                ev.utilization_pct()
            ),
            WidgetSnapshot::Fleet(f) => format!(
                "avg {:.1} mpg, {} idle, {} health alerts",
                f.avg_fuel_mpg, f.idle_vehicles, f.health_alerts
            ),
            WidgetSnapshot::Incidents(rows) => format!("{} recent incidents", rows.len()),
            WidgetSnapshot::IncidentSummary(s) => {
                let severities: Vec<String> = s
                    .by_display_order()
                    .iter()
                    .map(|c| format!("{} {}", c.severity, c.cnt))
                    .collect();
                format!(
                    "[{}], {}% lane blocked",
                    severities.join(", "),
                    s.lane_blocked_pct
                )
            }
            WidgetSnapshot::Locations(rows) => format!("{} map points", rows.len()),
            WidgetSnapshot::Overview(buckets) => format!("{} buckets", buckets.len()),
            WidgetSnapshot::Parking(p) => {
                format!("{}/{} occupied ({}%)", p.occupied, p.total, p.percentage)
            }
            WidgetSnapshot::Stats(s) => format!(
                "{} incidents, {} fleet online, {} train faults, {}% ev usage",
                s.incidents, s.fleet_online, s.train_faults, s.ev_usage
            ),
            WidgetSnapshot::Weather(w) => format!(
                "latest {}, {}% wet roads",
                w.latest
                    .as_ref()
                    .and_then(|l| l.condition.as_deref())
                    .unwrap_or("n/a"),
                w.wet_road_pct()
            ),
        }
    }
}
