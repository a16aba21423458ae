// Domain models: raw sensor events and the per-widget snapshots built from them

mod charging;
mod event;
mod fleet;
mod incident;
mod traffic;
mod weather;

pub use charging::{EvChargingSnapshot, EvReading, ParkingSnapshot, StationAvailability};
pub use event::{Event, SensorType};
pub use fleet::{FleetSnapshot, LocationRow, StatsSnapshot};
pub use incident::{IncidentRow, IncidentSummary, SeverityCount, severity_rank};
pub use traffic::{CongestionPoint, OverviewBucket};
pub use weather::{RoadConditionCount, WeatherReading, WeatherSnapshot};
