// Aggregation layer: turns windowed event reads into per-widget snapshots.
// primitives holds the pure reductions, widgets the per-widget queries.

pub mod primitives;
pub mod widgets;

pub use primitives::percentage;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::event_store::{EventStore, StoreError};
use crate::models::ParkingSnapshot;
use crate::widget::{Widget, WidgetSnapshot};

/// A widget's aggregation could not be computed. Only that widget is affected.
#[derive(Debug, thiserror::Error)]
#[error("{widget} aggregation unavailable")]
pub struct AggregationError {
    pub widget: Widget,
    #[source]
    pub source: StoreError,
}

pub(crate) fn unavailable(widget: Widget) -> impl FnOnce(StoreError) -> AggregationError {
    move |source| AggregationError { widget, source }
}

/// Values that do not come from the event store.
#[derive(Debug, Clone, Copy)]
pub struct WidgetSettings {
    /// Installed charging stations; the "total" half of the EV availability pair.
    pub ev_total_stations: u64,
    /// Parking occupancy has no sensor feed; it is served from this fixed value.
    pub parking: ParkingSnapshot,
}

/// Entry point used by the endpoint layer: one snapshot per widget, computed on demand.
pub struct Aggregator {
    store: Arc<dyn EventStore>,
    settings: WidgetSettings,
}

impl Aggregator {
    pub fn new(store: Arc<dyn EventStore>, settings: WidgetSettings) -> Self {
        Self { store, settings }
    }

    pub async fn snapshot(
        &self,
        widget: Widget,
        now: DateTime<Utc>,
    ) -> Result<WidgetSnapshot, AggregationError> {
        let store = self.store.as_ref();
        Ok(match widget {
            Widget::Congestion => {
                WidgetSnapshot::Congestion(widgets::congestion(store, now).await?)
            }
            Widget::EvCharging => WidgetSnapshot::EvCharging(
                widgets::ev_charging(store, now, self.settings.ev_total_stations).await?,
            ),
            Widget::Fleet => WidgetSnapshot::Fleet(widgets::fleet(store, now).await?),
            Widget::Incidents => WidgetSnapshot::Incidents(widgets::incidents(store, now).await?),
            Widget::IncidentSummary => {
                WidgetSnapshot::IncidentSummary(widgets::incident_summary(store, now).await?)
            }
            Widget::Locations => WidgetSnapshot::Locations(widgets::locations(store, now).await?),
            Widget::Overview => WidgetSnapshot::Overview(widgets::overview(store, now).await?),
            Widget::Parking => WidgetSnapshot::Parking(self.settings.parking),
            Widget::Stats => WidgetSnapshot::Stats(widgets::stats(store, now).await?),
            Widget::Weather => WidgetSnapshot::Weather(widgets::weather(store, now).await?),
        })
    }
}
