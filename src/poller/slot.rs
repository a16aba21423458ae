// Per-widget request ledger: de-duplication and stale-response discard.
//
// Every issued request gets a generation number. A success is applied only when its
// generation is newer than the one on display, so the view always reflects the most
// recently *issued* successful request regardless of arrival order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use super::source::FetchError;
use crate::widget::WidgetSnapshot;

/// What a refresh trigger should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Issue a new request with this generation.
    Issue(u64),
    /// A request issued within the de-duplication window is still in flight; wait for it.
    Join(u64),
}

/// How a settled request changed the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Applied,
    /// A newer generation is already on display; the response was dropped.
    Discarded,
    /// The request failed; the previous snapshot stays on display.
    Failed(String),
}

/// Renderer-facing state of one widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub snapshot: Option<WidgetSnapshot>,
    /// Generation of the snapshot on display (0 = nothing yet).
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Set when the latest refresh failed; cleared by the next success.
    pub stale: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

#[derive(Debug, Default)]
pub struct WidgetSlot {
    issued: u64,
    /// Start time of the newest issued request while it is unsettled.
    newest_in_flight: Option<Instant>,
    view: WidgetView,
}

impl WidgetSlot {
    pub fn admit(&mut self, now: Instant, dedup_window: Duration) -> Admission {
        if let Some(started) = self.newest_in_flight
            && now.saturating_duration_since(started) < dedup_window
        {
            return Admission::Join(self.issued);
        }
        self.issued += 1;
        self.newest_in_flight = Some(now);
        Admission::Issue(self.issued)
    }

    pub fn settle(
        &mut self,
        generation: u64,
        outcome: Result<WidgetSnapshot, FetchError>,
        at: DateTime<Utc>,
    ) -> Settlement {
        if generation == self.issued {
            self.newest_in_flight = None;
        }
        match outcome {
            Ok(snapshot) if generation > self.view.generation => {
                self.view.snapshot = Some(snapshot);
                self.view.generation = generation;
                self.view.refreshed_at = Some(at);
                self.view.stale = false;
                self.view.last_error = None;
                self.view.consecutive_failures = 0;
                Settlement::Applied
            }
            Ok(_) => Settlement::Discarded,
            Err(e) => {
                let message = e.to_string();
                // A failure older than what is displayed says nothing about the display.
                if generation > self.view.generation {
                    self.view.stale = true;
                    self.view.last_error = Some(message.clone());
                    self.view.consecutive_failures += 1;
                }
                Settlement::Failed(message)
            }
        }
    }

    /// Forgets a request that will never settle, so the next trigger issues afresh.
    pub fn abandon(&mut self, generation: u64) {
        if generation == self.issued {
            self.newest_in_flight = None;
        }
    }

    pub fn view(&self) -> &WidgetView {
        &self.view
    }
}
