// Polling client: one refresh loop per widget against its snapshot endpoint.
// Loops never share failures; a widget that cannot refresh keeps its last good snapshot.

pub mod slot;
pub mod source;

pub use slot::{Admission, Settlement, WidgetSlot, WidgetView};
pub use source::{FetchError, HttpSource, SnapshotSource};

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::config::PollingConfig;
use crate::widget::{Widget, WidgetSnapshot};

/// Capacity of the update channel; slow subscribers lag and skip.
const UPDATES_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub refresh_interval: Duration,
    pub dedup_window: Duration,
    pub request_timeout: Duration,
    pub refresh_when_hidden: bool,
}

impl From<&PollingConfig> for PollerConfig {
    fn from(c: &PollingConfig) -> Self {
        Self {
            refresh_interval: c.refresh_interval(),
            dedup_window: c.dedup_window(),
            request_timeout: c.request_timeout(),
            refresh_when_hidden: c.refresh_when_hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(u64),
    Discarded(u64),
    Failed { generation: u64, error: String },
    /// Coalesced into the in-flight request with this generation.
    Joined(u64),
    /// The widget is not polled by this client.
    Unknown,
}

/// Published whenever a widget's displayed snapshot changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetUpdate {
    pub widget: Widget,
    pub generation: u64,
}

struct Entry {
    slot: Mutex<WidgetSlot>,
    /// Highest generation settled so far; joined triggers wait on it.
    settled: watch::Sender<u64>,
}

pub struct Poller {
    source: Arc<dyn SnapshotSource>,
    config: PollerConfig,
    widgets: BTreeMap<Widget, Entry>,
    visible: watch::Sender<bool>,
    revalidate: broadcast::Sender<()>,
    updates: broadcast::Sender<WidgetUpdate>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        config: PollerConfig,
        widgets: impl IntoIterator<Item = Widget>,
    ) -> Self {
        let widgets = widgets
            .into_iter()
            .map(|w| {
                let entry = Entry {
                    slot: Mutex::new(WidgetSlot::default()),
                    settled: watch::channel(0).0,
                };
                (w, entry)
            })
            .collect();
        Self {
            source,
            config,
            widgets,
            visible: watch::channel(true).0,
            revalidate: broadcast::channel(16).0,
            updates: broadcast::channel(UPDATES_CAPACITY).0,
        }
    }

    pub fn widgets(&self) -> impl Iterator<Item = Widget> + '_ {
        self.widgets.keys().copied()
    }

    /// Current view of `widget`, or `None` when it is not polled.
    pub fn view(&self, widget: Widget) -> Option<WidgetView> {
        self.widgets
            .get(&widget)
            .map(|entry| lock(&entry.slot).view().clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetUpdate> {
        self.updates.subscribe()
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    /// Records consumer visibility. Becoming visible again revalidates every widget.
    pub fn set_visible(&self, visible: bool) {
        let was_visible = self.visible.send_replace(visible);
        if visible && !was_visible {
            debug!("consumer visible again; revalidating");
            self.revalidate();
        }
    }

    /// Asks every running widget loop for an immediate out-of-cycle refresh.
    pub fn revalidate(&self) {
        let _ = self.revalidate.send(());
    }

    /// One refresh of `widget`, honoring de-duplication and stale-response discard.
    ///
    /// Dropping the future before it completes abandons the request: later triggers
    /// issue a new one and joined callers are released.
    pub async fn refresh(&self, widget: Widget) -> RefreshOutcome {
        let Some(entry) = self.widgets.get(&widget) else {
            return RefreshOutcome::Unknown;
        };

        let admission = lock(&entry.slot).admit(Instant::now(), self.config.dedup_window);
        let generation = match admission {
            Admission::Issue(generation) => generation,
            Admission::Join(generation) => {
                let mut settled = entry.settled.subscribe();
                let _ = settled.wait_for(|g| *g >= generation).await;
                return RefreshOutcome::Joined(generation);
            }
        };

        let in_flight = InFlight {
            entry,
            generation,
            done: false,
        };
        let timeout = self.config.request_timeout;
        let outcome = match tokio::time::timeout(timeout, self.source.fetch(widget)).await {
            Ok(Ok(snapshot)) if snapshot.widget() != widget => Err(FetchError::WrongWidget {
                expected: widget,
                got: snapshot.widget(),
            }),
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };
        let settlement = in_flight.settle(outcome);

        match settlement {
            Settlement::Applied => {
                debug!(%widget, generation, "snapshot applied");
                let _ = self.updates.send(WidgetUpdate { widget, generation });
                RefreshOutcome::Applied(generation)
            }
            Settlement::Discarded => {
                debug!(%widget, generation, "stale response discarded");
                RefreshOutcome::Discarded(generation)
            }
            Settlement::Failed(error) => {
                warn!(%widget, generation, error = %error, "refresh failed; keeping last snapshot");
                RefreshOutcome::Failed { generation, error }
            }
        }
    }

    /// Refreshes every widget concurrently.
    pub async fn refresh_all(&self) -> Vec<(Widget, RefreshOutcome)> {
        futures_util::future::join_all(
            self.widgets()
                .map(|widget| async move { (widget, self.refresh(widget).await) }),
        )
        .await
    }

    /// Starts one loop per widget. Loops stop when `shutdown` changes or its sender is dropped.
    pub fn spawn(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        self.widgets()
            .map(|widget| tokio::spawn(Arc::clone(self).run_widget(widget, shutdown.clone())))
            .collect()
    }

    async fn run_widget(self: Arc<Self>, widget: Widget, mut shutdown: watch::Receiver<bool>) {
        let mut tick = interval(self.config.refresh_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut revalidate = self.revalidate.subscribe();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if self.config.refresh_when_hidden || self.is_visible() {
                        self.spawn_refresh(widget);
                    }
                }
                msg = revalidate.recv() => {
                    if let Err(broadcast::error::RecvError::Closed) = msg {
                        break;
                    }
                    self.spawn_refresh(widget);
                    tick.reset();
                }
                _ = shutdown.changed() => {
                    debug!(%widget, "poll loop shutting down");
                    break;
                }
            }
        }
    }

    /// Refreshes run detached so a slow response never holds up the widget's timer.
    fn spawn_refresh(self: &Arc<Self>, widget: Widget) {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            poller.refresh(widget).await;
        });
    }
}

/// An issued generation until it settles. Dropped unsettled, it is abandoned.
struct InFlight<'a> {
    entry: &'a Entry,
    generation: u64,
    done: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: Result<WidgetSnapshot, FetchError>) -> Settlement {
        let settlement = lock(&self.entry.slot).settle(self.generation, outcome, Utc::now());
        self.done = true;
        settlement
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            lock(&self.entry.slot).abandon(self.generation);
        }
        let generation = self.generation;
        self.entry.settled.send_modify(|g| *g = (*g).max(generation));
    }
}

fn lock(slot: &Mutex<WidgetSlot>) -> MutexGuard<'_, WidgetSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
