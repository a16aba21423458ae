// Reusable reductions behind every widget: trailing windows, bounded recent lists,
// scalar aggregates with defined defaults, latest-per-entity and time buckets.
// Everything here is pure; store access lives in widgets.rs.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use crate::event_store::{EventQuery, Order};
use crate::models::{Event, SensorType};

/// Trailing time range relative to query time. Both ends are inclusive:
/// `[now - length, now]`. An unbounded window has no lower end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    length: Option<TimeDelta>,
}

impl Window {
    pub fn trailing(length: TimeDelta) -> Self {
        Self {
            length: Some(length),
        }
    }

    pub fn minutes(minutes: i64) -> Self {
        Self::trailing(TimeDelta::minutes(minutes))
    }

    pub fn hours(hours: i64) -> Self {
        Self::trailing(TimeDelta::hours(hours))
    }

    /// Everything up to `now`.
    pub fn unbounded() -> Self {
        Self { length: None }
    }

    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.length.map(|l| now - l)
    }

    pub fn contains(&self, now: DateTime<Utc>, ts: DateTime<Utc>) -> bool {
        ts <= now && self.start(now).is_none_or(|start| ts >= start)
    }

    /// Store query covering this window for the given sensor types.
    pub fn query(
        &self,
        sensor_types: impl IntoIterator<Item = SensorType>,
        now: DateTime<Utc>,
    ) -> EventQuery {
        let query = EventQuery::new(sensor_types, now);
        match self.start(now) {
            Some(start) => query.since(start),
            None => query,
        }
    }

    /// Events of `events` that fall inside the window at `now`.
    pub fn select<'a>(
        &self,
        events: &'a [Event],
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Event> + use<'a> {
        let window = *self;
        events
            .iter()
            .filter(move |e| window.contains(now, e.timestamp))
    }
}

/// Up to `cap` events ordered by timestamp with insertion order as tiebreak.
/// `OldestFirst` keeps the oldest `cap`, `NewestFirst` the newest.
pub fn recent_list<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    cap: usize,
    order: Order,
) -> Vec<&'a Event> {
    let mut rows: Vec<&Event> = events.into_iter().collect();
    rows.sort_by_key(|e| e.recency());
    if order == Order::NewestFirst {
        rows.reverse();
    }
    rows.truncate(cap);
    rows
}

/// Keeps the newest event per key; output is newest first.
/// Ties on timestamp go to the later inserted event.
pub fn latest_per_entity<'a, K, F>(
    events: impl IntoIterator<Item = &'a Event>,
    key: F,
) -> Vec<&'a Event>
where
    K: Eq + Hash,
    F: Fn(&Event) -> K,
{
    let mut latest: HashMap<K, &Event> = HashMap::new();
    for e in events {
        match latest.entry(key(e)) {
            Entry::Occupied(mut slot) => {
                if e.recency() > slot.get().recency() {
                    slot.insert(e);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(e);
            }
        }
    }
    let mut out: Vec<&Event> = latest.into_values().collect();
    out.sort_by(|a, b| b.recency().cmp(&a.recency()));
    out
}

/// SQL-style AVG: missing and non-finite values are skipped; `None` when nothing remains.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let mut acc = MeanAcc::default();
    for v in values {
        acc.push(v);
    }
    acc.value()
}

/// Mean rounded to the nearest integer, 0 for empty input.
pub fn rounded_mean(values: impl IntoIterator<Item = Option<f64>>) -> i64 {
    mean(values).map(|m| m.round() as i64).unwrap_or(0)
}

/// COUNT(DISTINCT key); missing keys are not counted.
pub fn distinct_count<K: Eq + Hash>(keys: impl IntoIterator<Item = Option<K>>) -> u64 {
    keys.into_iter().flatten().collect::<HashSet<K>>().len() as u64
}

/// `round(100 * numerator / denominator)` clamped to [0, 100]; 0 when the denominator is 0.
pub fn percentage(numerator: u64, denominator: u64) -> u8 {
    if denominator == 0 {
        return 0;
    }
    let pct = (numerator as f64 * 100.0 / denominator as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Case-insensitive membership test for category columns.
pub fn is_one_of(value: Option<&str>, set: &[&str]) -> bool {
    value.is_some_and(|v| set.iter().any(|s| v.eq_ignore_ascii_case(s)))
}

/// Counts per upper-cased category, skipping events without one.
/// Ordered by count descending, then category name.
pub fn grouped_counts<'a, F>(
    events: impl IntoIterator<Item = &'a Event>,
    key: F,
) -> Vec<(String, u64)>
where
    F: Fn(&Event) -> Option<&str>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for e in events {
        if let Some(k) = key(e) {
            *counts.entry(k.to_ascii_uppercase()).or_default() += 1;
        }
    }
    let mut out: Vec<(String, u64)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// Finite value or 0, for chart fields that must never be null.
pub fn finite_or_zero(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

/// Running mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAcc {
    sum: f64,
    count: u64,
}

impl MeanAcc {
    pub fn push(&mut self, v: Option<f64>) {
        if let Some(v) = v.filter(|x| x.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn value_or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

/// Fixed-width buckets aligned to the epoch (e.g. minute boundaries).
#[derive(Debug, Clone, Copy)]
pub struct Bucketing {
    pub window: Window,
    pub width: TimeDelta,
    pub max_buckets: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<A> {
    pub start: DateTime<Utc>,
    pub acc: A,
}

/// Folds events into contiguous buckets ending with the one that contains `now`.
///
/// Every bucket between the window start and `now` is present, empty ones with
/// `A::default()`. When that span exceeds `max_buckets`, only the most recent
/// `max_buckets` are kept and older events are ignored.
pub fn bucketed<'a, A, F>(
    events: impl IntoIterator<Item = &'a Event>,
    now: DateTime<Utc>,
    bucketing: Bucketing,
    mut fold: F,
) -> Vec<Bucket<A>>
where
    A: Default,
    F: FnMut(&mut A, &Event),
{
    let width_ms = bucketing.width.num_milliseconds();
    if width_ms <= 0 || bucketing.max_buckets == 0 {
        return Vec::new();
    }

    let now_ms = now.timestamp_millis();
    let last_start = floor_to(now_ms, width_ms);
    let first_in_window = bucketing
        .window
        .start(now)
        .map(|s| floor_to(s.timestamp_millis(), width_ms))
        .unwrap_or(last_start);
    let span = ((last_start - first_in_window) / width_ms + 1) as usize;
    let count = span.min(bucketing.max_buckets);
    let first_start = last_start - (count as i64 - 1) * width_ms;

    let mut buckets: Vec<Bucket<A>> = (0..count as i64)
        .map(|i| Bucket {
            start: now - TimeDelta::milliseconds(now_ms - (first_start + i * width_ms)),
            acc: A::default(),
        })
        .collect();

    for e in events {
        if !bucketing.window.contains(now, e.timestamp) {
            continue;
        }
        let offset = floor_to(e.timestamp.timestamp_millis(), width_ms) - first_start;
        if offset < 0 {
            continue;
        }
        if let Some(bucket) = buckets.get_mut((offset / width_ms) as usize) {
            fold(&mut bucket.acc, e);
        }
    }
    buckets
}

fn floor_to(ms: i64, width_ms: i64) -> i64 {
    ms.div_euclid(width_ms) * width_ms
}
