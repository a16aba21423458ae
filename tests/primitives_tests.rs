// Pure reduction tests: windows, recent lists, latest-per-entity, scalars and buckets

mod common;

use chrono::{TimeDelta, Timelike};
use citypulse::aggregation::primitives::{
    Bucketing, MeanAcc, Window, bucketed, distinct_count, finite_or_zero, grouped_counts,
    is_one_of, latest_per_entity, mean, percentage, recent_list, rounded_mean,
};
use citypulse::event_store::Order;
use citypulse::models::{Event, SensorType};
use common::{fixed_now, mins_ago, secs_ago};

fn traffic(id: i64, ts: chrono::DateTime<chrono::Utc>) -> Event {
    Event::new(id, SensorType::Traffic, ts)
}

#[test]
fn test_window_includes_exact_boundary() {
    let now = fixed_now();
    let window = Window::minutes(30);
    assert!(window.contains(now, mins_ago(now, 30)));
    assert!(window.contains(now, now));
    assert!(!window.contains(now, mins_ago(now, 30) - TimeDelta::seconds(1)));
}

#[test]
fn test_window_excludes_future_events() {
    let now = fixed_now();
    assert!(!Window::minutes(30).contains(now, now + TimeDelta::seconds(1)));
    assert!(!Window::unbounded().contains(now, now + TimeDelta::seconds(1)));
}

#[test]
fn test_unbounded_window_has_no_start() {
    let now = fixed_now();
    let window = Window::unbounded();
    assert_eq!(window.start(now), None);
    assert!(window.contains(now, now - TimeDelta::days(400)));
}

#[test]
fn test_window_query_carries_bounds() {
    let now = fixed_now();
    let q = Window::hours(2).query([SensorType::Incident], now);
    assert_eq!(q.until, now);
    assert_eq!(q.since, Some(now - TimeDelta::hours(2)));
    assert_eq!(q.sensor_types, vec![SensorType::Incident]);
    assert_eq!(Window::unbounded().query([SensorType::Weather], now).since, None);
}

#[test]
fn test_window_select_filters_slice() {
    let now = fixed_now();
    let events = vec![
        traffic(1, mins_ago(now, 31)),
        traffic(2, mins_ago(now, 30)),
        traffic(3, secs_ago(now, 1)),
        traffic(4, now + TimeDelta::minutes(1)),
    ];
    let ids: Vec<i64> = Window::minutes(30).select(&events, now).map(|e| e.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn test_recent_list_oldest_first_keeps_oldest() {
    let now = fixed_now();
    let events: Vec<Event> = (0..25).map(|i| traffic(i, secs_ago(now, 100 - i))).collect();
    let rows = recent_list(&events, 20, Order::OldestFirst);
    assert_eq!(rows.len(), 20);
    assert_eq!(rows[0].id, 0);
    assert_eq!(rows[19].id, 19);
    assert!(rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_recent_list_newest_first_keeps_newest() {
    let now = fixed_now();
    let events: Vec<Event> = (0..8).map(|i| traffic(i, secs_ago(now, 100 - i))).collect();
    let ids: Vec<i64> = recent_list(&events, 5, Order::NewestFirst)
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![7, 6, 5, 4, 3]);
}

#[test]
fn test_recent_list_tiebreak_by_insertion() {
    let now = fixed_now();
    let ts = secs_ago(now, 10);
    let events = vec![traffic(3, ts), traffic(1, ts), traffic(2, ts)];
    let asc: Vec<i64> = recent_list(&events, 10, Order::OldestFirst)
        .iter()
        .map(|e| e.id)
        .collect();
    let desc: Vec<i64> = recent_list(&events, 10, Order::NewestFirst)
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(asc, vec![1, 2, 3]);
    assert_eq!(desc, vec![3, 2, 1]);
}

#[test]
fn test_latest_per_entity_one_row_per_key() {
    let now = fixed_now();
    let mut events = Vec::new();
    for i in 0..60 {
        let mut e = Event::new(i, SensorType::Fleet, secs_ago(now, 600 - i * 7));
        e.vehicle_id = Some(format!("V{}", i % 7));
        events.push(e);
    }
    let latest = latest_per_entity(&events, |e| e.vehicle_id.clone());
    assert_eq!(latest.len(), 7);
    for row in &latest {
        let newest = events
            .iter()
            .filter(|e| e.vehicle_id == row.vehicle_id)
            .map(|e| e.timestamp)
            .max()
            .unwrap();
        assert_eq!(row.timestamp, newest);
    }
    assert!(latest.windows(2).all(|w| w[0].recency() > w[1].recency()));
}

#[test]
fn test_latest_per_entity_tie_goes_to_later_insert() {
    let now = fixed_now();
    let ts = secs_ago(now, 30);
    let mut a = Event::new(10, SensorType::Fleet, ts);
    a.vehicle_id = Some("V1".into());
    a.fuel_mpg = Some(20.0);
    let mut b = Event::new(11, SensorType::Fleet, ts);
    b.vehicle_id = Some("V1".into());
    b.fuel_mpg = Some(30.0);
    let events = vec![b, a];
    let latest = latest_per_entity(&events, |e| e.vehicle_id.clone());
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, 11);
    assert_eq!(latest[0].fuel_mpg, Some(30.0));
}

#[test]
fn test_latest_per_entity_missing_key_is_one_group() {
    let now = fixed_now();
    let events = vec![
        Event::new(1, SensorType::Fleet, secs_ago(now, 20)),
        Event::new(2, SensorType::Fleet, secs_ago(now, 10)),
    ];
    let latest = latest_per_entity(&events, |e| e.vehicle_id.clone());
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, 2);
}

#[test]
fn test_mean_skips_missing_and_non_finite() {
    assert_eq!(mean([Some(20.0), None, Some(f64::NAN), Some(40.0)]), Some(30.0));
    assert_eq!(mean([Some(f64::INFINITY)]), None);
    assert_eq!(mean(std::iter::empty()), None);
}

#[test]
fn test_rounded_mean_defaults_to_zero() {
    assert_eq!(rounded_mean(std::iter::empty()), 0);
    assert_eq!(rounded_mean([None, None]), 0);
    assert_eq!(rounded_mean([Some(41.0), Some(42.0)]), 42);
    assert_eq!(rounded_mean([Some(10.0), Some(10.4)]), 10);
}

#[test]
fn test_mean_acc_value_or_zero() {
    let mut acc = MeanAcc::default();
    assert_eq!(acc.value(), None);
    assert_eq!(acc.value_or_zero(), 0.0);
    acc.push(Some(3.0));
    acc.push(None);
    acc.push(Some(5.0));
    assert_eq!(acc.value(), Some(4.0));
}

#[test]
fn test_distinct_count_ignores_missing() {
    assert_eq!(distinct_count([Some("A"), Some("B"), Some("A"), None]), 2);
    assert_eq!(distinct_count::<&str>([None, None]), 0);
}

#[test]
fn test_percentage_zero_denominator() {
    assert_eq!(percentage(0, 0), 0);
    assert_eq!(percentage(5, 0), 0);
}

#[test]
fn test_percentage_rounds_and_clamps() {
    assert_eq!(percentage(1, 3), 33);
    assert_eq!(percentage(2, 3), 67);
    assert_eq!(percentage(145, 199), 73);
    assert_eq!(percentage(3, 2), 100);
    for d in 1..=50u64 {
        for n in 0..=d {
            let p = percentage(n, d);
            assert!(p <= 100, "{}/{} gave {}", n, d, p);
        }
    }
}

#[test]
fn test_is_one_of_case_insensitive() {
    assert!(is_one_of(Some("critical"), &["HIGH", "CRITICAL"]));
    assert!(is_one_of(Some("High"), &["HIGH", "CRITICAL"]));
    assert!(!is_one_of(Some("LOW"), &["HIGH", "CRITICAL"]));
    assert!(!is_one_of(None, &["HIGH"]));
}

#[test]
fn test_grouped_counts_uppercases_and_orders_by_count() {
    let now = fixed_now();
    let mut events = Vec::new();
    for (i, road) in ["dry", "WET", "wet", "Icy", "DRY", "wet"].into_iter().enumerate() {
        let mut e = Event::new(i as i64, SensorType::Weather, secs_ago(now, 60));
        e.road_condition = Some(road.to_string());
        events.push(e);
    }
    events.push(Event::new(99, SensorType::Weather, secs_ago(now, 60)));

    let counts = grouped_counts(&events, |e| e.road_condition.as_deref());
    assert_eq!(
        counts,
        vec![("WET".to_string(), 3), ("DRY".to_string(), 2), ("ICY".to_string(), 1)]
    );
}

#[test]
fn test_finite_or_zero() {
    assert_eq!(finite_or_zero(Some(1.5)), 1.5);
    assert_eq!(finite_or_zero(None), 0.0);
    assert_eq!(finite_or_zero(Some(f64::NAN)), 0.0);
}

fn minute_buckets(max_buckets: usize) -> Bucketing {
    Bucketing {
        window: Window::minutes(30),
        width: TimeDelta::minutes(1),
        max_buckets,
    }
}

#[test]
fn test_bucketed_is_contiguous_and_capped() {
    let now = fixed_now();
    let none = std::iter::empty::<&Event>();
    let buckets = bucketed(none, now, minute_buckets(30), |n: &mut u32, _| *n += 1);
    assert_eq!(buckets.len(), 30);
    for pair in buckets.windows(2) {
        assert_eq!(pair[1].start - pair[0].start, TimeDelta::minutes(1));
    }
    let last = buckets.last().unwrap();
    assert!(last.start <= now && now < last.start + TimeDelta::minutes(1));
    assert_eq!(last.start.second(), 0);
    assert!(buckets.iter().all(|b| b.acc == 0));
}

#[test]
fn test_bucketed_span_without_cap() {
    let now = fixed_now();
    // 08:00:45 .. 08:30:45 touches 31 minute boundaries
    let none = std::iter::empty::<&Event>();
    let buckets = bucketed(none, now, minute_buckets(100), |_: &mut u32, _| {});
    assert_eq!(buckets.len(), 31);
}

#[test]
fn test_bucketed_places_events_and_drops_outside() {
    let now = fixed_now();
    let events = vec![
        traffic(1, now),
        traffic(2, secs_ago(now, 30)),
        traffic(3, secs_ago(now, 50)),
        traffic(4, mins_ago(now, 29)),
        traffic(5, mins_ago(now, 45)),
        traffic(6, now + TimeDelta::seconds(5)),
    ];
    let buckets = bucketed(&events, now, minute_buckets(30), |ids: &mut Vec<i64>, e| {
        ids.push(e.id)
    });

    let last = &buckets[buckets.len() - 1];
    assert_eq!(last.acc, vec![1, 2]);
    assert_eq!(buckets[buckets.len() - 2].acc, vec![3]);
    assert_eq!(buckets[0].acc, vec![4]);
    let placed: usize = buckets.iter().map(|b| b.acc.len()).sum();
    assert_eq!(placed, 4);
}

#[test]
fn test_bucketed_aligned_now() {
    let now = fixed_now().with_second(0).unwrap();
    for cap in [1usize, 5, 30] {
        let none = std::iter::empty::<&Event>();
        let buckets = bucketed(none, now, minute_buckets(cap), |_: &mut u8, _| {});
        assert_eq!(buckets.len(), cap);
        assert_eq!(buckets.last().unwrap().start, now);
    }
}
