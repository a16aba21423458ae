// One aggregation per widget: windowed store reads reduced with the primitives.
// Each function depends only on (store, now); store faults surface as AggregationError.

use chrono::{DateTime, TimeDelta, Utc};

use super::primitives::{
    Bucketing, MeanAcc, Window, bucketed, distinct_count, finite_or_zero, grouped_counts,
    is_one_of, latest_per_entity, mean, percentage, recent_list, rounded_mean,
};
use super::{AggregationError, unavailable};
use crate::event_store::{EventStore, Order};
use crate::models::{
    CongestionPoint, EvChargingSnapshot, EvReading, Event, FleetSnapshot, IncidentRow,
    IncidentSummary, LocationRow, OverviewBucket, RoadConditionCount, SensorType, SeverityCount,
    StationAvailability, StatsSnapshot, WeatherReading, WeatherSnapshot,
};
use crate::widget::Widget;

const CONGESTION_CAP: u32 = 20;
const EV_READINGS_CAP: u32 = 10;
const INCIDENT_LIST_CAP: u32 = 5;
const OVERVIEW_MAX_BUCKETS: usize = 30;

const HIGH_SEVERITIES: [&str; 2] = ["HIGH", "CRITICAL"];
const HEALTH_ALERT_STATUSES: [&str; 2] = ["WARNING", "ALERT"];
const MAP_SENSOR_TYPES: [SensorType; 4] = [
    SensorType::Incident,
    SensorType::Fleet,
    SensorType::Ev,
    SensorType::Bus,
];
/// Decimal places kept when a coordinate pair stands in for a missing entity id.
const COORDINATE_KEY_PRECISION: usize = 5;

/// Traffic density over the last 30 minutes: oldest 20 readings, ascending.
pub async fn congestion(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<Vec<CongestionPoint>, AggregationError> {
    let window = Window::minutes(30);
    let events = store
        .events(&window.query([SensorType::Traffic], now).limit(CONGESTION_CAP))
        .await
        .map_err(unavailable(Widget::Congestion))?;

    Ok(recent_list(
        window.select(&events, now),
        CONGESTION_CAP as usize,
        Order::OldestFirst,
    )
    .into_iter()
    .map(|e| CongestionPoint {
        timestamp: e.timestamp,
        traffic_density: finite_or_zero(e.traffic_density),
    })
    .collect())
}

/// Charger output over 20 minutes plus stations reporting available in the last 5.
pub async fn ev_charging(
    store: &dyn EventStore,
    now: DateTime<Utc>,
    total_stations: u64,
) -> Result<EvChargingSnapshot, AggregationError> {
    let readings_window = Window::minutes(20);
    let availability_window = Window::minutes(5);
    let readings_query = readings_window
        .query([SensorType::Ev], now)
        .limit(EV_READINGS_CAP);
    let availability_query = availability_window.query([SensorType::Ev], now);

    let (readings, availability) = tokio::try_join!(
        store.events(&readings_query),
        store.events(&availability_query),
    )
    .map_err(unavailable(Widget::EvCharging))?;

    let data = recent_list(
        readings_window.select(&readings, now),
        EV_READINGS_CAP as usize,
        Order::OldestFirst,
    )
    .into_iter()
    .map(|e| EvReading {
        timestamp: e.timestamp,
        current_kw: finite_or_zero(e.current_kw),
    })
    .collect();

    let available = distinct_count(
        availability_window
            .select(&availability, now)
            .filter(|e| e.ev_is_available == Some(true))
            .map(|e| e.station_id.as_deref()),
    );

    Ok(EvChargingSnapshot {
        data,
        stations: StationAvailability {
            available,
            total: total_stations,
        },
    })
}

/// Latest reading per vehicle in the last 10 minutes, then fuel, idle and health figures.
pub async fn fleet(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<FleetSnapshot, AggregationError> {
    let window = Window::minutes(10);
    let events = store
        .events(&window.query([SensorType::Fleet], now))
        .await
        .map_err(unavailable(Widget::Fleet))?;

    let latest = latest_per_entity(window.select(&events, now), |e| e.vehicle_id.clone());

    Ok(FleetSnapshot {
        avg_fuel_mpg: mean(latest.iter().map(|e| e.fuel_mpg)).unwrap_or(0.0),
        idle_vehicles: latest
            .iter()
            .filter(|e| e.is_online == Some(false))
            .count() as u64,
        health_alerts: latest
            .iter()
            .filter(|e| is_one_of(e.health_status.as_deref(), &HEALTH_ALERT_STATUSES))
            .count() as u64,
    })
}

/// Five most recent incidents in the last 2 hours, newest first.
pub async fn incidents(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<Vec<IncidentRow>, AggregationError> {
    let window = Window::hours(2);
    let events = store
        .events(
            &window
                .query([SensorType::Incident], now)
                .order(Order::NewestFirst)
                .limit(INCIDENT_LIST_CAP),
        )
        .await
        .map_err(unavailable(Widget::Incidents))?;

    Ok(recent_list(
        window.select(&events, now),
        INCIDENT_LIST_CAP as usize,
        Order::NewestFirst,
    )
    .into_iter()
    .map(|e| IncidentRow {
        incident_location: e.incident_location.clone(),
        severity: e.severity.clone(),
        incident_type: e.incident_type.clone(),
        timestamp: e.timestamp,
        latitude: e.latitude,
        longitude: e.longitude,
    })
    .collect())
}

/// Severity breakdown and lane-blocked share over the last 2 hours.
pub async fn incident_summary(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<IncidentSummary, AggregationError> {
    let window = Window::hours(2);
    let events = store
        .events(&window.query([SensorType::Incident], now))
        .await
        .map_err(unavailable(Widget::IncidentSummary))?;

    let in_window: Vec<&Event> = window.select(&events, now).collect();
    let severity = grouped_counts(in_window.iter().copied(), |e| e.severity.as_deref())
        .into_iter()
        .map(|(severity, cnt)| SeverityCount { severity, cnt })
        .collect();
    let lane_blocked = in_window
        .iter()
        .filter(|e| e.lane_blocked == Some(true))
        .count() as u64;

    Ok(IncidentSummary {
        severity,
        lane_blocked_pct: percentage(lane_blocked, in_window.len() as u64),
    })
}

/// Latest position per map entity over the last 10 minutes.
pub async fn locations(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<Vec<LocationRow>, AggregationError> {
    let window = Window::minutes(10);
    let events = store
        .events(&window.query(MAP_SENSOR_TYPES, now).with_coordinates())
        .await
        .map_err(unavailable(Widget::Locations))?;

    let latest = latest_per_entity(
        window.select(&events, now).filter(|e| e.coordinates().is_some()),
        |e| (e.sensor_type.clone(), location_key(e)),
    );

    Ok(latest
        .into_iter()
        .filter_map(|e| {
            let (latitude, longitude) = e.coordinates()?;
            Some(LocationRow {
                sensor_type: e.sensor_type.clone(),
                latitude,
                longitude,
                incident_location: e.incident_location.clone(),
                severity: e.severity.clone(),
                vehicle_id: e.vehicle_id.clone(),
                station_id: e.station_id.clone(),
            })
        })
        .collect())
}

/// Entity key for the map feed: vehicle id, else station id, else the rounded
/// coordinate pair. A heuristic: two distinct entities at the same rounded
/// position without ids collapse into one point.
pub fn location_key(e: &Event) -> String {
    if let Some(id) = &e.vehicle_id {
        return id.clone();
    }
    if let Some(id) = &e.station_id {
        return id.clone();
    }
    match e.coordinates() {
        Some((lat, lon)) => format!(
            "{:.prec$},{:.prec$}",
            lat,
            lon,
            prec = COORDINATE_KEY_PRECISION
        ),
        None => String::new(),
    }
}

#[derive(Default)]
struct PulseAcc {
    traffic_density: MeanAcc,
    speed: MeanAcc,
    bus_occupancy: MeanAcc,
    incidents: u64,
}

/// Per-minute pulse over the last 30 minutes: traffic density and speed, bus
/// occupancy and incident count, one contiguous bucket per minute.
pub async fn overview(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<Vec<OverviewBucket>, AggregationError> {
    let window = Window::minutes(30);
    let events = store
        .events(&window.query(
            [SensorType::Traffic, SensorType::Bus, SensorType::Incident],
            now,
        ))
        .await
        .map_err(unavailable(Widget::Overview))?;

    let bucketing = Bucketing {
        window,
        width: TimeDelta::minutes(1),
        max_buckets: OVERVIEW_MAX_BUCKETS,
    };
    let buckets = bucketed(&events, now, bucketing, |acc: &mut PulseAcc, e| {
        match e.sensor_type {
            SensorType::Traffic => {
                acc.traffic_density.push(e.traffic_density);
                acc.speed.push(e.avg_speed);
            }
            SensorType::Bus => acc.bus_occupancy.push(e.occupancy),
            SensorType::Incident => acc.incidents += 1,
            _ => {}
        }
    });

    Ok(buckets
        .into_iter()
        .map(|b| OverviewBucket {
            bucket: b.start,
            avg_traffic_density: b.acc.traffic_density.value_or_zero(),
            avg_speed: b.acc.speed.value_or_zero(),
            avg_bus_occupancy: b.acc.bus_occupancy.value_or_zero(),
            incident_count: b.acc.incidents,
        })
        .collect())
}

/// Header counters, each with its own type, filter and window.
pub async fn stats(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<StatsSnapshot, AggregationError> {
    let incident_window = Window::hours(1);
    let fleet_window = Window::minutes(5);
    let train_window = Window::hours(1);
    let ev_window = Window::minutes(10);

    let incident_query = incident_window.query([SensorType::Incident], now);
    let fleet_query = fleet_window.query([SensorType::Fleet], now);
    let train_query = train_window.query([SensorType::Train], now);
    let ev_query = ev_window.query([SensorType::Ev], now);

    let (incident_events, fleet_events, train_events, ev_events) = tokio::try_join!(
        store.events(&incident_query),
        store.events(&fleet_query),
        store.events(&train_query),
        store.events(&ev_query),
    )
    .map_err(unavailable(Widget::Stats))?;

    Ok(StatsSnapshot {
        incidents: incident_window
            .select(&incident_events, now)
            .filter(|e| is_one_of(e.severity.as_deref(), &HIGH_SEVERITIES))
            .count() as u64,
        fleet_online: distinct_count(
            fleet_window
                .select(&fleet_events, now)
                .filter(|e| e.is_online == Some(true))
                .map(|e| e.vehicle_id.as_deref()),
        ),
        train_faults: distinct_count(
            train_window
                .select(&train_events, now)
                .filter(|e| e.has_fault == Some(true))
                .map(|e| e.train_id.as_deref()),
        ),
        ev_usage: rounded_mean(ev_window.select(&ev_events, now).map(|e| e.charger_load)),
    })
}

/// Latest weather reading (any age) and road-condition counts over 30 minutes.
pub async fn weather(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<WeatherSnapshot, AggregationError> {
    let latest_window = Window::unbounded();
    let road_window = Window::minutes(30);
    let latest_query = latest_window
        .query([SensorType::Weather], now)
        .order(Order::NewestFirst)
        .limit(1);
    let road_query = road_window.query([SensorType::Weather], now);

    let (latest, road) = tokio::try_join!(
        store.events(&latest_query),
        store.events(&road_query),
    )
    .map_err(unavailable(Widget::Weather))?;

    let latest = recent_list(latest_window.select(&latest, now), 1, Order::NewestFirst)
        .first()
        .map(|e| WeatherReading {
            timestamp: e.timestamp,
            condition: e.condition.clone(),
            road_condition: e.road_condition.clone(),
            temperature: e.temperature.filter(|t| t.is_finite()),
            visibility: e.visibility.filter(|v| v.is_finite()),
        });

    let road_30m = grouped_counts(road_window.select(&road, now), |e| {
        e.road_condition.as_deref()
    })
    .into_iter()
    .map(|(road_condition, cnt)| RoadConditionCount {
        road_condition,
        cnt,
    })
    .collect();

    Ok(WeatherSnapshot { latest, road_30m })
}
