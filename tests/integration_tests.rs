// Integration tests: snapshot endpoints over HTTP, and the polling client against a live server

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeDelta, Utc};
use citypulse::aggregation::{Aggregator, WidgetSettings};
use citypulse::event_store::{EventStore, SqliteEventStore};
use citypulse::models::{ParkingSnapshot, SensorType, StatsSnapshot};
use citypulse::poller::{FetchError, HttpSource, SnapshotSource};
use citypulse::routes::{self, ErrorEnvelope};
use citypulse::widget::{Widget, WidgetSnapshot};
use common::{TestDb, event, store_options};
use std::sync::Arc;

fn test_app(store: impl EventStore + 'static) -> axum::Router {
    let settings = WidgetSettings {
        ev_total_stations: 32,
        parking: ParkingSnapshot::from_counts(145, 199),
    };
    routes::app(Arc::new(Aggregator::new(Arc::new(store), settings)))
}

fn missing_store(dir: &tempfile::TempDir) -> SqliteEventStore {
    let path = dir.path().join("absent.db");
    SqliteEventStore::open(path.to_str().unwrap(), store_options()).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let db = TestDb::new().await;
    let server = TestServer::new(test_app(db.store())).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("citypulse: operations dashboard backend");
}

#[tokio::test]
async fn test_version_endpoint() {
    let db = TestDb::new().await;
    let server = TestServer::new(test_app(db.store())).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("citypulse"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_widgets_endpoint_lists_every_path() {
    let db = TestDb::new().await;
    let server = TestServer::new(test_app(db.store())).unwrap();
    let json: serde_json::Value = server.get("/widgets").await.json();
    let paths: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["path"].as_str().unwrap())
        .collect();
    let expected: Vec<&str> = Widget::ALL.iter().map(|w| w.path()).collect();
    assert_eq!(paths, expected);
}

#[tokio::test]
async fn test_every_widget_endpoint_ok_and_uncached() {
    let db = TestDb::new().await;
    let server = TestServer::new(test_app(db.store())).unwrap();

    for widget in Widget::ALL {
        let response = server.get(widget.path()).await;
        response.assert_status_ok();
        let cache = response.header("cache-control");
        let cache = cache.to_str().unwrap();
        assert!(cache.contains("no-store"), "{}: {}", widget, cache);
        assert!(cache.contains("max-age=0"), "{}: {}", widget, cache);
        // The body decodes as this widget's shape.
        let body = response.as_bytes();
        let snapshot = widget.decode(body).unwrap();
        assert_eq!(snapshot.widget(), widget);
    }
}

#[tokio::test]
async fn test_parking_endpoint_body() {
    let db = TestDb::new().await;
    let server = TestServer::new(test_app(db.store())).unwrap();
    let json: serde_json::Value = server.get("/parking").await.json();
    assert_eq!(
        json,
        serde_json::json!({"occupied": 145, "available": 54, "total": 199, "percentage": 73})
    );
}

#[tokio::test]
async fn test_stats_endpoint_reflects_recent_events() {
    let db = TestDb::new().await;
    let now = Utc::now();
    let mut high = event(SensorType::Incident, now - TimeDelta::minutes(5));
    high.severity = Some("HIGH".into());
    let mut low = event(SensorType::Incident, now - TimeDelta::minutes(5));
    low.severity = Some("LOW".into());
    let mut bus = event(SensorType::Fleet, now - TimeDelta::minutes(1));
    bus.vehicle_id = Some("BUS-3".into());
    bus.is_online = Some(true);
    db.insert_all(&[high, low, bus]).await;

    let server = TestServer::new(test_app(db.store())).unwrap();
    let stats: StatsSnapshot = server.get("/stats").await.json();
    assert_eq!(
        stats,
        StatsSnapshot {
            incidents: 1,
            fleet_online: 1,
            train_faults: 0,
            ev_usage: 0,
        }
    );
}

#[tokio::test]
async fn test_weather_endpoint_uses_road30m_key() {
    let db = TestDb::new().await;
    let mut e = event(SensorType::Weather, Utc::now() - TimeDelta::minutes(2));
    e.road_condition = Some("wet".into());
    e.condition = Some("RAIN".into());
    db.insert(&e).await;

    let server = TestServer::new(test_app(db.store())).unwrap();
    let json: serde_json::Value = server.get("/weather").await.json();
    assert_eq!(json["road30m"], serde_json::json!([{"roadCondition": "WET", "cnt": 1}]));
    assert_eq!(json["latest"]["condition"], "RAIN");
}

#[tokio::test]
async fn test_store_failure_returns_generic_envelope() {
    let dir = tempfile::TempDir::new().unwrap();
    let server = TestServer::new(test_app(missing_store(&dir))).unwrap();

    let response = server.get("/congestion").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorEnvelope = response.json();
    assert_eq!(body.error, "Failed to fetch congestion");

    let response = server.get("/ev-charging").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let text = response.text();
    assert_eq!(text, r#"{"error":"Failed to fetch EV data"}"#);
    assert!(!text.contains("sqlite"));
}

#[tokio::test]
async fn test_failure_is_isolated_per_endpoint() {
    let dir = tempfile::TempDir::new().unwrap();
    let server = TestServer::new(test_app(missing_store(&dir))).unwrap();

    server
        .get("/fleet")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    server.get("/parking").await.assert_status_ok();
    server.get("/widgets").await.assert_status_ok();
}

#[tokio::test]
async fn test_concurrent_requests_share_store() {
    let db = TestDb::new().await;
    let server = Arc::new(TestServer::new(test_app(db.store())).unwrap());

    let requests = Widget::ALL.into_iter().chain(Widget::ALL).map(|widget| {
        let server = Arc::clone(&server);
        async move { server.get(widget.path()).await.status_code() }
    });
    for status in futures_util::future::join_all(requests).await {
        assert_eq!(status, StatusCode::OK);
    }
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_http_source_decodes_live_snapshot() {
    let db = TestDb::new().await;
    let base_url = serve(test_app(db.store())).await;
    let source = HttpSource::new(&base_url).unwrap();

    let snapshot = source.fetch(Widget::Parking).await.unwrap();
    assert_eq!(
        snapshot,
        WidgetSnapshot::Parking(ParkingSnapshot::from_counts(145, 199))
    );
    let snapshot = source.fetch(Widget::Overview).await.unwrap();
    assert_eq!(snapshot.widget(), Widget::Overview);
}

#[tokio::test]
async fn test_http_source_surfaces_error_envelope() {
    let dir = tempfile::TempDir::new().unwrap();
    let base_url = serve(test_app(missing_store(&dir))).await;
    let source = HttpSource::new(&base_url).unwrap();

    match source.fetch(Widget::Incidents).await {
        Err(FetchError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to fetch incidents");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_source_unreachable_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let source = HttpSource::new(&format!("http://{}", addr)).unwrap();

    let err = source.fetch(Widget::Stats).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "got {:?}", err);
}
