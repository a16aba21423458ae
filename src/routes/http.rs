// GET handlers: version, widget inventory and one snapshot endpoint per widget

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;

use super::AppState;
use super::error::ApiError;
use crate::widget::{Widget, WidgetSnapshot};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Serialize)]
struct WidgetEntry {
    name: &'static str,
    path: &'static str,
}

/// GET /widgets: the snapshot endpoints this server exposes.
pub(super) async fn widgets_handler() -> impl IntoResponse {
    let entries: Vec<WidgetEntry> = Widget::ALL
        .into_iter()
        .map(|w| WidgetEntry {
            name: w.name(),
            path: w.path(),
        })
        .collect();
    Json(entries)
}

/// GET /<widget>: snapshot computed against the current time.
pub(super) async fn snapshot_handler(
    State(state): State<AppState>,
    widget: Widget,
) -> Result<Json<WidgetSnapshot>, ApiError> {
    let snapshot = state.aggregator.snapshot(widget, Utc::now()).await?;
    Ok(Json(snapshot))
}
