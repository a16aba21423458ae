use anyhow::Result;
use citypulse::aggregation::{Aggregator, WidgetSettings};
use citypulse::event_store::{EventStore, SqliteEventStore, StoreOptions};
use citypulse::models::ParkingSnapshot;
use citypulse::{config, logging, routes};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let app_config = config::AppConfig::load()?;

    // The pool is established by the first snapshot request, not here.
    let sqlite = Arc::new(SqliteEventStore::open(
        &app_config.database.path,
        StoreOptions {
            max_connections: app_config.database.max_pool_size,
            acquire_timeout: Duration::from_millis(app_config.database.acquire_timeout_ms),
        },
    )?);
    let store: Arc<dyn EventStore> = sqlite.clone();
    let settings = WidgetSettings {
        ev_total_stations: app_config.widgets.ev_total_stations,
        parking: ParkingSnapshot::from_counts(
            app_config.widgets.parking_occupied,
            app_config.widgets.parking_total,
        ),
    };
    let aggregator = Arc::new(Aggregator::new(store, settings));

    let app = routes::app(aggregator);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        database = %app_config.database.path,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!(store_connected = sqlite.is_connected(), "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Received shutdown signal");
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}
