// Headless polling client: keeps the latest snapshot of each widget and logs every update.
//
//   citypulse-poll [WIDGET ...]      (default: every widget)
//
// On unix, SIGUSR1 marks the consumer hidden and SIGUSR2 visible again (which
// revalidates every widget immediately).

use anyhow::Result;
use citypulse::config::AppConfig;
use citypulse::logging;
use citypulse::poller::{HttpSource, Poller, PollerConfig};
use citypulse::widget::Widget;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init();

    let app_config = AppConfig::load()?;
    let widgets: Vec<Widget> = match std::env::args().skip(1).collect::<Vec<_>>() {
        args if args.is_empty() => Widget::ALL.to_vec(),
        args => args
            .iter()
            .map(|a| a.parse())
            .collect::<Result<Vec<Widget>>>()?,
    };

    let source = Arc::new(HttpSource::new(&app_config.polling.base_url)?);
    let poller = Arc::new(Poller::new(
        source,
        PollerConfig::from(&app_config.polling),
        widgets,
    ));
    tracing::info!(
        base_url = %app_config.polling.base_url,
        interval_ms = app_config.polling.refresh_interval_ms,
        widgets = poller.widgets().count(),
        "Polling started"
    );

    let mut updates = poller.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loops = poller.spawn(shutdown_rx);

    #[cfg(unix)]
    tokio::spawn(watch_visibility_signals(Arc::clone(&poller)));

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => {
                    if let Some(view) = poller.view(update.widget)
                        && let Some(snapshot) = &view.snapshot
                    {
                        tracing::info!(
                            widget = %update.widget,
                            generation = update.generation,
                            "{}",
                            snapshot.summary()
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "update log lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in loops {
        let _ = handle.await;
    }
    for widget in poller.widgets() {
        if let Some(view) = poller.view(widget)
            && view.stale
        {
            tracing::warn!(
                %widget,
                failures = view.consecutive_failures,
                error = view.last_error.as_deref().unwrap_or(""),
                "widget stale at shutdown"
            );
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn watch_visibility_signals(poller: Arc<Poller>) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut hide, mut show) = match (
        signal(SignalKind::user_defined1()),
        signal(SignalKind::user_defined2()),
    ) {
        (Ok(hide), Ok(show)) => (hide, show),
        _ => {
            tracing::warn!("visibility signals unavailable");
            return;
        }
    };
    loop {
        tokio::select! {
            Some(()) = hide.recv() => {
                tracing::info!("consumer hidden; pausing interval refreshes");
                poller.set_visible(false);
            }
            Some(()) = show.recv() => {
                tracing::info!("consumer visible");
                poller.set_visible(true);
            }
            else => break,
        }
    }
}
