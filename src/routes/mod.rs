// HTTP routes: read-only, uncached snapshot endpoints

mod error;
mod http;

pub use error::{ApiError, ErrorEnvelope};

use axum::http::{HeaderValue, header};
use axum::{Router, extract::State, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::aggregation::Aggregator;
use crate::widget::Widget;

const NO_STORE: &str = "no-store, max-age=0, must-revalidate";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: Arc<Aggregator>,
}

pub fn app(aggregator: Arc<Aggregator>) -> Router {
    let state = AppState { aggregator };
    let mut router: Router<AppState> = Router::new()
        .route("/", get(|| async { "citypulse: operations dashboard backend" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/widgets", get(http::widgets_handler)); // GET /widgets
    for widget in Widget::ALL {
        router = router.route(
            widget.path(),
            get(move |state: State<AppState>| http::snapshot_handler(state, widget)),
        );
    }
    router
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_STORE),
        ))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
