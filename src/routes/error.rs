// Uniform failure envelope: 500 with a generic message; details stay in the server log

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationError;

/// Body of every non-2xx snapshot response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Aggregation(e) => {
                tracing::error!(
                    widget = %e.widget,
                    error = %e.source,
                    "aggregation failed"
                );
                let body = ErrorEnvelope {
                    error: e.widget.failure_message().to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
