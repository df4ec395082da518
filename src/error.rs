use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// One feed feature could not be turned into a marker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRecordError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unreadable feature: {0}")]
    Unreadable(String),
}

impl MalformedRecordError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { field, reason: reason.into() }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing(field) | Self::Invalid { field, .. } => field,
            Self::Unreadable(_) => "feature",
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedFailure {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),

    #[error("body is not a GeoJSON feature collection: {0}")]
    Decode(String),
}

/// The feed could not be fetched; nothing can be drawn for this pass.
#[derive(Debug, Error)]
#[error("earthquake feed {url} unavailable after {attempts} attempt(s): {reason}")]
pub struct FeedUnavailableError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub reason: FeedFailure,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("marker at ({latitude}, {longitude}) has no drawable position")]
    Position { latitude: f64, longitude: f64 },

    #[error("marker radius {0} is not drawable")]
    Radius(f64),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Feed(#[from] FeedUnavailableError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("tile upstream: {0}")]
    TileUpstream(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Feed(_) => (StatusCode::BAD_GATEWAY, "FEED_UNAVAILABLE"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::TileUpstream(_) => (StatusCode::BAD_GATEWAY, "TILE_UPSTREAM"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let message = match &self {
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
