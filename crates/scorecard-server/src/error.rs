use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scorecard_common::error::CommonError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("invalid feed: {0}")]
    Feed(#[from] rss::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Feed(_) => StatusCode::BAD_GATEWAY,
            AppError::Common(e) => match e {
                CommonError::Upstream { .. }
                | CommonError::Request(_)
                | CommonError::InvalidJson(_) => StatusCode::BAD_GATEWAY,
                CommonError::Io { .. }
                | CommonError::SourceStatus { .. }
                | CommonError::Csv { .. }
                | CommonError::MissingColumn { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Common(CommonError::Upstream { status, .. }) => {
                format!("upstream service returned status {status}")
            }
            AppError::Common(CommonError::Request(e)) => match e.status() {
                Some(status) => format!("upstream service returned status {}", status.as_u16()),
                None => "upstream service unreachable".to_string(),
            },
            AppError::Common(CommonError::InvalidJson(_)) | AppError::Feed(_) => {
                "invalid response from upstream service".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = status.as_u16(), "request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
