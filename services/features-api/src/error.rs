//! HTTP rendering of [`FeaturesError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use features_protocol::FeaturesError;

/// Handler error; renders the status code and an `{name, message, code}` body.
#[derive(Debug)]
pub struct ApiError(pub FeaturesError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<FeaturesError> for ApiError {
    fn from(error: FeaturesError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }
        (status, Json(self.0.to_exception())).into_response()
    }
}
