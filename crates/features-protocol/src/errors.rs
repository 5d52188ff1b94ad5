//! Features API error types.

use thiserror::Error;

use crate::responses::ExceptionResponse;

/// Errors raised while translating or serving a Features request.
///
/// Every failure maps to one of three outcomes on the wire; the message is
/// surfaced verbatim in the exception body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeaturesError {
    /// Malformed or unsupported request input.
    #[error("{0}")]
    BadRequest(String),

    /// Unknown collection, filter or feature.
    #[error("{0}")]
    NotFound(String),

    /// Failure of a collaborator (backend, catalog) or of the service itself.
    #[error("{0}")]
    GeneralError(String),
}

impl FeaturesError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        FeaturesError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        FeaturesError::NotFound(msg.into())
    }

    pub fn general(msg: impl Into<String>) -> Self {
        FeaturesError::GeneralError(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            FeaturesError::BadRequest(_) => 400,
            FeaturesError::NotFound(_) => 404,
            FeaturesError::GeneralError(_) => 500,
        }
    }

    /// Error class name as rendered in the exception body.
    pub fn name(&self) -> &'static str {
        match self {
            FeaturesError::BadRequest(_) => "BadRequest",
            FeaturesError::NotFound(_) => "NotFound",
            FeaturesError::GeneralError(_) => "GeneralError",
        }
    }

    /// Convert to an ExceptionResponse.
    pub fn to_exception(&self) -> ExceptionResponse {
        ExceptionResponse::new(self.name(), self.status_code(), self.to_string())
    }
}
