//! HTTP error responses for web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::warn;

use crate::domain::error::DipbuyerError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &DipbuyerError) -> StatusCode {
    match err {
        DipbuyerError::ConfigMissing { .. }
        | DipbuyerError::ConfigInvalid { .. }
        | DipbuyerError::ConfigParse { .. } => StatusCode::BAD_REQUEST,
        DipbuyerError::SheetNameCollision { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DipbuyerError::Fetch(_) => StatusCode::BAD_GATEWAY,
        DipbuyerError::Report { .. } | DipbuyerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DipbuyerError> for WebError {
    fn from(err: DipbuyerError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), "request failed: {}", self.message);
        }
        let template = super::templates::ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}
