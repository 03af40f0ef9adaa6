//! HTTP-facing errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::intake::IntakeError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown config: {name}. Available: {available:?}")]
    UnknownConfig { name: String, available: Vec<String> },

    #[error("Unknown OCR provider: {name}. Available: {available:?}")]
    UnknownProvider { name: String, available: Vec<String> },

    #[error("No files uploaded")]
    NoFiles,

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("Not found")]
    NotFound,

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownConfig { .. }
            | Self::UnknownProvider { .. }
            | Self::NoFiles
            | Self::Multipart(_)
            | Self::Intake(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}
