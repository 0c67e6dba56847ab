use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::codec::CodecError;
use crate::services::providers::ProviderError;

/// Request-time error for the image endpoints.
///
/// Each variant maps to a stable machine-readable kind in the response
/// body. Pipeline failures (decode, external call, empty result) keep the
/// 500 status the service has always answered with.
#[derive(Debug, Error)]
pub enum FloorError {
    #[error("image decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("external image API error: {0}")]
    ExternalCall(#[from] ProviderError),

    #[error("external image API returned no image parts")]
    EmptyResult,

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl FloorError {
    pub fn kind(&self) -> &'static str {
        match self {
            FloorError::Decode(_) => "decode_error",
            FloorError::ExternalCall(_) => "external_call_error",
            FloorError::EmptyResult => "empty_result",
            FloorError::BadRequest(_) => "bad_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            FloorError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FloorError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
            message: String,
        }

        (
            self.status(),
            Json(ErrorResponse {
                error: self.kind(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
