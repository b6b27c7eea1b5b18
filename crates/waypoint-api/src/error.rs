//! API error type and its [`IntoResponse`] mapping.
//!
//! Legitimate misses stay 404 while operational failures (lost increments,
//! failed scans, store errors) surface as 500 — they are not folded into
//! "no data found".

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::envelope::Envelope;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("no data found")]
  NotFound,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(#[source] waypoint_core::Error),
}

impl From<waypoint_core::Error> for ApiError {
  fn from(e: waypoint_core::Error) -> Self {
    match e {
      waypoint_core::Error::NotFound => Self::NotFound,
      waypoint_core::Error::InvalidInput(m) => Self::BadRequest(m),
      other => Self::Internal(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound => (StatusCode::NOT_FOUND, "No data found".to_owned()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "something went wrong. try again later.".to_owned(),
        )
      }
    };

    Envelope {
      message,
      data: serde_json::json!({}),
      status_code: status.as_u16(),
    }
    .into_response(status)
  }
}
