//! The response envelope shared by every endpoint.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{"message": ..., "data": ..., "status_code": ...}`
///
/// `status_code` repeats the HTTP status in the body; some upstream callers
/// only look there.
#[derive(Debug, Serialize)]
pub struct Envelope {
  pub message:     String,
  pub data:        serde_json::Value,
  pub status_code: u16,
}

impl Envelope {
  pub fn into_response(self, status: StatusCode) -> Response {
    (status, Json(self)).into_response()
  }
}

/// A 200 envelope with `message: "Success"`.
pub fn success(data: serde_json::Value) -> Response {
  Envelope {
    message:     "Success".to_owned(),
    data,
    status_code: StatusCode::OK.as_u16(),
  }
  .into_response(StatusCode::OK)
}
