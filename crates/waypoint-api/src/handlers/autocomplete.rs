//! Handlers for the autocomplete endpoints. Both take query parameters, not a
//! body.

use axum::{
  extract::{Query, State},
  response::Response,
};
use serde::Deserialize;
use waypoint_core::{autocomplete::SUGGESTION_LIMIT, store::KvStore};

use crate::{AppState, envelope::success, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TermParams {
  pub term:        String,
  pub search_type: String,
}

/// `POST /set-auto-complete-term?term=...&search_type=...`
pub async fn record<S: KvStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<TermParams>,
) -> Result<Response, ApiError> {
  state
    .autocomplete
    .record(&params.term, &params.search_type)
    .await?;
  Ok(success(serde_json::json!({})))
}

/// `POST /get-auto-complete-term?term=...&search_type=...`
pub async fn suggest<S: KvStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<TermParams>,
) -> Result<Response, ApiError> {
  let terms = state
    .autocomplete
    .suggest(&params.term, &params.search_type, SUGGESTION_LIMIT)
    .await?;
  Ok(success(serde_json::to_value(terms).map_err(waypoint_core::Error::from)?))
}
