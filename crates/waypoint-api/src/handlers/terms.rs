//! Handlers for the term-ranking endpoints.

use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use waypoint_core::{ranking::PhraseEvent, store::KvStore};

use crate::{AppState, envelope::success, error::ApiError};

// ─── Phrase log ──────────────────────────────────────────────────────────────

/// `POST /save-terms` — log a raw search phrase event.
pub async fn save_phrase<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<PhraseEvent>,
) -> Result<Response, ApiError> {
  state.ranking.log_phrase(&body).await?;
  Ok(success(serde_json::json!({})))
}

// ─── Counters ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SaveSearchTerm {
  pub term:        String,
  pub search_type: String,
}

/// `POST /save-search-terms` — one observation of `(term, search_type)`.
pub async fn save<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<SaveSearchTerm>,
) -> Result<Response, ApiError> {
  state.ranking.save(&body.term, &body.search_type).await?;
  Ok(success(serde_json::json!({})))
}

// ─── Retrieval ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetSearchTerm {
  pub term:          String,
  pub search_type:   String,
  pub search_length: usize,
}

/// `POST /get-search-terms` — top counters for a category, count-descending.
pub async fn top<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<GetSearchTerm>,
) -> Result<Response, ApiError> {
  let counts = state
    .ranking
    .top_terms(&body.term, &body.search_type, body.search_length)
    .await?;
  Ok(success(serde_json::to_value(counts).map_err(waypoint_core::Error::from)?))
}

#[derive(Debug, Deserialize)]
pub struct GetGeneralTerm {
  pub term:          String,
  pub search_length: usize,
}

/// `POST /get-general-search-terms` — top cross-category aggregates.
pub async fn top_general<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<GetGeneralTerm>,
) -> Result<Response, ApiError> {
  let counts = state
    .ranking
    .top_general_terms(&body.term, body.search_length)
    .await?;
  Ok(success(serde_json::to_value(counts).map_err(waypoint_core::Error::from)?))
}
