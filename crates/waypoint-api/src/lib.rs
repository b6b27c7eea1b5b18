//! JSON HTTP API for Waypoint.
//!
//! Exposes an axum [`Router`] backed by any [`waypoint_core::store::KvStore`].
//! Every endpoint answers with the envelope
//! `{"message": ..., "data": ..., "status_code": ...}`.

pub mod envelope;
pub mod error;
pub mod handlers;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{post, put},
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use waypoint_core::{
  autocomplete::AutocompleteIndex,
  presence::PresenceStore,
  proximity::ProximityEngine,
  ranking::TermRankingIndex,
  store::KvStore,
};

pub use error::ApiError;

use handlers::{autocomplete, gps, terms};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `WAYPOINT_*` environment overrides. Every field has a default so the
/// server also starts bare.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_redis_url")]
  pub redis_url:          String,
  /// Applied to connect, read, and write on every store round trip.
  #[serde(default = "default_redis_timeout")]
  pub redis_timeout_secs: u64,
}

fn default_host() -> String {
  "0.0.0.0".to_owned()
}
fn default_port() -> u16 {
  8080
}
fn default_redis_url() -> String {
  "redis://127.0.0.1/".to_owned()
}
fn default_redis_timeout() -> u64 {
  5
}

impl ServerConfig {
  pub fn redis_timeout(&self) -> Duration {
    Duration::from_secs(self.redis_timeout_secs)
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers: the four engines, all
/// over one store handle.
pub struct AppState<S> {
  pub presence:     PresenceStore<S>,
  pub proximity:    ProximityEngine<S>,
  pub ranking:      TermRankingIndex<S>,
  pub autocomplete: AutocompleteIndex<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      presence:     self.presence.clone(),
      proximity:    self.proximity.clone(),
      ranking:      self.ranking.clone(),
      autocomplete: self.autocomplete.clone(),
    }
  }
}

impl<S: KvStore> AppState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      presence:     PresenceStore::new(Arc::clone(&store)),
      proximity:    ProximityEngine::new(Arc::clone(&store)),
      ranking:      TermRankingIndex::new(Arc::clone(&store)),
      autocomplete: AutocompleteIndex::new(store),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the Waypoint [`Router`]. CORS is wide open, matching the upstream
/// callers this service fronts.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: KvStore + 'static,
{
  Router::new()
    // Presence
    .route("/set-user-gps", post(gps::set::<S>))
    .route("/update-user-gps", put(gps::update::<S>))
    .route("/get-user-gps", post(gps::get_one::<S>))
    .route("/get-nearby-users", post(gps::nearby::<S>))
    // Term ranking
    .route("/save-terms", post(terms::save_phrase::<S>))
    .route("/save-search-terms", post(terms::save::<S>))
    .route("/get-search-terms", post(terms::top::<S>))
    .route("/get-general-search-terms", post(terms::top_general::<S>))
    // Autocomplete
    .route("/set-auto-complete-term", post(autocomplete::record::<S>))
    .route("/get-auto-complete-term", post(autocomplete::suggest::<S>))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
