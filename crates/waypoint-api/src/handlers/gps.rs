//! Handlers for the presence and proximity endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/set-user-gps` | Unconditional upsert |
//! | `PUT`  | `/update-user-gps` | 404 if the identity is unknown |
//! | `POST` | `/get-user-gps` | Query params `id`, `resource_type` |
//! | `POST` | `/get-nearby-users` | Full-scan radius query |

use axum::{
  Json,
  extract::{Query, State},
  response::Response,
};
use serde::Deserialize;
use waypoint_core::{
  geo::DistanceUnit,
  presence::PresenceRecord,
  proximity::NearbyQuery,
  store::KvStore,
};

use crate::{AppState, envelope::success, error::ApiError};

// ─── Upsert / update ─────────────────────────────────────────────────────────

/// Request body for `/set-user-gps` and `/update-user-gps`. Coordinates and
/// timestamp are strings, stored verbatim.
#[derive(Debug, Deserialize)]
pub struct UserGps {
  pub resource_type: String,
  pub id:            String,
  pub session_id:    Option<String>,
  pub latitude:      String,
  pub longitude:     String,
  pub timestamp:     String,
}

impl From<UserGps> for PresenceRecord {
  fn from(body: UserGps) -> Self {
    Self {
      resource_type: body.resource_type,
      id:            body.id,
      session_id:    body.session_id,
      latitude:      body.latitude,
      longitude:     body.longitude,
      timestamp:     body.timestamp,
    }
  }
}

/// `POST /set-user-gps`
pub async fn set<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<UserGps>,
) -> Result<Response, ApiError> {
  state.presence.upsert(&body.into()).await?;
  Ok(success(serde_json::json!({})))
}

/// `PUT /update-user-gps` — 404 when no record exists for the identity.
pub async fn update<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<UserGps>,
) -> Result<Response, ApiError> {
  state.presence.update(&body.into()).await?;
  Ok(success(serde_json::json!({})))
}

// ─── Point lookup ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetParams {
  pub id:            String,
  pub resource_type: String,
}

/// `POST /get-user-gps?id=...&resource_type=...`
pub async fn get_one<S: KvStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<GetParams>,
) -> Result<Response, ApiError> {
  let record = state.presence.get(&params.resource_type, &params.id).await?;
  Ok(success(serde_json::to_value(record).map_err(waypoint_core::Error::from)?))
}

// ─── Proximity ───────────────────────────────────────────────────────────────

/// Request body for `/get-nearby-users`. All numerics arrive as strings.
#[derive(Debug, Deserialize)]
pub struct NearbyBody {
  pub resource_type: String,
  pub distance:      String,
  pub longitude:     String,
  pub latitude:      String,
  pub distance_unit: String,
}

/// `POST /get-nearby-users`
pub async fn nearby<S: KvStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NearbyBody>,
) -> Result<Response, ApiError> {
  let unit: DistanceUnit = body.distance_unit.parse().map_err(ApiError::from)?;
  let query = NearbyQuery {
    resource_type: body.resource_type,
    latitude:      parse_number("latitude", &body.latitude)?,
    longitude:     parse_number("longitude", &body.longitude)?,
    radius:        parse_number("distance", &body.distance)?,
    unit,
  };

  let hits = state.proximity.find_nearby(&query).await?;
  Ok(success(serde_json::to_value(hits).map_err(waypoint_core::Error::from)?))
}

fn parse_number(name: &str, raw: &str) -> Result<f64, ApiError> {
  raw
    .trim()
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("{name} is not a number: {raw:?}")))
}
