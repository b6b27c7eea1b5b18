//! Proximity query engine — all presences within a radius of an origin.
//!
//! There is no spatial index: a query is a full scan of the resource type's
//! key partition, one distance computation per record. O(n) in the number of
//! tracked resources of that type, which is a documented scalability ceiling
//! at the scale this system targets, not a bug.

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;

use crate::{
  error::{Error, Result},
  geo::{self, DistanceUnit},
  presence::PresenceRecord,
  store::KvStore,
};

// ─── Query & result types ────────────────────────────────────────────────────

/// Parameters for [`ProximityEngine::find_nearby`].
#[derive(Debug, Clone)]
pub struct NearbyQuery {
  pub resource_type: String,
  pub latitude:      f64,
  pub longitude:     f64,
  /// Radius, expressed in `unit`.
  pub radius:        f64,
  pub unit:          DistanceUnit,
}

/// A presence record that survived the radius filter, annotated with its
/// computed distance from the origin.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyHit {
  #[serde(flatten)]
  pub record:        PresenceRecord,
  /// Distance in `distance_unit`, rounded to two decimals.
  pub distance:      f64,
  pub distance_unit: DistanceUnit,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct ProximityEngine<S> {
  store: Arc<S>,
}

impl<S> Clone for ProximityEngine<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store) }
  }
}

impl<S: KvStore> ProximityEngine<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Return every presence of `query.resource_type` within `query.radius` of
  /// the origin, each annotated with its distance in `query.unit`.
  ///
  /// Results keep scan order; callers must not rely on them being sorted by
  /// distance. Any failure mid-scan (malformed stored coordinate, store
  /// error) fails the whole query with [`Error::QueryFailed`] — no partial
  /// results are returned.
  pub async fn find_nearby(&self, query: &NearbyQuery) -> Result<Vec<NearbyHit>> {
    let pattern = format!("{}:*", query.resource_type);
    let keys = self
      .store
      .scan_keys(&pattern)
      .await
      .map_err(|e| Error::QueryFailed(e.to_string()))?;

    let mut hits = Vec::new();
    let mut seen = HashSet::new();
    for key in keys {
      // A cursor scan may hand back the same key more than once; one hit
      // per record.
      if !seen.insert(key.clone()) {
        continue;
      }
      let value = self
        .store
        .get_field(&key, &query.resource_type)
        .await
        .map_err(|e| Error::QueryFailed(e.to_string()))?
        .ok_or_else(|| {
          Error::QueryFailed(format!("key {key} has no {} field", query.resource_type))
        })?;

      let record: PresenceRecord = serde_json::from_str(&value)
        .map_err(|e| Error::QueryFailed(format!("malformed record at {key}: {e}")))?;

      let lat = parse_coordinate(&key, "latitude", &record.latitude)?;
      let lng = parse_coordinate(&key, "longitude", &record.longitude)?;

      let meters =
        geo::geodesic_meters(query.latitude, query.longitude, lat, lng);
      let distance = geo::round2(query.unit.from_meters(meters));

      if distance <= query.radius {
        hits.push(NearbyHit { record, distance, distance_unit: query.unit });
      }
    }

    Ok(hits)
  }
}

fn parse_coordinate(key: &str, name: &str, raw: &str) -> Result<f64> {
  raw.trim().parse().map_err(|_| {
    Error::QueryFailed(format!("malformed {name} {raw:?} at {key}"))
  })
}
