//! Engine tests against [`MemoryStore`].

use std::{
  convert::Infallible,
  sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  },
};

use crate::{
  Error,
  autocomplete::{AutocompleteIndex, SUGGESTION_LIMIT},
  geo::DistanceUnit,
  memory::MemoryStore,
  presence::{PresenceRecord, PresenceStore},
  proximity::{NearbyQuery, ProximityEngine},
  ranking::{MAX_INCREMENT_RETRIES, PhraseEvent, TermRankingIndex},
  store::KvStore,
};

fn store() -> Arc<MemoryStore> {
  Arc::new(MemoryStore::new())
}

/// Wraps a store and returns every scanned key twice, like a cursor scan
/// revisiting a slot mid-iteration.
struct DoubledScan(MemoryStore);

impl KvStore for DoubledScan {
  type Error = Infallible;

  async fn ping(&self) -> Result<(), Infallible> {
    self.0.ping().await
  }

  async fn set_field(
    &self,
    key: &str,
    field: &str,
    value: &str,
  ) -> Result<(), Infallible> {
    self.0.set_field(key, field, value).await
  }

  async fn get_field(
    &self,
    key: &str,
    field: &str,
  ) -> Result<Option<String>, Infallible> {
    self.0.get_field(key, field).await
  }

  async fn set_field_checked(
    &self,
    key: &str,
    field: &str,
    expected: Option<&str>,
    value: &str,
  ) -> Result<bool, Infallible> {
    self.0.set_field_checked(key, field, expected, value).await
  }

  async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, Infallible> {
    let keys = self.0.scan_keys(pattern).await?;
    Ok(keys.into_iter().flat_map(|k| [k.clone(), k]).collect())
  }

  async fn ranked_incr(
    &self,
    bucket: &str,
    member: &str,
    delta: f64,
  ) -> Result<f64, Infallible> {
    self.0.ranked_incr(bucket, member, delta).await
  }

  async fn ranked_scan(
    &self,
    bucket: &str,
    pattern: &str,
  ) -> Result<Vec<(String, f64)>, Infallible> {
    self.0.ranked_scan(bucket, pattern).await
  }
}

/// A store whose compare-and-set always loses its race.
struct AlwaysContended {
  inner:    MemoryStore,
  attempts: AtomicU32,
}

impl KvStore for AlwaysContended {
  type Error = Infallible;

  async fn ping(&self) -> Result<(), Infallible> {
    self.inner.ping().await
  }

  async fn set_field(
    &self,
    key: &str,
    field: &str,
    value: &str,
  ) -> Result<(), Infallible> {
    self.inner.set_field(key, field, value).await
  }

  async fn get_field(
    &self,
    key: &str,
    field: &str,
  ) -> Result<Option<String>, Infallible> {
    self.inner.get_field(key, field).await
  }

  async fn set_field_checked(
    &self,
    _key: &str,
    _field: &str,
    _expected: Option<&str>,
    _value: &str,
  ) -> Result<bool, Infallible> {
    self.attempts.fetch_add(1, Ordering::Relaxed);
    Ok(false)
  }

  async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, Infallible> {
    self.inner.scan_keys(pattern).await
  }

  async fn ranked_incr(
    &self,
    bucket: &str,
    member: &str,
    delta: f64,
  ) -> Result<f64, Infallible> {
    self.inner.ranked_incr(bucket, member, delta).await
  }

  async fn ranked_scan(
    &self,
    bucket: &str,
    pattern: &str,
  ) -> Result<Vec<(String, f64)>, Infallible> {
    self.inner.ranked_scan(bucket, pattern).await
  }
}

fn driver(id: &str, lat: &str, lng: &str) -> PresenceRecord {
  PresenceRecord {
    resource_type: "driver".into(),
    id:            id.into(),
    session_id:    Some("456".into()),
    latitude:      lat.into(),
    longitude:     lng.into(),
    timestamp:     "1970-01-01 00:00:01".into(),
  }
}

// ─── Presence ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_then_get_returns_last_written_fields() {
  let presence = PresenceStore::new(store());

  let record = driver("12345", "34.043369", "71.629313");
  presence.upsert(&record).await.unwrap();

  let fetched = presence.get("driver", "12345").await.unwrap();
  assert_eq!(fetched, record);
  // Decimal strings come back verbatim, not renormalised.
  assert_eq!(fetched.latitude, "34.043369");
}

#[tokio::test]
async fn upsert_replaces_wholesale() {
  let presence = PresenceStore::new(store());

  presence.upsert(&driver("1", "34.04", "71.62")).await.unwrap();
  let mut second = driver("1", "35.00", "72.00");
  second.session_id = None;
  presence.upsert(&second).await.unwrap();

  let fetched = presence.get("driver", "1").await.unwrap();
  assert_eq!(fetched.latitude, "35.00");
  // No partial-field merge: the old session_id is gone.
  assert_eq!(fetched.session_id, None);
}

#[tokio::test]
async fn get_missing_is_not_found() {
  let presence = PresenceStore::new(store());
  assert!(matches!(
    presence.get("driver", "nope").await,
    Err(Error::NotFound)
  ));
}

#[tokio::test]
async fn update_requires_existing_record() {
  let presence = PresenceStore::new(store());

  let record = driver("77", "34.04", "71.62");
  assert!(matches!(presence.update(&record).await, Err(Error::NotFound)));

  presence.upsert(&record).await.unwrap();
  let moved = driver("77", "34.05", "71.63");
  presence.update(&moved).await.unwrap();
  assert_eq!(presence.get("driver", "77").await.unwrap(), moved);
}

// ─── Proximity ───────────────────────────────────────────────────────────────

/// Two drivers near Peshawar, roughly 9 km apart.
async fn seed_two_drivers(s: &Arc<MemoryStore>) {
  let presence = PresenceStore::new(Arc::clone(s));
  presence.upsert(&driver("a", "34.0434", "71.6293")).await.unwrap();
  presence.upsert(&driver("b", "34.10", "71.70")).await.unwrap();
}

#[tokio::test]
async fn find_nearby_includes_within_radius_only() {
  let s = store();
  seed_two_drivers(&s).await;
  let proximity = ProximityEngine::new(Arc::clone(&s));

  // Radius 10 km covers both; radius 5 km only the origin driver.
  let wide = proximity
    .find_nearby(&NearbyQuery {
      resource_type: "driver".into(),
      latitude:      34.0434,
      longitude:     71.6293,
      radius:        10.0,
      unit:          DistanceUnit::Kilometers,
    })
    .await
    .unwrap();
  assert_eq!(wide.len(), 2);

  let tight = proximity
    .find_nearby(&NearbyQuery {
      resource_type: "driver".into(),
      latitude:      34.0434,
      longitude:     71.6293,
      radius:        5.0,
      unit:          DistanceUnit::Kilometers,
    })
    .await
    .unwrap();
  assert_eq!(tight.len(), 1);
  assert_eq!(tight[0].record.id, "a");
  assert_eq!(tight[0].distance, 0.0);
  assert_eq!(tight[0].distance_unit, DistanceUnit::Kilometers);
}

#[tokio::test]
async fn find_nearby_yields_one_hit_per_record_under_repeated_keys() {
  let s = Arc::new(DoubledScan(MemoryStore::new()));
  let presence = PresenceStore::new(Arc::clone(&s));
  presence.upsert(&driver("a", "34.0434", "71.6293")).await.unwrap();
  presence.upsert(&driver("b", "34.10", "71.70")).await.unwrap();
  let proximity = ProximityEngine::new(s);

  let hits = proximity
    .find_nearby(&NearbyQuery {
      resource_type: "driver".into(),
      latitude:      34.0434,
      longitude:     71.6293,
      radius:        10.0,
      unit:          DistanceUnit::Kilometers,
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn find_nearby_unit_conversion_is_consistent() {
  let s = store();
  seed_two_drivers(&s).await;
  let proximity = ProximityEngine::new(Arc::clone(&s));

  let query = |radius, unit| NearbyQuery {
    resource_type: "driver".into(),
    latitude:      34.0434,
    longitude:     71.6293,
    radius,
    unit,
  };

  let km = proximity
    .find_nearby(&query(100.0, DistanceUnit::Kilometers))
    .await
    .unwrap();
  let meters = proximity
    .find_nearby(&query(100_000.0, DistanceUnit::Meters))
    .await
    .unwrap();
  let miles = proximity
    .find_nearby(&query(100.0, DistanceUnit::Miles))
    .await
    .unwrap();

  let b_km = km.iter().find(|h| h.record.id == "b").unwrap().distance;
  let b_m = meters.iter().find(|h| h.record.id == "b").unwrap().distance;
  let b_mi = miles.iter().find(|h| h.record.id == "b").unwrap().distance;

  assert!(b_km > 8.0 && b_km < 10.0, "got {b_km}");
  assert!((b_m / 1000.0 - b_km).abs() < 0.01);
  assert!((b_m / 1609.344 - b_mi).abs() < 0.01);
}

#[tokio::test]
async fn find_nearby_scopes_to_resource_type() {
  let s = store();
  seed_two_drivers(&s).await;
  let presence = PresenceStore::new(Arc::clone(&s));
  let mut rider = driver("r1", "34.0434", "71.6293");
  rider.resource_type = "rider".into();
  presence.upsert(&rider).await.unwrap();

  let proximity = ProximityEngine::new(Arc::clone(&s));
  let hits = proximity
    .find_nearby(&NearbyQuery {
      resource_type: "rider".into(),
      latitude:      34.0434,
      longitude:     71.6293,
      radius:        1.0,
      unit:          DistanceUnit::Kilometers,
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].record.resource_type, "rider");
}

#[tokio::test]
async fn malformed_coordinate_fails_the_whole_query() {
  let s = store();
  seed_two_drivers(&s).await;
  // Corrupt one record directly in the store.
  let bad = serde_json::json!({
    "resource_type": "driver",
    "id": "bad",
    "session_id": null,
    "latitude": "not-a-number",
    "longitude": "71.6",
    "timestamp": "t"
  });
  s.set_field("driver:bad", "driver", &bad.to_string())
    .await
    .unwrap();

  let proximity = ProximityEngine::new(Arc::clone(&s));
  let result = proximity
    .find_nearby(&NearbyQuery {
      resource_type: "driver".into(),
      latitude:      34.0434,
      longitude:     71.6293,
      radius:        100.0,
      unit:          DistanceUnit::Kilometers,
    })
    .await;
  // All-or-nothing: no partial results despite two valid records.
  assert!(matches!(result, Err(Error::QueryFailed(_))));
}

// ─── Term ranking ────────────────────────────────────────────────────────────

#[tokio::test]
async fn count_equals_number_of_observations() {
  let ranking = TermRankingIndex::new(store());

  for _ in 0..5 {
    ranking.save("shoe", "apparel").await.unwrap();
  }

  let top = ranking.top_terms("shoe", "apparel", 10).await.unwrap();
  assert_eq!(top.len(), 1);
  assert_eq!(top[0].term, "shoe");
  assert_eq!(top[0].count, 5);
}

#[tokio::test]
async fn general_aggregate_spans_categories() {
  let ranking = TermRankingIndex::new(store());

  ranking.save("shoe", "apparel").await.unwrap();
  ranking.save("shoe", "footwear").await.unwrap();
  ranking.save("shoe", "apparel").await.unwrap();

  let general = ranking.top_general_terms("shoe", 10).await.unwrap();
  assert_eq!(general.len(), 1);
  assert_eq!(general[0].count, 3);

  let apparel = ranking.top_terms("shoe", "apparel", 10).await.unwrap();
  assert_eq!(apparel[0].count, 2);
}

#[tokio::test]
async fn top_terms_sorted_by_count_descending() {
  let ranking = TermRankingIndex::new(store());

  for _ in 0..3 {
    ranking.save("dell laptop", "electronics").await.unwrap();
  }
  ranking.save("dell mouse", "electronics").await.unwrap();
  for _ in 0..2 {
    ranking.save("dell monitor", "electronics").await.unwrap();
  }

  let top = ranking.top_terms("dell", "electronics", 10).await.unwrap();
  let counts: Vec<u64> = top.iter().map(|t| t.count).collect();
  assert_eq!(counts, vec![3, 2, 1]);
  assert_eq!(top[0].term, "dell laptop");

  // limit truncates after sorting
  let top2 = ranking.top_terms("dell", "electronics", 2).await.unwrap();
  assert_eq!(top2.len(), 2);
  assert_eq!(top2[1].term, "dell monitor");
}

#[tokio::test]
async fn equal_counts_break_ties_deterministically() {
  let ranking = TermRankingIndex::new(store());
  ranking.save("zeta thing", "stuff").await.unwrap();
  ranking.save("alpha thing", "stuff").await.unwrap();

  let top = ranking.top_terms("thing", "stuff", 10).await.unwrap();
  // Stable sort over key-sorted scan: equal counts come back key-ascending.
  assert_eq!(top[0].term, "alpha thing");
  assert_eq!(top[1].term, "zeta thing");
}

#[tokio::test]
async fn top_terms_filters_category_exactly() {
  let ranking = TermRankingIndex::new(store());
  ranking.save("shoe", "apparel").await.unwrap();
  ranking.save("shoelace", "hardware").await.unwrap();

  let apparel = ranking.top_terms("shoe", "apparel", 10).await.unwrap();
  assert_eq!(apparel.len(), 1);
  assert_eq!(apparel[0].term, "shoe");
}

#[tokio::test]
async fn no_lost_updates_under_concurrent_writers() {
  let ranking = TermRankingIndex::new(store());

  let mut handles = Vec::new();
  for _ in 0..4 {
    let ranking = ranking.clone();
    handles.push(tokio::spawn(async move {
      for _ in 0..25 {
        // A bounded-retry save may legitimately surface Conflict under
        // contention. The pair counter may already have committed by then, so
        // retrying the whole save can apply it twice; only the general
        // aggregate, committed last, is exactly-once per Ok.
        loop {
          match ranking.save("shoe", "apparel").await {
            Ok(()) => break,
            Err(Error::Conflict(_)) => continue,
            Err(e) => panic!("unexpected error: {e}"),
          }
        }
      }
    }));
  }
  for handle in handles {
    handle.await.unwrap();
  }

  let top = ranking.top_terms("shoe", "apparel", 1).await.unwrap();
  assert!(
    top[0].count >= 100,
    "pair count {} lost updates",
    top[0].count
  );
  let general = ranking.top_general_terms("shoe", 1).await.unwrap();
  assert_eq!(general[0].count, 100);
}

#[tokio::test]
async fn conflict_surfaces_after_retries_exhaust() {
  let contended = Arc::new(AlwaysContended {
    inner:    MemoryStore::new(),
    attempts: AtomicU32::new(0),
  });
  let ranking = TermRankingIndex::new(Arc::clone(&contended));

  match ranking.save("shoe", "apparel").await {
    Err(Error::Conflict(n)) => assert_eq!(n, MAX_INCREMENT_RETRIES),
    other => panic!("expected Conflict, got {other:?}"),
  }
  // The first increment gives up after the retry bound; the second never runs.
  assert_eq!(
    contended.attempts.load(Ordering::Relaxed),
    MAX_INCREMENT_RETRIES
  );
}

#[tokio::test]
async fn repeated_scan_keys_do_not_crowd_out_terms() {
  let ranking =
    TermRankingIndex::new(Arc::new(DoubledScan(MemoryStore::new())));
  ranking.save("boot", "apparel").await.unwrap();
  ranking.save("boot", "apparel").await.unwrap();
  ranking.save("shoe", "apparel").await.unwrap();

  let top = ranking.top_terms("o", "apparel", 2).await.unwrap();
  let terms: Vec<_> = top.iter().map(|t| t.term.as_str()).collect();
  assert_eq!(terms, ["boot", "shoe"]);
}

#[tokio::test]
async fn phrase_log_round_trips() {
  let s = store();
  let ranking = TermRankingIndex::new(Arc::clone(&s));

  let event = PhraseEvent {
    phrase:      "hello there world".into(),
    customer_id: "1".into(),
    source_id:   "2".into(),
    timestamp:   "2021-11-24 13:12:01".into(),
  };
  ranking.log_phrase(&event).await.unwrap();

  let raw = s
    .get_field("phrase:hello there world", "term")
    .await
    .unwrap()
    .unwrap();
  let stored: PhraseEvent = serde_json::from_str(&raw).unwrap();
  assert_eq!(stored.phrase, event.phrase);
  assert_eq!(stored.customer_id, "1");
}

// ─── Autocomplete ────────────────────────────────────────────────────────────

#[tokio::test]
async fn suggest_normalises_dedupes_and_excludes_non_matches() {
  let auto = AutocompleteIndex::new(store());

  for _ in 0..3 {
    auto.record("Dell XPS", "laptop").await.unwrap();
    auto.record("dell inspiron", "laptop").await.unwrap();
    auto.record("HP", "laptop").await.unwrap();
  }

  let suggestions = auto.suggest("dell", "laptop", SUGGESTION_LIMIT).await.unwrap();
  assert_eq!(suggestions, vec!["dell inspiron", "dell xps"]);
}

#[tokio::test]
async fn suggest_orders_by_score_descending() {
  let auto = AutocompleteIndex::new(store());

  auto.record("dell inspiron", "laptop").await.unwrap();
  auto.record("dell xps", "laptop").await.unwrap();
  auto.record("dell xps", "laptop").await.unwrap();

  let suggestions = auto.suggest("dell", "laptop", SUGGESTION_LIMIT).await.unwrap();
  assert_eq!(suggestions, vec!["dell xps", "dell inspiron"]);
}

#[tokio::test]
async fn suggest_truncates_to_limit() {
  let auto = AutocompleteIndex::new(store());
  for i in 0..10 {
    auto.record(&format!("dell model {i}"), "laptop").await.unwrap();
  }

  let suggestions = auto.suggest("dell", "laptop", SUGGESTION_LIMIT).await.unwrap();
  assert_eq!(suggestions.len(), SUGGESTION_LIMIT);
}

#[tokio::test]
async fn suggest_against_missing_bucket_is_empty() {
  let auto = AutocompleteIndex::new(store());
  let suggestions = auto.suggest("dell", "laptop", SUGGESTION_LIMIT).await.unwrap();
  assert!(suggestions.is_empty());
}

#[tokio::test]
async fn general_bucket_spans_search_types() {
  let auto = AutocompleteIndex::new(store());
  auto.record("dell xps", "laptop").await.unwrap();
  auto.record("dell screwdriver", "hardware").await.unwrap();

  let general = auto.suggest("dell", "general", SUGGESTION_LIMIT).await.unwrap();
  assert_eq!(general.len(), 2);
}

#[tokio::test]
async fn record_trims_and_lowercases_both_term_and_bucket() {
  let auto = AutocompleteIndex::new(store());
  auto.record("  Dell XPS  ", " Laptop ").await.unwrap();

  let suggestions = auto.suggest("DELL", "laptop", SUGGESTION_LIMIT).await.unwrap();
  assert_eq!(suggestions, vec!["dell xps"]);
}
