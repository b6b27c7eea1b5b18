//! The `KvStore` trait — the key-value collaborator contract.
//!
//! The trait is implemented by storage backends (`waypoint-store-redis` in
//! production, [`crate::memory::MemoryStore`] in tests). The engines depend on
//! this abstraction, not on any concrete backend.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

/// Abstraction over the backing key-value store.
///
/// Semantics required from an implementation:
///
/// - per-key hash fields with last-write-wins atomicity
///   ([`set_field`](Self::set_field) / [`get_field`](Self::get_field));
/// - an optimistic compare-and-set on a single field
///   ([`set_field_checked`](Self::set_field_checked)) — on Redis this is
///   `WATCH`/`MULTI`/`EXEC`;
/// - glob-pattern key enumeration as a non-atomic snapshot
///   ([`scan_keys`](Self::scan_keys)) — it may race with concurrent writes;
/// - ranked-set increment and pattern scan
///   ([`ranked_incr`](Self::ranked_incr) / [`ranked_scan`](Self::ranked_scan)).
pub trait KvStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Connectivity check, used at process bootstrap.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Set `field` under `key`, replacing any previous value.
  fn set_field<'a>(
    &'a self,
    key: &'a str,
    field: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Read `field` under `key`. Returns `None` if the key or field is absent.
  fn get_field<'a>(
    &'a self,
    key: &'a str,
    field: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Compare-and-set: write `value` only if the field still holds `expected`.
  ///
  /// Returns `false` when the field changed since `expected` was read — the
  /// caller lost an optimistic race and must retry or give up. Losing a race
  /// is not an `Err`; only transport failures are.
  fn set_field_checked<'a>(
    &'a self,
    key: &'a str,
    field: &'a str,
    expected: Option<&'a str>,
    value: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Enumerate keys matching a glob `pattern` (`*` and `?` wildcards).
  fn scan_keys<'a>(
    &'a self,
    pattern: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Increment `member`'s score by `delta` in the named ranked set, creating
  /// the member at `delta` if absent. Returns the new score.
  fn ranked_incr<'a>(
    &'a self,
    bucket: &'a str,
    member: &'a str,
    delta: f64,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + 'a;

  /// Enumerate `(member, score)` pairs of the named ranked set whose member
  /// matches the glob `pattern`. An unknown bucket yields an empty list.
  ///
  /// Cursor-based backends may return the same member more than once; callers
  /// deduplicate.
  fn ranked_scan<'a>(
    &'a self,
    bucket: &'a str,
    pattern: &'a str,
  ) -> impl Future<Output = Result<Vec<(String, f64)>, Self::Error>> + Send + 'a;
}
