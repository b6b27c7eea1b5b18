//! [`RedisStore`] — the Redis implementation of [`KvStore`].

use std::time::Duration;

use redis::Commands as _;
use waypoint_core::store::KvStore;

use crate::{Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Waypoint store backed by a Redis server.
///
/// Cloning is cheap — the inner client only holds connection parameters. Each
/// operation checks out its own connection on a blocking thread, with the
/// configured timeout applied to connect, read, and write.
#[derive(Clone)]
pub struct RedisStore {
  client:  redis::Client,
  timeout: Duration,
}

impl RedisStore {
  /// Build a store for `url` (e.g. `redis://127.0.0.1/`). Does not connect;
  /// call [`KvStore::ping`] to verify connectivity.
  pub fn open(url: &str, timeout: Duration) -> Result<Self> {
    let client = redis::Client::open(url)?;
    Ok(Self { client, timeout })
  }

  /// Run `op` with a fresh connection on the blocking pool.
  async fn run<T, F>(&self, op: F) -> Result<T>
  where
    F: FnOnce(&mut redis::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let client = self.client.clone();
    let timeout = self.timeout;
    tokio::task::spawn_blocking(move || {
      let mut conn = client.get_connection_with_timeout(timeout)?;
      conn.set_read_timeout(Some(timeout))?;
      conn.set_write_timeout(Some(timeout))?;
      op(&mut conn)
    })
    .await?
  }
}

// ─── KvStore impl ────────────────────────────────────────────────────────────

impl KvStore for RedisStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .run(|conn| {
        redis::cmd("PING").query::<String>(conn)?;
        Ok(())
      })
      .await
  }

  async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
    let (key, field, value) = (key.to_owned(), field.to_owned(), value.to_owned());
    self
      .run(move |conn| {
        conn.hset::<_, _, _, ()>(&key, &field, &value)?;
        Ok(())
      })
      .await
  }

  async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
    let (key, field) = (key.to_owned(), field.to_owned());
    self
      .run(move |conn| Ok(conn.hget::<_, _, Option<String>>(&key, &field)?))
      .await
  }

  async fn set_field_checked(
    &self,
    key: &str,
    field: &str,
    expected: Option<&str>,
    value: &str,
  ) -> Result<bool> {
    let (key, field, value) = (key.to_owned(), field.to_owned(), value.to_owned());
    let expected = expected.map(str::to_owned);
    self
      .run(move |conn| {
        // WATCH/HGET/MULTI/EXEC: the transaction aborts (EXEC returns nil)
        // if the watched key changed between the read and the commit.
        redis::cmd("WATCH").arg(&key).query::<()>(conn)?;
        let current: Option<String> = conn.hget(&key, &field)?;
        if current != expected {
          redis::cmd("UNWATCH").query::<()>(conn)?;
          return Ok(false);
        }
        let committed: Option<()> = redis::pipe()
          .atomic()
          .hset(&key, &field, &value)
          .ignore()
          .query(conn)?;
        Ok(committed.is_some())
      })
      .await
  }

  async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
    let pattern = pattern.to_owned();
    self
      .run(move |conn| {
        let keys: Vec<String> = conn.scan_match(&pattern)?.collect();
        Ok(keys)
      })
      .await
  }

  async fn ranked_incr(&self, bucket: &str, member: &str, delta: f64) -> Result<f64> {
    let (bucket, member) = (bucket.to_owned(), member.to_owned());
    self
      .run(move |conn| Ok(conn.zincr::<_, _, _, f64>(&bucket, &member, delta)?))
      .await
  }

  async fn ranked_scan(
    &self,
    bucket: &str,
    pattern: &str,
  ) -> Result<Vec<(String, f64)>> {
    let (bucket, pattern) = (bucket.to_owned(), pattern.to_owned());
    self
      .run(move |conn| {
        let members: Vec<(String, f64)> =
          conn.zscan_match(&bucket, &pattern)?.collect();
        Ok(members)
      })
      .await
  }
}
