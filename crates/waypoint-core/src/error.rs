//! Error types for `waypoint-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The identity (presence record, counter, bucket member) does not exist.
  #[error("no matching record")]
  NotFound,

  /// An optimistic increment lost its race every time within the retry bound.
  #[error("optimistic write lost after {0} attempts")]
  Conflict(u32),

  /// A proximity scan failed mid-flight; no partial results are returned.
  #[error("proximity query failed: {0}")]
  QueryFailed(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error in [`Error::Store`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
