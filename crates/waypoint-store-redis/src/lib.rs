//! Redis backend for the Waypoint key-value store.
//!
//! Drives the synchronous `redis` client through
//! [`tokio::task::spawn_blocking`] so store access never blocks the async
//! runtime.

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::RedisStore;
