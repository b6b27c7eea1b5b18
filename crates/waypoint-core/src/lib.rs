//! Core types, the `KvStore` trait, and the Waypoint engines.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The engines (presence, proximity, ranking, autocomplete) are generic over
//! any [`store::KvStore`] backend; `waypoint-store-redis` provides the
//! production implementation and [`memory::MemoryStore`] backs the tests.

pub mod autocomplete;
pub mod error;
pub mod geo;
pub mod memory;
pub mod presence;
pub mod proximity;
pub mod ranking;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
