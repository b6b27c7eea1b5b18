//! Request handlers, grouped by subsystem.

pub mod autocomplete;
pub mod gps;
pub mod terms;
