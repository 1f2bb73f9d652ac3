//! Tool tracker library. The binary in `src/main.rs` wires these modules
//! together; `tests/` drives the router through the same public API.

pub mod api;
pub mod clock;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod repository;
pub mod scheduler;
pub mod store;

// startup plumbing
pub mod cli;
pub mod config;
pub mod logging;
