//! Tool Lifecycle Module
//!
//! This module holds the decision logic of the tracker: expiry arithmetic,
//! the status transitions driven by inspections, and the alert feed that
//! merges stored alerts with alerts computed from current tool state.

pub mod config;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod inspection;
pub mod stores;
pub mod synthesizer;
pub mod types;


pub use config::LifecycleConfig;
pub use engine::{BackfillReport, Caller, InspectionOutcome, ToolLifecycleEngine};
pub use error::{LifecycleError, LifecycleResult};
pub use stores::{AlertStore, InspectionStore, LifecycleStore, ToolStore, UserStore};
pub use synthesizer::{FeedSummary, SyntheticAlertId, SyntheticCategory};
pub use types::*;
