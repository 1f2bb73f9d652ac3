//! Error types for lifecycle operations

use thiserror::Error;

/// Errors that can occur while processing tools, inspections and alerts.
///
/// Every variant is raised before any mutation is applied.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl LifecycleError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }
}

/// Result alias used throughout the lifecycle module.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
