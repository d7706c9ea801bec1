//! Error types for event store operations.

use crate::model::DateKey;
use thiserror::Error;

/// A draft was rejected before touching the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Event name is required")]
    MissingName,

    #[error("Start time is required")]
    MissingStartTime,

    #[error("End time is required")]
    MissingEndTime,

    #[error("Invalid time '{0}'. Expected HH:MM")]
    InvalidTime(String),

    #[error("Start time must be before end time")]
    StartNotBeforeEnd,
}

/// Errors returned by [`crate::store::EventStore`] mutations.
///
/// Every variant leaves the store unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Event overlaps with an existing event on {date}: '{name}' (#{index})")]
    Overlap {
        date: DateKey,
        index: usize,
        name: String,
    },

    #[error("No event #{index} on {date}")]
    NotFound { date: DateKey, index: usize },

    #[error("Failed to save events: {0}")]
    Persistence(anyhow::Error),
}

impl StoreError {
    pub fn is_overlap(&self) -> bool {
        matches!(self, Self::Overlap { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
