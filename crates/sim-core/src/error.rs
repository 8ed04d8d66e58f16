//! Error taxonomy shared by every service in the simulation.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by repositories and services.
///
/// `NotFound`, `Conflict` and `InvalidOperation` are recoverable and meant to be
/// surfaced to whoever requested the action. `Unexpected` marks a broken
/// invariant and aborts the running turn.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Requested id is absent.
    #[error("entity with id \"{id}\" of type {entity_type} is not found")]
    NotFound { entity_type: String, id: String },
    /// Uniqueness constraint violated.
    #[error("conflict occurred: {reason}{}", render_data(.data))]
    Conflict { reason: String, data: Option<Value> },
    /// Domain rule violated (cash, stock, storage volume).
    #[error("invalid operation: {reason}{}", render_data(.data))]
    InvalidOperation { reason: String, data: Option<Value> },
    /// Something that should be structurally impossible happened.
    #[error("unexpected error: {reason}{}", render_data(.data))]
    Unexpected { reason: String, data: Option<Value> },
}

fn render_data(data: &Option<Value>) -> String {
    match data {
        Some(v) => format!(" (data: {v})"),
        None => String::new(),
    }
}

impl SimError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        SimError::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        SimError::Conflict {
            reason: reason.into(),
            data: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        SimError::InvalidOperation {
            reason: reason.into(),
            data: None,
        }
    }

    pub fn unexpected(reason: impl Into<String>) -> Self {
        SimError::Unexpected {
            reason: reason.into(),
            data: None,
        }
    }

    /// Attach structured data to a `Conflict`, `InvalidOperation` or `Unexpected` error.
    pub fn with_data(mut self, value: Value) -> Self {
        match &mut self {
            SimError::Conflict { data, .. }
            | SimError::InvalidOperation { data, .. }
            | SimError::Unexpected { data, .. } => *data = Some(value),
            SimError::NotFound { .. } => {}
        }
        self
    }

    /// Fatal errors must not be retried; they abort the turn.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::Unexpected { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SimError::NotFound { .. })
    }
}

/// Result alias used across the core.
pub type SimResult<T> = Result<T, SimError>;
