// src/error.rs

//! Domain error taxonomy.
//!
//! Assembly-time errors fail closed: the user never sees a partially valid
//! proposal. Store errors surface per item at execution time and never abort
//! the rest of a batch.

use thiserror::Error;

/// Raised while turning draft operations into a canonical proposal.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Malformed operation shape, limit violation, unresolved domain
    /// reference. Blocks the entire proposal.
    #[error("invalid proposal: {0}")]
    Validation(String),

    /// Proposed entity type outside the current scope's allow-list.
    /// Enforced in code, independent of whatever the policy was told.
    #[error("{entity} operations are not allowed in {scope} scope")]
    Authorization { entity: String, scope: String },
}

impl AssemblyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Raised by workspace store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Update/delete referenced a stale or missing entity id.
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("workspace backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}
