// src/proposal/registry.rs

//! Long-lived pending-proposal state. The wait for user confirmation has no
//! deadline, so a proposal is an owned value parked here rather than a
//! blocked worker.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::AssemblyError;
use crate::policy::Scope;
use crate::proposal::assembler::{parse_change_set, parse_create_payload, DomainResolver};
use crate::proposal::operation::{DraftOperation, Operation, OperationAction};
use crate::proposal::selection::SelectionSet;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("proposal {0} not found")]
    UnknownProposal(String),
    #[error("operation index {0} out of range")]
    UnknownOperation(usize),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// One proposal awaiting the user's decision.
#[derive(Debug, Clone)]
pub struct PendingProposal {
    pub user_id: String,
    pub scope: Scope,
    pub summary: String,
    pub operations: Vec<Operation>,
    pub selection: SelectionSet,
    pub resolver: DomainResolver,
    /// The awaiting assistant turn, rewritten once the proposal resolves.
    pub turn_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ProposalRegistry {
    inner: RwLock<HashMap<String, PendingProposal>>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pending: PendingProposal) -> String {
        let id = Uuid::new_v4().to_string();
        debug!(proposal_id = %id, operations = pending.operations.len(), "proposal pending");
        self.inner.write().await.insert(id.clone(), pending);
        id
    }

    /// Flip one operation's selection. Returns the selected indices.
    pub async fn toggle(&self, id: &str, index: usize) -> Result<Vec<usize>, RegistryError> {
        let mut inner = self.inner.write().await;
        let pending = inner
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownProposal(id.to_string()))?;
        if index >= pending.operations.len() {
            return Err(RegistryError::UnknownOperation(index));
        }
        pending.selection.toggle(index);
        Ok(pending.selection.indices().collect())
    }

    /// Replace one operation's payload, revalidating it through the same
    /// rules the original draft went through. Selection membership is
    /// untouched: it is keyed by index, not payload content.
    pub async fn edit(
        &self,
        id: &str,
        index: usize,
        payload: Value,
    ) -> Result<DraftOperation, RegistryError> {
        let mut inner = self.inner.write().await;
        let pending = inner
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownProposal(id.to_string()))?;
        let resolver = pending.resolver.clone();
        let operation = pending
            .operations
            .get_mut(index)
            .ok_or(RegistryError::UnknownOperation(index))?;

        match &mut operation.action {
            OperationAction::Create(create) => {
                *create = parse_create_payload(operation.entity, &payload, &resolver)?;
            }
            OperationAction::Update { changes, .. } => {
                *changes = parse_change_set(operation.entity, &payload, &resolver)?;
            }
            OperationAction::Delete { .. } => {
                return Err(RegistryError::Assembly(AssemblyError::validation(
                    "delete operations carry no payload to edit",
                )));
            }
        }
        Ok(operation.to_wire())
    }

    /// Remove a pending proposal for confirmation or cancellation. Either
    /// way it stops being pending; cancellation simply drops the value.
    pub async fn take(&self, id: &str) -> Option<PendingProposal> {
        self.inner.write().await.remove(id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::operation::{CreatePayload, EntityKind};
    use crate::workspace::{Priority, TaskDraft};
    use serde_json::json;

    fn pending_with_one_create() -> PendingProposal {
        PendingProposal {
            user_id: "u".into(),
            scope: Scope::Global,
            summary: "I'll create 1 task.".into(),
            operations: vec![Operation {
                index: 0,
                entity: EntityKind::Task,
                action: OperationAction::Create(CreatePayload::Task(TaskDraft {
                    title: "Buy milk".into(),
                    priority: Priority::Medium,
                    due_date: None,
                    due_time: None,
                    all_day: true,
                    project_id: None,
                })),
                reason: None,
            }],
            selection: SelectionSet::all(1),
            resolver: DomainResolver::default(),
            turn_id: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn edit_keeps_selection_and_revalidates() {
        let registry = ProposalRegistry::new();
        let id = registry.insert(pending_with_one_create()).await;

        let wire = registry
            .edit(&id, 0, json!({ "title": "Buy oat milk" }))
            .await
            .unwrap();
        assert_eq!(wire.data.unwrap()["title"], "Buy oat milk");

        // Still selected after the edit; toggling still works by index.
        let selected = registry.toggle(&id, 0).await.unwrap();
        assert!(selected.is_empty());
        let selected = registry.toggle(&id, 0).await.unwrap();
        assert_eq!(selected, vec![0]);
    }

    #[tokio::test]
    async fn edit_rejects_over_limit_payloads() {
        let registry = ProposalRegistry::new();
        let id = registry.insert(pending_with_one_create()).await;
        let err = registry
            .edit(&id, 0, json!({ "title": "x".repeat(51) }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Assembly(AssemblyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn take_removes_pending_state() {
        let registry = ProposalRegistry::new();
        let id = registry.insert(pending_with_one_create()).await;
        assert!(registry.contains(&id).await);
        assert!(registry.take(&id).await.is_some());
        assert!(!registry.contains(&id).await);
        assert!(registry.take(&id).await.is_none());
    }
}
