// src/executor/mod.rs

//! Applies the selected subset of a confirmed proposal. Operations run one
//! at a time in ascending index order, since a later operation may lean on
//! an earlier one's effect. Each backend call is isolated: a failure is
//! recorded for that item and execution continues. No rollback, no batch
//! atomicity.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::proposal::operation::{ChangeSet, CreatePayload, Operation, OperationAction};
use crate::proposal::selection::SelectionSet;
use crate::workspace::store::WorkspaceStore;

/// Aggregate outcome of one confirmed batch.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub success_count: usize,
    pub error_count: usize,
    pub lines: Vec<String>,
}

impl ExecutionReport {
    pub fn summary(&self) -> String {
        let total = self.success_count + self.error_count;
        if total == 0 {
            "Nothing was selected, so no changes were made.".to_string()
        } else if self.error_count == 0 {
            format!(
                "Applied {} operation{}.",
                total,
                if total == 1 { "" } else { "s" }
            )
        } else {
            format!("{} succeeded, {} failed.", self.success_count, self.error_count)
        }
    }

    /// Summary plus the per-item lines, for the rewritten chat turn.
    pub fn render(&self) -> String {
        let mut out = self.summary();
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

pub struct ExecutionEngine {
    store: Arc<dyn WorkspaceStore>,
}

impl ExecutionEngine {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        user_id: &str,
        operations: &[Operation],
        selection: &SelectionSet,
    ) -> ExecutionReport {
        let mut report = ExecutionReport {
            success_count: 0,
            error_count: 0,
            lines: Vec::new(),
        };

        for index in selection.indices() {
            let Some(operation) = operations.get(index) else {
                continue;
            };
            match self.apply(user_id, operation).await {
                Ok(line) => {
                    report.success_count += 1;
                    report.lines.push(line);
                }
                Err(e) => {
                    warn!(index, error = %e, "operation failed; continuing with the rest");
                    report.error_count += 1;
                    report
                        .lines
                        .push(format!("Failed to {}: {}", operation.describe(), e));
                }
            }
        }

        info!(
            user_id,
            success = report.success_count,
            failed = report.error_count,
            "batch executed"
        );
        report
    }

    async fn apply(&self, user_id: &str, operation: &Operation) -> Result<String, StoreError> {
        match &operation.action {
            OperationAction::Create(CreatePayload::Task(draft)) => {
                let task = self.store.create_task(user_id, draft).await?;
                Ok(format!("Created task \"{}\"", task.title))
            }
            OperationAction::Create(CreatePayload::Note(draft)) => {
                let note = self.store.create_note(user_id, draft).await?;
                Ok(format!("Created note \"{}\"", note.title))
            }
            OperationAction::Update { id, changes } => match changes {
                ChangeSet::Task(changes) => {
                    let task = self.store.update_task(user_id, id, changes).await?;
                    Ok(format!("Updated task \"{}\"", task.title))
                }
                ChangeSet::Note(changes) => {
                    let note = self.store.update_note(user_id, id, changes).await?;
                    Ok(format!("Updated note \"{}\"", note.title))
                }
                ChangeSet::Project(changes) => {
                    let project = self.store.update_project(user_id, id, changes).await?;
                    Ok(format!("Updated project \"{}\"", project.name))
                }
                ChangeSet::File(changes) => {
                    let file = self.store.update_file(user_id, id, changes).await?;
                    Ok(format!("Moved file \"{}\"", file.name))
                }
            },
            OperationAction::Delete { id } => {
                match operation.entity {
                    crate::proposal::operation::EntityKind::Task => {
                        self.store.delete_task(user_id, id).await?
                    }
                    crate::proposal::operation::EntityKind::Note => {
                        self.store.delete_note(user_id, id).await?
                    }
                    crate::proposal::operation::EntityKind::File => {
                        self.store.delete_file(user_id, id).await?
                    }
                    // The assembler never lets a project delete through.
                    crate::proposal::operation::EntityKind::Project => {
                        return Err(StoreError::not_found("project", id));
                    }
                }
                Ok(format!("Deleted {} {}", operation.entity.singular(), id))
            }
        }
    }
}
