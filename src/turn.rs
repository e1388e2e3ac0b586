// src/turn.rs

//! Turn pipeline: the full lifecycle of a user message, from classification
//! through proposal review to execution. This is the one place the chat
//! surface, the registry and the execution engine meet.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::context::ContextBuilder;
use crate::error::{AssemblyError, StoreError};
use crate::executor::{ExecutionEngine, ExecutionReport};
use crate::notify::NotificationTrigger;
use crate::policy::{finalize_questions, ClassifierPolicy, PolicyReply, Question, Scope};
use crate::proposal::registry::{PendingProposal, ProposalRegistry, RegistryError};
use crate::proposal::{assemble, DomainResolver, DraftOperation};
use crate::workspace::store::WorkspaceStore;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("proposal {0} not found")]
    UnknownProposal(String),
    #[error("operation index {0} out of range")]
    UnknownOperation(usize),
    #[error("classification failed: {0}")]
    Policy(String),
}

impl From<RegistryError> for TurnError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownProposal(id) => TurnError::UnknownProposal(id),
            RegistryError::UnknownOperation(index) => TurnError::UnknownOperation(index),
            RegistryError::Assembly(e) => TurnError::Assembly(e),
        }
    }
}

/// What a user message turned into.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Clarification needed; each question already carries its "Other".
    Questions(Vec<Question>),
    /// A proposal awaiting review. Operations are in wire form for the
    /// client, in proposal order.
    Proposal {
        proposal_id: String,
        summary: String,
        operations: Vec<DraftOperation>,
    },
    /// Ordinary conversational reply.
    Message(String),
}

pub struct TurnPipeline {
    store: Arc<dyn WorkspaceStore>,
    policy: Arc<dyn ClassifierPolicy>,
    registry: ProposalRegistry,
    notifier: NotificationTrigger,
    engine: ExecutionEngine,
    context_builder: ContextBuilder,
}

impl TurnPipeline {
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        policy: Arc<dyn ClassifierPolicy>,
        notifier: NotificationTrigger,
    ) -> Self {
        Self {
            policy,
            registry: ProposalRegistry::new(),
            notifier,
            engine: ExecutionEngine::new(store.clone()),
            context_builder: ContextBuilder::new(store.clone()),
            store,
        }
    }

    /// Run one user message through classification.
    pub async fn handle_message(
        &self,
        user_id: &str,
        scope: &Scope,
        message: &str,
    ) -> Result<TurnOutcome, TurnError> {
        self.store.ensure_domains(user_id).await?;
        self.store
            .append_turn(user_id, "user", message, false)
            .await?;

        let context = self.context_builder.build(user_id).await?;
        let reply = self
            .policy
            .classify(message, scope, &context)
            .await
            .map_err(|e| TurnError::Policy(e.to_string()))?;

        match reply {
            PolicyReply::Clarify(questions) => {
                let questions = finalize_questions(questions);
                let rendered = questions
                    .iter()
                    .map(|q| q.question.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.store
                    .append_turn(user_id, "assistant", &rendered, false)
                    .await?;
                Ok(TurnOutcome::Questions(questions))
            }
            PolicyReply::Propose { drafts, .. } => {
                // The assembler's deterministic summary wins over whatever
                // sentence the policy wrote; the counts are always honest.
                let proposal = assemble(scope, &context, drafts)?;
                let turn_id = self
                    .store
                    .append_turn(user_id, "assistant", &proposal.summary, true)
                    .await?;

                let count = proposal.operations.len();
                let operations = proposal.operations.iter().map(|op| op.to_wire()).collect();
                let summary = proposal.summary.clone();
                let selection = crate::proposal::SelectionSet::all(count);

                let proposal_id = self
                    .registry
                    .insert(PendingProposal {
                        user_id: user_id.to_string(),
                        scope: scope.clone(),
                        summary: proposal.summary,
                        operations: proposal.operations,
                        selection,
                        resolver: DomainResolver::new(&context, scope),
                        turn_id,
                        created_at: Utc::now(),
                    })
                    .await;

                // Notify at proposal time, not execution time, so the user
                // hears about pending work without opening the app.
                self.notifier.proposal_ready(&summary, count).await;

                info!(user_id, %proposal_id, count, "proposal awaiting review");
                Ok(TurnOutcome::Proposal {
                    proposal_id,
                    summary,
                    operations,
                })
            }
            PolicyReply::Answer(content) => {
                self.store
                    .append_turn(user_id, "assistant", &content, false)
                    .await?;
                self.notifier.maybe_insight(&content).await;
                Ok(TurnOutcome::Message(content))
            }
        }
    }

    /// Flip one operation in or out of the pending selection.
    pub async fn toggle(&self, proposal_id: &str, index: usize) -> Result<Vec<usize>, TurnError> {
        Ok(self.registry.toggle(proposal_id, index).await?)
    }

    /// Replace one operation's payload before confirmation.
    pub async fn edit(
        &self,
        proposal_id: &str,
        index: usize,
        payload: serde_json::Value,
    ) -> Result<DraftOperation, TurnError> {
        Ok(self.registry.edit(proposal_id, index, payload).await?)
    }

    /// Execute the selected subset and resolve the awaiting chat turn.
    pub async fn confirm(&self, proposal_id: &str) -> Result<ExecutionReport, TurnError> {
        let pending = self
            .registry
            .take(proposal_id)
            .await
            .ok_or_else(|| TurnError::UnknownProposal(proposal_id.to_string()))?;

        let report = self
            .engine
            .execute(&pending.user_id, &pending.operations, &pending.selection)
            .await;
        self.store
            .resolve_turn(pending.turn_id, &report.render())
            .await?;
        Ok(report)
    }

    /// Discard a pending proposal without touching the workspace.
    pub async fn cancel(&self, proposal_id: &str) -> Result<(), TurnError> {
        let pending = self
            .registry
            .take(proposal_id)
            .await
            .ok_or_else(|| TurnError::UnknownProposal(proposal_id.to_string()))?;

        self.store
            .resolve_turn(pending.turn_id, "Okay, I won't make those changes.")
            .await?;
        info!(%proposal_id, "proposal cancelled");
        Ok(())
    }
}
