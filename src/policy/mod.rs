// src/policy/mod.rs

//! The classification policy seam. The policy is an injected strategy and
//! is treated as untrusted: scope and mutability rules are stated in its
//! prompt but only ever enforced by the assembler.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::WorkspaceContext;
use crate::proposal::{DraftOperation, EntityKind};

/// The entity-type universe a conversation is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Global,
    Tasks,
    Notes,
    Project {
        project_id: String,
    },
}

impl Scope {
    pub fn allows(&self, entity: EntityKind) -> bool {
        match self {
            Scope::Global => true,
            Scope::Tasks => entity == EntityKind::Task,
            Scope::Notes => entity == EntityKind::Note,
            Scope::Project { .. } => {
                matches!(entity, EntityKind::Task | EntityKind::Note)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Tasks => "tasks",
            Scope::Notes => "notes",
            Scope::Project { .. } => "project",
        }
    }

    /// The project auto-assigned to created tasks/notes in project scope.
    pub fn default_project(&self) -> Option<&str> {
        match self {
            Scope::Project { project_id } => Some(project_id),
            _ => None,
        }
    }
}

/// One clarification question with 2-4 policy-provided options. The caller
/// appends the implicit "Other" choice before surfacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
}

pub const OTHER_CHOICE: &str = "Other";

/// Append the implicit "Other" choice, dropping a policy-provided trailing
/// "Other" first so it never doubles.
pub fn finalize_questions(questions: Vec<Question>) -> Vec<Question> {
    questions
        .into_iter()
        .map(|mut q| {
            if q.options
                .last()
                .is_some_and(|o| o.trim().eq_ignore_ascii_case(OTHER_CHOICE))
            {
                q.options.pop();
            }
            q.options.push(OTHER_CHOICE.to_string());
            q
        })
        .collect()
}

/// What the policy decided to do with a user message.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyReply {
    /// Needs more detail before it can propose anything.
    Clarify(Vec<Question>),
    /// Draft operations plus the policy's own summary. Both go through the
    /// assembler before anyone sees them.
    Propose {
        summary: String,
        drafts: Vec<DraftOperation>,
    },
    /// Ordinary conversational answer, no operations.
    Answer(String),
}

#[async_trait]
pub trait ClassifierPolicy: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        scope: &Scope,
        context: &WorkspaceContext,
    ) -> anyhow::Result<PolicyReply>;
}

// ── Tool-call contract ────────────────────────────────────────────────

pub fn ask_questions_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "ask_questions",
            "description": "Ask the user 2-4 clarification questions before proposing any workspace changes. Each question carries 2-4 concrete option strings. Do NOT include an 'Other' option; it is added automatically.",
            "parameters": {
                "type": "object",
                "properties": {
                    "questions": {
                        "type": "array",
                        "minItems": 2,
                        "maxItems": 4,
                        "items": {
                            "type": "object",
                            "properties": {
                                "question": { "type": "string" },
                                "options": {
                                    "type": "array",
                                    "minItems": 2,
                                    "maxItems": 4,
                                    "items": { "type": "string" }
                                }
                            },
                            "required": ["question", "options"]
                        }
                    }
                },
                "required": ["questions"]
            }
        }
    })
}

pub fn propose_operations_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "propose_operations",
            "description": "Propose workspace mutations for the user to review. Dates are YYYY-MM-DD, times are 24-hour HH:MM. Task and note titles are at most 50 characters, project descriptions at most 200.",
            "parameters": {
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "One short sentence describing the proposal"
                    },
                    "operations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "operation": { "type": "string", "enum": ["create", "update", "delete"] },
                                "type": { "type": "string", "enum": ["task", "note", "project", "file"] },
                                "id": { "type": "string", "description": "Entity id, required for update and delete, forbidden for create" },
                                "data": { "type": "object", "description": "Full payload, required for create" },
                                "changes": { "type": "object", "description": "Changed fields only, required for update" },
                                "reason": { "type": "string", "description": "Short rationale shown to the user" }
                            },
                            "required": ["operation", "type"]
                        }
                    }
                },
                "required": ["summary", "operations"]
            }
        }
    })
}

pub fn policy_tools() -> Vec<Value> {
    vec![ask_questions_tool(), propose_operations_tool()]
}
