// src/workspace/store.rs

//! Storage trait for the workspace backend. All reads and writes go through
//! this; the pipeline never touches the pool directly.
//!
//! The bounded `query_*` methods double as the escape hatch for callers that
//! need more than the per-turn context snapshot.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::workspace::{
    ChatTurn, FileChanges, Note, NoteChanges, NoteDraft, Project, ProjectChanges, StoredFile,
    Task, TaskChanges, TaskDraft,
};

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Seed the fixed domain projects for a user. Idempotent.
    async fn ensure_domains(&self, user_id: &str) -> Result<(), StoreError>;

    async fn create_task(&self, user_id: &str, draft: &TaskDraft) -> Result<Task, StoreError>;
    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<Task, StoreError>;
    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    async fn create_note(&self, user_id: &str, draft: &NoteDraft) -> Result<Note, StoreError>;
    async fn update_note(
        &self,
        user_id: &str,
        id: &str,
        changes: &NoteChanges,
    ) -> Result<Note, StoreError>;
    async fn delete_note(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    /// Projects are fixed-domain: description is the only mutable field and
    /// there are no create/delete counterparts.
    async fn update_project(
        &self,
        user_id: &str,
        id: &str,
        changes: &ProjectChanges,
    ) -> Result<Project, StoreError>;

    async fn update_file(
        &self,
        user_id: &str,
        id: &str,
        changes: &FileChanges,
    ) -> Result<StoredFile, StoreError>;
    async fn delete_file(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    async fn query_tasks(&self, user_id: &str, limit: usize) -> Result<Vec<Task>, StoreError>;
    async fn query_notes(&self, user_id: &str, limit: usize) -> Result<Vec<Note>, StoreError>;
    async fn query_projects(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Project>, StoreError>;
    async fn query_files(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredFile>, StoreError>;

    /// Append a chat turn; returns the turn id. A proposal turn is appended
    /// with `awaiting = true` and rewritten via [`resolve_turn`] once the
    /// user confirms or cancels.
    ///
    /// [`resolve_turn`]: WorkspaceStore::resolve_turn
    async fn append_turn(
        &self,
        user_id: &str,
        role: &str,
        content: &str,
        awaiting: bool,
    ) -> Result<i64, StoreError>;

    /// Rewrite an awaiting turn to its final outcome and clear the flag.
    async fn resolve_turn(&self, turn_id: i64, content: &str) -> Result<(), StoreError>;

    /// Last `limit` turns, oldest first.
    async fn recent_turns(&self, user_id: &str, limit: usize)
        -> Result<Vec<ChatTurn>, StoreError>;
}
