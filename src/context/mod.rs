// src/context/mod.rs

//! Bounded, read-only snapshot of a user's workspace for the classification
//! policy to reason over. Bounds keep the model input small; the store's
//! `query_*` methods remain available when a caller needs more.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use crate::config::CONFIG;
use crate::error::StoreError;
use crate::workspace::store::WorkspaceStore;
use crate::workspace::{ChatTurn, Note, Project, StoredFile, Task};

#[derive(Debug, Clone, Default)]
pub struct WorkspaceContext {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub notes: Vec<Note>,
    pub files: Vec<StoredFile>,
    pub history: Vec<ChatTurn>,
}

impl WorkspaceContext {
    /// Lowercased name/domain -> project id, plus the ids themselves so a
    /// policy echoing an id back verbatim still resolves.
    pub fn domain_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for project in &self.projects {
            map.insert(project.name.to_lowercase(), project.id.clone());
            map.insert(project.domain.as_str().to_lowercase(), project.id.clone());
            map.insert(project.id.to_lowercase(), project.id.clone());
        }
        map
    }

    /// Compact prompt block the policy sees each turn.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("## Workspace\n\nProjects:\n");
        for p in &self.projects {
            let _ = writeln!(out, "- {} (id: {}): {}", p.name, p.id, p.description);
        }
        out.push_str("\nTasks:\n");
        for t in &self.tasks {
            let status = if t.done { "done" } else { "open" };
            let due = t
                .due_date
                .map(|d| format!(", due {}", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            let _ = writeln!(out, "- [{}] {} (id: {}{})", status, t.title, t.id, due);
        }
        out.push_str("\nNotes:\n");
        for n in &self.notes {
            let _ = writeln!(out, "- {} (id: {})", n.title, n.id);
        }
        out.push_str("\nFiles:\n");
        for f in &self.files {
            let _ = writeln!(out, "- {} (id: {})", f.name, f.id);
        }
        if !self.history.is_empty() {
            out.push_str("\nRecent conversation:\n");
            for turn in &self.history {
                let _ = writeln!(out, "{}: {}", turn.role, turn.content);
            }
        }
        out
    }
}

pub struct ContextBuilder {
    store: Arc<dyn WorkspaceStore>,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }

    /// Escape hatch for callers that need more than the snapshot.
    pub fn store(&self) -> &Arc<dyn WorkspaceStore> {
        &self.store
    }

    /// Build the per-turn snapshot. Every query is bounded; the builder
    /// never scans the full workspace.
    pub async fn build(&self, user_id: &str) -> Result<WorkspaceContext, StoreError> {
        let projects = self
            .store
            .query_projects(user_id, CONFIG.context_projects)
            .await?;
        let tasks = self.store.query_tasks(user_id, CONFIG.context_tasks).await?;
        let notes = self.store.query_notes(user_id, CONFIG.context_notes).await?;
        let files = self.store.query_files(user_id, CONFIG.context_files).await?;
        let history = self
            .store
            .recent_turns(user_id, CONFIG.context_history)
            .await?;

        debug!(
            user_id,
            projects = projects.len(),
            tasks = tasks.len(),
            notes = notes.len(),
            files = files.len(),
            history = history.len(),
            "workspace context built"
        );

        Ok(WorkspaceContext {
            projects,
            tasks,
            notes,
            files,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Domain;
    use chrono::Utc;

    fn project(id: &str, domain: Domain) -> Project {
        Project {
            id: id.to_string(),
            name: domain.as_str().to_string(),
            description: String::new(),
            domain,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn domain_map_covers_names_domains_and_ids() {
        let ctx = WorkspaceContext {
            projects: vec![project("U1", Domain::Body), project("U2", Domain::Mind)],
            ..Default::default()
        };
        let map = ctx.domain_map();
        assert_eq!(map.get("body").map(String::as_str), Some("U1"));
        assert_eq!(map.get("mind").map(String::as_str), Some("U2"));
        assert_eq!(map.get("u2").map(String::as_str), Some("U2"));
        assert!(map.get("cooking").is_none());
    }
}
