// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;

use tend::context::WorkspaceContext;
use tend::notify::{Notification, NotificationSink, NotificationTrigger};
use tend::policy::{ClassifierPolicy, PolicyReply, Scope};
use tend::turn::TurnPipeline;
use tend::workspace::sqlite::SqliteWorkspaceStore;
use tend::workspace::{Domain, Project};

/// Fresh in-memory store with the schema applied. One connection, so every
/// query sees the same database.
pub async fn memory_store() -> SqliteWorkspaceStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteWorkspaceStore::new(pool);
    store.init_schema().await.unwrap();
    store
}

pub fn project(id: &str, domain: Domain) -> Project {
    Project {
        id: id.to_string(),
        name: domain.as_str().to_string(),
        description: String::new(),
        domain,
        created_at: Utc::now(),
    }
}

/// Snapshot with the four seeded domain projects under fixed ids.
pub fn snapshot_with_domains() -> WorkspaceContext {
    WorkspaceContext {
        projects: vec![
            project("U1", Domain::Body),
            project("U2", Domain::Mind),
            project("U3", Domain::Work),
            project("U4", Domain::Home),
        ],
        ..Default::default()
    }
}

/// Deterministic classifier: hands back scripted replies in order.
pub struct ScriptedPolicy {
    replies: Mutex<VecDeque<PolicyReply>>,
}

impl ScriptedPolicy {
    pub fn new(replies: Vec<PolicyReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl ClassifierPolicy for ScriptedPolicy {
    async fn classify(
        &self,
        _message: &str,
        _scope: &Scope,
        _context: &WorkspaceContext,
    ) -> anyhow::Result<PolicyReply> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

/// Records delivered notifications instead of sending them anywhere.
#[derive(Clone, Default)]
pub struct CapturingSink {
    pub sent: Arc<Mutex<Vec<Notification>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<tend::notify::NotificationKind> {
        self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
    }
}

#[async_trait]
impl NotificationSink for CapturingSink {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Pipeline over an in-memory store with scripted classification. Returns
/// the store handle and sink alongside so tests can inspect both.
pub async fn scripted_pipeline(
    replies: Vec<PolicyReply>,
) -> (TurnPipeline, Arc<SqliteWorkspaceStore>, CapturingSink) {
    let store = Arc::new(memory_store().await);
    let sink = CapturingSink::new();
    let pipeline = TurnPipeline::new(
        store.clone(),
        Arc::new(ScriptedPolicy::new(replies)),
        NotificationTrigger::new(Arc::new(sink.clone())),
    );
    (pipeline, store, sink)
}
