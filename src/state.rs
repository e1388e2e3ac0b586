// src/state.rs

use std::sync::Arc;

use crate::notify::{NotificationSink, NotificationTrigger};
use crate::policy::ClassifierPolicy;
use crate::turn::TurnPipeline;
use crate::workspace::store::WorkspaceStore;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TurnPipeline>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        policy: Arc<dyn ClassifierPolicy>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let notifier = NotificationTrigger::new(sink);
        Self {
            pipeline: Arc::new(TurnPipeline::new(store, policy, notifier)),
        }
    }
}
