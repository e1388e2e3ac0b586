// src/notify/mod.rs

//! Notification triggers. Delivery transport (email, browser push) is an
//! external concern behind [`NotificationSink`]; a sink failure is logged
//! and never fails the turn.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CONFIG;

/// Heuristic markers for the insight trigger. Best-effort by design; false
/// positives and negatives only cost a non-critical notification.
const INSIGHT_KEYWORDS: &[&str] = &[
    "I noticed",
    "I recommend",
    "pattern detected",
    "you might want",
    "worth paying attention",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Proposal,
    Insight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Default sink: structured log only.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        info!(kind = ?notification.kind, summary = %notification.summary, "notification");
        Ok(())
    }
}

/// Hands notifications to an external delivery endpoint.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("notification webhook error {}: {}", status, error_text);
        }
        Ok(())
    }
}

pub struct NotificationTrigger {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationTrigger {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Fires as soon as a proposal is assembled, before confirm/cancel, so
    /// the user hears about it even if they never open the app to review.
    pub async fn proposal_ready(&self, summary: &str, count: usize) {
        self.send(Notification {
            kind: NotificationKind::Proposal,
            summary: summary.to_string(),
            count: Some(count),
            body: None,
        })
        .await;
    }

    /// Fires from ordinary conversational replies that look like insights.
    pub async fn maybe_insight(&self, reply: &str) {
        if !looks_like_insight(reply, CONFIG.insight_min_chars) {
            return;
        }
        debug!("conversational reply matched insight heuristic");
        self.send(Notification {
            kind: NotificationKind::Insight,
            summary: "New insight from your assistant".to_string(),
            count: None,
            body: Some(reply.to_string()),
        })
        .await;
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.sink.deliver(notification).await {
            warn!(error = %e, "notification delivery failed");
        }
    }
}

fn looks_like_insight(reply: &str, min_chars: usize) -> bool {
    reply.chars().count() >= min_chars && INSIGHT_KEYWORDS.iter().any(|k| reply.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insight_needs_length_and_keyword() {
        let long_insight = format!("I noticed something about your week. {}", "x".repeat(200));
        assert!(looks_like_insight(&long_insight, 200));

        // Keyword but short.
        assert!(!looks_like_insight("I noticed a thing.", 200));

        // Long but no keyword.
        let long_plain = "x".repeat(300);
        assert!(!looks_like_insight(&long_plain, 200));
    }
}
