// src/workspace/mod.rs

//! Workspace entities and the mutation payloads the proposal pipeline
//! produces. Payloads are typed per entity; duck-typed maps stop at the
//! assembler boundary.

pub mod sqlite;
pub mod store;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Fixed project categories. Not user-creatable; one project per domain is
/// seeded for every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Body,
    Mind,
    Work,
    Home,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Body, Domain::Mind, Domain::Work, Domain::Home];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Body => "Body",
            Domain::Mind => "Mind",
            Domain::Work => "Work",
            Domain::Home => "Home",
        }
    }

    pub fn from_name(name: &str) -> Option<Domain> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown domain '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

// ── Entities ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub all_day: bool,
    pub done: bool,
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Immutable after creation; updates may only touch title and owning
    /// project.
    pub content: String,
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub domain: Domain,
    pub created_at: DateTime<Utc>,
}

/// Files enter the workspace through the upload path, never through the
/// proposal pipeline. Proposals may only reassign or delete them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One chat turn. A proposal's assistant turn stays `awaiting_response`
/// until the proposal is confirmed or cancelled, at which point the content
/// is rewritten to the actual outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub awaiting_response: bool,
    pub created_at: DateTime<Utc>,
}

// ── Mutation payloads ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub all_day: bool,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub all_day: Option<bool>,
    pub done: Option<bool>,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub project_id: Option<String>,
}

/// Note content is immutable; there is deliberately no field for it here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub project_id: Option<String>,
}

/// The only mutable project field in fixed-domain mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectChanges {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChanges {
    pub project_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_lookup_is_case_insensitive() {
        assert_eq!(Domain::from_name("body"), Some(Domain::Body));
        assert_eq!(Domain::from_name(" MIND "), Some(Domain::Mind));
        assert_eq!(Domain::from_name("cooking"), None);
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
