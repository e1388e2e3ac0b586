// src/proposal/assembler.rs

//! Turns the policy's untrusted draft operations into a canonical proposal.
//! Fails closed: one bad draft blocks the whole proposal, because a
//! half-valid proposal is confusing to confirm.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::WorkspaceContext;
use crate::error::AssemblyError;
use crate::policy::Scope;
use crate::proposal::operation::{
    ChangeSet, CreatePayload, DraftOperation, EntityKind, Operation, OperationAction,
    OperationKind,
};
use crate::workspace::{
    FileChanges, NoteChanges, NoteDraft, Priority, ProjectChanges, TaskChanges, TaskDraft,
    DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};

/// A validated proposal: canonical operations plus the summary sentence.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub summary: String,
    pub operations: Vec<Operation>,
}

/// Resolves domain/project references against the proposal-time snapshot.
/// Kept on the pending proposal so later edits resolve against the same
/// snapshot the proposal was built from.
#[derive(Debug, Clone, Default)]
pub struct DomainResolver {
    map: HashMap<String, String>,
    default_project: Option<String>,
}

impl DomainResolver {
    pub fn new(context: &WorkspaceContext, scope: &Scope) -> Self {
        Self {
            map: context.domain_map(),
            default_project: scope.default_project().map(|p| p.to_string()),
        }
    }

    /// Pick the owning project for a payload. An explicit domain name must
    /// resolve; defaulting it to null would hide a real error from the user.
    fn project_for(
        &self,
        explicit_id: Option<String>,
        domain: Option<String>,
    ) -> Result<Option<String>, AssemblyError> {
        if let Some(name) = domain {
            let id = self.map.get(&name.to_lowercase()).cloned().ok_or_else(|| {
                AssemblyError::validation(format!("unknown domain \"{}\"", name))
            })?;
            return Ok(Some(id));
        }
        if let Some(id) = explicit_id {
            let resolved = self.map.get(&id.to_lowercase()).cloned().ok_or_else(|| {
                AssemblyError::validation(format!("unknown project \"{}\"", id))
            })?;
            return Ok(Some(resolved));
        }
        Ok(self.default_project.clone())
    }
}

pub fn assemble(
    scope: &Scope,
    context: &WorkspaceContext,
    drafts: Vec<DraftOperation>,
) -> Result<Proposal, AssemblyError> {
    if drafts.is_empty() {
        return Err(AssemblyError::validation("proposal contains no operations"));
    }

    let resolver = DomainResolver::new(context, scope);
    let mut operations = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.into_iter().enumerate() {
        operations.push(assemble_one(scope, &resolver, index, draft)?);
    }

    let summary = render_summary(&operations);
    debug!(operations = operations.len(), %summary, "proposal assembled");
    Ok(Proposal {
        summary,
        operations,
    })
}

fn assemble_one(
    scope: &Scope,
    resolver: &DomainResolver,
    index: usize,
    draft: DraftOperation,
) -> Result<Operation, AssemblyError> {
    let entity = draft.entity;
    let kind = draft.operation;

    // Scope first, and in code: the policy prompt says the same thing, but
    // prompts are not an enforcement mechanism.
    if !scope.allows(entity) {
        return Err(AssemblyError::Authorization {
            entity: entity.singular().to_string(),
            scope: scope.name().to_string(),
        });
    }

    match (kind, entity) {
        (OperationKind::Create, EntityKind::File) => {
            return Err(AssemblyError::validation(
                "files are added by upload and cannot be created here",
            ));
        }
        (OperationKind::Create | OperationKind::Delete, EntityKind::Project) => {
            return Err(AssemblyError::validation(
                "projects are fixed; only their description can be updated",
            ));
        }
        _ => {}
    }

    let action = match kind {
        OperationKind::Create => {
            if draft.id.is_some() {
                return Err(AssemblyError::validation(format!(
                    "create {} must not carry an id",
                    entity
                )));
            }
            if draft.changes.is_some() {
                return Err(AssemblyError::validation(
                    "create carries data, not changes",
                ));
            }
            let data = draft
                .data
                .ok_or_else(|| AssemblyError::validation(format!("create {} requires data", entity)))?;
            OperationAction::Create(parse_create_payload(entity, &data, resolver)?)
        }
        OperationKind::Update => {
            let id = require_id(&draft.id, kind, entity)?;
            if draft.data.is_some() {
                return Err(AssemblyError::validation(
                    "update carries changes, not data",
                ));
            }
            let changes = draft.changes.ok_or_else(|| {
                AssemblyError::validation(format!("update {} requires changes", entity))
            })?;
            OperationAction::Update {
                id,
                changes: parse_change_set(entity, &changes, resolver)?,
            }
        }
        OperationKind::Delete => {
            let id = require_id(&draft.id, kind, entity)?;
            if draft.data.is_some() || draft.changes.is_some() {
                return Err(AssemblyError::validation(
                    "delete carries neither data nor changes",
                ));
            }
            OperationAction::Delete { id }
        }
    };

    Ok(Operation {
        index,
        entity,
        action,
        reason: draft.reason,
    })
}

fn require_id(
    id: &Option<String>,
    kind: OperationKind,
    entity: EntityKind,
) -> Result<String, AssemblyError> {
    match id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AssemblyError::validation(format!(
            "{} {} requires an id",
            kind, entity
        ))),
    }
}

// ── Payload parsing ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskDataWire {
    title: String,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    due_time: Option<String>,
    #[serde(default)]
    all_day: Option<bool>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskChangesWire {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    due_time: Option<String>,
    #[serde(default)]
    all_day: Option<bool>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoteDataWire {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoteChangesWire {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectChangesWire {
    description: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FileChangesWire {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

pub(crate) fn parse_create_payload(
    entity: EntityKind,
    data: &Value,
    resolver: &DomainResolver,
) -> Result<CreatePayload, AssemblyError> {
    match entity {
        EntityKind::Task => {
            let wire: TaskDataWire = from_value("task data", data)?;
            check_title("task title", &wire.title)?;
            let due_date = wire.due_date.as_deref().map(parse_date).transpose()?;
            let due_time = wire.due_time.as_deref().map(parse_time).transpose()?;
            // No time given means an all-day task unless the policy said
            // otherwise.
            let all_day = wire.all_day.unwrap_or(due_time.is_none());
            let project_id = resolver.project_for(wire.project_id, wire.domain)?;
            Ok(CreatePayload::Task(TaskDraft {
                title: wire.title,
                priority: wire.priority.unwrap_or_default(),
                due_date,
                due_time,
                all_day,
                project_id,
            }))
        }
        EntityKind::Note => {
            let wire: NoteDataWire = from_value("note data", data)?;
            check_title("note title", &wire.title)?;
            let project_id = resolver.project_for(wire.project_id, wire.domain)?;
            Ok(CreatePayload::Note(NoteDraft {
                title: wire.title,
                content: wire.content,
                project_id,
            }))
        }
        EntityKind::Project | EntityKind::File => Err(AssemblyError::validation(format!(
            "{} entities cannot be created here",
            entity
        ))),
    }
}

pub(crate) fn parse_change_set(
    entity: EntityKind,
    changes: &Value,
    resolver: &DomainResolver,
) -> Result<ChangeSet, AssemblyError> {
    match entity {
        EntityKind::Task => {
            let wire: TaskChangesWire = from_value("task changes", changes)?;
            if let Some(title) = &wire.title {
                check_title("task title", title)?;
            }
            let due_date = wire.due_date.as_deref().map(parse_date).transpose()?;
            let due_time = wire.due_time.as_deref().map(parse_time).transpose()?;
            let project_id = match (wire.project_id, wire.domain) {
                (None, None) => None,
                (id, domain) => resolver.project_for(id, domain)?,
            };
            Ok(ChangeSet::Task(TaskChanges {
                title: wire.title,
                priority: wire.priority,
                due_date,
                due_time,
                all_day: wire.all_day,
                done: wire.done,
                project_id,
            }))
        }
        EntityKind::Note => {
            // Note content is immutable after creation; strip it rather
            // than passing it through and ignoring it silently.
            let changes = strip_note_content(changes);
            let wire: NoteChangesWire = from_value("note changes", &changes)?;
            if let Some(title) = &wire.title {
                check_title("note title", title)?;
            }
            let project_id = match (wire.project_id, wire.domain) {
                (None, None) => None,
                (id, domain) => resolver.project_for(id, domain)?,
            };
            Ok(ChangeSet::Note(NoteChanges {
                title: wire.title,
                project_id,
            }))
        }
        EntityKind::Project => {
            let wire: ProjectChangesWire = from_value("project changes", changes)?;
            if wire.description.chars().count() > DESCRIPTION_MAX_CHARS {
                return Err(AssemblyError::validation(format!(
                    "project description exceeds {} characters",
                    DESCRIPTION_MAX_CHARS
                )));
            }
            Ok(ChangeSet::Project(ProjectChanges {
                description: wire.description,
            }))
        }
        EntityKind::File => {
            let wire: FileChangesWire = from_value("file changes", changes)?;
            let project_id = resolver
                .project_for(wire.project_id, wire.domain)?
                .ok_or_else(|| {
                    AssemblyError::validation("file update must reassign an owning project")
                })?;
            Ok(ChangeSet::File(FileChanges { project_id }))
        }
    }
}

fn strip_note_content(changes: &Value) -> Value {
    let mut changes = changes.clone();
    if let Some(map) = changes.as_object_mut() {
        if map.remove("content").is_some() {
            warn!("note content is immutable; dropping content from update changes");
        }
    }
    changes
}

fn from_value<T: serde::de::DeserializeOwned>(
    label: &str,
    value: &Value,
) -> Result<T, AssemblyError> {
    serde_json::from_value(value.clone())
        .map_err(|e| AssemblyError::validation(format!("malformed {}: {}", label, e)))
}

fn check_title(label: &str, title: &str) -> Result<(), AssemblyError> {
    if title.trim().is_empty() {
        return Err(AssemblyError::validation(format!("{} is empty", label)));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AssemblyError::validation(format!(
            "{} exceeds {} characters",
            label, TITLE_MAX_CHARS
        )));
    }
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, AssemblyError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AssemblyError::validation(format!("invalid date \"{}\", expected YYYY-MM-DD", raw))
    })
}

fn parse_time(raw: &str) -> Result<NaiveTime, AssemblyError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
        AssemblyError::validation(format!("invalid time \"{}\", expected 24-hour HH:MM", raw))
    })
}

// ── Summary ───────────────────────────────────────────────────────────

fn render_summary(operations: &[Operation]) -> String {
    let mut counts: BTreeMap<(OperationKind, EntityKind), usize> = BTreeMap::new();
    for op in operations {
        *counts.entry((op.kind(), op.entity)).or_default() += 1;
    }

    // Counts sharing a verb merge under it: "create 2 tasks and 1 note".
    let mut by_verb: BTreeMap<OperationKind, Vec<String>> = BTreeMap::new();
    for ((kind, entity), n) in counts {
        let noun = if n == 1 { entity.singular() } else { entity.plural() };
        by_verb.entry(kind).or_default().push(format!("{} {}", n, noun));
    }

    let parts: Vec<String> = by_verb
        .into_iter()
        .map(|(kind, items)| format!("{} {}", kind.verb(), join_list(&items)))
        .collect();
    format!("I'll {}.", join_list(&parts))
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}
