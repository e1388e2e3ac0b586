// src/proposal/operation.rs

//! Operation shapes. `DraftOperation` is the untrusted wire form the
//! classification policy emits; `Operation` is the canonical form after
//! assembly, with the id/data/changes presence rules encoded structurally
//! and a stable transient index for selection and edit bookkeeping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workspace::{
    FileChanges, NoteChanges, NoteDraft, ProjectChanges, TaskChanges, TaskDraft,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Note,
    Project,
    File,
}

impl EntityKind {
    pub fn singular(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Note => "note",
            EntityKind::Project => "project",
            EntityKind::File => "file",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Task => "tasks",
            EntityKind::Note => "notes",
            EntityKind::Project => "projects",
            EntityKind::File => "files",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}

/// Wire shape of a proposed operation, exactly as exchanged with the
/// classification policy and the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftOperation {
    pub operation: OperationKind,
    #[serde(rename = "type")]
    pub entity: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Full payload for a create. Projects and files are never created through
/// this pipeline, so there is no variant for them.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePayload {
    Task(TaskDraft),
    Note(NoteDraft),
}

/// Partial payload for an update, per entity mutability rules.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSet {
    Task(TaskChanges),
    Note(NoteChanges),
    Project(ProjectChanges),
    File(FileChanges),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationAction {
    Create(CreatePayload),
    Update { id: String, changes: ChangeSet },
    Delete { id: String },
}

/// A validated operation. `index` is assigned once at assembly time and is
/// the only key used for selection membership and edits; payload equality
/// plays no part, so editing a payload cannot desync the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub index: usize,
    pub entity: EntityKind,
    pub action: OperationAction,
    pub reason: Option<String>,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self.action {
            OperationAction::Create(_) => OperationKind::Create,
            OperationAction::Update { .. } => OperationKind::Update,
            OperationAction::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Short label for result lines, e.g. `create task "Buy milk"`.
    pub fn describe(&self) -> String {
        match &self.action {
            OperationAction::Create(CreatePayload::Task(draft)) => {
                format!("create task \"{}\"", draft.title)
            }
            OperationAction::Create(CreatePayload::Note(draft)) => {
                format!("create note \"{}\"", draft.title)
            }
            OperationAction::Update { id, .. } => {
                format!("update {} {}", self.entity.singular(), id)
            }
            OperationAction::Delete { id } => {
                format!("delete {} {}", self.entity.singular(), id)
            }
        }
    }

    /// Render back to the wire shape for the client.
    pub fn to_wire(&self) -> DraftOperation {
        let (id, data, changes) = match &self.action {
            OperationAction::Create(payload) => (None, Some(create_to_value(payload)), None),
            OperationAction::Update { id, changes } => {
                (Some(id.clone()), None, Some(changes_to_value(changes)))
            }
            OperationAction::Delete { id } => (Some(id.clone()), None, None),
        };
        DraftOperation {
            operation: self.kind(),
            entity: self.entity,
            id,
            data,
            changes,
            reason: self.reason.clone(),
        }
    }
}

fn create_to_value(payload: &CreatePayload) -> Value {
    match payload {
        CreatePayload::Task(draft) => serde_json::json!({
            "title": draft.title,
            "priority": draft.priority.as_str(),
            "due_date": draft.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "due_time": draft.due_time.map(|t| t.format("%H:%M").to_string()),
            "all_day": draft.all_day,
            "project_id": draft.project_id,
        }),
        CreatePayload::Note(draft) => serde_json::json!({
            "title": draft.title,
            "content": draft.content,
            "project_id": draft.project_id,
        }),
    }
}

fn changes_to_value(changes: &ChangeSet) -> Value {
    let mut map = Map::new();
    match changes {
        ChangeSet::Task(c) => {
            if let Some(title) = &c.title {
                map.insert("title".into(), Value::String(title.clone()));
            }
            if let Some(priority) = c.priority {
                map.insert("priority".into(), Value::String(priority.as_str().into()));
            }
            if let Some(date) = c.due_date {
                map.insert(
                    "due_date".into(),
                    Value::String(date.format("%Y-%m-%d").to_string()),
                );
            }
            if let Some(time) = c.due_time {
                map.insert(
                    "due_time".into(),
                    Value::String(time.format("%H:%M").to_string()),
                );
            }
            if let Some(all_day) = c.all_day {
                map.insert("all_day".into(), Value::Bool(all_day));
            }
            if let Some(done) = c.done {
                map.insert("done".into(), Value::Bool(done));
            }
            if let Some(project_id) = &c.project_id {
                map.insert("project_id".into(), Value::String(project_id.clone()));
            }
        }
        ChangeSet::Note(c) => {
            if let Some(title) = &c.title {
                map.insert("title".into(), Value::String(title.clone()));
            }
            if let Some(project_id) = &c.project_id {
                map.insert("project_id".into(), Value::String(project_id.clone()));
            }
        }
        ChangeSet::Project(c) => {
            map.insert(
                "description".into(),
                Value::String(c.description.clone()),
            );
        }
        ChangeSet::File(c) => {
            map.insert("project_id".into(), Value::String(c.project_id.clone()));
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_round_trips() {
        let raw = json!({
            "operation": "update",
            "type": "note",
            "id": "n1",
            "changes": { "title": "Renamed" },
            "reason": "clearer name"
        });
        let draft: DraftOperation = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(draft.operation, OperationKind::Update);
        assert_eq!(draft.entity, EntityKind::Note);
        assert_eq!(serde_json::to_value(&draft).unwrap(), raw);
    }

    #[test]
    fn absent_optional_fields_stay_absent() {
        let draft: DraftOperation = serde_json::from_value(json!({
            "operation": "delete",
            "type": "file",
            "id": "f1"
        }))
        .unwrap();
        let rendered = serde_json::to_value(&draft).unwrap();
        assert!(rendered.get("data").is_none());
        assert!(rendered.get("changes").is_none());
        assert!(rendered.get("reason").is_none());
    }
}
