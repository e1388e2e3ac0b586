// tests/assembler_test.rs

mod common;

use serde_json::json;
use tend::error::AssemblyError;
use tend::policy::Scope;
use tend::proposal::{assemble, DraftOperation, OperationAction};

fn draft(raw: serde_json::Value) -> DraftOperation {
    serde_json::from_value(raw).unwrap()
}

#[test]
fn create_must_not_carry_an_id() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "task",
            "id": "t1",
            "data": { "title": "Buy milk" }
        }))],
    )
    .unwrap_err();
    assert!(matches!(err, AssemblyError::Validation(_)));
}

#[test]
fn update_requires_an_id() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "update",
            "type": "task",
            "changes": { "done": true }
        }))],
    )
    .unwrap_err();
    assert!(err.to_string().contains("requires an id"));
}

#[test]
fn files_cannot_be_created_through_proposals() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "file",
            "data": { "name": "report.pdf" }
        }))],
    )
    .unwrap_err();
    assert!(err.to_string().contains("upload"));
}

#[test]
fn projects_are_fixed() {
    let snapshot = common::snapshot_with_domains();
    for op in ["create", "delete"] {
        let mut raw = json!({ "operation": op, "type": "project" });
        if op == "create" {
            raw["data"] = json!({ "name": "Cooking" });
        } else {
            raw["id"] = json!("U1");
        }
        let err = assemble(&Scope::Global, &snapshot, vec![draft(raw)]).unwrap_err();
        assert!(matches!(err, AssemblyError::Validation(_)), "{} slipped through", op);
    }

    // Description updates are the one allowed project mutation.
    let proposal = assemble(
        &Scope::Global,
        &snapshot,
        vec![draft(json!({
            "operation": "update",
            "type": "project",
            "id": "U1",
            "changes": { "description": "Health and fitness" }
        }))],
    )
    .unwrap();
    assert_eq!(proposal.summary, "I'll update 1 project.");
}

#[test]
fn over_limit_title_is_rejected_not_truncated() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "task",
            "data": { "title": "x".repeat(51) }
        }))],
    )
    .unwrap_err();
    assert!(err.to_string().contains("50"));
}

#[test]
fn scope_rejects_out_of_universe_entities() {
    let err = assemble(
        &Scope::Tasks,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "note",
            "data": { "title": "Meeting notes", "content": "..." }
        }))],
    )
    .unwrap_err();
    assert!(matches!(err, AssemblyError::Authorization { .. }));
    assert_eq!(err.to_string(), "note operations are not allowed in tasks scope");
}

#[test]
fn domain_names_resolve_to_project_ids() {
    let proposal = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "task",
            "data": { "title": "Morning run", "domain": "Body" }
        }))],
    )
    .unwrap();
    let wire = proposal.operations[0].to_wire();
    assert_eq!(wire.data.unwrap()["project_id"], "U1");
}

#[test]
fn unresolvable_domain_is_an_error_not_null() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "task",
            "data": { "title": "Morning run", "domain": "Cooking" }
        }))],
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown domain \"Cooking\""));
}

#[test]
fn project_scope_assigns_its_project_to_creates() {
    let scope = Scope::Project {
        project_id: "U3".into(),
    };
    let proposal = assemble(
        &scope,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "note",
            "data": { "title": "Sprint retro", "content": "went fine" }
        }))],
    )
    .unwrap();
    let wire = proposal.operations[0].to_wire();
    assert_eq!(wire.data.unwrap()["project_id"], "U3");
}

#[test]
fn note_content_is_stripped_from_updates() {
    let proposal = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "update",
            "type": "note",
            "id": "n1",
            "changes": { "title": "Renamed", "content": "rewrite attempt" }
        }))],
    )
    .unwrap();
    let wire = proposal.operations[0].to_wire();
    let changes = wire.changes.unwrap();
    assert_eq!(changes["title"], "Renamed");
    assert!(changes.get("content").is_none());
}

#[test]
fn one_bad_operation_blocks_the_whole_proposal() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![
            draft(json!({
                "operation": "create",
                "type": "task",
                "data": { "title": "Fine task" }
            })),
            draft(json!({
                "operation": "update",
                "type": "task",
                "changes": { "done": true }
            })),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, AssemblyError::Validation(_)));
}

#[test]
fn task_without_time_defaults_to_all_day() {
    let proposal = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![
            draft(json!({
                "operation": "create",
                "type": "task",
                "data": { "title": "Dentist", "due_date": "2026-09-01" }
            })),
            draft(json!({
                "operation": "create",
                "type": "task",
                "data": { "title": "Standup", "due_date": "2026-09-01", "due_time": "09:30" }
            })),
        ],
    )
    .unwrap();

    let all_day = proposal.operations[0].to_wire().data.unwrap();
    assert_eq!(all_day["all_day"], true);
    let timed = proposal.operations[1].to_wire().data.unwrap();
    assert_eq!(timed["all_day"], false);
    assert_eq!(timed["due_time"], "09:30");
}

#[test]
fn malformed_dates_are_rejected() {
    let err = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![draft(json!({
            "operation": "create",
            "type": "task",
            "data": { "title": "Dentist", "due_date": "next tuesday" }
        }))],
    )
    .unwrap_err();
    assert!(err.to_string().contains("YYYY-MM-DD"));
}

#[test]
fn summary_counts_match_operations() {
    let proposal = assemble(
        &Scope::Global,
        &common::snapshot_with_domains(),
        vec![
            draft(json!({
                "operation": "create",
                "type": "task",
                "data": { "title": "One" }
            })),
            draft(json!({
                "operation": "create",
                "type": "task",
                "data": { "title": "Two" }
            })),
            draft(json!({
                "operation": "delete",
                "type": "note",
                "id": "n1"
            })),
        ],
    )
    .unwrap();
    assert_eq!(proposal.summary, "I'll create 2 tasks and delete 1 note.");
    assert!(matches!(
        proposal.operations[2].action,
        OperationAction::Delete { .. }
    ));
}
