use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::persist::LoadOutcome;
use crate::store::Store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// Summary of how the store came up, so the UI can warn about damaged files.
pub fn open_summary(store: &Store) -> serde_json::Value {
    let report = store.load_report();
    let collections = report
        .outcomes
        .iter()
        .map(|(c, o)| {
            let (status, extra) = match o {
                LoadOutcome::Loaded(n) => ("loaded", json!({ "count": n })),
                LoadOutcome::Missing => ("missing", json!({})),
                LoadOutcome::Quarantined { backup, reason } => (
                    "quarantined",
                    json!({ "backup": backup.to_string_lossy(), "reason": reason }),
                ),
                LoadOutcome::Unreadable { reason } => ("unreadable", json!({ "reason": reason })),
            };
            let mut v = json!({ "collection": c.stem(), "status": status });
            if let (Some(obj), Some(extra)) = (v.as_object_mut(), extra.as_object()) {
                obj.extend(extra.clone());
            }
            v
        })
        .collect::<Vec<_>>();
    let dangling = report
        .dangling
        .iter()
        .map(|d| {
            json!({
                "collection": d.collection.stem(),
                "id": d.id,
                "parentKind": d.parent_kind,
                "parentId": d.parent_id,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "collections": collections,
        "defaultRubricCreated": report.default_rubric_created,
        "classListsRepaired": report.class_lists_repaired,
        "dangling": dangling,
        "dirError": report.dir_error,
    })
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let store = Store::open(&path);
    let summary = open_summary(&store);
    state.workspace = Some(path.clone());
    state.store = Some(store);
    ok(
        &req.id,
        json!({ "workspacePath": path.to_string_lossy(), "load": summary }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
