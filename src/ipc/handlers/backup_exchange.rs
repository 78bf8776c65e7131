use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::core::open_summary;
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde_json::json;
use std::path::PathBuf;

fn required_path(req: &Request, key: &str) -> Option<PathBuf> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(out_path) = required_path(req, "outPath") else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };
    match backup::export_data_bundle(&store.layout().data_dir(), &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "outPath": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
            }),
        ),
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

/// Replaces the workspace data with a bundle and reopens the store from it.
fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(in_path) = required_path(req, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    let data_dir = match state.store.take() {
        Some(store) => store.layout().data_dir(),
        None => crate::persist::DataLayout::new(&workspace).data_dir(),
    };

    let result = backup::import_data_bundle(&in_path, &data_dir);
    // Reopen either way: on failure the previous data is still in place.
    let store = Store::open(&workspace);
    let summary = open_summary(&store);
    state.store = Some(store);

    match result {
        Ok(imported) => ok(
            &req.id,
            json!({
                "bundleFormatDetected": imported.bundle_format_detected,
                "entryCount": imported.entry_count,
                "load": summary,
            }),
        ),
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
