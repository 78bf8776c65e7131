use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, with_store, Handler};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde_json::json;
use std::path::PathBuf;

/// Copies a scan into the submission's directory. With `attach: true` the
/// returned path is also appended to the submission's image list.
fn images_import(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let source = PathBuf::from(get_required_str(params, "sourcePath")?);
    let submission_id = get_required_str(params, "submissionId")?;
    let attach = params
        .get("attach")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let mut sub = if attach {
        Some(
            store
                .submission(&submission_id)
                .cloned()
                .ok_or_else(|| HandlerErr::not_found("submission"))?,
        )
    } else {
        None
    };

    let relative = store.images().import_image(&source, &submission_id);
    if let (Some(rel), Some(sub)) = (relative.as_ref(), sub.as_mut()) {
        if !sub.image_paths.iter().any(|p| p == rel) {
            sub.image_paths.push(rel.clone());
            store.update_submission(sub.clone())?;
        }
    }
    Ok(json!({ "relativePath": relative }))
}

fn images_resolve(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let rel = get_required_str(params, "relativePath")?;
    let path = store.images().resolve(&rel);
    Ok(json!({ "path": path.to_string_lossy() }))
}

/// Probes a stored image. Only the detected format and size cross the pipe;
/// the UI reads the bytes from the resolved path itself.
fn images_load(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let rel = get_required_str(params, "relativePath")?;
    let image = store.images().load(&rel).map(|img| {
        json!({
            "format": img.format.as_str(),
            "byteLength": img.bytes.len(),
        })
    });
    Ok(json!({ "image": image }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "images.import" => images_import,
        "images.resolve" => images_resolve,
        "images.load" => images_load,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
