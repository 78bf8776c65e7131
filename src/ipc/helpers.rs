use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Non-empty trimmed string param.
pub fn get_required_name(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?.trim().to_string();
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(v)
}

/// Typed param. `Ok(None)` when the key is absent; an explicit `null` is
/// passed through to `T` so `Option` fields can be cleared.
pub fn get_typed<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<T>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e))),
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Runs `f` against the open store, or answers `no_workspace`.
pub fn with_store<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&mut Store, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(store) = state.store.as_mut() else {
        return HandlerErr::new("no_workspace", "select a workspace first").response(&req.id);
    };
    match f(store, &req.params) {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub type Handler = fn(&mut Store, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>;
