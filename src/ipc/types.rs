use crate::store::Store;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the sidecar holds between requests. The store is opened by
/// `workspace.select` and owned here for the life of the process.
#[derive(Debug, Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
}
