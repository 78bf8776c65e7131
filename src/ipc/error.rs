use crate::error::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Failure of one handler, rendered into the error envelope by the caller.
#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new("not_found", format!("{} not found", what))
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        let details = match &e {
            StoreError::Persist { collection, .. } => Some(json!({ "collection": collection.stem() })),
            _ => None,
        };
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}
