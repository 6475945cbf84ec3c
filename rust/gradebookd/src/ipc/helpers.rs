use crate::exchange::ImportError;
use crate::gradebook::GradebookError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::AppData;
use serde::Serialize;
use serde_json::json;

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

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<GradebookError> for HandlerErr {
    fn from(e: GradebookError) -> Self {
        HandlerErr::new(e.code(), e.to_string())
    }
}

impl From<ImportError> for HandlerErr {
    fn from(e: ImportError) -> Self {
        HandlerErr::new("import_failed", e.to_string()).with_details(json!({ "kind": e.kind() }))
    }
}

pub type HandlerResult = Result<serde_json::Value, HandlerErr>;

pub fn respond(req: &Request, result: HandlerResult) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn to_json<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value).map_err(|e| HandlerErr::new("serialize_failed", e.to_string()))
}

pub fn param_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {key}")))
}

pub fn param_opt_str<'a>(req: &'a Request, key: &str) -> Result<Option<&'a str>, HandlerErr> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{key} must be a string"))),
    }
}

pub fn param_opt_i64(req: &Request, key: &str) -> Result<Option<i64>, HandlerErr> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{key} must be an integer"))),
    }
}

pub fn param_i64(req: &Request, key: &str) -> Result<i64, HandlerErr> {
    param_opt_i64(req, key)?.ok_or_else(|| HandlerErr::new("bad_params", format!("missing {key}")))
}

pub fn param_row(req: &Request) -> Result<usize, HandlerErr> {
    let row = param_i64(req, "row")?;
    usize::try_from(row).map_err(|_| {
        HandlerErr::new("bad_params", "row must be >= 0").with_details(json!({ "row": row }))
    })
}

/// Mark cells arrive as typed text or as numbers; null clears the cell.
pub fn param_mark_input(req: &Request, key: &str) -> Result<String, HandlerErr> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(HandlerErr::new(
            "bad_params",
            format!("{key} must be a string or number"),
        )
        .with_details(json!({ key: other }))),
    }
}

pub fn require_workspace(state: &mut AppState) -> Result<&mut AppData, HandlerErr> {
    if state.store.is_none() {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    }
    Ok(&mut state.data)
}

/// Persists the live state and reports the outcome as `saved` on the result.
pub fn with_saved(state: &AppState, mut result: serde_json::Value) -> serde_json::Value {
    result["saved"] = json!(state.persist());
    result
}
