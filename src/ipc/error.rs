use serde_json::json;

use crate::error::CoreError;
use crate::normalize::BoundaryError;

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

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<BoundaryError> for HandlerErr {
    fn from(e: BoundaryError) -> Self {
        Self::bad_params(e.to_string())
    }
}

impl From<CoreError> for HandlerErr {
    fn from(e: CoreError) -> Self {
        let details = match &e {
            CoreError::Validation { field, .. } => Some(json!({ "field": field })),
            CoreError::AlreadyMarked { subject, date } => {
                Some(json!({ "subject": subject, "date": date }))
            }
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

impl From<serde_json::Error> for HandlerErr {
    fn from(e: serde_json::Error) -> Self {
        Self {
            code: "internal",
            message: e.to_string(),
            details: None,
        }
    }
}

/// Runs a handler body and wraps its outcome in the response envelope.
pub fn respond(
    id: &str,
    body: impl FnOnce() -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    match body() {
        Ok(result) => ok(id, result),
        Err(e) => e.response(id),
    }
}
