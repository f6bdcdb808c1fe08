//! Boundary normalization.
//!
//! Records arrive from several backends that disagree on spelling: `_id`
//! versus `id`, numeric versus string ids, `rfidUid` versus `rfidTag`,
//! `section` versus `sectionName`. Everything is folded into one canonical
//! shape here, once, so the matching code never re-implements fallbacks.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("missing {0}")]
    Missing(String),

    #[error("{field} must be an array")]
    NotAnArray { field: String },

    #[error("{field}[{index}]: {message}")]
    Malformed {
        field: String,
        index: usize,
        message: String,
    },

    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Student,
    Teacher,
    Section,
    Timetable,
    Attendance,
    Grade,
    Assignment,
    Submission,
    Login,
}

fn is_id_key(key: &str) -> bool {
    key == "id" || key.ends_with("Id") || key == "rollNo" || key == "rfidTag"
}

fn blank_to_null(v: &mut Value) {
    let blank = v.as_str().map(|s| s.trim().is_empty()).unwrap_or(false);
    if blank {
        *v = Value::Null;
    }
}

fn number_to_string(v: &mut Value) {
    if let Value::Number(n) = v {
        *v = Value::String(n.to_string());
    }
}

fn is_missing(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Moves `from` into `to` when `to` is absent. `from` is always removed.
fn fold_field(obj: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(v) = obj.remove(from) {
        if is_missing(obj, to) {
            obj.insert(to.to_string(), v);
        }
    }
}

fn normalize_status(obj: &mut Map<String, Value>) {
    let Some(Value::String(s)) = obj.get("status") else {
        return;
    };
    let t = s.trim().to_ascii_uppercase();
    let canonical = match t.as_str() {
        "P" | "PRESENT" => Value::String("PRESENT".into()),
        "A" | "ABSENT" => Value::String("ABSENT".into()),
        "" => Value::Null,
        _ => Value::String(t),
    };
    obj.insert("status".into(), canonical);
}

/// Canonicalizes one record in place.
pub fn normalize_record(kind: RecordKind, value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };

    fold_field(obj, "_id", "id");
    fold_field(obj, "rfidUid", "rfidTag");

    match kind {
        RecordKind::Timetable => fold_field(obj, "section", "sectionName"),
        // The login's own id is the account id, never a profile id.
        RecordKind::Login => fold_field(obj, "id", "userId"),
        RecordKind::Attendance => {
            // Attendance rows may embed the whole student document.
            if let Some(Value::Object(mut student)) = obj.remove("student") {
                fold_field(&mut student, "_id", "id");
                fold_field(&mut student, "rfidUid", "rfidTag");
                if let Some(id) = student.remove("id") {
                    if is_missing(obj, "studentId") {
                        obj.insert("studentId".into(), id);
                    }
                }
                if let Some(tag) = student.remove("rfidTag") {
                    if is_missing(obj, "rfidTag") {
                        obj.insert("rfidTag".into(), tag);
                    }
                }
            }
            normalize_status(obj);
        }
        RecordKind::Submission => {
            if let Some(Value::String(s)) = obj.get_mut("status") {
                *s = s.trim().to_ascii_uppercase();
            }
        }
        _ => {}
    }

    for (key, v) in obj.iter_mut() {
        if is_id_key(key) {
            number_to_string(v);
            blank_to_null(v);
        }
    }
}

/// Normalizes and deserializes one record.
pub fn parse_record<T: DeserializeOwned>(
    kind: RecordKind,
    field: &str,
    raw: &Value,
) -> Result<T, BoundaryError> {
    let mut v = raw.clone();
    normalize_record(kind, &mut v);
    serde_json::from_value(v).map_err(|e| BoundaryError::Invalid {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Normalizes and deserializes `params[field]` as a collection. A missing or
/// null field is an empty collection.
pub fn parse_collection<T: DeserializeOwned>(
    kind: RecordKind,
    params: &Value,
    field: &str,
) -> Result<Vec<T>, BoundaryError> {
    let items = match params.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(BoundaryError::NotAnArray {
                field: field.to_string(),
            })
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, raw) in items.iter().enumerate() {
        let mut v = raw.clone();
        normalize_record(kind, &mut v);
        let parsed = serde_json::from_value(v).map_err(|e| BoundaryError::Malformed {
            field: field.to_string(),
            index,
            message: e.to_string(),
        })?;
        out.push(parsed);
    }
    Ok(out)
}

/// Like [`parse_record`] but for a required `params[field]`.
pub fn parse_required<T: DeserializeOwned>(
    kind: RecordKind,
    params: &Value,
    field: &str,
) -> Result<T, BoundaryError> {
    match params.get(field) {
        None | Some(Value::Null) => Err(BoundaryError::Missing(field.to_string())),
        Some(raw) => parse_record(kind, field, raw),
    }
}

pub fn required_str(params: &Value, field: &str) -> Result<String, BoundaryError> {
    match params.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(BoundaryError::Missing(field.to_string())),
    }
}
