use serde_json::json;

use crate::calc::{compute_attendance, mark_attendance, AttendanceMark};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceKey, AttendanceRecord};
use crate::normalize::{parse_collection, required_str, RecordKind};

fn parse_key(p: &serde_json::Value) -> Result<AttendanceKey, HandlerErr> {
    match p.get("key").and_then(|v| v.as_str()) {
        None | Some("rfid") => Ok(AttendanceKey::Rfid),
        Some("studentId") => Ok(AttendanceKey::StudentId),
        Some(other) => Err(HandlerErr::bad_params(format!(
            "key must be 'rfid' or 'studentId', got {:?}",
            other
        ))),
    }
}

fn handle_compute(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let records: Vec<AttendanceRecord> = parse_collection(RecordKind::Attendance, p, "records")?;
    let identifier = required_str(p, "identifier")?;
    let key = parse_key(p)?;
    let summary = compute_attendance(&records, key, &identifier, &state.config.attendance);
    Ok(serde_json::to_value(summary)?)
}

fn handle_mark(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let records: Vec<AttendanceRecord> = parse_collection(RecordKind::Attendance, p, "records")?;
    let Some(raw_mark) = p.get("mark") else {
        return Err(HandlerErr::bad_params("missing mark"));
    };
    let mut raw_mark = raw_mark.clone();
    crate::normalize::normalize_record(RecordKind::Attendance, &mut raw_mark);
    let mark: AttendanceMark = serde_json::from_value(raw_mark)
        .map_err(|e| HandlerErr::bad_params(format!("mark: {}", e)))?;
    let allow_override = p.get("override").and_then(|v| v.as_bool()).unwrap_or(false);

    let records = mark_attendance(&records, &mark, allow_override)?;
    Ok(json!({ "records": records }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.compute" => Some(respond(&req.id, || handle_compute(state, req))),
        "attendance.mark" => Some(respond(&req.id, || handle_mark(req))),
        _ => None,
    }
}
