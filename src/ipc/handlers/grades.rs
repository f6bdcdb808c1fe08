use crate::calc::compute_gpa;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::GradeRecord;
use crate::normalize::{parse_collection, required_str, RecordKind};

fn handle_gpa(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let grades: Vec<GradeRecord> = parse_collection(RecordKind::Grade, p, "grades")?;
    let student_id = required_str(p, "studentId")?;
    Ok(serde_json::to_value(compute_gpa(&grades, &student_id))?)
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.gpa" => Some(respond(&req.id, || handle_gpa(req))),
        _ => None,
    }
}
