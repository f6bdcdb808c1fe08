use serde_json::json;

use crate::identity::{resolve_identity, resolve_profile};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{LoginIdentity, StudentProfile, TeacherProfile};
use crate::normalize::{parse_collection, parse_required, required_str, RecordKind};

fn handle_resolve_profile(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let token = required_str(p, "token")?;
    let kind = p.get("kind").and_then(|v| v.as_str()).unwrap_or("student");

    match kind {
        "student" => {
            let students: Vec<StudentProfile> =
                parse_collection(RecordKind::Student, p, "students")?;
            let m = resolve_profile(&token, &students);
            Ok(json!({
                "profile": m.profile,
                "matchedOn": m.matched_on,
                "notices": m.notices,
            }))
        }
        "teacher" => {
            let teachers: Vec<TeacherProfile> =
                parse_collection(RecordKind::Teacher, p, "teachers")?;
            let m = resolve_profile(&token, &teachers);
            Ok(json!({
                "profile": m.profile,
                "matchedOn": m.matched_on,
                "notices": m.notices,
            }))
        }
        other => Err(HandlerErr::bad_params(format!(
            "kind must be 'student' or 'teacher', got {:?}",
            other
        ))),
    }
}

fn handle_resolve(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let login: LoginIdentity = parse_required(RecordKind::Login, p, "login")?;
    let students: Vec<StudentProfile> = parse_collection(RecordKind::Student, p, "students")?;
    let teachers: Vec<TeacherProfile> = parse_collection(RecordKind::Teacher, p, "teachers")?;
    let (identity, notices) = resolve_identity(&login, &students, &teachers);
    Ok(json!({
        "identity": identity,
        "notices": notices,
    }))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "identity.resolveProfile" => Some(respond(&req.id, || handle_resolve_profile(req))),
        "identity.resolve" => Some(respond(&req.id, || handle_resolve(req))),
        _ => None,
    }
}
