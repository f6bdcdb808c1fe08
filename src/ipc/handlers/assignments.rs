use serde_json::json;

use crate::assignments::{
    assignments_for_sections, assignments_for_student, derive_submission_status,
    grade_submission,
};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{Assignment, Section, SectionRef, StudentProfile, Submission};
use crate::normalize::{parse_collection, parse_required, RecordKind};

fn handle_for_student(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let student: StudentProfile = parse_required(RecordKind::Student, p, "student")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    let assignments: Vec<Assignment> =
        parse_collection(RecordKind::Assignment, p, "assignments")?;
    let (section, list) = assignments_for_student(&student, &sections, &assignments);
    Ok(json!({ "section": section, "assignments": list }))
}

fn handle_for_sections(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    let sections: Vec<SectionRef> = sections
        .into_iter()
        .map(|s| SectionRef {
            id: s.id.unwrap_or_default(),
            name: s.name.unwrap_or_default(),
        })
        .collect();
    let assignments: Vec<Assignment> =
        parse_collection(RecordKind::Assignment, p, "assignments")?;
    Ok(json!({ "assignments": assignments_for_sections(&assignments, &sections) }))
}

fn handle_status(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let assignment: Assignment = parse_required(RecordKind::Assignment, p, "assignment")?;
    let students: Vec<StudentProfile> = parse_collection(RecordKind::Student, p, "students")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    let submissions: Vec<Submission> =
        parse_collection(RecordKind::Submission, p, "submissions")?;
    let board = derive_submission_status(
        &assignment,
        &students,
        &sections,
        &submissions,
        &state.config.grading,
    );
    Ok(serde_json::to_value(board)?)
}

fn handle_grade(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let assignment: Assignment = parse_required(RecordKind::Assignment, p, "assignment")?;
    let submission: Submission = parse_required(RecordKind::Submission, p, "submission")?;
    let Some(marks) = p.get("marks").and_then(|v| v.as_f64()) else {
        return Err(HandlerErr::bad_params("marks must be a number"));
    };
    let feedback = p
        .get("feedback")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let graded = grade_submission(
        &assignment,
        &submission,
        marks,
        feedback,
        &state.config.grading,
    )?;
    Ok(json!({ "submission": graded }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.forStudent" => Some(respond(&req.id, || handle_for_student(req))),
        "assignments.forSections" => Some(respond(&req.id, || handle_for_sections(req))),
        "submissions.status" => Some(respond(&req.id, || handle_status(state, req))),
        "submissions.grade" => Some(respond(&req.id, || handle_grade(state, req))),
        _ => None,
    }
}
