use serde_json::json;

use crate::assignments::{
    assignments_for_student, derive_submission_status, max_marks_for, validate_marks,
    SubmissionState,
};
use crate::calc::{compute_gpa, compute_student_attendance};
use crate::identity::resolve_identity;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    Assignment, AttendanceRecord, GradeRecord, LoginIdentity, Role, Section, StudentProfile,
    Submission, SubmissionStatus,
};
use crate::normalize::{parse_collection, parse_required, RecordKind};

/// One call for the student landing page: identity, section, attendance,
/// GPA and the state of every assignment in the student's section.
fn handle_student(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let login: LoginIdentity = parse_required(RecordKind::Login, p, "login")?;
    if login.role != Role::Student {
        return Err(HandlerErr::bad_params("login.role must be STUDENT"));
    }
    let students: Vec<StudentProfile> = parse_collection(RecordKind::Student, p, "students")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    let attendance: Vec<AttendanceRecord> =
        parse_collection(RecordKind::Attendance, p, "attendance")?;
    let grades: Vec<GradeRecord> = parse_collection(RecordKind::Grade, p, "grades")?;
    let assignments: Vec<Assignment> =
        parse_collection(RecordKind::Assignment, p, "assignments")?;
    let submissions: Vec<Submission> =
        parse_collection(RecordKind::Submission, p, "submissions")?;

    let (identity, mut notices) = resolve_identity(&login, &students, &[]);
    let Some(student) = identity.student.as_ref() else {
        return Ok(json!({
            "identity": identity,
            "enrolled": false,
            "section": null,
            "attendance": null,
            "gpa": null,
            "assignments": [],
            "notices": notices,
        }));
    };

    let attendance = compute_student_attendance(
        &attendance,
        &student.id,
        student.rfid_tag.as_deref(),
        &state.config.attendance,
    );
    let gpa = compute_gpa(&grades, &student.id);

    let mine: Vec<Submission> = submissions
        .into_iter()
        .filter(|s| s.student_id == student.id)
        .collect();
    let (section, list) = assignments_for_student(student, &sections, &assignments);
    let mut rows = Vec::with_capacity(list.len());
    for a in list {
        let board = derive_submission_status(
            a,
            std::slice::from_ref(student),
            &sections,
            &mine,
            &state.config.grading,
        );
        let status = board
            .states
            .get(&student.id)
            .copied()
            .unwrap_or(SubmissionState::NotSubmitted);
        // Marks rejected while deriving the state are reported, not shown.
        let max_marks = max_marks_for(a, &state.config.grading);
        let marks = if status == SubmissionState::Graded {
            mine.iter()
                .filter(|s| s.assignment_id == a.id && s.status == SubmissionStatus::Graded)
                .filter_map(|s| s.marks)
                .filter(|m| validate_marks(*m, max_marks).is_ok())
                .last()
        } else {
            None
        };
        notices.extend(board.notices);
        rows.push(json!({
            "assignment": a,
            "status": status,
            "marks": marks,
        }));
    }

    Ok(json!({
        "identity": identity,
        "enrolled": true,
        "section": section,
        "attendance": attendance,
        "gpa": gpa,
        "assignments": rows,
        "notices": notices,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.student" => Some(respond(&req.id, || handle_student(state, req))),
        _ => None,
    }
}
