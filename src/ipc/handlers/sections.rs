use serde_json::json;

use crate::cohort::{filter_students_by_sections, search_cohort};
use crate::identity::resolve_identity;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    LoginIdentity, Role, Section, SectionRef, StudentProfile, TeacherProfile, TimetableSlot,
};
use crate::normalize::{parse_collection, parse_required, RecordKind};
use crate::sections::{resolve_student_section, resolve_teacher_sections};

fn query_param(p: &serde_json::Value) -> &str {
    p.get("query").and_then(|v| v.as_str()).unwrap_or("")
}

fn handle_for_teacher(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let teacher: TeacherProfile = parse_required(RecordKind::Teacher, p, "teacher")?;
    let slots: Vec<TimetableSlot> = parse_collection(RecordKind::Timetable, p, "timetable")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    let (resolved, notices) = resolve_teacher_sections(&teacher, &slots, &sections);
    Ok(json!({ "sections": resolved, "notices": notices }))
}

fn handle_for_student(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let student: StudentProfile = parse_required(RecordKind::Student, p, "student")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    Ok(json!({ "section": resolve_student_section(&student, &sections) }))
}

fn handle_cohort_filter(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let students: Vec<StudentProfile> = parse_collection(RecordKind::Student, p, "students")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;
    let refs: Vec<SectionRef> = sections
        .into_iter()
        .map(|s| SectionRef {
            id: s.id.unwrap_or_default(),
            name: s.name.unwrap_or_default(),
        })
        .collect();
    let members = filter_students_by_sections(&students, &refs);
    Ok(json!({ "students": search_cohort(&members, query_param(p)) }))
}

/// The "my cohort" page: login to teacher, teacher to sections, sections to
/// students.
fn handle_cohort_for_teacher(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p = &req.params;
    let login: LoginIdentity = parse_required(RecordKind::Login, p, "login")?;
    let teachers: Vec<TeacherProfile> = parse_collection(RecordKind::Teacher, p, "teachers")?;
    let students: Vec<StudentProfile> = parse_collection(RecordKind::Student, p, "students")?;
    let slots: Vec<TimetableSlot> = parse_collection(RecordKind::Timetable, p, "timetable")?;
    let sections: Vec<Section> = parse_collection(RecordKind::Section, p, "sections")?;

    if login.role != Role::Teacher {
        return Err(HandlerErr::bad_params("login.role must be TEACHER"));
    }
    let (identity, mut notices) = resolve_identity(&login, &[], &teachers);

    // Without a profile the login id stands in, so class-teacher links that
    // were recorded against the account still resolve.
    let teacher = match (&identity.teacher, &identity.canonical_id) {
        (Some(t), _) => Some(t.clone()),
        (None, Some(id)) => Some(TeacherProfile {
            id: id.clone(),
            name: login.display_name.clone().unwrap_or_default(),
            email: login.email.clone(),
            employee_id: login.username.clone(),
            department: None,
        }),
        (None, None) => None,
    };

    let (mine, more) = match &teacher {
        Some(t) => resolve_teacher_sections(t, &slots, &sections),
        None => (Vec::new(), Vec::new()),
    };
    notices.extend(more);

    let members = filter_students_by_sections(&students, &mine);
    Ok(json!({
        "identity": identity,
        "sections": mine,
        "students": search_cohort(&members, query_param(p)),
        "notices": notices,
    }))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sections.forTeacher" => Some(respond(&req.id, || handle_for_teacher(req))),
        "sections.forStudent" => Some(respond(&req.id, || handle_for_student(req))),
        "cohort.filter" => Some(respond(&req.id, || handle_cohort_filter(req))),
        "cohort.forTeacher" => Some(respond(&req.id, || handle_cohort_for_teacher(req))),
        _ => None,
    }
}
