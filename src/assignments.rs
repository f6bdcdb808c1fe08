//! Assignment listing and per-student submission state.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::cohort::filter_students_by_sections;
use crate::config::GradingPolicy;
use crate::error::{CoreError, Notice};
use crate::model::{
    Assignment, Section, SectionRef, StudentProfile, Submission, SubmissionStatus,
};
use crate::sections::resolve_student_section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    NotSubmitted,
    Submitted,
    Graded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmissionEvent {
    Submit,
    Grade { marks: f64, max_marks: f64 },
}

pub fn validate_marks(marks: f64, max_marks: f64) -> Result<(), CoreError> {
    if !marks.is_finite() || marks < 0.0 || marks > max_marks {
        return Err(CoreError::validation(
            "marks",
            format!("{} is outside 0..={}", marks, max_marks),
        ));
    }
    Ok(())
}

impl SubmissionState {
    /// GRADED is terminal: a later submit leaves it graded, a later grade
    /// overwrites it in place.
    pub fn apply(self, event: SubmissionEvent) -> Result<Self, CoreError> {
        match event {
            SubmissionEvent::Submit => Ok(self.max(SubmissionState::Submitted)),
            SubmissionEvent::Grade { marks, max_marks } => {
                validate_marks(marks, max_marks)?;
                if self == SubmissionState::NotSubmitted {
                    return Err(CoreError::validation(
                        "submission",
                        "cannot grade work that was never submitted",
                    ));
                }
                Ok(SubmissionState::Graded)
            }
        }
    }
}

pub fn max_marks_for(assignment: &Assignment, policy: &GradingPolicy) -> f64 {
    assignment.max_marks.unwrap_or(policy.default_max_marks)
}

/// State a single submission row puts its student in. Rows that claim GRADED
/// with missing or out-of-range marks stay SUBMITTED and are reported.
fn row_state(sub: &Submission, max_marks: f64, notices: &mut Vec<Notice>) -> SubmissionState {
    let submitted = SubmissionState::Submitted;
    if sub.status != SubmissionStatus::Graded {
        return submitted;
    }
    let Some(marks) = sub.marks else {
        notices.push(Notice::data_integrity(format!(
            "submission by {} is GRADED without marks",
            sub.student_id
        )));
        return submitted;
    };
    match submitted.apply(SubmissionEvent::Grade { marks, max_marks }) {
        Ok(state) => state,
        Err(e) => {
            notices.push(Notice::from(&e).with_details(serde_json::json!({
                "studentId": sub.student_id,
                "marks": marks,
                "maxMarks": max_marks,
            })));
            submitted
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBoard {
    pub states: BTreeMap<String, SubmissionState>,
    pub notices: Vec<Notice>,
}

/// Per-student state for one assignment.
///
/// The roster is every student in the assignment's section (by id, or by the
/// section's name for legacy rows). Students with no submission row are
/// NOT_SUBMITTED. Submissions from students outside the roster are kept and
/// reported.
pub fn derive_submission_status(
    assignment: &Assignment,
    students: &[StudentProfile],
    sections: &[Section],
    submissions: &[Submission],
    policy: &GradingPolicy,
) -> SubmissionBoard {
    let mut notices = Vec::new();
    let max_marks = max_marks_for(assignment, policy);
    let mut states: BTreeMap<String, SubmissionState> = BTreeMap::new();

    let section = assignment.section_id.as_deref().map(|sid| {
        let name = sections
            .iter()
            .find(|s| s.id.as_deref() == Some(sid))
            .and_then(|s| s.name.clone())
            .unwrap_or_default();
        SectionRef {
            id: sid.to_string(),
            name,
        }
    });
    match &section {
        Some(section) => {
            for s in filter_students_by_sections(students, std::slice::from_ref(section)) {
                states.insert(s.id.clone(), SubmissionState::NotSubmitted);
            }
        }
        None => notices.push(Notice::data_integrity(format!(
            "assignment {} has no section",
            assignment.id
        ))),
    }

    let roster: HashSet<String> = states.keys().cloned().collect();
    for sub in submissions.iter().filter(|s| s.assignment_id == assignment.id) {
        let next = row_state(sub, max_marks, &mut notices);
        if !roster.contains(&sub.student_id) {
            notices.push(Notice::data_integrity(format!(
                "submission from {} who is not on the roster of assignment {}",
                sub.student_id, assignment.id
            )));
        }
        let current = states
            .entry(sub.student_id.clone())
            .or_insert(SubmissionState::NotSubmitted);
        *current = (*current).max(next);
    }

    SubmissionBoard { states, notices }
}

/// Write path: records marks on a submission. Out-of-range marks block the
/// operation; re-grading follows `policy.allow_regrade`.
pub fn grade_submission(
    assignment: &Assignment,
    submission: &Submission,
    marks: f64,
    feedback: Option<String>,
    policy: &GradingPolicy,
) -> Result<Submission, CoreError> {
    if submission.assignment_id != assignment.id {
        return Err(CoreError::validation(
            "assignmentId",
            format!(
                "submission belongs to {}, not {}",
                submission.assignment_id, assignment.id
            ),
        ));
    }
    if submission.status == SubmissionStatus::Graded && !policy.allow_regrade {
        return Err(CoreError::validation("submission", "already graded"));
    }
    let current = match submission.status {
        SubmissionStatus::Submitted => SubmissionState::Submitted,
        SubmissionStatus::Graded => SubmissionState::Graded,
    };
    current.apply(SubmissionEvent::Grade {
        marks,
        max_marks: max_marks_for(assignment, policy),
    })?;

    log::debug!(
        "graded submission of {} for {} with {}",
        submission.student_id,
        assignment.id,
        marks
    );
    Ok(Submission {
        status: SubmissionStatus::Graded,
        marks: Some(marks),
        feedback: feedback.or_else(|| submission.feedback.clone()),
        ..submission.clone()
    })
}

pub fn assignments_for_sections<'a>(
    assignments: &'a [Assignment],
    sections: &[SectionRef],
) -> Vec<&'a Assignment> {
    let ids: HashSet<&str> = sections.iter().map(|s| s.id.as_str()).collect();
    assignments
        .iter()
        .filter(|a| a.section_id.as_deref().map(|id| ids.contains(id)).unwrap_or(false))
        .collect()
}

pub fn assignments_for_student<'a>(
    student: &StudentProfile,
    sections: &[Section],
    assignments: &'a [Assignment],
) -> (Option<SectionRef>, Vec<&'a Assignment>) {
    match resolve_student_section(student, sections) {
        Some(section) => {
            let list = assignments_for_sections(assignments, std::slice::from_ref(&section));
            (Some(section), list)
        }
        None => {
            // Only a bare section id is known; still worth a lookup.
            let list = match student.section_id.as_deref() {
                Some(sid) => assignments
                    .iter()
                    .filter(|a| a.section_id.as_deref() == Some(sid))
                    .collect(),
                None => Vec::new(),
            };
            (None, list)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{has_notice, NoticeCode};

    fn assignment(max: Option<f64>) -> Assignment {
        Assignment {
            id: "a1".into(),
            section_id: Some("s1".into()),
            title: Some("Heaps".into()),
            subject: Some("DS".into()),
            deadline: Some("2025-02-01".into()),
            max_marks: max,
            teacher_id: None,
        }
    }

    fn student(id: &str, sid: Option<&str>, sname: Option<&str>) -> StudentProfile {
        StudentProfile {
            id: id.into(),
            name: id.to_uppercase(),
            email: None,
            roll_no: None,
            rfid_tag: None,
            section_id: sid.map(Into::into),
            section_name: sname.map(Into::into),
            year: None,
            branch: None,
            cgpa: None,
        }
    }

    fn sections() -> Vec<Section> {
        vec![Section {
            id: Some("s1".into()),
            name: Some("CSE-A".into()),
            class_teacher_id: None,
        }]
    }

    fn sub(student: &str, status: SubmissionStatus, marks: Option<f64>) -> Submission {
        Submission {
            id: None,
            assignment_id: "a1".into(),
            student_id: student.into(),
            status,
            marks,
            feedback: None,
        }
    }

    #[test]
    fn lifecycle_not_submitted_submitted_graded() {
        let a = assignment(Some(100.0));
        let roster = vec![student("st", Some("s1"), None)];
        let policy = GradingPolicy::default();

        let b = derive_submission_status(&a, &roster, &sections(), &[], &policy);
        assert_eq!(b.states["st"], SubmissionState::NotSubmitted);

        let pending = sub("st", SubmissionStatus::Submitted, None);
        let b = derive_submission_status(&a, &roster, &sections(), &[pending.clone()], &policy);
        assert_eq!(b.states["st"], SubmissionState::Submitted);

        let graded = grade_submission(&a, &pending, 85.0, None, &policy).expect("grade");
        let b = derive_submission_status(&a, &roster, &sections(), &[graded], &policy);
        assert_eq!(b.states["st"], SubmissionState::Graded);

        let err = grade_submission(&a, &pending, 150.0, None, &policy).expect_err("too high");
        assert_eq!(err.code(), "validation_error");
        let b = derive_submission_status(&a, &roster, &sections(), &[pending], &policy);
        assert_eq!(b.states["st"], SubmissionState::Submitted);
    }

    #[test]
    fn out_of_range_graded_row_stays_submitted() {
        let a = assignment(Some(100.0));
        let roster = vec![student("st", Some("s1"), None)];
        let rows = vec![sub("st", SubmissionStatus::Graded, Some(150.0))];
        let b = derive_submission_status(&a, &roster, &sections(), &rows, &GradingPolicy::default());
        assert_eq!(b.states["st"], SubmissionState::Submitted);
        assert!(has_notice(&b.notices, NoticeCode::ValidationError));
    }

    #[test]
    fn legacy_name_membership_and_orphans() {
        let a = assignment(None);
        let roster = vec![
            student("x", None, Some("CSE-A")),
            student("y", Some("s2"), None),
        ];
        let rows = vec![sub("ghost", SubmissionStatus::Submitted, None)];
        let b = derive_submission_status(&a, &roster, &sections(), &rows, &GradingPolicy::default());
        assert_eq!(b.states.get("x"), Some(&SubmissionState::NotSubmitted));
        assert!(!b.states.contains_key("y"));
        assert_eq!(b.states.get("ghost"), Some(&SubmissionState::Submitted));
        assert!(has_notice(&b.notices, NoticeCode::DataIntegrity));
    }

    #[test]
    fn graded_is_terminal() {
        let g = SubmissionState::Graded;
        assert_eq!(g.apply(SubmissionEvent::Submit).expect("submit"), SubmissionState::Graded);
        assert_eq!(
            g.apply(SubmissionEvent::Grade {
                marks: 40.0,
                max_marks: 50.0
            })
            .expect("regrade"),
            SubmissionState::Graded
        );
        assert!(SubmissionState::NotSubmitted
            .apply(SubmissionEvent::Grade {
                marks: 1.0,
                max_marks: 10.0
            })
            .is_err());
    }

    #[test]
    fn regrade_respects_policy() {
        let a = assignment(Some(50.0));
        let graded = sub("st", SubmissionStatus::Graded, Some(30.0));
        let out = grade_submission(&a, &graded, 45.0, Some("better".into()), &GradingPolicy::default())
            .expect("overwrite");
        assert_eq!(out.marks, Some(45.0));
        assert_eq!(out.feedback.as_deref(), Some("better"));

        let strict = GradingPolicy {
            allow_regrade: false,
            ..GradingPolicy::default()
        };
        assert!(grade_submission(&a, &graded, 45.0, None, &strict).is_err());
    }

    #[test]
    fn default_max_marks_applies_when_missing() {
        let a = assignment(None);
        let pending = sub("st", SubmissionStatus::Submitted, None);
        assert!(grade_submission(&a, &pending, 100.0, None, &GradingPolicy::default()).is_ok());
        assert!(grade_submission(&a, &pending, 100.5, None, &GradingPolicy::default()).is_err());
    }

    #[test]
    fn student_assignments_follow_resolved_section() {
        let mut other = assignment(None);
        other.id = "a2".into();
        other.section_id = Some("s9".into());
        let all = vec![assignment(None), other];
        let st = student("st", None, Some("CSE-A"));
        let (section, list) = assignments_for_student(&st, &sections(), &all);
        assert_eq!(section.map(|s| s.id), Some("s1".into()));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "a1");
    }
}
