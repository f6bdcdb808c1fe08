//! Section resolution for teachers and students.

use std::collections::HashMap;

use crate::error::Notice;
use crate::model::{Section, SectionRef, StudentProfile, TeacherProfile, TimetableSlot};

fn present(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// A slot's `teacherId` was written by several screens: some stored the
/// profile id, others the login username (employee id) or email.
fn slot_belongs_to(slot: &TimetableSlot, teacher: &TeacherProfile) -> bool {
    match present(slot.teacher_id.as_deref()) {
        Some(tid) => {
            tid == teacher.id
                || present(teacher.employee_id.as_deref()) == Some(tid)
                || present(teacher.email.as_deref())
                    .map(|e| e.eq_ignore_ascii_case(tid))
                    .unwrap_or(false)
        }
        None => present(slot.instructor.as_deref()) == Some(teacher.name.trim()),
    }
}

/// Insertion-ordered union keyed by section id.
#[derive(Debug, Default)]
struct SectionUnion {
    order: Vec<SectionRef>,
    index: HashMap<String, usize>,
}

impl SectionUnion {
    fn insert(&mut self, id: &str, name: &str) {
        match self.index.get(id) {
            // Keep the first position; later records overwrite the name.
            Some(&i) => self.order[i].name = name.to_string(),
            None => {
                self.index.insert(id.to_string(), self.order.len());
                self.order.push(SectionRef {
                    id: id.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }
}

/// Sections a teacher instructs (timetable) plus sections they are class
/// teacher of, unioned by id with timetable-derived entries first.
pub fn resolve_teacher_sections(
    teacher: &TeacherProfile,
    slots: &[TimetableSlot],
    sections: &[Section],
) -> (Vec<SectionRef>, Vec<Notice>) {
    let mut union = SectionUnion::default();
    let mut dropped = 0usize;

    let from_timetable = slots
        .iter()
        .filter(|s| slot_belongs_to(s, teacher))
        .map(|s| (s.section_id.as_deref(), s.section_name.as_deref()));
    let from_class_teacher = sections
        .iter()
        .filter(|s| present(s.class_teacher_id.as_deref()) == Some(teacher.id.as_str()))
        .map(|s| (s.id.as_deref(), s.name.as_deref()));

    for (id, name) in from_timetable.chain(from_class_teacher) {
        match (present(id), present(name)) {
            (Some(id), Some(name)) => union.insert(id, name),
            _ => dropped += 1,
        }
    }

    let mut notices = Vec::new();
    if dropped > 0 {
        notices.push(Notice::data_integrity(format!(
            "dropped {} section reference(s) without both id and name for teacher {}",
            dropped, teacher.id
        )));
    }
    (union.order, notices)
}

/// The section a student belongs to: matched by id first, then by the legacy
/// name. Falls back to the student's own fields when both are populated but
/// the section collection has no such record.
pub fn resolve_student_section(
    student: &StudentProfile,
    sections: &[Section],
) -> Option<SectionRef> {
    let sid = present(student.section_id.as_deref());
    let sname = present(student.section_name.as_deref());

    let by_id = sid.and_then(|sid| {
        sections
            .iter()
            .find(|s| present(s.id.as_deref()) == Some(sid))
    });
    let by_name = || {
        sname.and_then(|n| {
            sections
                .iter()
                .find(|s| {
                    present(s.name.as_deref()).map(str::to_lowercase) == Some(n.to_lowercase())
                })
        })
    };

    if let Some(found) = by_id.or_else(by_name) {
        if let (Some(id), Some(name)) = (present(found.id.as_deref()), present(found.name.as_deref()))
        {
            return Some(SectionRef {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
    }

    match (sid, sname) {
        (Some(id), Some(name)) => Some(SectionRef {
            id: id.to_string(),
            name: name.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher() -> TeacherProfile {
        TeacherProfile {
            id: "t1".into(),
            name: "Meera Iyer".into(),
            email: Some("meera@uni.edu".into()),
            employee_id: Some("EMP1".into()),
            department: None,
        }
    }

    fn slot(teacher_id: Option<&str>, instructor: Option<&str>, sid: Option<&str>, sname: Option<&str>) -> TimetableSlot {
        TimetableSlot {
            id: None,
            day: Some("MON".into()),
            time: Some("09:00".into()),
            subject: Some("DS".into()),
            teacher_id: teacher_id.map(Into::into),
            instructor: instructor.map(Into::into),
            section_id: sid.map(Into::into),
            section_name: sname.map(Into::into),
        }
    }

    fn section(id: &str, name: &str, ct: Option<&str>) -> Section {
        Section {
            id: Some(id.into()),
            name: Some(name.into()),
            class_teacher_id: ct.map(Into::into),
        }
    }

    fn ids(v: &[SectionRef]) -> Vec<&str> {
        v.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn no_slots_and_no_class_teacher_is_empty() {
        let sections = vec![section("s1", "CSE-A", Some("other"))];
        let (out, notices) = resolve_teacher_sections(&teacher(), &[], &sections);
        assert!(out.is_empty());
        assert!(notices.is_empty());
    }

    #[test]
    fn timetable_before_class_teacher_and_deduplicated() {
        let slots = vec![
            slot(Some("t1"), None, Some("s2"), Some("CSE-B")),
            slot(Some("t1"), None, Some("s2"), Some("CSE-B")),
            slot(Some("t2"), None, Some("s9"), Some("ECE-A")),
        ];
        let sections = vec![
            section("s1", "CSE-A", Some("t1")),
            section("s2", "CSE-B", Some("t1")),
        ];
        let (out, _) = resolve_teacher_sections(&teacher(), &slots, &sections);
        assert_eq!(ids(&out), vec!["s2", "s1"]);
    }

    #[test]
    fn teacher_id_may_hold_employee_id_or_email() {
        let slots = vec![
            slot(Some("EMP1"), None, Some("s1"), Some("A")),
            slot(Some("MEERA@uni.edu"), None, Some("s2"), Some("B")),
        ];
        let (out, _) = resolve_teacher_sections(&teacher(), &slots, &[]);
        assert_eq!(ids(&out), vec!["s1", "s2"]);
    }

    #[test]
    fn instructor_name_only_when_teacher_id_missing() {
        let slots = vec![
            slot(None, Some("Meera Iyer"), Some("s1"), Some("A")),
            slot(Some("t2"), Some("Meera Iyer"), Some("s2"), Some("B")),
        ];
        let (out, _) = resolve_teacher_sections(&teacher(), &slots, &[]);
        assert_eq!(ids(&out), vec!["s1"]);
    }

    #[test]
    fn malformed_entries_are_dropped_with_notice() {
        let slots = vec![
            slot(Some("t1"), None, None, Some("A")),
            slot(Some("t1"), None, Some("s2"), None),
        ];
        let (out, notices) = resolve_teacher_sections(&teacher(), &slots, &[]);
        assert!(out.is_empty());
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn reordering_inputs_yields_same_set() {
        let slots = vec![
            slot(Some("t1"), None, Some("s1"), Some("A")),
            slot(Some("t1"), None, Some("s3"), Some("C")),
        ];
        let sections = vec![section("s2", "B", Some("t1")), section("s3", "C", Some("t1"))];
        let (a, _) = resolve_teacher_sections(&teacher(), &slots, &sections);
        let mut rs = slots.clone();
        rs.reverse();
        let mut rsec = sections.clone();
        rsec.reverse();
        let (b, _) = resolve_teacher_sections(&teacher(), &rs, &rsec);
        let mut a = ids(&a);
        let mut b = ids(&b);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn student_section_by_id_then_name_then_own_fields() {
        let sections = vec![section("s1", "CSE-A", None), section("s2", "CSE-B", None)];
        let mut st = StudentProfile {
            id: "st".into(),
            name: "Asha".into(),
            email: None,
            roll_no: None,
            rfid_tag: None,
            section_id: Some("s2".into()),
            section_name: Some("CSE-A".into()),
            year: None,
            branch: None,
            cgpa: None,
        };
        assert_eq!(resolve_student_section(&st, &sections).map(|s| s.id), Some("s2".into()));

        st.section_id = None;
        assert_eq!(resolve_student_section(&st, &sections).map(|s| s.id), Some("s1".into()));

        st.section_name = Some(" cse-b".into());
        assert_eq!(resolve_student_section(&st, &sections).map(|s| s.id), Some("s2".into()));

        st.section_id = Some("s7".into());
        st.section_name = Some("MECH".into());
        assert_eq!(
            resolve_student_section(&st, &sections),
            Some(SectionRef {
                id: "s7".into(),
                name: "MECH".into()
            })
        );

        st.section_name = None;
        assert_eq!(resolve_student_section(&st, &sections), None);
    }
}
