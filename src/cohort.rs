use std::collections::HashSet;

use crate::model::{SectionRef, StudentProfile};

/// Students whose `sectionId` or legacy `sectionName` names one of
/// `sections`. Names match ignoring case and surrounding whitespace. Each
/// student appears once, in input order, even when both fields match or the
/// roster lists the same id twice.
pub fn filter_students_by_sections<'a>(
    students: &'a [StudentProfile],
    sections: &[SectionRef],
) -> Vec<&'a StudentProfile> {
    let ids: HashSet<&str> = sections
        .iter()
        .map(|s| s.id.as_str())
        .filter(|id| !id.is_empty())
        .collect();
    let names: HashSet<String> = sections
        .iter()
        .map(|s| s.name.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut out = Vec::new();

    for s in students {
        let by_id = s
            .section_id
            .as_deref()
            .map(|v| ids.contains(v))
            .unwrap_or(false);
        let by_name = s
            .section_name
            .as_deref()
            .map(|v| names.contains(&v.trim().to_lowercase()))
            .unwrap_or(false);
        if (by_id || by_name) && seen.insert(s.id.as_str()) {
            out.push(s);
        }
    }
    out
}

/// Case-insensitive substring search over name and email.
pub fn search_cohort<'a>(students: &[&'a StudentProfile], query: &str) -> Vec<&'a StudentProfile> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return students.to_vec();
    }
    students
        .iter()
        .copied()
        .filter(|s| {
            s.name.to_lowercase().contains(&q)
                || s.email
                    .as_deref()
                    .map(|e| e.to_lowercase().contains(&q))
                    .unwrap_or(false)
        })
        .collect()
}
