use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::AttendancePolicy;
use crate::error::{CoreError, Notice, NoticeCode};
use crate::model::{AttendanceKey, AttendanceRecord, AttendanceStatus, GradeRecord};

pub const MIN_SEMESTER: i64 = 1;
pub const MAX_SEMESTER: i64 = 8;

/// Rounds half away from zero to a whole percent.
pub fn round_percent(x: f64) -> f64 {
    x.round()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRate {
    pub percentage: f64,
    pub present: usize,
    pub total: usize,
}

impl AttendanceRate {
    fn from_counts(present: usize, total: usize, policy: &AttendancePolicy) -> Self {
        let percentage = if total > 0 {
            round_percent(100.0 * present as f64 / total as f64)
        } else {
            policy.empty_percentage
        };
        Self {
            percentage,
            present,
            total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowAttendance {
    pub percentage: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub percentage: f64,
    pub present: usize,
    pub total: usize,
    pub by_subject: BTreeMap<String, AttendanceRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_attendance: Option<LowAttendance>,
    pub notices: Vec<Notice>,
}

fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

fn key_matches(value: Option<&str>, identifier: &str) -> bool {
    !identifier.is_empty() && value.map(str::trim) == Some(identifier)
}

/// Attendance for one student, overall and per subject, matching records on
/// a single join key.
///
/// Records without a status are ignored. Records with an unparseable date
/// still count, but each one is reported.
pub fn compute_attendance(
    records: &[AttendanceRecord],
    key: AttendanceKey,
    identifier: &str,
    policy: &AttendancePolicy,
) -> AttendanceSummary {
    let identifier = identifier.trim();
    summarize_attendance(records, |r| key_matches(r.key(key), identifier), policy)
}

/// Like [`compute_attendance`], but a record belongs to the student when
/// either its `rfidTag` or its `studentId` names them. Mixed snapshots, where
/// some rows only carry one of the two keys, are counted in full.
pub fn compute_student_attendance(
    records: &[AttendanceRecord],
    student_id: &str,
    rfid_tag: Option<&str>,
    policy: &AttendancePolicy,
) -> AttendanceSummary {
    let student_id = student_id.trim();
    let rfid_tag = rfid_tag.map(str::trim).unwrap_or("");
    summarize_attendance(
        records,
        |r| {
            key_matches(r.key(AttendanceKey::Rfid), rfid_tag)
                || key_matches(r.key(AttendanceKey::StudentId), student_id)
        },
        policy,
    )
}

fn summarize_attendance<F>(
    records: &[AttendanceRecord],
    belongs: F,
    policy: &AttendancePolicy,
) -> AttendanceSummary
where
    F: Fn(&AttendanceRecord) -> bool,
{
    let mut notices = Vec::new();
    let mut present = 0usize;
    let mut total = 0usize;
    let mut subjects: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for r in records {
        let Some(status) = r.status else {
            continue;
        };
        if !belongs(r) {
            continue;
        }
        if let Some(date) = r.date.as_deref() {
            if parse_date(date).is_err() {
                notices.push(
                    Notice::validation(format!("malformed attendance date {:?}", date))
                        .with_details(serde_json::json!({ "subject": r.subject })),
                );
            }
        }

        let is_present = status == AttendanceStatus::Present;
        total += 1;
        if is_present {
            present += 1;
        }
        if let Some(subject) = r.subject.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let entry = subjects.entry(subject.to_string()).or_insert((0, 0));
            entry.1 += 1;
            if is_present {
                entry.0 += 1;
            }
        }
    }

    let overall = AttendanceRate::from_counts(present, total, policy);
    let by_subject = subjects
        .into_iter()
        .map(|(subject, (p, t))| (subject, AttendanceRate::from_counts(p, t, policy)))
        .collect();

    let low_attendance = if overall.percentage < policy.low_threshold {
        notices.push(
            Notice::new(
                NoticeCode::LowAttendance,
                format!(
                    "attendance {}% is below {}%",
                    overall.percentage, policy.low_threshold
                ),
            )
            .with_details(serde_json::json!({ "percentage": overall.percentage })),
        );
        Some(LowAttendance {
            percentage: overall.percentage,
            threshold: policy.low_threshold,
        })
    } else {
        None
    };

    AttendanceSummary {
        percentage: overall.percentage,
        present: overall.present,
        total: overall.total,
        by_subject,
        low_attendance,
        notices,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub identifier: String,
    #[serde(default)]
    pub key: AttendanceKey,
    pub subject: String,
    pub date: String,
    pub status: AttendanceStatus,
}

/// Records one attendance mark and returns the new snapshot.
///
/// A second mark for the same student, subject and date is rejected unless
/// `allow_override` is set, in which case the existing row is replaced.
pub fn mark_attendance(
    records: &[AttendanceRecord],
    mark: &AttendanceMark,
    allow_override: bool,
) -> Result<Vec<AttendanceRecord>, CoreError> {
    let identifier = mark.identifier.trim();
    if identifier.is_empty() {
        return Err(CoreError::validation("identifier", "must not be empty"));
    }
    let subject = mark.subject.trim();
    if subject.is_empty() {
        return Err(CoreError::validation("subject", "must not be empty"));
    }
    let date = parse_date(&mark.date)
        .map_err(|e| CoreError::validation("date", format!("expected YYYY-MM-DD: {}", e)))?;

    let same_slot = |r: &AttendanceRecord| {
        r.key(mark.key).map(str::trim) == Some(identifier)
            && r.subject.as_deref().map(str::trim) == Some(subject)
            && r.date.as_deref().and_then(|d| parse_date(d).ok()) == Some(date)
    };

    let mut out = records.to_vec();
    let row = AttendanceRecord {
        student_id: match mark.key {
            AttendanceKey::StudentId => Some(identifier.to_string()),
            AttendanceKey::Rfid => None,
        },
        rfid_tag: match mark.key {
            AttendanceKey::Rfid => Some(identifier.to_string()),
            AttendanceKey::StudentId => None,
        },
        subject: Some(subject.to_string()),
        date: Some(date.format("%Y-%m-%d").to_string()),
        status: Some(mark.status),
    };

    match out.iter().position(|r| same_slot(r)) {
        Some(_) if !allow_override => Err(CoreError::AlreadyMarked {
            subject: subject.to_string(),
            date: date.to_string(),
        }),
        Some(i) => {
            // Keep whichever join keys the stored row already had.
            let existing = &out[i];
            out[i] = AttendanceRecord {
                student_id: existing.student_id.clone().or(row.student_id),
                rfid_tag: existing.rfid_tag.clone().or(row.rfid_tag),
                ..row
            };
            Ok(out)
        }
        None => {
            out.push(row);
            Ok(out)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    O,
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    P,
    F,
}

impl LetterGrade {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "O" => Some(Self::O),
            "A+" => Some(Self::APlus),
            "A" => Some(Self::A),
            "B+" => Some(Self::BPlus),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "P" => Some(Self::P),
            "F" => Some(Self::F),
            _ => None,
        }
    }

    pub fn points(self) -> f64 {
        match self {
            Self::O => 10.0,
            Self::APlus => 9.0,
            Self::A => 8.0,
            Self::BPlus => 7.0,
            Self::B => 6.0,
            Self::C => 5.0,
            Self::P => 4.0,
            Self::F => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WeightedSum {
    points: f64,
    credits: f64,
    count: usize,
}

impl WeightedSum {
    fn add(&mut self, points: f64, credits: f64) {
        self.points += points * credits;
        self.credits += credits;
        self.count += 1;
    }

    fn average(&self) -> Option<f64> {
        if self.credits > 0.0 {
            Some(self.points / self.credits)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaSummary {
    pub overall: f64,
    pub total_credits: f64,
    pub by_semester: BTreeMap<i64, f64>,
    pub notices: Vec<Notice>,
}

/// Credit-weighted GPA for one student, per semester and across all
/// semesters combined.
///
/// Rows with an unknown letter, a semester outside 1..=8, or negative credits
/// are excluded and reported. A semester whose rows carry zero total credits
/// reports 0 with a DATA_INTEGRITY notice.
pub fn compute_gpa(grades: &[GradeRecord], student_id: &str) -> GpaSummary {
    let student_id = student_id.trim();
    let mut notices = Vec::new();
    let mut overall = WeightedSum::default();
    let mut semesters: BTreeMap<i64, WeightedSum> = BTreeMap::new();

    for g in grades.iter().filter(|g| g.student_id.trim() == student_id) {
        let subject = g.subject.as_deref().unwrap_or("?");
        let Some(letter) = LetterGrade::parse(&g.grade) else {
            notices.push(Notice::validation(format!(
                "unknown grade {:?} for {}",
                g.grade, subject
            )));
            continue;
        };
        if !(MIN_SEMESTER..=MAX_SEMESTER).contains(&g.semester) {
            notices.push(Notice::validation(format!(
                "semester {} for {} is outside {}..={}",
                g.semester, subject, MIN_SEMESTER, MAX_SEMESTER
            )));
            continue;
        }
        if !g.credits.is_finite() || g.credits < 0.0 {
            notices.push(Notice::validation(format!(
                "credits {} for {} must be a non-negative number",
                g.credits, subject
            )));
            continue;
        }

        overall.add(letter.points(), g.credits);
        semesters
            .entry(g.semester)
            .or_default()
            .add(letter.points(), g.credits);
    }

    let mut by_semester = BTreeMap::new();
    for (sem, sum) in semesters {
        let gpa = match sum.average() {
            Some(v) => v,
            None => {
                notices.push(
                    Notice::data_integrity(format!(
                        "semester {} has {} grade(s) but zero credits",
                        sem, sum.count
                    ))
                    .with_details(serde_json::json!({ "semester": sem })),
                );
                0.0
            }
        };
        by_semester.insert(sem, gpa);
    }

    let overall_gpa = match overall.average() {
        Some(v) => v,
        None => {
            if overall.count > 0 {
                notices.push(Notice::data_integrity(format!(
                    "student {} has grades but zero total credits",
                    student_id
                )));
            }
            0.0
        }
    };

    GpaSummary {
        overall: overall_gpa,
        total_credits: overall.credits,
        by_semester,
        notices,
    }
}
