//! Entity matching: free-form identity tokens to canonical profiles.

use serde::Serialize;

use crate::error::{Notice, NoticeCode};
use crate::model::{LoginIdentity, Role, StudentProfile, TeacherProfile};

/// Fields the matcher looks at, in precedence order.
pub trait Profile {
    fn profile_id(&self) -> &str;
    fn email(&self) -> Option<&str>;
    /// Roll number for students, employee id for teachers.
    fn registry_key(&self) -> Option<&str>;
    fn display_name(&self) -> &str;
}

impl Profile for StudentProfile {
    fn profile_id(&self) -> &str {
        &self.id
    }
    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
    fn registry_key(&self) -> Option<&str> {
        self.roll_no.as_deref()
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Profile for TeacherProfile {
    fn profile_id(&self) -> &str {
        &self.id
    }
    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
    fn registry_key(&self) -> Option<&str> {
        self.employee_id.as_deref()
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchField {
    Email,
    RegistryKey,
    Name,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileMatch<'a, P> {
    pub profile: Option<&'a P>,
    pub matched_on: Option<MatchField>,
    pub notices: Vec<Notice>,
}

fn field_value<P: Profile>(p: &P, field: MatchField) -> Option<&str> {
    match field {
        MatchField::Email => p.email(),
        MatchField::RegistryKey => p.registry_key(),
        MatchField::Name => Some(p.display_name()),
    }
}

fn same(a: Option<&str>, token: &str) -> bool {
    a.map(|v| v.trim().to_lowercase() == token.to_lowercase())
        .unwrap_or(false)
}

/// Resolves `token` against `profiles`.
///
/// Each field is tried across the whole collection before the next one, so an
/// email hit anywhere beats a roll-number hit earlier in the input. Within a
/// field the first profile in input order wins; further hits are reported as
/// a DATA_INTEGRITY notice rather than resolved through a secondary key.
pub fn resolve_profile<'a, P: Profile>(token: &str, profiles: &'a [P]) -> ProfileMatch<'a, P> {
    let token = token.trim();
    let mut notices = Vec::new();

    if !token.is_empty() {
        for field in [MatchField::Email, MatchField::RegistryKey, MatchField::Name] {
            let mut hits = profiles
                .iter()
                .filter(|p| same(field_value(*p, field), token));
            let Some(first) = hits.next() else {
                continue;
            };
            let others: Vec<&str> = hits.map(|p| p.profile_id()).collect();
            if !others.is_empty() {
                notices.push(
                    Notice::data_integrity(format!(
                        "identity token {:?} matches {} profiles; using {}",
                        token,
                        others.len() + 1,
                        first.profile_id()
                    ))
                    .with_details(serde_json::json!({
                        "chosen": first.profile_id(),
                        "ignored": others,
                    })),
                );
            }
            return ProfileMatch {
                profile: Some(first),
                matched_on: Some(field),
                notices,
            };
        }
    }

    notices.push(Notice::new(
        NoticeCode::NotFound,
        format!("no profile matches identity token {:?}", token),
    ));
    ProfileMatch {
        profile: None,
        matched_on: None,
        notices,
    }
}

/// The login resolved once per session and handed explicitly to every
/// downstream computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIdentity {
    pub role: Role,
    /// Profile id when a profile matched, otherwise the login's own id.
    pub canonical_id: Option<String>,
    pub student: Option<StudentProfile>,
    pub teacher: Option<TeacherProfile>,
}

impl ResolvedIdentity {
    pub fn is_enrolled(&self) -> bool {
        self.student.is_some()
    }
}

fn login_tokens(login: &LoginIdentity) -> Vec<&str> {
    [
        login.email.as_deref(),
        login.username.as_deref(),
        login.display_name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|t| !t.trim().is_empty())
    .collect()
}

fn resolve_with_tokens<'a, P: Profile>(
    tokens: &[&str],
    profiles: &'a [P],
    notices: &mut Vec<Notice>,
) -> Option<&'a P> {
    for token in tokens {
        let m = resolve_profile(token, profiles);
        if m.profile.is_some() {
            notices.extend(m.notices);
            return m.profile;
        }
    }
    None
}

pub fn resolve_identity(
    login: &LoginIdentity,
    students: &[StudentProfile],
    teachers: &[TeacherProfile],
) -> (ResolvedIdentity, Vec<Notice>) {
    let tokens = login_tokens(login);
    let mut notices = Vec::new();
    let fallback_id = login
        .user_id
        .clone()
        .or_else(|| login.email.clone())
        .or_else(|| login.username.clone());

    let mut identity = ResolvedIdentity {
        role: login.role,
        canonical_id: None,
        student: None,
        teacher: None,
    };

    match login.role {
        Role::Student => {
            identity.student = resolve_with_tokens(&tokens, students, &mut notices).cloned();
            identity.canonical_id = identity.student.as_ref().map(|s| s.id.clone());
        }
        Role::Teacher => {
            identity.teacher = resolve_with_tokens(&tokens, teachers, &mut notices).cloned();
            identity.canonical_id = identity
                .teacher
                .as_ref()
                .map(|t| t.id.clone())
                .or_else(|| login.user_id.clone());
        }
        Role::Admin => {
            identity.canonical_id = fallback_id;
        }
    }

    if login.role != Role::Admin && identity.student.is_none() && identity.teacher.is_none() {
        log::info!("no profile for login {:?}", tokens.first().unwrap_or(&""));
        notices.push(Notice::new(
            NoticeCode::NotFound,
            "no profile matches the login identity",
        ));
    }

    (identity, notices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::has_notice;

    fn student(id: &str, name: &str, email: &str, roll: &str) -> StudentProfile {
        StudentProfile {
            id: id.into(),
            name: name.into(),
            email: Some(email.into()),
            roll_no: Some(roll.into()),
            rfid_tag: None,
            section_id: None,
            section_name: None,
            year: None,
            branch: None,
            cgpa: None,
        }
    }

    fn teacher(id: &str, name: &str, email: &str, emp: &str) -> TeacherProfile {
        TeacherProfile {
            id: id.into(),
            name: name.into(),
            email: Some(email.into()),
            employee_id: Some(emp.into()),
            department: None,
        }
    }

    #[test]
    fn email_match_found_at_any_position() {
        let students = vec![
            student("1", "Asha", "asha@uni.edu", "R1"),
            student("2", "Bala", "bala@uni.edu", "R2"),
            student("3", "Chitra", "chitra@uni.edu", "R3"),
        ];
        for s in &students {
            let m = resolve_profile(s.email.as_deref().unwrap_or_default(), &students);
            assert_eq!(m.profile.map(|p| p.id.as_str()), Some(s.id.as_str()));
            assert_eq!(m.matched_on, Some(MatchField::Email));
        }
    }

    #[test]
    fn email_tier_beats_earlier_roll_number_hit() {
        let students = vec![
            student("1", "Asha", "asha@uni.edu", "x@uni.edu"),
            student("2", "Bala", "x@uni.edu", "R2"),
        ];
        let m = resolve_profile("x@uni.edu", &students);
        assert_eq!(m.profile.map(|p| p.id.as_str()), Some("2"));
    }

    #[test]
    fn roll_number_then_name_case_insensitive() {
        let students = vec![student("1", "Asha Rao", "asha@uni.edu", "21CS001")];
        assert_eq!(
            resolve_profile("21cs001", &students).matched_on,
            Some(MatchField::RegistryKey)
        );
        assert_eq!(
            resolve_profile("ASHA RAO", &students).matched_on,
            Some(MatchField::Name)
        );
    }

    #[test]
    fn name_match_is_exact_not_fuzzy() {
        let students = vec![student("1", "Asha Rao", "asha@uni.edu", "R1")];
        let m = resolve_profile("Asha", &students);
        assert!(m.profile.is_none());
        assert!(has_notice(&m.notices, NoticeCode::NotFound));
    }

    #[test]
    fn duplicate_match_keeps_first_and_flags_integrity() {
        let teachers = vec![
            teacher("t1", "Meera", "meera@uni.edu", "E1"),
            teacher("t2", "Meera", "other@uni.edu", "E2"),
        ];
        let m = resolve_profile("meera", &teachers);
        assert_eq!(m.profile.map(|p| p.id.as_str()), Some("t1"));
        assert!(has_notice(&m.notices, NoticeCode::DataIntegrity));
    }

    #[test]
    fn empty_token_is_not_found() {
        let students = vec![student("1", "", "a@b", "R1")];
        assert!(resolve_profile("  ", &students).profile.is_none());
    }

    #[test]
    fn teacher_login_falls_back_to_user_id() {
        let login = LoginIdentity {
            email: Some("new@uni.edu".into()),
            username: Some("newbie".into()),
            user_id: Some("u-77".into()),
            display_name: None,
            role: Role::Teacher,
        };
        let (identity, notices) = resolve_identity(&login, &[], &[]);
        assert_eq!(identity.canonical_id.as_deref(), Some("u-77"));
        assert!(identity.teacher.is_none());
        assert!(has_notice(&notices, NoticeCode::NotFound));
    }

    #[test]
    fn teacher_login_resolves_by_username_employee_id() {
        let teachers = vec![teacher("t9", "Meera", "meera@uni.edu", "EMP9")];
        let login = LoginIdentity {
            email: None,
            username: Some("EMP9".into()),
            user_id: Some("u-1".into()),
            display_name: None,
            role: Role::Teacher,
        };
        let (identity, notices) = resolve_identity(&login, &[], &teachers);
        assert_eq!(identity.canonical_id.as_deref(), Some("t9"));
        assert!(notices.is_empty());
    }
}
