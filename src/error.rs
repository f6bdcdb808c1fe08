use serde::Serialize;
use thiserror::Error;

/// Failures raised by the write paths (grading, attendance marking) and by
/// identity lookups that callers choose to treat as hard errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("no profile matches identity token {token:?}")]
    NotFound { token: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    DataIntegrity(String),

    #[error("attendance for {subject} on {date} is already marked")]
    AlreadyMarked { subject: String, date: String },
}

impl CoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation_error",
            Self::DataIntegrity(_) => "data_integrity",
            Self::AlreadyMarked { .. } => "already_marked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeCode {
    NotFound,
    LowAttendance,
    DataIntegrity,
    ValidationError,
}

/// Advisory output attached to a best-effort result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub code: NoticeCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Notice {
    pub fn new(code: NoticeCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("data integrity: {}", message);
        Self::new(NoticeCode::DataIntegrity, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(NoticeCode::ValidationError, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&CoreError> for Notice {
    fn from(e: &CoreError) -> Self {
        match e {
            CoreError::NotFound { .. } => Notice::new(NoticeCode::NotFound, e.to_string()),
            CoreError::DataIntegrity(m) => Notice::data_integrity(m.clone()),
            CoreError::Validation { .. } | CoreError::AlreadyMarked { .. } => {
                Notice::validation(e.to_string())
            }
        }
    }
}

pub fn has_notice(notices: &[Notice], code: NoticeCode) -> bool {
    notices.iter().any(|n| n.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            CoreError::NotFound {
                token: "x".into()
            }
            .code(),
            "not_found"
        );
        assert_eq!(CoreError::validation("marks", "bad").code(), "validation_error");
        assert_eq!(CoreError::DataIntegrity("x".into()).code(), "data_integrity");
    }

    #[test]
    fn notice_serializes_screaming_code() {
        let n = Notice::new(NoticeCode::LowAttendance, "low");
        let v = serde_json::to_value(&n).expect("serialize");
        assert_eq!(v["code"], "LOW_ATTENDANCE");
        assert!(v.get("details").is_none());
    }
}
