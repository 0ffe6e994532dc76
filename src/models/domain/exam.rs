use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::dto::request::CreateExamRequest;

/// A fixed-length multiple-choice exam offered within a time window.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_questions: i32,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Exam {
    pub fn new(
        title: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
        total_questions: i32,
    ) -> Self {
        Exam {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            start_time,
            end_time,
            duration_minutes,
            total_questions,
            is_active: true,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn from_request(request: CreateExamRequest) -> Self {
        let mut exam = Exam::new(
            &request.title,
            request.start_time,
            request.end_time,
            request.duration_minutes,
            request.total_questions,
        );
        exam.is_active = request.is_active.unwrap_or(true);
        exam
    }

    pub fn duration_seconds(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }
}

/// Why an exam refused admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    NotYetStarted,
    Expired,
    Inactive,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DenialReason::NotYetStarted => "not-yet-started",
            DenialReason::Expired => "expired",
            DenialReason::Inactive => "inactive",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Admission {
    pub admissible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl Admission {
    pub fn granted() -> Self {
        Self {
            admissible: true,
            reason: None,
        }
    }

    pub fn denied(reason: DenialReason) -> Self {
        Self {
            admissible: false,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn exam_defaults_to_active_with_fresh_id() {
        let now = Utc::now();
        let exam = Exam::new("Physics", now, now + Duration::hours(2), 60, 40);

        assert!(exam.is_active);
        assert!(!exam.id.is_empty());
        assert_eq!(exam.duration_seconds(), 3600);
    }

    #[test]
    fn denial_reason_serializes_kebab_case() {
        let json = serde_json::to_string(&DenialReason::NotYetStarted).expect("should serialize");
        assert_eq!(json, "\"not-yet-started\"");

        let parsed: DenialReason = serde_json::from_str("\"expired\"").expect("should parse");
        assert_eq!(parsed, DenialReason::Expired);
    }

    #[test]
    fn denied_admission_carries_reason() {
        let admission = Admission::denied(DenialReason::Inactive);
        assert!(!admission.admissible);
        assert_eq!(admission.reason, Some(DenialReason::Inactive));
        assert_eq!(Admission::granted().reason, None);
    }
}
