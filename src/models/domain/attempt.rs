use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One student's single pass at an exam. Unique per (student_id, exam_id).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Attempt {
    pub id: String,
    pub student_id: String,
    pub exam_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub is_completed: bool,
    /// Frozen at finalization; `None` while in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreBreakdown>,
}

impl Attempt {
    pub fn start(student_id: &str, exam_id: &str, started_at: DateTime<Utc>) -> Self {
        Attempt {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            exam_id: exam_id.to_string(),
            started_at,
            submitted_at: None,
            score: 0.0,
            is_completed: false,
            result: None,
        }
    }

    /// Seconds left on the countdown, measured from the original start.
    pub fn remaining_seconds(&self, duration_seconds: i64, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        (duration_seconds - elapsed).max(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub attempted: i32,
    pub correct: i32,
    pub incorrect: i32,
    pub unattempted: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_attempt_starts_unscored_and_open() {
        let now = Utc::now();
        let attempt = Attempt::start("student-1", "exam-1", now);

        assert_eq!(attempt.started_at, now);
        assert_eq!(attempt.score, 0.0);
        assert!(!attempt.is_completed);
        assert!(attempt.submitted_at.is_none());
        assert!(attempt.result.is_none());
    }

    #[test]
    fn remaining_seconds_counts_from_original_start() {
        let start = Utc::now();
        let attempt = Attempt::start("student-1", "exam-1", start);

        assert_eq!(attempt.remaining_seconds(3600, start), 3600);
        assert_eq!(
            attempt.remaining_seconds(3600, start + Duration::minutes(15)),
            2700
        );
        assert_eq!(attempt.remaining_seconds(3600, start + Duration::hours(3)), 0);
    }

    #[test]
    fn attempt_round_trip_preserves_result() {
        let mut attempt = Attempt::start("student-1", "exam-1", Utc::now());
        attempt.is_completed = true;
        attempt.score = 8.75;
        attempt.result = Some(ScoreBreakdown {
            score: 8.75,
            attempted: 15,
            correct: 10,
            incorrect: 5,
            unattempted: 25,
        });

        let json = serde_json::to_string(&attempt).expect("attempt should serialize");
        let parsed: Attempt = serde_json::from_str(&json).expect("attempt should deserialize");

        assert_eq!(parsed, attempt);
    }
}
