use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::AnswerChoice;

/// The selected option for one question of one attempt. Keyed by
/// (attempt_id, question_id); a later selection replaces the earlier one.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Answer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub selected_answer: AnswerChoice,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(
        attempt_id: &str,
        question_id: &str,
        selected_answer: AnswerChoice,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Answer {
            id: Uuid::new_v4().to_string(),
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            selected_answer,
            is_correct,
            answered_at,
        }
    }
}
