use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::models::domain::question::{AnswerChoice, QuestionOptions};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 3, max = 50))]
    pub enrollment_number: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, max = 256))]
    pub secret_code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i32,

    #[validate(range(min = 1, max = 500))]
    pub total_questions: i32,

    pub is_active: Option<bool>,
}

/// Partial settings update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateExamSettingsRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i32>,

    #[validate(range(min = 1, max = 500))]
    pub total_questions: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,

    pub options: QuestionOptions,
    pub correct_answer: AnswerChoice,

    #[validate(length(max = 100))]
    pub section: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 50))]
    pub difficulty: Option<String>,

    #[validate(length(max = 4000))]
    pub explanation: Option<String>,

    #[validate(range(min = 0))]
    pub question_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    #[validate(length(min = 1, max = 64))]
    pub question_id: String,

    /// Option letter, either case.
    #[validate(length(min = 1, max = 1))]
    pub selected_answer: String,
}
