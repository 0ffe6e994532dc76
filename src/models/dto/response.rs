use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    auth::Role,
    models::domain::{Attempt, Question, QuestionOptions, ScoreBreakdown, Student},
};

#[derive(Debug, Clone, Serialize)]
pub struct StudentDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub enrollment_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Student> for StudentDto {
    fn from(student: Student) -> Self {
        StudentDto {
            id: student.id,
            name: student.name,
            email: student.email,
            enrollment_number: student.enrollment_number,
            created_at: student.created_at,
        }
    }
}

/// A question as shown to a student: no correct answer, no explanation.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub question_text: String,
    pub options: QuestionOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub question_order: i32,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        PublicQuestion {
            id: question.id,
            question_text: question.question_text,
            options: question.options,
            section: question.section,
            question_order: question.question_order,
        }
    }
}

/// One row of the admin results view.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResultRow {
    pub attempt_id: String,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_number: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreBreakdown>,
}

impl AttemptResultRow {
    pub fn new(attempt: Attempt, student: Option<Student>) -> Self {
        let (student_name, enrollment_number) = match student {
            Some(s) => (Some(s.name), Some(s.enrollment_number)),
            None => (None, None),
        };

        AttemptResultRow {
            attempt_id: attempt.id,
            student_id: attempt.student_id,
            student_name,
            enrollment_number,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            is_completed: attempt.is_completed,
            result: attempt.result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentDto>,
}

/// Outcome of a submit. `already_submitted` is true when the attempt had been
/// finalized before this request.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt_id: String,
    pub already_submitted: bool,
    pub result: ScoreBreakdown,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}
