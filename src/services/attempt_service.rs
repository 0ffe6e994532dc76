use std::sync::Arc;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::domain::{Attempt, Exam},
    repositories::{AttemptRepository, ExamRepository, StudentRepository},
    services::time_window::ensure_admissible,
};

pub struct AttemptService {
    attempts: Arc<dyn AttemptRepository>,
    exams: Arc<dyn ExamRepository>,
    students: Arc<dyn StudentRepository>,
    clock: Arc<dyn Clock>,
}

impl AttemptService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        exams: Arc<dyn ExamRepository>,
        students: Arc<dyn StudentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attempts,
            exams,
            students,
            clock,
        }
    }

    /// Create the student's attempt, or return the open one unchanged.
    pub async fn start_attempt(&self, student_id: &str, exam_id: &str) -> AppResult<Attempt> {
        let (_, attempt) = self.begin(student_id, exam_id).await?;
        Ok(attempt)
    }

    /// [`start_attempt`](Self::start_attempt), also handing back the exam it
    /// was admitted to.
    pub async fn begin(&self, student_id: &str, exam_id: &str) -> AppResult<(Exam, Attempt)> {
        let exam = self
            .exams
            .find_by_id(exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", exam_id)))?;

        let now = self.clock.now();
        ensure_admissible(&exam, now)?;

        if self.students.find_by_id(student_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Student with id '{}' not found",
                student_id
            )));
        }

        if let Some(existing) = self
            .attempts
            .find_by_student_and_exam(student_id, exam_id)
            .await?
        {
            return resume(existing).map(|attempt| (exam, attempt));
        }

        match self
            .attempts
            .create(Attempt::start(student_id, exam_id, now))
            .await
        {
            Ok(attempt) => {
                log::info!(
                    "Created attempt {} for student {} on exam {}",
                    attempt.id,
                    student_id,
                    exam_id
                );
                Ok((exam, attempt))
            }
            Err(AppError::AlreadyExists(msg)) => {
                // A concurrent start won the insert; hand back its attempt.
                let winner = self
                    .attempts
                    .find_by_student_and_exam(student_id, exam_id)
                    .await?
                    .ok_or(AppError::AlreadyExists(msg))?;
                resume(winner).map(|attempt| (exam, attempt))
            }
            Err(err) => Err(err),
        }
    }
}

fn resume(attempt: Attempt) -> AppResult<Attempt> {
    if attempt.is_completed {
        return Err(AppError::AlreadyCompleted);
    }
    log::info!(
        "Resuming attempt {} for student {} (started {})",
        attempt.id,
        attempt.student_id,
        attempt.started_at
    );
    Ok(attempt)
}
