use std::sync::Arc;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::domain::{Answer, AnswerChoice},
    repositories::{AnswerRepository, AttemptRepository, QuestionRepository},
    services::locks::AttemptLocks,
};

pub struct AnswerService {
    attempts: Arc<dyn AttemptRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
    clock: Arc<dyn Clock>,
    locks: AttemptLocks,
}

impl AnswerService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
        clock: Arc<dyn Clock>,
        locks: AttemptLocks,
    ) -> Self {
        Self {
            attempts,
            questions,
            answers,
            clock,
            locks,
        }
    }

    /// Store the selected option for a question, replacing any earlier one.
    ///
    /// Correctness is decided here and never recomputed. The attempt's score
    /// is left alone.
    pub async fn record_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        selected_answer: &str,
    ) -> AppResult<Answer> {
        let choice: AnswerChoice = selected_answer.parse()?;

        let _guard = self.locks.acquire(attempt_id).await;

        let attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))?;
        if attempt.is_completed {
            return Err(AppError::AttemptFinalized(attempt_id.to_string()));
        }

        let question = self
            .questions
            .find_by_id(question_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Question with id '{}' not found", question_id))
            })?;
        if question.exam_id != attempt.exam_id {
            return Err(AppError::ValidationError(format!(
                "Question '{}' does not belong to this exam",
                question_id
            )));
        }

        let answer = Answer::new(
            attempt_id,
            question_id,
            choice,
            question.is_correct(choice),
            self.clock.now(),
        );
        let stored = self.answers.upsert(answer).await?;

        log::debug!(
            "Recorded answer {} for question {} on attempt {}",
            stored.selected_answer,
            question_id,
            attempt_id
        );
        Ok(stored)
    }
}
