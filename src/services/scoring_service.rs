use std::{collections::HashMap, sync::Arc};

use crate::{
    clock::Clock,
    config::MarkingScheme,
    errors::{AppError, AppResult},
    models::domain::{Answer, Attempt, Question, ScoreBreakdown},
    repositories::{AnswerRepository, AttemptRepository, ExamRepository, QuestionRepository},
    services::locks::AttemptLocks,
};

/// Result of a finalize call. Both arms carry the stored breakdown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FinalizeOutcome {
    /// This call computed and persisted the score.
    Finalized(ScoreBreakdown),
    /// The attempt was already complete; nothing was recomputed.
    AlreadyFinalized(ScoreBreakdown),
}

impl FinalizeOutcome {
    pub fn result(&self) -> ScoreBreakdown {
        match self {
            FinalizeOutcome::Finalized(b) | FinalizeOutcome::AlreadyFinalized(b) => *b,
        }
    }

    pub fn finalized_now(&self) -> bool {
        matches!(self, FinalizeOutcome::Finalized(_))
    }
}

/// Classify each of the first `total_questions` slots and apply `marking`.
///
/// `questions` must be ordered by `question_order`. Slots beyond the number
/// of questions present count as unattempted; answers to questions outside
/// the slots are ignored.
pub fn compute_score(
    questions: &[Question],
    total_questions: i32,
    answers: &[Answer],
    marking: &MarkingScheme,
) -> ScoreBreakdown {
    let total = total_questions.max(0);
    let by_question: HashMap<&str, &Answer> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a))
        .collect();

    let mut correct = 0;
    let mut incorrect = 0;
    for question in questions.iter().take(total as usize) {
        match by_question.get(question.id.as_str()) {
            Some(answer) if answer.is_correct => correct += 1,
            Some(_) => incorrect += 1,
            None => {}
        }
    }

    let attempted = correct + incorrect;
    let unattempted = total - attempted;
    let score = f64::from(correct) * marking.correct_answer
        + f64::from(incorrect) * marking.incorrect_answer
        + f64::from(unattempted) * marking.unanswered;

    ScoreBreakdown {
        score,
        attempted,
        correct,
        incorrect,
        unattempted,
    }
}

fn stored_result(attempt: &Attempt) -> AppResult<ScoreBreakdown> {
    attempt.result.ok_or_else(|| {
        AppError::InternalError(format!(
            "Attempt '{}' is completed but has no stored result",
            attempt.id
        ))
    })
}

pub struct ScoringService {
    attempts: Arc<dyn AttemptRepository>,
    exams: Arc<dyn ExamRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
    clock: Arc<dyn Clock>,
    locks: AttemptLocks,
    marking: MarkingScheme,
}

impl ScoringService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        exams: Arc<dyn ExamRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
        clock: Arc<dyn Clock>,
        locks: AttemptLocks,
        marking: MarkingScheme,
    ) -> Self {
        Self {
            attempts,
            exams,
            questions,
            answers,
            clock,
            locks,
            marking,
        }
    }

    /// Score and close the attempt exactly once.
    ///
    /// Repeat calls return the stored breakdown untouched. Concurrent calls
    /// in this process are serialized per attempt; across processes the
    /// conditional completion update decides the winner.
    pub async fn finalize_attempt(&self, attempt_id: &str) -> AppResult<FinalizeOutcome> {
        let _guard = self.locks.acquire(attempt_id).await;

        let attempt = self.find_attempt(attempt_id).await?;
        if attempt.is_completed {
            return Ok(FinalizeOutcome::AlreadyFinalized(stored_result(&attempt)?));
        }

        let exam = self
            .exams
            .find_by_id(&attempt.exam_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Exam with id '{}' not found", attempt.exam_id))
            })?;
        let questions = self.questions.find_by_exam(&exam.id).await?;
        let answers = self.answers.find_by_attempt(attempt_id).await?;

        let breakdown = compute_score(&questions, exam.total_questions, &answers, &self.marking);
        let submitted_at = self.clock.now();

        if self
            .attempts
            .complete(attempt_id, &breakdown, submitted_at)
            .await?
        {
            log::info!(
                "Finalized attempt {} for student {}: score {} ({} correct, {} incorrect, {} unattempted)",
                attempt_id,
                attempt.student_id,
                breakdown.score,
                breakdown.correct,
                breakdown.incorrect,
                breakdown.unattempted
            );
            return Ok(FinalizeOutcome::Finalized(breakdown));
        }

        // Lost the conditional update to another writer.
        let winner = self.find_attempt(attempt_id).await?;
        if winner.is_completed {
            log::debug!("Attempt {} was finalized concurrently", attempt_id);
            return Ok(FinalizeOutcome::AlreadyFinalized(stored_result(&winner)?));
        }

        Err(AppError::StorageError(format!(
            "Completion of attempt '{}' was not applied",
            attempt_id
        )))
    }

    /// The stored result if the attempt is already complete.
    pub async fn completed_result(&self, attempt_id: &str) -> AppResult<Option<ScoreBreakdown>> {
        let attempt = self.find_attempt(attempt_id).await?;
        if attempt.is_completed {
            Ok(Some(stored_result(&attempt)?))
        } else {
            Ok(None)
        }
    }

    async fn find_attempt(&self, attempt_id: &str) -> AppResult<Attempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))
    }
}
