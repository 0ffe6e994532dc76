use std::sync::Arc;

use validator::Validate;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{Admission, Exam, Question},
        dto::{
            request::{CreateExamRequest, CreateQuestionRequest, UpdateExamSettingsRequest},
            response::{AttemptResultRow, PublicQuestion},
        },
    },
    repositories::{
        AnswerRepository, AttemptRepository, ExamRepository, QuestionRepository,
        StudentRepository,
    },
    services::{
        locks::AttemptLocks,
        time_window::{ensure_admissible, is_admissible},
    },
};

/// Admin management of exams and their questions, plus the read paths
/// students use before starting.
pub struct ExamService {
    exams: Arc<dyn ExamRepository>,
    questions: Arc<dyn QuestionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    answers: Arc<dyn AnswerRepository>,
    students: Arc<dyn StudentRepository>,
    clock: Arc<dyn Clock>,
    locks: AttemptLocks,
}

fn check_window(exam: &Exam) -> AppResult<()> {
    if exam.start_time >= exam.end_time {
        return Err(AppError::ValidationError(
            "start_time must be before end_time".to_string(),
        ));
    }
    Ok(())
}

impl ExamService {
    pub fn new(
        exams: Arc<dyn ExamRepository>,
        questions: Arc<dyn QuestionRepository>,
        attempts: Arc<dyn AttemptRepository>,
        answers: Arc<dyn AnswerRepository>,
        students: Arc<dyn StudentRepository>,
        clock: Arc<dyn Clock>,
        locks: AttemptLocks,
    ) -> Self {
        Self {
            exams,
            questions,
            attempts,
            answers,
            students,
            clock,
            locks,
        }
    }

    pub async fn create_exam(&self, request: CreateExamRequest) -> AppResult<Exam> {
        request.validate()?;

        let mut exam = Exam::from_request(request);
        let now = self.clock.now();
        exam.created_at = Some(now);
        exam.modified_at = Some(now);
        check_window(&exam)?;

        let exam = self.exams.create(exam).await?;
        log::info!("Created exam {} ('{}')", exam.id, exam.title);
        Ok(exam)
    }

    pub async fn get_exam(&self, id: &str) -> AppResult<Exam> {
        self.exams
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", id)))
    }

    pub async fn list_exams(&self) -> AppResult<Vec<Exam>> {
        self.exams.list().await
    }

    /// Stored results of finalized attempts are not recomputed.
    pub async fn update_settings(
        &self,
        id: &str,
        request: UpdateExamSettingsRequest,
    ) -> AppResult<Exam> {
        request.validate()?;

        let mut exam = self.get_exam(id).await?;
        if let Some(title) = request.title {
            exam.title = title;
        }
        if let Some(start_time) = request.start_time {
            exam.start_time = start_time;
        }
        if let Some(end_time) = request.end_time {
            exam.end_time = end_time;
        }
        if let Some(duration_minutes) = request.duration_minutes {
            exam.duration_minutes = duration_minutes;
        }
        if let Some(total_questions) = request.total_questions {
            exam.total_questions = total_questions;
        }
        if let Some(is_active) = request.is_active {
            exam.is_active = is_active;
        }
        check_window(&exam)?;
        exam.modified_at = Some(self.clock.now());

        let exam = self.exams.update(exam).await?;
        log::info!("Updated settings of exam {}", exam.id);
        Ok(exam)
    }

    /// Removes the exam with its questions, attempts and their answers.
    /// Returns the ids of the attempts that were removed.
    pub async fn delete_exam(&self, id: &str) -> AppResult<Vec<String>> {
        let exam = self.get_exam(id).await?;

        let attempt_ids = self.attempt_ids(&exam.id).await?;
        let mut answers_removed = 0;
        for attempt_id in &attempt_ids {
            answers_removed += self.remove_attempt_locked(attempt_id).await?;
        }
        let attempts_removed = attempt_ids.len() as u64;
        // attempts started after the listing above
        let late_attempts = self.attempts.delete_by_exam(&exam.id).await?;
        let questions_removed = self.questions.delete_by_exam(&exam.id).await?;
        self.exams.delete(&exam.id).await?;

        log::info!(
            "Deleted exam {} with {} questions, {} attempts, {} answers",
            exam.id,
            questions_removed,
            attempts_removed + late_attempts,
            answers_removed
        );
        Ok(attempt_ids)
    }

    /// Ids of every attempt recorded against the exam.
    pub async fn attempt_ids(&self, exam_id: &str) -> AppResult<Vec<String>> {
        let attempts = self.attempts.find_by_exam(exam_id).await?;
        Ok(attempts.into_iter().map(|a| a.id).collect())
    }

    pub async fn add_question(
        &self,
        exam_id: &str,
        request: CreateQuestionRequest,
    ) -> AppResult<Question> {
        request.validate()?;
        let exam = self.get_exam(exam_id).await?;

        let order = match request.question_order {
            Some(order) => order,
            None => self.questions.count_by_exam(&exam.id).await? as i32,
        };

        let mut question = Question::new(
            &exam.id,
            &request.question_text,
            request.options,
            request.correct_answer,
            order,
        );
        question.section = request.section;
        question.category = request.category;
        question.difficulty = request.difficulty;
        question.explanation = request.explanation;
        question.created_at = Some(self.clock.now());

        let question = self.questions.create(question).await?;
        log::debug!("Added question {} to exam {}", question.id, exam.id);
        Ok(question)
    }

    /// Every question of the exam, answers included.
    pub async fn list_questions(&self, exam_id: &str) -> AppResult<Vec<Question>> {
        let exam = self.get_exam(exam_id).await?;
        self.questions.find_by_exam(&exam.id).await
    }

    pub async fn admission(&self, exam_id: &str) -> AppResult<Admission> {
        let exam = self.get_exam(exam_id).await?;
        is_admissible(&exam, self.clock.now())
    }

    /// The paper a student sits: the first `total_questions` questions in
    /// order, without answers. Only served while the exam is admissible.
    pub async fn exam_paper(&self, exam_id: &str) -> AppResult<Vec<PublicQuestion>> {
        let exam = self.get_exam(exam_id).await?;
        ensure_admissible(&exam, self.clock.now())?;

        let questions = self.questions.find_by_exam(&exam.id).await?;
        Ok(questions
            .into_iter()
            .take(exam.total_questions.max(0) as usize)
            .map(PublicQuestion::from)
            .collect())
    }

    pub async fn list_results(&self, exam_id: &str) -> AppResult<Vec<AttemptResultRow>> {
        let exam = self.get_exam(exam_id).await?;
        let attempts = self.attempts.find_by_exam(&exam.id).await?;

        let mut rows = Vec::with_capacity(attempts.len());
        for attempt in attempts {
            let student = self.students.find_by_id(&attempt.student_id).await?;
            rows.push(AttemptResultRow::new(attempt, student));
        }
        Ok(rows)
    }

    /// Removes an attempt and its answers so the student may sit the exam
    /// again.
    pub async fn delete_attempt(&self, attempt_id: &str) -> AppResult<()> {
        let _guard = self.locks.acquire(attempt_id).await;

        let attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))?;

        let answers_removed = self.answers.delete_by_attempt(&attempt.id).await?;
        self.attempts.delete(&attempt.id).await?;

        log::info!(
            "Deleted attempt {} of student {} ({} answers)",
            attempt.id,
            attempt.student_id,
            answers_removed
        );
        Ok(())
    }

    /// Deletes one attempt's answers and record under its lock. Returns the
    /// number of answers removed.
    async fn remove_attempt_locked(&self, attempt_id: &str) -> AppResult<u64> {
        let _guard = self.locks.acquire(attempt_id).await;

        let answers_removed = self.answers.delete_by_attempt(attempt_id).await?;
        match self.attempts.delete(attempt_id).await {
            Ok(()) | Err(AppError::NotFound(_)) => Ok(answers_removed),
            Err(e) => Err(e),
        }
    }
}
