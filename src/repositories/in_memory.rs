//! Process-local storage backends.
//!
//! These honor the same uniqueness and conditional-update rules as the Mongo
//! repositories, so services behave identically on either backend. Selected
//! with `STORAGE_BACKEND=memory`; data is lost on restart.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Answer, Attempt, Exam, Question, ScoreBreakdown, Student},
    repositories::{
        attempt_repository::sort_by_started_at, exam_repository::sort_by_start_time,
        question_repository::sort_by_order, AnswerRepository, AttemptRepository, ExamRepository,
        QuestionRepository, StudentRepository,
    },
};

#[derive(Default)]
pub struct InMemoryStudentRepository {
    students: Arc<RwLock<HashMap<String, Student>>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn create(&self, student: Student) -> AppResult<Student> {
        let mut students = self.students.write().await;
        let taken = students.values().any(|s| {
            s.id == student.id
                || s.email == student.email
                || s.enrollment_number == student.enrollment_number
        });
        if taken {
            return Err(AppError::AlreadyExists(format!(
                "Student with email '{}' or enrollment number '{}' already exists",
                student.email, student.enrollment_number
            )));
        }

        students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Student>> {
        let students = self.students.read().await;
        Ok(students.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Student>> {
        let email = email.trim().to_ascii_lowercase();
        let students = self.students.read().await;
        Ok(students.values().find(|s| s.email == email).cloned())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryExamRepository {
    exams: Arc<RwLock<HashMap<String, Exam>>>,
}

impl InMemoryExamRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamRepository for InMemoryExamRepository {
    async fn create(&self, exam: Exam) -> AppResult<Exam> {
        let mut exams = self.exams.write().await;
        if exams.contains_key(&exam.id) {
            return Err(AppError::AlreadyExists(format!(
                "Exam with id '{}' already exists",
                exam.id
            )));
        }

        exams.insert(exam.id.clone(), exam.clone());
        Ok(exam)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Exam>> {
        let exams = self.exams.read().await;
        Ok(exams.get(id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Exam>> {
        let exams = self.exams.read().await;
        let mut items: Vec<_> = exams.values().cloned().collect();
        sort_by_start_time(&mut items);
        Ok(items)
    }

    async fn update(&self, exam: Exam) -> AppResult<Exam> {
        let mut exams = self.exams.write().await;
        if !exams.contains_key(&exam.id) {
            return Err(AppError::NotFound(format!(
                "Exam with id '{}' not found",
                exam.id
            )));
        }

        exams.insert(exam.id.clone(), exam.clone());
        Ok(exam)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut exams = self.exams.write().await;
        match exams.remove(id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Exam with id '{}' not found", id))),
        }
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: Arc<RwLock<HashMap<String, Question>>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn create(&self, question: Question) -> AppResult<Question> {
        let mut questions = self.questions.write().await;
        if questions.contains_key(&question.id) {
            return Err(AppError::AlreadyExists(format!(
                "Question with id '{}' already exists",
                question.id
            )));
        }

        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>> {
        let questions = self.questions.read().await;
        Ok(questions.get(id).cloned())
    }

    async fn find_by_exam(&self, exam_id: &str) -> AppResult<Vec<Question>> {
        let questions = self.questions.read().await;
        let mut items: Vec<_> = questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        sort_by_order(&mut items);
        Ok(items)
    }

    async fn count_by_exam(&self, exam_id: &str) -> AppResult<u64> {
        let questions = self.questions.read().await;
        Ok(questions.values().filter(|q| q.exam_id == exam_id).count() as u64)
    }

    async fn delete_by_exam(&self, exam_id: &str) -> AppResult<u64> {
        let mut questions = self.questions.write().await;
        let before = questions.len();
        questions.retain(|_, q| q.exam_id != exam_id);
        Ok((before - questions.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAttemptRepository {
    attempts: Arc<RwLock<HashMap<String, Attempt>>>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn create(&self, attempt: Attempt) -> AppResult<Attempt> {
        let mut attempts = self.attempts.write().await;
        let taken = attempts.values().any(|a| {
            a.id == attempt.id
                || (a.student_id == attempt.student_id && a.exam_id == attempt.exam_id)
        });
        if taken {
            return Err(AppError::AlreadyExists(format!(
                "Attempt for student '{}' on exam '{}' already exists",
                attempt.student_id, attempt.exam_id
            )));
        }

        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Attempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.get(id).cloned())
    }

    async fn find_by_student_and_exam(
        &self,
        student_id: &str,
        exam_id: &str,
    ) -> AppResult<Option<Attempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| a.student_id == student_id && a.exam_id == exam_id)
            .cloned())
    }

    async fn find_by_exam(&self, exam_id: &str) -> AppResult<Vec<Attempt>> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<_> = attempts
            .values()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect();
        sort_by_started_at(&mut items);
        Ok(items)
    }

    async fn complete(
        &self,
        id: &str,
        result: &ScoreBreakdown,
        submitted_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut attempts = self.attempts.write().await;
        let Some(attempt) = attempts.get_mut(id) else {
            return Ok(false);
        };
        if attempt.is_completed {
            return Ok(false);
        }

        attempt.is_completed = true;
        attempt.score = result.score;
        attempt.submitted_at = Some(submitted_at);
        attempt.result = Some(*result);
        Ok(true)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut attempts = self.attempts.write().await;
        match attempts.remove(id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!(
                "Attempt with id '{}' not found",
                id
            ))),
        }
    }

    async fn delete_by_exam(&self, exam_id: &str) -> AppResult<u64> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, a| a.exam_id != exam_id);
        Ok((before - attempts.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Keyed by (attempt_id, question_id).
#[derive(Default)]
pub struct InMemoryAnswerRepository {
    answers: Arc<RwLock<HashMap<(String, String), Answer>>>,
}

impl InMemoryAnswerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnswerRepository for InMemoryAnswerRepository {
    async fn upsert(&self, answer: Answer) -> AppResult<Answer> {
        let mut answers = self.answers.write().await;
        let key = (answer.attempt_id.clone(), answer.question_id.clone());

        let stored = match answers.get(&key) {
            Some(existing) => Answer {
                id: existing.id.clone(),
                ..answer
            },
            None => answer,
        };
        answers.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_by_attempt(&self, attempt_id: &str) -> AppResult<Vec<Answer>> {
        let answers = self.answers.read().await;
        Ok(answers
            .values()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn delete_by_attempt(&self, attempt_id: &str) -> AppResult<u64> {
        let mut answers = self.answers.write().await;
        let before = answers.len();
        answers.retain(|(attempt, _), _| attempt != attempt_id);
        Ok((before - answers.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}
