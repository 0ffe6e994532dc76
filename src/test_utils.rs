use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    clock::ManualClock,
    config::Config,
    errors::AppResult,
    models::domain::{Answer, Attempt, Exam, Question, Student},
    repositories::{
        AnswerRepository, AttemptRepository, ExamRepository, InMemoryAnswerRepository,
        InMemoryAttemptRepository, InMemoryExamRepository, InMemoryQuestionRepository,
        InMemoryStudentRepository, QuestionRepository, StudentRepository,
    },
    services::{
        answer_service::AnswerService, attempt_service::AttemptService,
        exam_service::ExamService, locks::AttemptLocks, scoring_service::ScoringService,
        session_service::SessionService,
    },
};

pub mod fixtures {
    use crate::models::domain::{AnswerChoice, Question, QuestionOptions};

    const CHOICES: [AnswerChoice; 4] = [
        AnswerChoice::A,
        AnswerChoice::B,
        AnswerChoice::C,
        AnswerChoice::D,
    ];

    /// `n` questions ordered 0..n with correct answers cycling A to D.
    pub fn questions_for(exam_id: &str, n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::new(
                    exam_id,
                    &format!("Question {}", i + 1),
                    QuestionOptions {
                        a: "alpha".to_string(),
                        b: "bravo".to_string(),
                        c: "charlie".to_string(),
                        d: "delta".to_string(),
                    },
                    CHOICES[i % CHOICES.len()],
                    i as i32,
                )
            })
            .collect()
    }

    pub fn wrong_choice(correct: AnswerChoice) -> AnswerChoice {
        match correct {
            AnswerChoice::A => AnswerChoice::B,
            _ => AnswerChoice::A,
        }
    }
}

/// Counts `find_by_attempt` calls so tests can tell how often scoring ran.
pub struct CountingAnswerRepository {
    inner: InMemoryAnswerRepository,
    reads: AtomicUsize,
}

impl CountingAnswerRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryAnswerRepository::new(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerRepository for CountingAnswerRepository {
    async fn upsert(&self, answer: Answer) -> AppResult<Answer> {
        self.inner.upsert(answer).await
    }

    async fn find_by_attempt(&self, attempt_id: &str) -> AppResult<Vec<Answer>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_attempt(attempt_id).await
    }

    async fn delete_by_attempt(&self, attempt_id: &str) -> AppResult<u64> {
        self.inner.delete_by_attempt(attempt_id).await
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// In-memory stores, a manual clock, and service builders wired over them.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub students: Arc<InMemoryStudentRepository>,
    pub exams: Arc<InMemoryExamRepository>,
    pub questions: Arc<InMemoryQuestionRepository>,
    pub attempts: Arc<InMemoryAttemptRepository>,
    pub answers: Arc<CountingAnswerRepository>,
    pub locks: AttemptLocks,
    pub config: Config,
    start: DateTime<Utc>,
}

impl Harness {
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            clock: Arc::new(ManualClock::new(start)),
            students: Arc::new(InMemoryStudentRepository::new()),
            exams: Arc::new(InMemoryExamRepository::new()),
            questions: Arc::new(InMemoryQuestionRepository::new()),
            attempts: Arc::new(InMemoryAttemptRepository::new()),
            answers: Arc::new(CountingAnswerRepository::new()),
            locks: AttemptLocks::new(),
            config: Config::test_config(),
            start,
        }
    }

    /// The instant the clock was created at.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    pub async fn seed_exam(&self, total_questions: i32, n_questions: usize) -> (Exam, Vec<Question>) {
        self.seed_exam_with_duration(total_questions, n_questions, 60)
            .await
    }

    /// Active exam whose window spans one hour either side of the start time.
    pub async fn seed_exam_with_duration(
        &self,
        total_questions: i32,
        n_questions: usize,
        duration_minutes: i32,
    ) -> (Exam, Vec<Question>) {
        let exam = Exam::new(
            "Aptitude",
            self.start - Duration::hours(1),
            self.start + Duration::hours(1),
            duration_minutes,
            total_questions,
        );
        let exam = self.exams.create(exam).await.unwrap();

        let mut questions = Vec::with_capacity(n_questions);
        for question in fixtures::questions_for(&exam.id, n_questions) {
            questions.push(self.questions.create(question).await.unwrap());
        }
        (exam, questions)
    }

    pub async fn seed_student(&self, enrollment_number: &str) -> Student {
        self.students
            .create(Student::test_student(enrollment_number))
            .await
            .unwrap()
    }

    /// Fresh student with an open attempt started at the start time.
    pub async fn seed_attempt(&self, exam: &Exam) -> Attempt {
        let enrollment = format!("EN-{}", uuid::Uuid::new_v4().simple());
        let student = self.seed_student(&enrollment).await;
        self.attempts
            .create(Attempt::start(&student.id, &exam.id, self.start))
            .await
            .unwrap()
    }

    pub fn answer_reads(&self) -> usize {
        self.answers.reads()
    }

    pub fn attempt_service(&self) -> AttemptService {
        AttemptService::new(
            self.attempts.clone(),
            self.exams.clone(),
            self.students.clone(),
            self.clock.clone(),
        )
    }

    pub fn answer_service(&self) -> AnswerService {
        self.answer_service_with(self.answers.clone())
    }

    pub fn scoring_service(&self) -> ScoringService {
        self.scoring_service_with(self.attempts.clone(), self.answers.clone())
    }

    pub fn scoring_service_with_attempts(
        &self,
        attempts: Arc<dyn AttemptRepository>,
    ) -> ScoringService {
        self.scoring_service_with(attempts, self.answers.clone())
    }

    pub fn scoring_service_with_answers(&self, answers: Arc<dyn AnswerRepository>) -> ScoringService {
        self.scoring_service_with(self.attempts.clone(), answers)
    }

    pub fn session_service(&self) -> SessionService {
        self.session_service_with_answers(self.answers.clone())
    }

    pub fn session_service_with_answers(&self, answers: Arc<dyn AnswerRepository>) -> SessionService {
        SessionService::new(
            Arc::new(self.attempt_service()),
            Arc::new(self.answer_service_with(answers.clone())),
            Arc::new(self.scoring_service_with(self.attempts.clone(), answers)),
            self.attempts.clone(),
            self.exams.clone(),
            self.clock.clone(),
            self.config.retry,
        )
    }

    pub fn exam_service(&self) -> ExamService {
        ExamService::new(
            self.exams.clone(),
            self.questions.clone(),
            self.attempts.clone(),
            self.answers.clone(),
            self.students.clone(),
            self.clock.clone(),
            self.locks.clone(),
        )
    }

    fn answer_service_with(&self, answers: Arc<dyn AnswerRepository>) -> AnswerService {
        AnswerService::new(
            self.attempts.clone(),
            self.questions.clone(),
            answers,
            self.clock.clone(),
            self.locks.clone(),
        )
    }

    fn scoring_service_with(
        &self,
        attempts: Arc<dyn AttemptRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> ScoringService {
        ScoringService::new(
            attempts,
            self.exams.clone(),
            self.questions.clone(),
            answers,
            self.clock.clone(),
            self.locks.clone(),
            self.config.marking,
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::AnswerChoice;

    #[test]
    fn questions_cycle_through_choices_in_order() {
        let questions = fixtures::questions_for("exam-1", 5);
        assert_eq!(questions.len(), 5);
        assert_eq!(questions[0].correct_answer, AnswerChoice::A);
        assert_eq!(questions[3].correct_answer, AnswerChoice::D);
        assert_eq!(questions[4].correct_answer, AnswerChoice::A);
        assert_eq!(questions[4].question_order, 4);
    }

    #[tokio::test]
    async fn seeded_exam_is_open_at_start_time() {
        let harness = Harness::new();
        let (exam, questions) = harness.seed_exam(2, 3).await;

        assert!(exam.start_time < harness.start_time());
        assert!(exam.end_time > harness.start_time());
        assert_eq!(questions.len(), 3);
        assert_eq!(harness.answer_reads(), 0);
    }
}
