use std::sync::Arc;

use crate::{
    auth::{AdminVerifier, SecretCodeVerifier},
    clock::{Clock, SystemClock},
    config::{Config, StorageBackend},
    db::Database,
    errors::AppResult,
    repositories::{
        AnswerRepository, AttemptRepository, ExamRepository, InMemoryAnswerRepository,
        InMemoryAttemptRepository, InMemoryExamRepository, InMemoryQuestionRepository,
        InMemoryStudentRepository, MongoAnswerRepository, MongoAttemptRepository,
        MongoExamRepository, MongoQuestionRepository, MongoStudentRepository,
        QuestionRepository, StudentRepository,
    },
    services::{
        answer_service::AnswerService, attempt_service::AttemptService,
        exam_service::ExamService, locks::AttemptLocks, scoring_service::ScoringService,
        session_service::SessionService, student_service::StudentService,
    },
};

/// One handle per entity store.
#[derive(Clone)]
pub struct Repositories {
    pub students: Arc<dyn StudentRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub answers: Arc<dyn AnswerRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            students: Arc::new(MongoStudentRepository::new(db)),
            exams: Arc::new(MongoExamRepository::new(db)),
            questions: Arc::new(MongoQuestionRepository::new(db)),
            attempts: Arc::new(MongoAttemptRepository::new(db)),
            answers: Arc::new(MongoAnswerRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            students: Arc::new(InMemoryStudentRepository::new()),
            exams: Arc::new(InMemoryExamRepository::new()),
            questions: Arc::new(InMemoryQuestionRepository::new()),
            attempts: Arc::new(InMemoryAttemptRepository::new()),
            answers: Arc::new(InMemoryAnswerRepository::new()),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.students.ensure_indexes().await?;
        self.exams.ensure_indexes().await?;
        self.questions.ensure_indexes().await?;
        self.attempts.ensure_indexes().await?;
        self.answers.ensure_indexes().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub student_service: Arc<StudentService>,
    pub exam_service: Arc<ExamService>,
    pub session_service: Arc<SessionService>,
    pub admin_verifier: Arc<dyn AdminVerifier>,
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let (repositories, db) = match config.storage_backend {
            StorageBackend::Mongo => {
                let db = Database::connect(&config).await?;
                (Repositories::mongo(&db), Some(db))
            }
            StorageBackend::Memory => {
                log::warn!("Using in-memory storage; data will not survive a restart");
                (Repositories::in_memory(), None)
            }
        };
        repositories.ensure_indexes().await?;

        let mut state = Self::build(config, repositories, Arc::new(SystemClock));
        state.db = db;
        Ok(state)
    }

    /// Wire services over the given stores and clock.
    pub fn build(config: Config, repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        let locks = AttemptLocks::new();

        let attempt_service = Arc::new(AttemptService::new(
            repos.attempts.clone(),
            repos.exams.clone(),
            repos.students.clone(),
            clock.clone(),
        ));
        let answer_service = Arc::new(AnswerService::new(
            repos.attempts.clone(),
            repos.questions.clone(),
            repos.answers.clone(),
            clock.clone(),
            locks.clone(),
        ));
        let scoring_service = Arc::new(ScoringService::new(
            repos.attempts.clone(),
            repos.exams.clone(),
            repos.questions.clone(),
            repos.answers.clone(),
            clock.clone(),
            locks.clone(),
            config.marking,
        ));
        let session_service = Arc::new(SessionService::new(
            attempt_service,
            answer_service,
            scoring_service,
            repos.attempts.clone(),
            repos.exams.clone(),
            clock.clone(),
            config.retry,
        ));
        let exam_service = Arc::new(ExamService::new(
            repos.exams.clone(),
            repos.questions.clone(),
            repos.attempts.clone(),
            repos.answers.clone(),
            repos.students.clone(),
            clock,
            locks,
        ));
        let student_service = Arc::new(StudentService::new(repos.students));
        let admin_verifier = Arc::new(SecretCodeVerifier::new(&config.admin_secret_code));

        Self {
            student_service,
            exam_service,
            session_service,
            admin_verifier,
            db: None,
            config: Arc::new(config),
        }
    }
}
