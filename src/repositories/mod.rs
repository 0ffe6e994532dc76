pub mod answer_repository;
pub mod attempt_repository;
pub mod exam_repository;
pub mod in_memory;
pub mod question_repository;
pub mod student_repository;

pub use answer_repository::{AnswerRepository, MongoAnswerRepository};
pub use attempt_repository::{AttemptRepository, MongoAttemptRepository};
pub use exam_repository::{ExamRepository, MongoExamRepository};
pub use in_memory::{
    InMemoryAnswerRepository, InMemoryAttemptRepository, InMemoryExamRepository,
    InMemoryQuestionRepository, InMemoryStudentRepository,
};
pub use question_repository::{MongoQuestionRepository, QuestionRepository};
pub use student_repository::{MongoStudentRepository, StudentRepository};
