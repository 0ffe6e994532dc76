pub mod answer;
pub mod attempt;
pub mod exam;
pub mod question;
pub mod student;
pub use answer::Answer;
pub use attempt::{Attempt, ScoreBreakdown};
pub use exam::{Admission, DenialReason, Exam};
pub use question::{AnswerChoice, Question, QuestionOptions};
pub use student::Student;
