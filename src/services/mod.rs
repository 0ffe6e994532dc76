pub mod answer_service;
pub mod attempt_service;
pub mod exam_service;
pub mod locks;
pub mod retry;
pub mod scoring_service;
pub mod session_service;
pub mod student_service;
pub mod time_window;
