pub mod admin_handler;
pub mod attempt_handler;
pub mod auth_handler;
pub mod exam_handler;
pub mod health_handler;

use actix_web::web;

use crate::auth::AuthMiddleware;

/// Registers every route. Expects `Data<Arc<AppState>>` and
/// `Data<JwtService>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_handler::health_check)
        .service(health_handler::health_check_ready)
        .service(health_handler::health_check_live)
        .service(
            web::scope("/api/auth")
                .service(auth_handler::register)
                .service(auth_handler::login)
                .service(auth_handler::admin_login),
        )
        .service(
            web::scope("/api")
                .wrap(AuthMiddleware)
                .service(exam_handler::get_admission)
                .service(exam_handler::get_exam_paper)
                .service(exam_handler::start_session)
                .service(exam_handler::get_session_status)
                .service(attempt_handler::record_answer)
                .service(attempt_handler::submit_attempt)
                .service(admin_handler::create_exam)
                .service(admin_handler::list_exams)
                .service(admin_handler::update_exam)
                .service(admin_handler::delete_exam)
                .service(admin_handler::add_question)
                .service(admin_handler::list_questions)
                .service(admin_handler::list_results)
                .service(admin_handler::delete_attempt),
        );
}
