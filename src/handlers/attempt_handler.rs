use std::sync::Arc;

use actix_web::{post, put, web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::{require_student, AuthenticatedUser},
    errors::AppError,
    middleware::get_request_id,
    models::dto::{request::RecordAnswerRequest, response::SubmitResponse},
    services::scoring_service::FinalizeOutcome,
};

#[put("/attempts/{id}/answers")]
async fn record_answer(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<RecordAnswerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let student_id = require_student(&auth.0)?;
    request.validate()?;

    let answer = state
        .session_service
        .answer(
            student_id,
            &id,
            &request.question_id,
            &request.selected_answer,
        )
        .await?;
    Ok(HttpResponse::Ok().json(answer))
}

#[post("/attempts/{id}/submit")]
async fn submit_attempt(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let student_id = require_student(&auth.0)?;
    log::info!(
        "[{}] Student {} submitting attempt {}",
        get_request_id(&req).unwrap_or_else(|| "-".to_string()),
        student_id,
        id
    );

    let outcome = state.session_service.submit(student_id, &id).await?;
    Ok(HttpResponse::Ok().json(SubmitResponse {
        attempt_id: id.into_inner(),
        already_submitted: matches!(outcome, FinalizeOutcome::AlreadyFinalized(_)),
        result: outcome.result(),
    }))
}
