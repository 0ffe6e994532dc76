use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_student, AuthenticatedUser},
    errors::AppError,
};

#[get("/exams/{id}/admission")]
async fn get_admission(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let admission = state.exam_service.admission(&id).await?;
    Ok(HttpResponse::Ok().json(admission))
}

#[get("/exams/{id}/questions")]
async fn get_exam_paper(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_student(&auth.0)?;

    let paper = state.exam_service.exam_paper(&id).await?;
    Ok(HttpResponse::Ok().json(paper))
}

#[post("/exams/{id}/attempt")]
async fn start_session(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let student_id = require_student(&auth.0)?;

    let status = state.session_service.start(student_id, &id).await?;
    Ok(HttpResponse::Ok().json(status))
}

#[get("/exams/{id}/attempt")]
async fn get_session_status(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let student_id = require_student(&auth.0)?;

    let status = state.session_service.status(student_id, &id).await?;
    Ok(HttpResponse::Ok().json(status))
}
