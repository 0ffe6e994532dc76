use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{CreateExamRequest, CreateQuestionRequest, UpdateExamSettingsRequest},
        response::DeleteResponse,
    },
};

#[post("/admin/exams")]
async fn create_exam(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateExamRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let exam = state.exam_service.create_exam(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(exam))
}

#[get("/admin/exams")]
async fn list_exams(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let exams = state.exam_service.list_exams().await?;
    Ok(HttpResponse::Ok().json(exams))
}

#[put("/admin/exams/{id}")]
async fn update_exam(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<UpdateExamSettingsRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let exam = state
        .exam_service
        .update_settings(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(exam))
}

#[delete("/admin/exams/{id}")]
async fn delete_exam(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    for attempt_id in state.exam_service.attempt_ids(&id).await? {
        state.session_service.cancel_countdown(&attempt_id);
    }
    // attempts started between the listing and the delete
    for attempt_id in state.exam_service.delete_exam(&id).await? {
        state.session_service.cancel_countdown(&attempt_id);
    }
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: format!("Exam '{}' deleted", id),
    }))
}

#[post("/admin/exams/{id}/questions")]
async fn add_question(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<CreateQuestionRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let question = state
        .exam_service
        .add_question(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(question))
}

#[get("/admin/exams/{id}/questions")]
async fn list_questions(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let questions = state.exam_service.list_questions(&id).await?;
    Ok(HttpResponse::Ok().json(questions))
}

#[get("/admin/exams/{id}/results")]
async fn list_results(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let results = state.exam_service.list_results(&id).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[delete("/admin/attempts/{id}")]
async fn delete_attempt(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    state.session_service.cancel_countdown(&id);
    state.exam_service.delete_attempt(&id).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: format!("Attempt '{}' deleted", id),
    }))
}
