use std::sync::Arc;

use actix_web::{post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{JwtService, Role},
    errors::AppError,
    models::dto::{
        request::{AdminLoginRequest, LoginRequest, RegisterStudentRequest},
        response::AuthResponse,
    },
};

#[post("/register")]
async fn register(
    state: web::Data<Arc<AppState>>,
    jwt: web::Data<JwtService>,
    request: web::Json<RegisterStudentRequest>,
) -> Result<HttpResponse, AppError> {
    let student = state.student_service.register(request.into_inner()).await?;
    let token = jwt.create_student_token(&student)?;

    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        role: Role::Student,
        student: Some(student.into()),
    }))
}

#[post("/login")]
async fn login(
    state: web::Data<Arc<AppState>>,
    jwt: web::Data<JwtService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let student = state.student_service.login(request.into_inner()).await?;
    let token = jwt.create_student_token(&student)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        role: Role::Student,
        student: Some(student.into()),
    }))
}

#[post("/admin")]
async fn admin_login(
    state: web::Data<Arc<AppState>>,
    jwt: web::Data<JwtService>,
    request: web::Json<AdminLoginRequest>,
) -> Result<HttpResponse, AppError> {
    if !state.admin_verifier.verify(&request.secret_code) {
        log::warn!("Rejected admin login with invalid secret code");
        return Err(AppError::Unauthorized("Invalid admin code".to_string()));
    }

    Ok(HttpResponse::Ok().json(AuthResponse {
        token: jwt.create_admin_token()?,
        role: Role::Admin,
        student: None,
    }))
}
