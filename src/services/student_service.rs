use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::password::{hash_password, verify_password},
    errors::{AppError, AppResult},
    models::{
        domain::Student,
        dto::request::{LoginRequest, RegisterStudentRequest},
    },
    repositories::StudentRepository,
};

pub struct StudentService {
    repository: Arc<dyn StudentRepository>,
}

impl StudentService {
    pub fn new(repository: Arc<dyn StudentRepository>) -> Self {
        Self { repository }
    }

    pub async fn register(&self, request: RegisterStudentRequest) -> AppResult<Student> {
        request.validate()?;

        if self.repository.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "A student with email '{}' is already registered",
                request.email.trim()
            )));
        }

        let password_hash = hash_password(&request.password)?;
        let student = Student::new(
            request.name.trim(),
            &request.email,
            &request.enrollment_number,
            &password_hash,
        );
        let student = self.repository.create(student).await?;

        log::info!(
            "Registered student {} ({})",
            student.id,
            student.enrollment_number
        );
        Ok(student)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<Student> {
        request.validate()?;

        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let student = self
            .repository
            .find_by_email(&request.email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &student.password_hash)? {
            log::warn!("Failed login for student {}", student.id);
            return Err(invalid());
        }

        Ok(student)
    }

    pub async fn get_student(&self, id: &str) -> AppResult<Student> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id '{}' not found", id)))
    }
}
