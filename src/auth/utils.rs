use crate::{
    auth::{claims::Role, Claims},
    errors::{AppError, AppResult},
};

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    if claims.role != Role::Admin {
        return Err(AppError::Unauthorized(
            "Only admins can perform this action".to_string(),
        ));
    }
    Ok(())
}

/// Returns the caller's student id.
pub fn require_student(claims: &Claims) -> AppResult<&str> {
    if claims.role != Role::Student {
        return Err(AppError::Unauthorized(
            "Only students can take exams".to_string(),
        ));
    }
    Ok(&claims.sub)
}
