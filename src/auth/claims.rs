use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::Student;

pub const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // student id, or "admin"
    pub name: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn for_student(student: &Student, expiration_hours: i64) -> Self {
        Self::build(&student.id, &student.name, Role::Student, expiration_hours)
    }

    pub fn for_admin(expiration_hours: i64) -> Self {
        Self::build(ADMIN_SUBJECT, "Administrator", Role::Admin, expiration_hours)
    }

    fn build(sub: &str, name: &str, role: Role, expiration_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours);

        Self {
            sub: sub.to_string(),
            name: name.to_string(),
            role,
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        }
    }
}
