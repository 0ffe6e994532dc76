use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub enrollment_number: String,
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn new(name: &str, email: &str, enrollment_number: &str, password_hash: &str) -> Self {
        Student {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.trim().to_ascii_lowercase(),
            enrollment_number: enrollment_number.trim().to_string(),
            password_hash: password_hash.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
impl Student {
    pub fn test_student(enrollment_number: &str) -> Self {
        Student::new(
            "Test Student",
            &format!("{}@example.com", enrollment_number),
            enrollment_number,
            "not-a-real-hash",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_creation_normalizes_email() {
        let student = Student::new("Asha Rao", "  Asha@Example.COM ", " EN-001 ", "hash");

        assert_eq!(student.email, "asha@example.com");
        assert_eq!(student.enrollment_number, "EN-001");
        assert!(student.created_at.is_some());
    }

    #[test]
    fn test_student_fixture() {
        let student = Student::test_student("EN-42");
        assert_eq!(student.email, "EN-42@example.com".to_ascii_lowercase());
    }
}
