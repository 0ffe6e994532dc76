use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::claims::Claims,
    errors::{AppError, AppResult},
    models::domain::Student,
};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_hours: i64,
}

impl JwtService {
    pub fn new(secret: &SecretString, expiration_hours: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation: Validation::default(),
            expiration_hours,
        }
    }

    pub fn create_student_token(&self, student: &Student) -> AppResult<String> {
        self.encode_claims(&Claims::for_student(student, self.expiration_hours))
    }

    pub fn create_admin_token(&self) -> AppResult<String> {
        self.encode_claims(&Claims::for_admin(self.expiration_hours))
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token has expired".to_string())
                }
                _ => AppError::Unauthorized(format!("Invalid token: {}", e)),
            })
    }

    pub fn expiration_hours(&self) -> i64 {
        self.expiration_hours
    }

    fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to create JWT: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::claims::Role, config::Config};

    #[test]
    fn test_jwt_create_and_validate() {
        let config = Config::test_config();
        let jwt_service = JwtService::new(&config.jwt_secret, 1);

        let student = Student::test_student("EN-7");
        let token = jwt_service.create_student_token(&student).unwrap();
        assert!(!token.is_empty());

        let claims = jwt_service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, student.id);
        assert_eq!(claims.role, Role::Student);
    }

    #[test]
    fn test_admin_token_round_trip() {
        let config = Config::test_config();
        let jwt_service = JwtService::new(&config.jwt_secret, 1);

        let token = jwt_service.create_admin_token().unwrap();
        let claims = jwt_service.validate_token(&token).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_jwt_invalid_token() {
        let config = Config::test_config();
        let jwt_service = JwtService::new(&config.jwt_secret, 1);

        let result = jwt_service.validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let config = Config::test_config();
        let issuer = JwtService::new(&SecretString::from("another-secret".to_string()), 1);
        let verifier = JwtService::new(&config.jwt_secret, 1);

        let token = issuer.create_admin_token().unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }
}
