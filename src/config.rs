use std::{env, str::FromStr, time::Duration};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

const DEFAULT_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const DEFAULT_ADMIN_SECRET_CODE: &str = "dev_admin_code";

/// Score delta per answer outcome.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct MarkingScheme {
    pub correct_answer: f64,
    pub incorrect_answer: f64,
    pub unanswered: f64,
}

impl Default for MarkingScheme {
    fn default() -> Self {
        Self {
            correct_answer: 1.0,
            incorrect_answer: -0.25,
            unanswered: 0.0,
        }
    }
}

/// Backoff and timeout applied to storage calls made on behalf of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub op_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            op_timeout: Duration::from_secs(5),
        }
    }
}

/// Where repositories keep their data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: String,
    pub storage_backend: StorageBackend,
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub admin_secret_code: SecretString,
    pub marking: MarkingScheme,
    pub retry: RetryPolicy,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let marking_defaults = MarkingScheme::default();
        let retry_defaults = RetryPolicy::default();

        Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            storage_backend: env_or("STORAGE_BACKEND", StorageBackend::Mongo),
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "exam-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env_or("WEB_SERVER_PORT", 8080),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            ),
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", 24),
            admin_secret_code: SecretString::from(
                env::var("ADMIN_SECRET_CODE")
                    .unwrap_or_else(|_| DEFAULT_ADMIN_SECRET_CODE.to_string()),
            ),
            marking: MarkingScheme {
                correct_answer: env_or("MARK_CORRECT", marking_defaults.correct_answer),
                incorrect_answer: env_or("MARK_INCORRECT", marking_defaults.incorrect_answer),
                unanswered: env_or("MARK_UNANSWERED", marking_defaults.unanswered),
            },
            retry: RetryPolicy {
                max_attempts: env_or("STORAGE_RETRY_ATTEMPTS", retry_defaults.max_attempts).max(1),
                base_delay: Duration::from_millis(env_or(
                    "STORAGE_RETRY_BASE_DELAY_MS",
                    retry_defaults.base_delay.as_millis() as u64,
                )),
                op_timeout: Duration::from_secs(env_or(
                    "STORAGE_TIMEOUT_SECS",
                    retry_defaults.op_timeout.as_secs(),
                )),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();
        let admin_code = self.admin_secret_code.expose_secret();

        if jwt_secret == DEFAULT_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.storage_backend == StorageBackend::Memory {
            panic!("FATAL: STORAGE_BACKEND=memory is not allowed in production.");
        }

        if admin_code == DEFAULT_ADMIN_SECRET_CODE {
            panic!(
                "FATAL: ADMIN_SECRET_CODE is using default value! Set ADMIN_SECRET_CODE environment variable."
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            app_env: "test".to_string(),
            storage_backend: StorageBackend::Memory,
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "exam-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            admin_secret_code: SecretString::from("test_admin_code".to_string()),
            marking: MarkingScheme::default(),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                op_timeout: Duration::from_secs(1),
            },
        }
    }
}
