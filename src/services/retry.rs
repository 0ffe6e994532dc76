use std::{future::Future, time::Duration};

use crate::{
    config::RetryPolicy,
    errors::{AppError, AppResult},
};

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let factor = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(factor)
}

/// Run `op` once under the policy's timeout. A timeout becomes `StorageError`.
pub async fn with_timeout<T, F>(policy: &RetryPolicy, op: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(policy.op_timeout, op).await {
        Ok(result) => result,
        Err(_) => Err(AppError::StorageError(format!(
            "storage call timed out after {:?}",
            policy.op_timeout
        ))),
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` calls have been made. Each call is bounded by
/// `op_timeout`.
pub async fn retry_storage<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match with_timeout(policy, op()).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = backoff_delay(policy.base_delay, attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
