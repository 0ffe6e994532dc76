use chrono::{DateTime, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Admission, DenialReason, Exam},
};

/// Decide whether `exam` accepts attempts at `now`.
///
/// Admissible iff active and `start_time <= now <= end_time`, both bounds
/// inclusive. When several reasons apply, `Inactive` is reported first, then
/// `NotYetStarted`, then `Expired`.
pub fn is_admissible(exam: &Exam, now: DateTime<Utc>) -> AppResult<Admission> {
    if exam.start_time > exam.end_time {
        return Err(AppError::ValidationError(format!(
            "Exam '{}' has a window that starts after it ends",
            exam.id
        )));
    }

    if !exam.is_active {
        return Ok(Admission::denied(DenialReason::Inactive));
    }
    if now < exam.start_time {
        return Ok(Admission::denied(DenialReason::NotYetStarted));
    }
    if now > exam.end_time {
        return Ok(Admission::denied(DenialReason::Expired));
    }

    Ok(Admission::granted())
}

/// Like [`is_admissible`], but a denial becomes `ExamUnavailable`.
pub fn ensure_admissible(exam: &Exam, now: DateTime<Utc>) -> AppResult<()> {
    match is_admissible(exam, now)?.reason {
        None => Ok(()),
        Some(reason) => Err(AppError::ExamUnavailable(reason)),
    }
}
