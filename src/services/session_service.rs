//! Drives an attempt through not-started, in-progress and completed, and owns
//! the per-attempt countdown that auto-submits on expiry.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    clock::Clock,
    config::RetryPolicy,
    errors::{AppError, AppResult},
    models::domain::{Answer, Attempt, Exam, ScoreBreakdown},
    repositories::{AttemptRepository, ExamRepository},
    services::{
        answer_service::AnswerService,
        attempt_service::AttemptService,
        retry::{backoff_delay, retry_storage, with_timeout},
        scoring_service::{FinalizeOutcome, ScoringService},
    },
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SessionStatus {
    NotStarted,
    InProgress {
        attempt_id: String,
        started_at: DateTime<Utc>,
        remaining_seconds: i64,
    },
    Completed {
        attempt_id: String,
        result: ScoreBreakdown,
    },
}

struct SessionTimer {
    handle: JoinHandle<()>,
    submitting: Arc<AtomicBool>,
}

type TimerMap = Arc<Mutex<HashMap<String, SessionTimer>>>;

pub struct SessionService {
    attempt_service: Arc<AttemptService>,
    answer_service: Arc<AnswerService>,
    scoring: Arc<ScoringService>,
    attempts: Arc<dyn AttemptRepository>,
    exams: Arc<dyn ExamRepository>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    timers: TimerMap,
}

impl SessionService {
    pub fn new(
        attempt_service: Arc<AttemptService>,
        answer_service: Arc<AnswerService>,
        scoring: Arc<ScoringService>,
        attempts: Arc<dyn AttemptRepository>,
        exams: Arc<dyn ExamRepository>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            attempt_service,
            answer_service,
            scoring,
            attempts,
            exams,
            clock,
            retry,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start or resume the student's session. A resumed attempt whose time
    /// has run out is finalized on the spot.
    pub async fn start(&self, student_id: &str, exam_id: &str) -> AppResult<SessionStatus> {
        let (exam, attempt) = self.attempt_service.begin(student_id, exam_id).await?;
        self.track(&exam, attempt).await
    }

    /// Persisted view of the student's session on an exam.
    ///
    /// An open attempt with no time left is finalized, and an open attempt
    /// without a live countdown (e.g. after a restart) gets one re-armed.
    pub async fn status(&self, student_id: &str, exam_id: &str) -> AppResult<SessionStatus> {
        let attempt = with_timeout(
            &self.retry,
            self.attempts.find_by_student_and_exam(student_id, exam_id),
        )
        .await?;

        let Some(attempt) = attempt else {
            return Ok(SessionStatus::NotStarted);
        };

        if attempt.is_completed {
            let result = attempt.result.ok_or_else(|| {
                AppError::InternalError(format!("Attempt '{}' has no stored result", attempt.id))
            })?;
            return Ok(SessionStatus::Completed {
                attempt_id: attempt.id,
                result,
            });
        }

        let exam = self.find_exam(&attempt.exam_id).await?;
        self.track(&exam, attempt).await
    }

    /// Record an answer on the student's own attempt, retrying transient
    /// storage failures.
    pub async fn answer(
        &self,
        student_id: &str,
        attempt_id: &str,
        question_id: &str,
        selected_answer: &str,
    ) -> AppResult<Answer> {
        let attempt = self.ensure_owner(student_id, attempt_id).await?;

        if !attempt.is_completed {
            let exam = self.find_exam(&attempt.exam_id).await?;
            if self.remaining_seconds(&exam, &attempt) == 0 {
                self.expire(attempt_id).await?;
                return Err(AppError::AttemptFinalized(attempt_id.to_string()));
            }
        }

        retry_storage(&self.retry, "record answer", || {
            self.answer_service
                .record_answer(attempt_id, question_id, selected_answer)
        })
        .await
    }

    /// Manual submit. Cancels the countdown and finalizes; repeats return the
    /// stored result.
    pub async fn submit(&self, student_id: &str, attempt_id: &str) -> AppResult<FinalizeOutcome> {
        self.ensure_owner(student_id, attempt_id).await?;
        self.cancel_countdown(attempt_id);
        finalize_with_recheck(&self.scoring, &self.retry, attempt_id).await
    }

    /// Loads the attempt and checks that it belongs to `student_id`.
    pub async fn ensure_owner(&self, student_id: &str, attempt_id: &str) -> AppResult<Attempt> {
        let attempt = with_timeout(&self.retry, self.attempts.find_by_id(attempt_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))?;

        if attempt.student_id != student_id {
            return Err(AppError::Unauthorized(
                "Attempt belongs to another student".to_string(),
            ));
        }
        Ok(attempt)
    }

    pub fn has_timer(&self, attempt_id: &str) -> bool {
        lock_timers(&self.timers).contains_key(attempt_id)
    }

    pub fn active_timers(&self) -> usize {
        lock_timers(&self.timers).len()
    }

    /// Abort every countdown. Attempts stay open and are picked up again by
    /// `status` or `start`.
    pub fn shutdown(&self) {
        let mut timers = lock_timers(&self.timers);
        for (attempt_id, timer) in timers.drain() {
            timer.handle.abort();
            log::debug!("Stopped countdown for attempt {}", attempt_id);
        }
    }

    async fn track(&self, exam: &Exam, attempt: Attempt) -> AppResult<SessionStatus> {
        let remaining = self.remaining_seconds(exam, &attempt);
        if remaining == 0 {
            let outcome = self.expire(&attempt.id).await?;
            return Ok(SessionStatus::Completed {
                attempt_id: attempt.id,
                result: outcome.result(),
            });
        }

        self.arm_timer(&attempt.id, remaining);
        Ok(SessionStatus::InProgress {
            attempt_id: attempt.id,
            started_at: attempt.started_at,
            remaining_seconds: remaining,
        })
    }

    fn remaining_seconds(&self, exam: &Exam, attempt: &Attempt) -> i64 {
        attempt.remaining_seconds(exam.duration_seconds(), self.clock.now())
    }

    async fn expire(&self, attempt_id: &str) -> AppResult<FinalizeOutcome> {
        self.cancel_countdown(attempt_id);
        log::info!("Time is up for attempt {}, submitting", attempt_id);
        finalize_with_recheck(&self.scoring, &self.retry, attempt_id).await
    }

    async fn find_exam(&self, exam_id: &str) -> AppResult<Exam> {
        with_timeout(&self.retry, self.exams.find_by_id(exam_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", exam_id)))
    }

    fn arm_timer(&self, attempt_id: &str, remaining_seconds: i64) {
        let mut timers = lock_timers(&self.timers);
        if timers.contains_key(attempt_id) {
            return;
        }

        let submitting = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_countdown(
            attempt_id.to_string(),
            remaining_seconds,
            submitting.clone(),
            self.scoring.clone(),
            self.retry,
            self.timers.clone(),
        ));

        log::debug!(
            "Armed countdown for attempt {} ({}s left)",
            attempt_id,
            remaining_seconds
        );
        timers.insert(attempt_id.to_string(), SessionTimer { handle, submitting });
    }

    /// Stop the countdown for an attempt, if one is running.
    pub fn cancel_countdown(&self, attempt_id: &str) {
        let Some(timer) = lock_timers(&self.timers).remove(attempt_id) else {
            return;
        };

        // An auto-submit already in flight is left to finish; finalize is
        // serialized per attempt so the caller simply waits behind it.
        if !timer.submitting.swap(true, Ordering::SeqCst) {
            timer.handle.abort();
            log::info!("Cancelled countdown for attempt {}", attempt_id);
        }
    }
}

fn lock_timers(timers: &TimerMap) -> std::sync::MutexGuard<'_, HashMap<String, SessionTimer>> {
    timers.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_countdown(
    attempt_id: String,
    remaining_seconds: i64,
    submitting: Arc<AtomicBool>,
    scoring: Arc<ScoringService>,
    retry: RetryPolicy,
    timers: TimerMap,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // first tick completes immediately
    interval.tick().await;

    let mut remaining = remaining_seconds;
    while remaining > 0 {
        interval.tick().await;
        remaining -= 1;
    }

    if submitting.swap(true, Ordering::SeqCst) {
        return;
    }

    log::info!("Countdown expired for attempt {}, auto-submitting", attempt_id);
    match finalize_with_recheck(&scoring, &retry, &attempt_id).await {
        Ok(outcome) => log::info!(
            "Auto-submit of attempt {} done (score {})",
            attempt_id,
            outcome.result().score
        ),
        Err(AppError::NotFound(_)) => {
            log::info!("Attempt {} was removed before its countdown ended", attempt_id)
        }
        Err(err) => log::error!("Auto-submit of attempt {} failed: {}", attempt_id, err),
    }

    let mut timers = lock_timers(&timers);
    if timers
        .get(&attempt_id)
        .is_some_and(|t| Arc::ptr_eq(&t.submitting, &submitting))
    {
        timers.remove(&attempt_id);
    }
}

/// Finalize with bounded retries. After a storage failure the attempt is
/// re-read first, so a completion that landed before the failure surfaced is
/// returned instead of being attempted again.
pub async fn finalize_with_recheck(
    scoring: &ScoringService,
    policy: &RetryPolicy,
    attempt_id: &str,
) -> AppResult<FinalizeOutcome> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match with_timeout(policy, scoring.finalize_attempt(attempt_id)).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) if err.is_retryable() => err,
            Err(err) => return Err(err),
        };

        if let Ok(Some(result)) = with_timeout(policy, scoring.completed_result(attempt_id)).await {
            log::info!(
                "Attempt {} was already finalized despite error: {}",
                attempt_id,
                err
            );
            return Ok(FinalizeOutcome::AlreadyFinalized(result));
        }

        if attempt >= max_attempts {
            log::error!(
                "Giving up finalizing attempt {} after {} tries: {}",
                attempt_id,
                attempt,
                err
            );
            return Err(err);
        }

        let delay = backoff_delay(policy.base_delay, attempt);
        log::warn!(
            "Finalizing attempt {} failed (try {}/{}): {}; retrying in {:?}",
            attempt_id,
            attempt,
            max_attempts,
            err,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::{
            answer_repository::MockAnswerRepository, attempt_repository::MockAttemptRepository,
        },
        test_utils::Harness,
    };
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::AtomicU32;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_auto_submits_once_at_zero() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam_with_duration(3, 3, 1).await;
        let student = harness.seed_student("EN-200").await;
        let session = harness.session_service();

        let status = session.start(&student.id, &exam.id).await.unwrap();
        let SessionStatus::InProgress { attempt_id, remaining_seconds, .. } = status else {
            panic!("expected in-progress, got {:?}", status);
        };
        assert_eq!(remaining_seconds, 60);
        assert!(session.has_timer(&attempt_id));

        tokio::time::sleep(Duration::from_secs(59)).await;
        settle().await;
        let open = harness.attempts.find_by_id(&attempt_id).await.unwrap().unwrap();
        assert!(!open.is_completed);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;

        let closed = harness.attempts.find_by_id(&attempt_id).await.unwrap().unwrap();
        assert!(closed.is_completed);
        assert_eq!(harness.answer_reads(), 1);
        assert!(!session.has_timer(&attempt_id));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_cancels_countdown() {
        let harness = Harness::new();
        let (exam, questions) = harness.seed_exam_with_duration(2, 2, 1).await;
        let student = harness.seed_student("EN-201").await;
        let session = harness.session_service();

        let SessionStatus::InProgress { attempt_id, .. } =
            session.start(&student.id, &exam.id).await.unwrap()
        else {
            panic!("expected in-progress");
        };
        let q = &questions[0];
        session
            .answer(&student.id, &attempt_id, &q.id, &q.correct_answer.to_string())
            .await
            .unwrap();

        let outcome = session.submit(&student.id, &attempt_id).await.unwrap();
        assert!(outcome.finalized_now());
        assert_eq!(outcome.result().score, 1.0);
        assert!(!session.has_timer(&attempt_id));

        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(harness.answer_reads(), 1);

        let again = session.submit(&student.id, &attempt_id).await.unwrap();
        assert_eq!(again, FinalizeOutcome::AlreadyFinalized(outcome.result()));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_reports_reduced_remaining_time() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam_with_duration(2, 2, 60).await;
        let student = harness.seed_student("EN-202").await;
        let session = harness.session_service();

        let first = session.start(&student.id, &exam.id).await.unwrap();
        harness.clock.advance(ChronoDuration::minutes(15));
        let second = session.start(&student.id, &exam.id).await.unwrap();

        match (first, second) {
            (
                SessionStatus::InProgress { attempt_id: a, remaining_seconds: r1, started_at: s1 },
                SessionStatus::InProgress { attempt_id: b, remaining_seconds: r2, started_at: s2 },
            ) => {
                assert_eq!(a, b);
                assert_eq!(s1, s2);
                assert_eq!(r1, 3600);
                assert_eq!(r2, 2700);
            }
            other => panic!("unexpected statuses: {:?}", other),
        }
        assert_eq!(session.active_timers(), 1);
        session.shutdown();
        assert_eq!(session.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_without_time_left_finalizes() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam_with_duration(4, 4, 30).await;
        let student = harness.seed_student("EN-203").await;
        let session = harness.session_service();

        session.start(&student.id, &exam.id).await.unwrap();
        session.shutdown();
        harness.clock.advance(ChronoDuration::minutes(31));

        let status = session.status(&student.id, &exam.id).await.unwrap();
        match status {
            SessionStatus::Completed { result, .. } => {
                assert_eq!(result.unattempted, 4);
                assert_eq!(result.score, 0.0);
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_each_state() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam(2, 2).await;
        let student = harness.seed_student("EN-204").await;
        let session = harness.session_service();

        assert_eq!(
            session.status(&student.id, &exam.id).await.unwrap(),
            SessionStatus::NotStarted
        );

        let SessionStatus::InProgress { attempt_id, .. } =
            session.start(&student.id, &exam.id).await.unwrap()
        else {
            panic!("expected in-progress");
        };
        assert!(matches!(
            session.status(&student.id, &exam.id).await.unwrap(),
            SessionStatus::InProgress { .. }
        ));

        session.submit(&student.id, &attempt_id).await.unwrap();
        assert!(matches!(
            session.status(&student.id, &exam.id).await.unwrap(),
            SessionStatus::Completed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn other_students_cannot_touch_attempt() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam(2, 2).await;
        let owner = harness.seed_student("EN-205").await;
        let intruder = harness.seed_student("EN-206").await;
        let session = harness.session_service();

        let SessionStatus::InProgress { attempt_id, .. } =
            session.start(&owner.id, &exam.id).await.unwrap()
        else {
            panic!("expected in-progress");
        };

        assert!(matches!(
            session.submit(&intruder.id, &attempt_id).await,
            Err(AppError::Unauthorized(_))
        ));
        session.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn answer_retries_transient_storage_errors() {
        let harness = Harness::new();
        let (exam, questions) = harness.seed_exam(2, 2).await;
        let attempt = harness.seed_attempt(&exam).await;

        let failures = Arc::new(AtomicU32::new(0));
        let counter = failures.clone();
        let mut answers = MockAnswerRepository::new();
        answers.expect_upsert().times(3).returning(move |answer| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::StorageError("connection reset".to_string()))
            } else {
                Ok(answer)
            }
        });

        let session = harness.session_service_with_answers(Arc::new(answers));
        let stored = session
            .answer(&attempt.student_id, &attempt.id, &questions[0].id, "b")
            .await
            .unwrap();

        assert_eq!(stored.selected_answer.to_string(), "B");
        assert_eq!(failures.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_failure_rechecks_completion() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam(2, 2).await;
        let open = Attempt::start("s1", &exam.id, harness.start_time());
        let landed = ScoreBreakdown {
            score: 0.0,
            attempted: 0,
            correct: 0,
            incorrect: 0,
            unattempted: 2,
        };
        let mut closed = open.clone();
        closed.is_completed = true;
        closed.result = Some(landed);

        // The completion write is applied but its acknowledgement is lost.
        let mut attempts = MockAttemptRepository::new();
        let mut reads = vec![closed, open];
        attempts
            .expect_find_by_id()
            .times(2)
            .returning(move |_| Ok(reads.pop()));
        attempts
            .expect_complete()
            .times(1)
            .returning(|_, _, _| Err(AppError::StorageError("ack lost".to_string())));
        let scoring = harness.scoring_service_with_attempts(Arc::new(attempts));

        let outcome = finalize_with_recheck(&scoring, &harness.config.retry, "any")
            .await
            .unwrap();
        assert_eq!(outcome, FinalizeOutcome::AlreadyFinalized(landed));
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_gives_up_when_storage_stays_down() {
        let harness = Harness::new();
        let (exam, _) = harness.seed_exam(2, 2).await;
        let attempt = harness.seed_attempt(&exam).await;

        let mut answers = MockAnswerRepository::new();
        answers
            .expect_find_by_attempt()
            .times(harness.config.retry.max_attempts as usize)
            .returning(|_| Err(AppError::StorageError("down".to_string())));
        let scoring = harness.scoring_service_with_answers(Arc::new(answers));

        let result = finalize_with_recheck(&scoring, &harness.config.retry, &attempt.id).await;
        assert!(matches!(result, Err(AppError::StorageError(_))));

        let open = harness.attempts.find_by_id(&attempt.id).await.unwrap().unwrap();
        assert!(!open.is_completed);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(SessionStatus::NotStarted).unwrap();
        assert_eq!(json["state"], "not-started");
    }
}
