//! Bounded exponential-backoff retry around a single handler invocation.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::model::TaskResult;

/// Retry/backoff policy. `max_retries` counts *additional* attempts beyond the first, so a
/// handler that never succeeds is invoked `max_retries + 1` times in total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// `delay_i = min(max_delay, initial_delay * 2^(i-1))`, `i` 1-based, before jitter.
    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let scaled = self.initial_delay.as_secs_f64() * 2f64.powi(exponent as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// Adds up to +/-10% uniform jitter to the base delay, then re-clamps to `max_delay`.
    fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_fraction = rand::thread_rng().gen_range(-0.1..=0.1);
        let jittered = base.as_secs_f64() * (1.0 + jitter_fraction);
        Duration::from_secs_f64(jittered.max(0.0).min(self.max_delay.as_secs_f64()))
    }
}

/// Outcome of driving a handler invocation through [`run`], including how many attempts it
/// took. The engine needs this to persist `retry_count` once at settle.
pub struct RetryOutcome {
    pub result: TaskResult,
    pub attempts: u32,
}

/// Runs `attempt` (one handler invocation) up to `config.max_retries + 1` times, sleeping a
/// clamped, jittered exponential backoff between retryable failures.
///
/// `attempt` receives the 1-based attempt number and must itself enforce
/// `config.attempt_timeout`. The retry strategy only owns backoff and counting, not the
/// per-attempt deadline (that is the engine's job, since only it knows how to translate an
/// elapsed timeout into a retryable [`EngineError`]).
pub async fn run<F, Fut>(config: &RetryConfig, task_id: &str, mut attempt: F) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<TaskResult, EngineError>>,
{
    let total_attempts = config.max_retries + 1;
    let mut last_err: Option<EngineError> = None;
    let mut attempts_made = 0;

    for n in 1..=total_attempts {
        attempts_made = n;
        match attempt(n).await {
            Ok(result) => {
                return RetryOutcome {
                    result,
                    attempts: n,
                };
            }
            Err(err) => {
                let retryable = err.is_retryable();
                if retryable && n < total_attempts {
                    let delay = config.jittered_delay(n);
                    debug!(
                        task_id,
                        attempt = n,
                        next_delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    last_err = Some(err);
                    continue;
                }
                warn!(task_id, attempt = n, error = %err, retryable, "attempt failed, giving up");
                last_err = Some(err);
                break;
            }
        }
    }

    let err = last_err.expect("loop always sets last_err before falling through");
    let retryable = err.is_retryable();
    RetryOutcome {
        result: TaskResult::Failure {
            task_id: task_id.to_string(),
            error: format!("Execution failed after {attempts_made} attempts: {err}"),
            retryable,
        },
        attempts: attempts_made,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_try_invokes_once() {
        let calls = AtomicU32::new(0);
        let outcome = run(&fast_config(3), "t1", |_n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(TaskResult::Success { task_id: "t1".into(), result: Default::default() }) }
        })
        .await;

        assert!(outcome.result.is_success());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success_invokes_k_plus_one_times() {
        let calls = AtomicU32::new(0);
        let outcome = run(&fast_config(3), "t1", |_n| {
            let call_no = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call_no <= 2 {
                    Err(EngineError::Timeout)
                } else {
                    Ok(TaskResult::Success { task_id: "t1".into(), result: Default::default() })
                }
            }
        })
        .await;

        assert!(outcome.result.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = run(&fast_config(3), "t1", |_n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::handler("bad input")) }
        })
        .await;

        match outcome.result {
            TaskResult::Failure { retryable, .. } => assert!(!retryable),
            _ => panic!("expected failure"),
        }
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retryable_failure_still_reports_retryable_true() {
        let calls = AtomicU32::new(0);
        let outcome = run(&fast_config(2), "t1", |_n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::Timeout) }
        })
        .await;

        match outcome.result {
            TaskResult::Failure { retryable, .. } => assert!(retryable),
            _ => panic!("expected failure"),
        }
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn base_delay_follows_exponential_schedule() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(5),
        };
        assert_eq!(config.base_delay(1), Duration::from_secs(1));
        assert_eq!(config.base_delay(2), Duration::from_secs(2));
        assert_eq!(config.base_delay(3), Duration::from_secs(4));
        assert_eq!(config.base_delay(10), Duration::from_secs(60));
    }

    #[test]
    fn jittered_delay_stays_within_tolerance_and_clamp() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(5),
        };
        for _ in 0..50 {
            let delay = config.jittered_delay(2);
            assert!(delay.as_secs_f64() >= 2.0 * 0.9 - 0.001);
            assert!(delay.as_secs_f64() <= 2.0 * 1.1 + 0.001);
        }
    }
}
