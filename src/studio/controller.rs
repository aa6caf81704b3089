use crate::{
    config::GenerationConfig,
    error::Result,
    logger,
    models::{GenerationFailure, GenerationOutcome, GenerationRequest},
    studio::{
        backoff::{cancellable_sleep, RetryPolicy},
        executor::{AttemptError, AttemptExecutor, SimulatedExecutor, OVERLOADED_REASON},
    },
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

struct ActiveFlight {
    id: u64,
    token: CancellationToken,
}

/// Drives one generation at a time from submission to exactly one outcome.
///
/// Every `submit` gets its own cancellation token and records it as the
/// current flight. Submitting again cancels the previous token, so the
/// superseded call resolves to `Cancelled` for its own caller while the new
/// call runs a fresh attempt chain. Each suspension point (attempt latency,
/// backoff wait) races against the token and cancellation wins ties.
pub struct GenerationController {
    executor: Arc<dyn AttemptExecutor>,
    policy: RetryPolicy,
    current: Mutex<Option<ActiveFlight>>,
    next_flight: AtomicU64,
}

/// Clears the current-flight slot when a `submit` finishes or is dropped,
/// unless a newer flight has already replaced it.
struct FlightGuard<'a> {
    controller: &'a GenerationController,
    id: u64,
    token: CancellationToken,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.controller.slot();
        if current.as_ref().map_or(false, |flight| flight.id == self.id) {
            *current = None;
        }
    }
}

impl GenerationController {
    pub fn new(executor: Arc<dyn AttemptExecutor>, policy: RetryPolicy) -> Self {
        Self {
            executor,
            policy,
            current: Mutex::new(None),
            next_flight: AtomicU64::new(1),
        }
    }

    pub fn simulated(config: &GenerationConfig) -> Self {
        Self::new(
            Arc::new(SimulatedExecutor::from_config(config)),
            RetryPolicy::new(config.max_retries, config.backoff_base()),
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActiveFlight>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_flight(&self) -> FlightGuard<'_> {
        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self.slot().replace(ActiveFlight {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            if !previous.token.is_cancelled() {
                log::info!(
                    "Generation #{} superseded by #{}, cancelling it",
                    previous.id,
                    id
                );
            }
            previous.token.cancel();
        }

        FlightGuard {
            controller: self,
            id,
            token,
        }
    }

    /// Runs a generation to its terminal outcome.
    ///
    /// Invalid requests are rejected with a `ValidationError` before any
    /// waiting. Everything that happens after that is reported as an outcome.
    pub async fn submit(&self, request: GenerationRequest) -> Result<GenerationOutcome> {
        request.validate()?;

        let flight = self.begin_flight();
        let _timer = logger::timer(&format!("generation #{}", flight.id));
        log::debug!(
            "Generation #{} started: style={}, prompt={} chars",
            flight.id,
            request.style,
            request.prompt.chars().count()
        );

        let outcome = self.run_attempts(&request, flight.id, &flight.token).await;

        match &outcome {
            GenerationOutcome::Success(result) => {
                log::info!("Generation #{} succeeded: {}", flight.id, result.id)
            }
            GenerationOutcome::Failure(failure) => {
                log::warn!("Generation #{} failed: {}", flight.id, failure)
            }
            GenerationOutcome::Cancelled => log::info!("Generation #{} cancelled", flight.id),
        }
        Ok(outcome)
    }

    async fn run_attempts(
        &self,
        request: &GenerationRequest,
        flight_id: u64,
        token: &CancellationToken,
    ) -> GenerationOutcome {
        let mut attempt = 0;
        loop {
            let executed = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                executed = AssertUnwindSafe(self.executor.execute(request, attempt)).catch_unwind() => Some(executed),
            };

            // Cancellation observed at the same boundary as a finished attempt wins.
            let executed = match executed {
                Some(executed) if !token.is_cancelled() => executed,
                _ => return GenerationOutcome::Cancelled,
            };

            let error = match executed {
                Ok(Ok(result)) => return GenerationOutcome::Success(result),
                Ok(Err(error)) => error,
                Err(panic) => AttemptError::Fatal(format!(
                    "generation attempt panicked: {}",
                    panic_message(&*panic)
                )),
            };

            let attempts = attempt + 1;
            if !error.is_retryable() {
                log::error!(
                    "Generation #{} attempt {} hit a non-retryable fault: {}",
                    flight_id,
                    attempts,
                    error
                );
                return GenerationOutcome::Failure(GenerationFailure {
                    reason: error.to_string(),
                    attempts,
                    retries_exhausted: false,
                });
            }

            let delay = match self.policy.delay_after(attempt) {
                Some(delay) => delay,
                None => {
                    return GenerationOutcome::Failure(GenerationFailure {
                        reason: OVERLOADED_REASON.to_string(),
                        attempts,
                        retries_exhausted: true,
                    })
                }
            };

            log::warn!(
                "Generation #{} attempt {}/{}: {}, retrying in {}ms",
                flight_id,
                attempts,
                self.policy.max_attempts(),
                error,
                delay.as_millis()
            );
            if !cancellable_sleep(token, delay).await {
                return GenerationOutcome::Cancelled;
            }
            attempt += 1;
        }
    }

    /// Cancels the in-flight generation, if any. Returns whether one was running.
    ///
    /// The flight stays in flight until its `submit` resolves to `Cancelled`.
    pub fn cancel(&self) -> bool {
        match self.slot().as_ref() {
            Some(flight) if !flight.token.is_cancelled() => {
                flight.token.cancel();
                log::info!("Cancelling generation #{}", flight.id);
                true
            }
            _ => false,
        }
    }

    /// True from the start of a `submit` until it has produced its outcome.
    pub fn is_in_flight(&self) -> bool {
        self.slot().is_some()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
