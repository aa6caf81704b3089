use crate::{
    config::GenerationConfig,
    models::{GenerationRequest, GenerationResult},
};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const OVERLOADED_REASON: &str = "model overloaded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Transient; the controller retries with backoff.
    Overloaded,
    /// Anything else. Ends the generation immediately.
    Fatal(String),
}

impl AttemptError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Overloaded)
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Overloaded => f.write_str(OVERLOADED_REASON),
            AttemptError::Fatal(reason) => f.write_str(reason),
        }
    }
}

/// One remote invocation. Cancellation is handled by the caller, which drops
/// the future, so implementations need no cancellation plumbing of their own.
#[async_trait]
pub trait AttemptExecutor: Send + Sync {
    async fn execute(
        &self,
        request: &GenerationRequest,
        attempt: u32,
    ) -> Result<GenerationResult, AttemptError>;

    fn name(&self) -> &'static str;
}

/// In-process stand-in for the generation service: random latency, then an
/// overload trial with fixed odds on every attempt.
pub struct SimulatedExecutor {
    min_latency: Duration,
    max_latency: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedExecutor {
    pub fn new(min_latency: Duration, max_latency: Duration, failure_rate: f64) -> Self {
        Self {
            min_latency,
            max_latency,
            failure_rate: if failure_rate.is_nan() {
                0.0
            } else {
                failure_rate.clamp(0.0, 1.0)
            },
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        let executor = Self::new(
            config.min_latency(),
            config.max_latency(),
            config.failure_rate,
        );
        match config.seed {
            Some(seed) => executor.with_seed(seed),
            None => executor,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Draws the latency and the overload trial up front so no lock is held
    /// across the wait.
    fn draw(&self) -> (Duration, bool) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let latency = if self.max_latency > self.min_latency {
            rng.gen_range(self.min_latency..self.max_latency)
        } else {
            self.min_latency
        };
        (latency, rng.gen_bool(self.failure_rate))
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

#[async_trait]
impl AttemptExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        request: &GenerationRequest,
        attempt: u32,
    ) -> Result<GenerationResult, AttemptError> {
        let (latency, overloaded) = self.draw();
        log::debug!(
            "Simulated attempt {} waiting {}ms",
            attempt + 1,
            latency.as_millis()
        );
        tokio::time::sleep(latency).await;

        if overloaded {
            return Err(AttemptError::Overloaded);
        }
        Ok(GenerationResult::synthesize(request))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
