use std::time::Duration;

use rand::Rng;

/// Default delay unit between lock attempts.
const DEFAULT_STEP: Duration = Duration::from_millis(100);

/// Smallest step accepted, so retries never spin without yielding.
const MIN_STEP: Duration = Duration::from_millis(1);

/// Computes how long to wait before retry `attempt` (1 for the first retry).
pub trait RetryDelay: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

impl<F> RetryDelay for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// Randomized backoff so that competing clients do not retry in lockstep.
///
/// Picks `n` uniformly in `[0, attempt)`, raises it to at least 1, and waits
/// `n * step`, saturating at `Duration::MAX`. Attempts 0 to 2 therefore
/// always wait exactly one step.
#[derive(Debug, Clone, Copy)]
pub struct JitteredDelay {
    step: Duration,
}

impl JitteredDelay {
    /// Steps below one millisecond are raised to one millisecond.
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.max(MIN_STEP),
        }
    }
}

impl Default for JitteredDelay {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}

impl RetryDelay for JitteredDelay {
    fn delay(&self, attempt: u32) -> Duration {
        let span = attempt.max(1);
        let n = rand::rng().random_range(0..span).max(1);
        self.step.saturating_mul(n)
    }
}
