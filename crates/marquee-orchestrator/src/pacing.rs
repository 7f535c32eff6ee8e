//! Pacing between workflow stages.
//!
//! Stages that do no model work of their own can be paced so the task list
//! advances at a readable speed. Tests use [`NoPacing`].

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Decides how long a paced stage waits.
#[async_trait]
pub trait Pacing: Send + Sync {
    /// Suspends the caller for this policy's delay.
    async fn pause(&self, stage: &str);
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacing for NoPacing {
    async fn pause(&self, _stage: &str) {}
}

/// Waits a uniformly random duration in `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct RandomPacing {
    min: Duration,
    max: Duration,
}

impl RandomPacing {
    /// Creates a policy; the bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max { Self { min, max } } else { Self { min: max, max: min } }
    }

    /// Draws the next delay.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for RandomPacing {
    fn default() -> Self {
        Self::new(Duration::from_millis(800), Duration::from_millis(2000))
    }
}

#[async_trait]
impl Pacing for RandomPacing {
    async fn pause(&self, stage: &str) {
        let delay = self.next_delay();
        trace!(stage, delay_ms = delay.as_millis() as u64, "Pacing stage");
        tokio::time::sleep(delay).await;
    }
}
