//! Delay and deadline primitives
//!
//! Inter-action delays and retry backoff go through [`Sleeper`] so tests can
//! run the remediation sequence without wall-clock waits.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Injectable wait
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Hard bound for one invocation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Clamp an action timeout to what is left of the budget
    pub fn clamp(&self, timeout: Duration) -> Duration {
        timeout.min(self.remaining())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
