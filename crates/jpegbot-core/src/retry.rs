//! Rate-limit backoff and interruptible waiting.
//!
//! The platform tells the bot how long to wait before writing again. The
//! retry policy honours that wait through a [`Sleeper`], which production
//! code backs with real time and a shutdown flag, and tests back with a
//! recorder that returns immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{BotError, Result};

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Process-wide interrupt flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

pub trait Sleeper {
    /// Block for `duration`. Returns [`BotError::Interrupted`] if shutdown was
    /// requested before or during the wait.
    fn sleep(&self, duration: Duration) -> Result<()>;
}

/// Sleeps on the current thread in short slices so an interrupt is noticed
/// within one slice.
#[derive(Debug, Clone)]
pub struct ThreadSleeper {
    shutdown: Shutdown,
    slice: Duration,
}

impl ThreadSleeper {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            shutdown,
            slice: Duration::from_millis(250),
        }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutdown.is_triggered() {
                return Err(BotError::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(self.slice));
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retries an operation while it reports [`BotError::RateLimited`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed. `None` retries until success or interrupt.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        match config.max_attempts {
            Some(n) => Self::bounded(n),
            None => Self::unbounded(),
        }
    }

    /// Call `op` until it succeeds, fails with anything other than a rate
    /// limit, or the attempt budget runs out. Each rate limit waits exactly
    /// the duration the platform asked for.
    pub fn run<T>(&self, sleeper: &dyn Sleeper, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match op() {
                Err(BotError::RateLimited { retry_after }) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        return Err(BotError::RateLimited { retry_after });
                    }
                    warn!(
                        attempt,
                        wait_secs = retry_after.as_secs(),
                        "rate limit exceeded, sleeping before retry"
                    );
                    sleeper.sleep(retry_after)?;
                }
                other => return other,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
