//! Bounded register polling
//!
//! Mirrors `readl_poll_timeout`: read, test, sleep `period`, repeat until
//! `timeout` has elapsed, then take one final sample so a slow scheduler
//! cannot turn a finished operation into a timeout. A zero period spins
//! instead of sleeping (`readl_poll_timeout_atomic` with no delay).

use crate::error::{Result, RngError};
use crate::mmio::Mmio;
use std::time::{Duration, Instant};

/// Poll timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Sleep between reads; zero spins
    pub period: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl PollTiming {
    /// Sleeping poll
    pub const fn new(period: Duration, timeout: Duration) -> Self {
        Self { period, timeout }
    }

    /// Busy poll with no delay between reads
    pub const fn busy(timeout: Duration) -> Self {
        Self {
            period: Duration::ZERO,
            timeout,
        }
    }
}

/// Outcome of a poll: the last value read, and whether the condition held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Last register value sampled
    pub value: u32,
    /// Whether `cond` was satisfied
    pub done: bool,
}

impl PollOutcome {
    /// Convert to a result, naming the awaited `operation` on timeout
    ///
    /// # Errors
    ///
    /// Returns [`RngError::Timeout`] if the condition never held.
    #[allow(clippy::cast_possible_truncation)]
    pub fn or_timeout(self, operation: &'static str, timing: PollTiming) -> Result<u32> {
        if self.done {
            Ok(self.value)
        } else {
            Err(RngError::Timeout {
                operation,
                duration_us: timing.timeout.as_micros() as u64,
            })
        }
    }
}

/// Poll register `offset` until `cond` holds or the timeout expires
///
/// Register access errors end the poll immediately. The last sampled value is
/// returned either way so callers can acknowledge whatever status they saw.
///
/// # Errors
///
/// Returns error if a register read fails.
pub fn poll_register<M, F>(regs: &M, offset: usize, timing: PollTiming, cond: F) -> Result<PollOutcome>
where
    M: Mmio + ?Sized,
    F: Fn(u32) -> bool,
{
    let start = Instant::now();
    loop {
        let value = regs.read32(offset)?;
        if cond(value) {
            return Ok(PollOutcome { value, done: true });
        }
        if start.elapsed() >= timing.timeout {
            let value = regs.read32(offset)?;
            return Ok(PollOutcome {
                value,
                done: cond(value),
            });
        }
        if timing.period.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(timing.period);
        }
    }
}
