//! Driver configuration
//!
//! Defaults come from the silicon model (`rkrng_chip::timing`). Any field can
//! be overridden through the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RKRNG_POLL_PERIOD_US` | [`DriverConfig::poll_period`] |
//! | `RKRNG_POLL_TIMEOUT_US` | [`DriverConfig::poll_timeout`] |
//! | `RKRNG_AUTOSUSPEND_MS` | [`DriverConfig::autosuspend_delay`] |
//! | `RKRNG_RUNTIME_PM` | [`DriverConfig::runtime_pm`] (`0`/`1`, `false`/`true`) |
//!
//! `RKRNG_DT_ROOT` is read by discovery, not here.

use rkrng_chip::timing;
use std::time::Duration;
use tracing::warn;

/// Tunables for one bound TRNG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Sleep between status reads in slow-path polls
    pub poll_period: Duration,

    /// Upper bound for every poll loop
    pub poll_timeout: Duration,

    /// Idle time before the block is suspended
    pub autosuspend_delay: Duration,

    /// Use runtime PM: init on first use, cleanup after autosuspend.
    /// When false, init runs at registration and cleanup at unregistration.
    pub runtime_pm: bool,

    /// Reset assert time at probe
    pub reset_pulse: Duration,

    /// RK3568 osc ring sample period
    pub sample_count: u32,

    /// TRNG v1 auto reseed cadence in bytes
    pub auto_reseed_bytes: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_micros(timing::POLL_PERIOD_US),
            poll_timeout: Duration::from_micros(timing::POLL_TIMEOUT_US),
            autosuspend_delay: Duration::from_millis(timing::AUTOSUSPEND_DELAY_MS),
            runtime_pm: true,
            reset_pulse: Duration::from_micros(timing::RESET_PULSE_US),
            sample_count: timing::RK3568_SAMPLE_CNT,
            auto_reseed_bytes: timing::TRNG_V1_AUTO_RESEED_BYTES,
        }
    }
}

impl DriverConfig {
    /// Defaults with environment overrides applied
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(us) = parse_var::<u64>(&var, "RKRNG_POLL_PERIOD_US") {
            self.poll_period = Duration::from_micros(us);
        }
        if let Some(us) = parse_var::<u64>(&var, "RKRNG_POLL_TIMEOUT_US") {
            self.poll_timeout = Duration::from_micros(us);
        }
        if let Some(ms) = parse_var::<u64>(&var, "RKRNG_AUTOSUSPEND_MS") {
            self.autosuspend_delay = Duration::from_millis(ms);
        }
        if let Some(raw) = var("RKRNG_RUNTIME_PM") {
            match raw.trim() {
                "1" | "true" | "on" => self.runtime_pm = true,
                "0" | "false" | "off" => self.runtime_pm = false,
                other => warn!("Ignoring RKRNG_RUNTIME_PM={other:?}"),
            }
        }
        self
    }

    /// Set the poll timeout
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the slow-path poll period
    #[must_use]
    pub const fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Set the autosuspend delay
    #[must_use]
    pub const fn with_autosuspend_delay(mut self, delay: Duration) -> Self {
        self.autosuspend_delay = delay;
        self
    }

    /// Enable or disable runtime PM
    #[must_use]
    pub const fn with_runtime_pm(mut self, enabled: bool) -> Self {
        self.runtime_pm = enabled;
        self
    }

    /// Poll timeout in microseconds, for error reporting
    #[allow(clippy::cast_possible_truncation)]
    pub const fn poll_timeout_us(&self) -> u64 {
        self.poll_timeout.as_micros() as u64
    }
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {key}={raw:?}: not a number");
            None
        }
    }
}
