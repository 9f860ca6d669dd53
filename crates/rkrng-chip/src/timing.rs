//! Timing and tuning constants.
//!
//! Values match what the in-kernel driver programs; they were tuned on real
//! boards and are the defaults for `DriverConfig`.

/// Interval between status register reads while polling (µs).
pub const POLL_PERIOD_US: u64 = 100;

/// Upper bound for any single poll loop (µs).
pub const POLL_TIMEOUT_US: u64 = 10_000;

/// Idle time before runtime PM suspends the block (ms).
pub const AUTOSUSPEND_DELAY_MS: u64 = 100;

/// Width of the reset pulse issued at probe (µs).
pub const RESET_PULSE_US: u64 = 2;

/// RK3568 osc ring sample period.
///
/// Trade-off between speed and quality; gives a quality of ~900
/// (~87.5% of FIPS 140-2 successes).
pub const RK3568_SAMPLE_CNT: u32 = 1000;

/// TRNG v1 reseeds automatically after this many bytes.
pub const TRNG_V1_AUTO_RESEED_BYTES: u32 = 1000;

/// Bytes per `AUTO_RQSTS` unit.
pub const TRNG_V1_REQUEST_BYTES: u32 = 16;

/// `AUTO_RQSTS` value for a reseed cadence given in bytes.
#[must_use]
pub const fn auto_reseed_requests(bytes: u32) -> u32 {
    bytes / TRNG_V1_REQUEST_BYTES
}
