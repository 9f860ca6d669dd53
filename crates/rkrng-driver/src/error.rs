//! Error types for TRNG driver operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, RngError>;

/// Errors that can occur while binding or driving a TRNG
#[derive(Debug, Error)]
pub enum RngError {
    /// No operation table matches the device's compatible string
    #[error("No driver match for compatible \"{compatible}\"")]
    NoMatch {
        /// Compatible string that failed to match
        compatible: String,
    },

    /// A required platform resource is missing
    #[error("Missing {resource} resource")]
    MissingResource {
        /// Resource kind (clocks, reset, registers)
        resource: &'static str,
    },

    /// Clock handling failed
    #[error("Clock error: {reason}")]
    Clock {
        /// Reason for failure
        reason: String,
    },

    /// Reset line handling failed
    #[error("Reset error: {reason}")]
    Reset {
        /// Reason for failure
        reason: String,
    },

    /// IP version register does not hold the expected code
    #[error("Wrong TRNG version: expected {expected:#010x}, actual {actual:#010x}")]
    VersionMismatch {
        /// Expected version code
        expected: u32,
        /// Value read from hardware
        actual: u32,
    },

    /// A bounded poll expired
    #[error("Timed out after {duration_us}us waiting for {operation}")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// Poll timeout in microseconds
        duration_us: u64,
    },

    /// Register access outside the mapped window
    #[error("Out of bounds register access: offset={offset:#x}, len={len}, limit={limit:#x}")]
    OutOfBounds {
        /// Register offset
        offset: usize,
        /// Access width in bytes
        len: usize,
        /// Size of the mapped window
        limit: usize,
    },

    /// Malformed device-tree node
    #[error("Invalid device tree node {path}: {reason}")]
    InvalidDeviceTree {
        /// Node or property path
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Device not found at the expected path
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// No supported TRNG detected on the system
    #[error("No Rockchip TRNG devices detected")]
    NoDevicesFound,

    /// Device is in an invalid state
    #[error("Device in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },

    /// A read returned no data
    #[error("{name} returned no data")]
    ShortRead {
        /// Name of the rng
        name: String,
    },

    /// I/O error during device access
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

// Linux errno values used by the hwrng contract.
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EFAULT: i32 = 14;
const EBUSY: i32 = 16;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const ETIMEDOUT: i32 = 110;

impl RngError {
    /// Create a no-match error
    pub fn no_match(compatible: impl Into<String>) -> Self {
        Self::NoMatch {
            compatible: compatible.into(),
        }
    }

    /// Create a clock error
    pub fn clock(reason: impl Into<String>) -> Self {
        Self::Clock {
            reason: reason.into(),
        }
    }

    /// Create a reset error
    pub fn reset(reason: impl Into<String>) -> Self {
        Self::Reset {
            reason: reason.into(),
        }
    }

    /// Create a device-tree error
    pub fn invalid_device_tree(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDeviceTree {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Whether this error is a poll timeout
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Negative errno, as returned through the hwrng `read`/`init` contract
    pub fn errno(&self) -> i32 {
        -match self {
            Self::Timeout { .. } => ETIMEDOUT,
            Self::VersionMismatch { .. } | Self::OutOfBounds { .. } => EFAULT,
            Self::NoMatch { .. } | Self::NoDevicesFound => ENODEV,
            Self::MissingResource { .. } | Self::DeviceNotFound { .. } => ENOENT,
            Self::InvalidDeviceTree { .. } => EINVAL,
            Self::InvalidState { .. } => EBUSY,
            Self::Io { source } => source.raw_os_error().unwrap_or(EIO),
            Self::Clock { .. } | Self::Reset { .. } | Self::ShortRead { .. } => EIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_follows_kernel_codes() {
        let timeout = RngError::Timeout {
            operation: "random data",
            duration_us: 10_000,
        };
        assert_eq!(timeout.errno(), -110);
        assert!(timeout.is_timeout());

        let version = RngError::VersionMismatch {
            expected: 0x46bc,
            actual: 0,
        };
        assert_eq!(version.errno(), -14);
        assert_eq!(RngError::no_match("foo,bar").errno(), -19);
        assert_eq!(RngError::MissingResource { resource: "reset" }.errno(), -2);
    }

    #[test]
    fn version_message_shows_both_codes() {
        let e = RngError::VersionMismatch {
            expected: 0x46bc,
            actual: 0x1234,
        };
        assert_eq!(
            e.to_string(),
            "Wrong TRNG version: expected 0x000046bc, actual 0x00001234"
        );
    }
}
