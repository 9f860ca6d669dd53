//! Clock and reset resources
//!
//! The driver sees its clocks as one bulk set (`clk_bulk_*`) and its reset
//! lines as one array (`reset_control_array_*`). On a running Linux system
//! the clock and reset controllers belong to the kernel, so these
//! implementations only track state.

use crate::error::Result;
use std::fmt::Debug;
use tracing::{debug, trace};

/// Bulk clock set for one device
pub trait ClockBulk: Debug + Send {
    /// Number of clocks in the set
    fn count(&self) -> usize;

    /// Prepare and enable every clock, unwinding on failure
    ///
    /// # Errors
    ///
    /// Returns error if any clock fails to enable.
    fn prepare_enable(&mut self) -> Result<()>;

    /// Disable and unprepare every clock
    fn disable_unprepare(&mut self);

    /// Whether the set is currently enabled
    fn is_enabled(&self) -> bool;
}

/// Reset line array for one device
pub trait ResetControl: Debug + Send {
    /// Assert all lines
    ///
    /// # Errors
    ///
    /// Returns error if the reset controller rejects the request.
    fn assert(&mut self) -> Result<()>;

    /// Deassert all lines
    ///
    /// # Errors
    ///
    /// Returns error if the reset controller rejects the request.
    fn deassert(&mut self) -> Result<()>;
}

/// Clocks owned by the kernel or firmware
///
/// The named clocks are kept running by whoever owns the clock controller;
/// this only records the enable count so enable/disable pairing can be
/// checked.
#[derive(Debug, Clone)]
pub struct FirmwareClocks {
    names: Vec<String>,
    enable_count: u32,
}

impl FirmwareClocks {
    /// Clock set with the given names
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            enable_count: 0,
        }
    }

    /// Clock names
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ClockBulk for FirmwareClocks {
    fn count(&self) -> usize {
        self.names.len()
    }

    fn prepare_enable(&mut self) -> Result<()> {
        self.enable_count += 1;
        trace!("clocks {:?} enable count {}", self.names, self.enable_count);
        Ok(())
    }

    fn disable_unprepare(&mut self) {
        self.enable_count = self.enable_count.saturating_sub(1);
        trace!("clocks {:?} enable count {}", self.names, self.enable_count);
    }

    fn is_enabled(&self) -> bool {
        self.enable_count > 0
    }
}

/// Reset lines owned by the kernel
///
/// The kernel pulses these when it brings the block up; from userspace the
/// request is recorded and otherwise ignored.
#[derive(Debug, Clone, Default)]
pub struct FirmwareReset {
    lines: usize,
}

impl FirmwareReset {
    /// Reset array with `lines` specifiers
    pub const fn new(lines: usize) -> Self {
        Self { lines }
    }
}

impl ResetControl for FirmwareReset {
    fn assert(&mut self) -> Result<()> {
        debug!("reset assert ({} line(s), kernel owned)", self.lines);
        Ok(())
    }

    fn deassert(&mut self) -> Result<()> {
        debug!("reset deassert ({} line(s), kernel owned)", self.lines);
        Ok(())
    }
}
