//! Rockchip TRNG device: probe, bind and the hwrng glue
//!
//! `RkRng::probe` is the platform-driver bind path. It selects the
//! operation table by compatible string, pulses the reset, sets up runtime
//! PM and returns a device ready to hand to [`Registration::register`].
//!
//! [`Registration::register`]: crate::Registration::register

use crate::config::DriverConfig;
use crate::error::{Result, RngError};
use crate::hwrng::Hwrng;
use crate::mmio::Mmio;
use crate::pm::{PmState, RuntimePm};
use crate::poll::PollTiming;
use crate::resources::{ClockBulk, ResetControl};
use crate::soc::{of_match, SocData};
use rkrng_chip::soc::SocVariant;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Driver name used for registration
pub const DRIVER_NAME: &str = "rockchip-rng";

/// Resources handed to probe by the platform layer
#[derive(Debug)]
pub struct Resources {
    /// Register window
    pub regs: Box<dyn Mmio>,
    /// Bulk clock set
    pub clocks: Box<dyn ClockBulk>,
    /// Reset lines, if described
    pub reset: Option<Box<dyn ResetControl>>,
}

/// The hardware half of a bound device, as seen by the variant operations
#[derive(Debug)]
pub struct RngHw {
    pub(crate) regs: Box<dyn Mmio>,
    pub(crate) clocks: Box<dyn ClockBulk>,
    pub(crate) config: DriverConfig,
}

impl RngHw {
    pub(crate) fn enable_clks(&mut self) -> Result<()> {
        self.clocks.prepare_enable().inspect_err(|e| {
            error!("Failed to enable clocks: {e}");
        })
    }

    pub(crate) fn slow_poll(&self) -> PollTiming {
        PollTiming::new(self.config.poll_period, self.config.poll_timeout)
    }

    pub(crate) fn busy_poll(&self) -> PollTiming {
        PollTiming::busy(self.config.poll_timeout)
    }
}

/// A bound Rockchip TRNG
#[derive(Debug)]
pub struct RkRng {
    name: String,
    soc: &'static SocData,
    hw: RngHw,
    pm: RuntimePm,
}

impl RkRng {
    /// Bind to a platform device
    ///
    /// `compatibles` is the device's compatible list, most specific first.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::NoMatch`] for an unsupported device,
    /// [`RngError::MissingResource`] if a required reset is absent, or the
    /// reset controller's error.
    pub fn probe<S: AsRef<str>>(
        name: impl Into<String>,
        compatibles: &[S],
        resources: Resources,
        config: DriverConfig,
    ) -> Result<Self> {
        let name = name.into();
        let soc = of_match(compatibles).ok_or_else(|| {
            RngError::no_match(
                compatibles
                    .first()
                    .map_or_else(String::new, |c| c.as_ref().to_string()),
            )
        })?;
        debug!("{name}: matched {} ({} clock(s))", soc.variant, resources.clocks.count());

        let Resources { regs, clocks, reset } = resources;
        if regs.size() == 0 {
            error!("{name}: no register window");
            return Err(RngError::MissingResource {
                resource: "registers",
            });
        }
        match reset {
            Some(mut rst) => pulse_reset(rst.as_mut(), &config).inspect_err(|e| {
                error!("{name}: Failed to get reset property: {e}");
            })?,
            None if !soc.reset_optional => {
                error!("{name}: Failed to get reset property");
                return Err(RngError::MissingResource { resource: "reset" });
            }
            None => debug!("{name}: no reset line"),
        }

        let pm = if config.runtime_pm {
            RuntimePm::new(config.autosuspend_delay)
        } else {
            RuntimePm::disabled()
        };

        info!("{DRIVER_NAME} {name}: {} TRNG bound, quality {}", soc.variant, soc.quality);
        Ok(Self {
            name,
            soc,
            hw: RngHw {
                regs,
                clocks,
                config,
            },
            pm,
        })
    }

    /// Variant driving this device
    pub const fn variant(&self) -> SocVariant {
        self.soc.variant
    }

    /// Runtime PM state
    pub const fn pm_state(&self) -> PmState {
        self.pm.state()
    }

    /// Whether the bulk clocks are on
    pub fn clocks_enabled(&self) -> bool {
        self.hw.clocks.is_enabled()
    }

    /// Suspend now if idle for the autosuspend delay
    pub fn run_autosuspend(&mut self, now: Instant) -> bool {
        let Self { soc, hw, pm, .. } = self;
        pm.run_autosuspend(now, || (soc.cleanup)(hw))
    }

    /// System sleep: power down regardless of the autosuspend timer
    ///
    /// # Errors
    ///
    /// Returns error if a read is in flight.
    pub fn suspend(&mut self) -> Result<()> {
        let Self { soc, hw, pm, .. } = self;
        pm.force_suspend(|| (soc.cleanup)(hw))
    }

    /// System wake: bring the block back if it was active at suspend
    ///
    /// # Errors
    ///
    /// Returns the variant `init` error.
    pub fn resume(&mut self) -> Result<()> {
        let Self { soc, hw, pm, .. } = self;
        pm.force_resume(|| (soc.init)(hw))
    }
}

fn pulse_reset(rst: &mut dyn ResetControl, config: &DriverConfig) -> Result<()> {
    rst.assert()?;
    std::thread::sleep(config.reset_pulse);
    rst.deassert()
}

impl Hwrng for RkRng {
    fn name(&self) -> &str {
        &self.name
    }

    fn quality(&self) -> u16 {
        self.soc.quality
    }

    fn init(&mut self) -> Result<()> {
        if self.pm.is_enabled() {
            return Ok(());
        }
        (self.soc.init)(&mut self.hw)
    }

    fn read(&mut self, buf: &mut [u8], _wait: bool) -> Result<usize> {
        let Self { soc, hw, pm, .. } = self;
        pm.resume_and_get(|| (soc.init)(hw))?;

        let result = (soc.read)(hw, buf);

        pm.mark_last_busy();
        pm.put_autosuspend(|| (soc.cleanup)(hw))?;

        if let Err(e) = &result {
            warn!("{}: read failed: {e}", self.name);
        }
        result
    }

    fn cleanup(&mut self) {
        if !self.pm.is_enabled() {
            (self.soc.cleanup)(&mut self.hw);
            return;
        }
        if let Err(e) = self.suspend() {
            warn!("{}: {e}", self.name);
        }
    }

    fn idle(&mut self) {
        self.run_autosuspend(Instant::now());
    }
}
