//! Backend selection
//!
//! Turns a discovered [`PlatformDevice`] into the [`Resources`] probe needs:
//! a register window plus clock and reset handles.

use crate::backends::{DevMemRegion, SoftwareTrng};
use crate::device::Resources;
use crate::discovery::PlatformDevice;
use crate::error::{Result, RngError};
use crate::resources::{FirmwareClocks, FirmwareReset, ResetControl};

/// Register backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Physical registers through `/dev/mem`
    DevMem,

    /// Software TRNG model
    Software,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DevMem => write!(f, "/dev/mem"),
            Self::Software => write!(f, "Software (simulated TRNG)"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    /// Best available: physical registers
    Auto,

    /// Force `/dev/mem`
    DevMem,

    /// Force the software model, for CI and dry runs
    Software,
}

/// Build probe resources for `device`
///
/// # Errors
///
/// Returns error if the device's compatible list is unsupported or the
/// register window cannot be mapped.
pub fn select_backend(
    selection: BackendSelection,
    device: &PlatformDevice,
) -> Result<(BackendType, Resources)> {
    match selection {
        BackendSelection::Auto | BackendSelection::DevMem => {
            let size = usize::try_from(device.size).map_err(|_| {
                RngError::invalid_device_tree(&device.path, "reg size exceeds address space")
            })?;
            let regs = DevMemRegion::map(device.base, size)?;
            tracing::info!("Using /dev/mem backend for {}", device.name);
            let reset = (device.reset_count > 0).then(|| {
                Box::new(FirmwareReset::new(device.reset_count)) as Box<dyn ResetControl>
            });
            Ok((
                BackendType::DevMem,
                Resources {
                    regs: Box::new(regs),
                    clocks: Box::new(FirmwareClocks::new(device.clock_names.clone())),
                    reset,
                },
            ))
        }

        BackendSelection::Software => {
            let variant = device.variant().ok_or_else(|| {
                RngError::no_match(device.compatibles.first().cloned().unwrap_or_default())
            })?;
            tracing::info!("Using software backend for {}", device.name);
            let sim = SoftwareTrng::new(variant);
            Ok((BackendType::Software, sim.into_resources(device.reset_count > 0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::Mmio;
    use rkrng_chip::soc::SocVariant;

    #[test]
    fn software_backend_follows_reset_count() {
        let mut dev = PlatformDevice::reference(SocVariant::Rk3588);
        let (kind, res) = select_backend(BackendSelection::Software, &dev).unwrap();
        assert_eq!(kind, BackendType::Software);
        assert!(res.reset.is_none());

        dev.reset_count = 1;
        let (_, res) = select_backend(BackendSelection::Software, &dev).unwrap();
        assert!(res.reset.is_some());
        assert_eq!(res.regs.size(), 0x200);
    }

    #[test]
    fn software_backend_rejects_unknown_device() {
        let mut dev = PlatformDevice::reference(SocVariant::Rk3568);
        dev.compatibles = vec!["rockchip,rk3288-crypto".into()];
        assert!(matches!(
            select_backend(BackendSelection::Software, &dev),
            Err(RngError::NoMatch { .. })
        ));
    }
}
