//! Per-variant operation tables
//!
//! Each supported IP block supplies its own `init`, `read` and `cleanup`
//! along with a quality score and its reset requirements. A table is picked
//! once at probe time by compatible string and never changes afterwards;
//! the only dispatch cost is the indirect call through it.

mod rk3568;
mod rk3588;

use crate::device::RngHw;
use crate::error::Result;
use rkrng_chip::soc::{compatible, SocVariant};

/// Hardware operation table for one TRNG variant
#[derive(Debug)]
pub struct SocData {
    /// Variant this table drives
    pub variant: SocVariant,
    /// Power up: enable clocks and program the block
    pub init: fn(&mut RngHw) -> Result<()>,
    /// Fill up to 32 bytes of `buf`, returning the count
    pub read: fn(&mut RngHw, &mut [u8]) -> Result<usize>,
    /// Power down: stop the block and disable clocks
    pub cleanup: fn(&mut RngHw),
    /// Entropy per 1024 bits
    pub quality: u16,
    /// Whether the reset line may be missing from the device description
    pub reset_optional: bool,
}

/// RK3568 crypto-block TRNG
pub static RK3568_SOC_DATA: SocData = SocData {
    variant: SocVariant::Rk3568,
    init: rk3568::init,
    read: rk3568::read,
    cleanup: rk3568::cleanup,
    quality: SocVariant::Rk3568.quality(),
    reset_optional: SocVariant::Rk3568.reset_optional(),
};

/// RK3588 TRNG v1
pub static RK3588_SOC_DATA: SocData = SocData {
    variant: SocVariant::Rk3588,
    init: rk3588::init,
    read: rk3588::read,
    cleanup: rk3588::cleanup,
    quality: SocVariant::Rk3588.quality(),
    reset_optional: SocVariant::Rk3588.reset_optional(),
};

/// One entry of the device-tree match table
#[derive(Debug)]
pub struct OfDeviceId {
    /// Compatible string
    pub compatible: &'static str,
    /// Match data
    pub data: &'static SocData,
}

/// Device-tree match table
pub static OF_MATCH_TABLE: &[OfDeviceId] = &[
    OfDeviceId {
        compatible: compatible::RK3568,
        data: &RK3568_SOC_DATA,
    },
    OfDeviceId {
        compatible: compatible::RK3588,
        data: &RK3588_SOC_DATA,
    },
];

/// Match a device's compatible list against the table
///
/// The device list is ordered most specific first, so the first entry that
/// hits wins.
pub fn of_match<S: AsRef<str>>(compatibles: &[S]) -> Option<&'static SocData> {
    compatibles.iter().find_map(|c| {
        OF_MATCH_TABLE
            .iter()
            .find(|id| id.compatible == c.as_ref())
            .map(|id| id.data)
    })
}
