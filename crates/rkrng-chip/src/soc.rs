//! SoC identities and per-variant silicon facts.
//!
//! Source: upstream `rk356x-base.dtsi` and `rk3588-base.dtsi`, RK3568 and
//! RK3588 TRMs.

/// Device-tree compatible strings the driver binds to.
pub mod compatible {
    /// TRNG inside the RK3568 crypto block.
    pub const RK3568: &str = "rockchip,rk3568-rng";
    /// Standalone TRNG v1 in the RK3588.
    pub const RK3588: &str = "rockchip,rk3588-rng";
}

/// All supported compatible strings, in match-table order.
pub const ALL_COMPATIBLES: &[&str] = &[compatible::RK3568, compatible::RK3588];

/// TRNG hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocVariant {
    /// RK3568-style TRNG embedded in the crypto block.
    Rk3568,
    /// RK3588 standalone TRNG v1.
    Rk3588,
}

impl SocVariant {
    /// Look up a variant by device-tree compatible string.
    #[must_use]
    pub fn from_compatible(compatible: &str) -> Option<Self> {
        match compatible {
            compatible::RK3568 => Some(Self::Rk3568),
            compatible::RK3588 => Some(Self::Rk3588),
            _ => None,
        }
    }

    /// Device-tree compatible string for this variant.
    #[must_use]
    pub const fn compatible(self) -> &'static str {
        match self {
            Self::Rk3568 => compatible::RK3568,
            Self::Rk3588 => compatible::RK3588,
        }
    }

    /// Entropy quality per 1024 bits, as credited by the hwrng core.
    ///
    /// RK3568: sample count tuned for ~87.5% FIPS 140-2 successes.
    /// RK3588: as determined by testing.
    #[must_use]
    pub const fn quality(self) -> u16 {
        match self {
            Self::Rk3568 => 900,
            Self::Rk3588 => 999,
        }
    }

    /// Whether the reset line may be absent from the device description.
    #[must_use]
    pub const fn reset_optional(self) -> bool {
        matches!(self, Self::Rk3588)
    }

    /// Register window of the reference instance.
    #[must_use]
    pub const fn reference_window(self) -> RegisterWindow {
        match self {
            Self::Rk3568 => RegisterWindow { base: 0xfe38_8000, size: 0x4000 },
            Self::Rk3588 => RegisterWindow { base: 0xfe37_8000, size: 0x200 },
        }
    }

    /// Number of clocks in the reference device tree.
    ///
    /// RK3568 has `core` and `ahb`; the RK3588 block has a single
    /// firmware-managed bus clock.
    #[must_use]
    pub const fn clock_count(self) -> usize {
        match self {
            Self::Rk3568 => 2,
            Self::Rk3588 => 1,
        }
    }
}

impl std::fmt::Display for SocVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rk3568 => write!(f, "RK3568"),
            Self::Rk3588 => write!(f, "RK3588 (TRNG v1)"),
        }
    }
}

/// Physical register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWindow {
    /// Physical base address.
    pub base: u64,
    /// Window size in bytes.
    pub size: u64,
}
