//! Userspace hwrng driver for the Rockchip RK3568 and RK3588 TRNG blocks.
//!
//! Binds to a TRNG described in the device tree, brings it up, and serves
//! random bytes through the hwrng contract. Register maps and silicon
//! constants live in `rkrng-chip`; this crate owns everything that touches
//! the hardware.
//!
//! # Backends
//!
//! ```text
//! DevMem    : physical registers mapped from /dev/mem (root, kernel
//!             driver unbound)
//! Software  : register-level model of both blocks, for CI
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use rkrng_driver::{select_backend, BackendSelection, DeviceManager, DriverConfig, RkRng,
//!                    Registration};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mgr = DeviceManager::discover()?;
//! let dev = &mgr.devices()[0];
//! let (_, resources) = select_backend(BackendSelection::Auto, dev)?;
//!
//! let rng = RkRng::probe(&dev.name, &dev.compatibles, resources, DriverConfig::from_env())?;
//! let reg = Registration::register(Box::new(rng))?;
//!
//! let mut key = [0u8; 64];
//! reg.fill(&mut key)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Variants
//!
//! | SoC | Block | Quality | Reset | Read path |
//! |-----|-------|---------|-------|-----------|
//! | RK3568 | crypto TRNG | 900 | required | sleep-poll `START` |
//! | RK3588 | TRNG v1 | 999 | optional | busy-poll `RAND_RDY` |

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
mod config;
mod device;
mod discovery;
mod error;
mod hwrng;
pub mod mmio;
pub mod pm;
pub mod poll;
pub mod resources;
pub mod soc;

/// Silicon facts (re-exported from rkrng-chip).
pub mod chip {
    pub use rkrng_chip::regs::MAX_BYTES_PER_READ;
    pub use rkrng_chip::soc::{compatible, RegisterWindow, SocVariant, ALL_COMPATIBLES};
    pub use rkrng_chip::timing;
}

pub use backend::{select_backend, BackendSelection, BackendType};
pub use backends::{DevMemRegion, Faults, SoftwareTrng};
pub use config::DriverConfig;
pub use device::{Resources, RkRng, RngHw, DRIVER_NAME};
pub use discovery::{default_root, DeviceManager, PlatformDevice, DT_ROOT_ENV};
pub use error::{Result, RngError};
pub use hwrng::{Hwrng, HwrngCore, Registration};
pub use pm::PmState;
