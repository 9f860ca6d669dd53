//! Silicon model for the Rockchip RK3568 and RK3588 TRNG blocks.
//!
//! This crate has **no dependencies** and **no hardware access**: it is a
//! pure model of the silicon: register offsets and bit definitions, the SoC
//! variants and their device-tree identities, and the timing constants the
//! driver programs.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | RK3568 crypto TRNG and TRNG v1 register maps |
//! | [`soc`] | Compatible strings, variants, quality, reference windows |
//! | [`timing`] | Poll period/timeout, autosuspend, sample and reseed counts |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod regs;
pub mod soc;
pub mod timing;
