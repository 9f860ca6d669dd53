//! Register backends
//!
//! - **DevMem**: the physical register window mapped from `/dev/mem`
//! - **Software**: a register-level model of both TRNG blocks, for CI

pub mod mmap;
pub mod software;

pub use mmap::DevMemRegion;
pub use software::{Faults, SimClocks, SimHandle, SimReset, SoftwareTrng};
