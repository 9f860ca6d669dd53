//! Register window access
//!
//! Every backend (a `/dev/mem` mapping, the software TRNG model) exposes its
//! register window through [`Mmio`]. Accesses are 32-bit and bounds-checked;
//! the variants never touch anything narrower.

use crate::error::{Result, RngError};
use std::fmt::Debug;

/// 32-bit register window
pub trait Mmio: Debug + Send {
    /// Size of the window in bytes
    fn size(&self) -> usize;

    /// Read a 32-bit register
    ///
    /// # Errors
    ///
    /// Returns error if `offset + 4` exceeds the window.
    fn read32(&self, offset: usize) -> Result<u32>;

    /// Write a 32-bit register
    ///
    /// # Errors
    ///
    /// Returns error if `offset + 4` exceeds the window.
    fn write32(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Copy `buf.len()` bytes out of consecutive registers starting at
    /// `offset`, like `memcpy_fromio`. Registers are little-endian.
    ///
    /// # Errors
    ///
    /// Returns error if the copy would leave the window.
    fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len(), self.size())?;
        for (i, chunk) in buf.chunks_mut(4).enumerate() {
            let word = self.read32(offset + i * 4)?.to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }
}

impl<M: Mmio + ?Sized> Mmio for Box<M> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read32(&self, offset: usize) -> Result<u32> {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).write32(offset, value)
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(offset, buf)
    }
}

/// Validate an access of `len` bytes at `offset` against a window of `limit`
/// bytes.
///
/// # Errors
///
/// Returns [`RngError::OutOfBounds`] if the access does not fit.
pub fn check_bounds(offset: usize, len: usize, limit: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= limit => Ok(()),
        _ => Err(RngError::OutOfBounds { offset, len, limit }),
    }
}
