//! `/dev/mem` register window
//!
//! Maps a physical register block into the process with `O_SYNC` so the
//! pages are uncached. Requires `CAP_SYS_RAWIO` and a kernel that allows
//! `/dev/mem` access to the range (`CONFIG_STRICT_DEVMEM` blocks claimed
//! I/O regions: unbind the kernel driver first).

use crate::error::{Result, RngError};
use crate::mmio::{check_bounds, Mmio};
use rustix::fs::OFlags;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::Path;
use std::ptr::NonNull;

/// Physical memory device
pub const DEV_MEM: &str = "/dev/mem";

/// Register window mapped from physical memory
#[derive(Debug)]
pub struct DevMemRegion {
    /// Start of the page-aligned mapping
    map: NonNull<u8>,
    map_len: usize,
    /// Offset of the register window inside the mapping
    start: usize,
    size: usize,
    phys_base: u64,
    _file: File,
}

impl DevMemRegion {
    /// Map `size` bytes of registers at physical address `phys_base`
    ///
    /// # Errors
    ///
    /// Returns error if `/dev/mem` cannot be opened or the range cannot be
    /// mapped.
    pub fn map(phys_base: u64, size: usize) -> Result<Self> {
        Self::map_from(Path::new(DEV_MEM), phys_base, size)
    }

    /// Map from an arbitrary memory device (e.g. a `uio` node)
    ///
    /// # Errors
    ///
    /// Returns error if `phys_base` is not 32-bit aligned, or if the device
    /// cannot be opened or the range cannot be mapped.
    pub fn map_from(device: &Path, phys_base: u64, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(RngError::MissingResource {
                resource: "registers",
            });
        }
        // every register pointer is start + offset; start must keep u32 alignment
        if phys_base % 4 != 0 {
            tracing::error!("Register base {phys_base:#x} is not 32-bit aligned");
            return Err(RngError::invalid_state(format!(
                "unaligned register base {phys_base:#x}"
            )));
        }

        #[allow(clippy::cast_possible_wrap)]
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlags::SYNC.bits() as i32)
            .open(device)
            .map_err(|e| {
                tracing::error!("Cannot open {}: {e}", device.display());
                e
            })?;

        let page = rustix::param::page_size() as u64;
        let aligned = phys_base & !(page - 1);
        #[allow(clippy::cast_possible_truncation)]
        let start = (phys_base - aligned) as usize;
        let map_len = (start + size).next_multiple_of(page as usize);

        // SAFETY: fresh shared mapping of a device file; nothing else in the
        // process aliases it, and it lives until Drop unmaps it.
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                aligned,
            )
        }
        .map_err(|e| {
            tracing::error!("mmap of {phys_base:#x}+{size:#x} failed: {e}");
            std::io::Error::from(e)
        })?;
        let map = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| RngError::invalid_state("mmap returned null"))?;

        tracing::debug!("Mapped {size:#x} bytes at {phys_base:#x} ({map_len:#x} byte mapping)");

        Ok(Self {
            map,
            map_len,
            start,
            size,
            phys_base,
            _file: file,
        })
    }

    fn reg(&self, offset: usize) -> Result<*mut u32> {
        check_bounds(offset, 4, self.size)?;
        if offset % 4 != 0 {
            return Err(RngError::OutOfBounds {
                offset,
                len: 4,
                limit: self.size,
            });
        }
        // SAFETY: start + offset + 4 <= start + size <= map_len; start and
        // offset are both multiples of 4 and the mapping is page aligned.
        #[allow(clippy::cast_ptr_alignment)]
        let ptr = unsafe { self.map.as_ptr().add(self.start + offset).cast::<u32>() };
        Ok(ptr)
    }
}

impl Mmio for DevMemRegion {
    fn size(&self) -> usize {
        self.size
    }

    fn read32(&self, offset: usize) -> Result<u32> {
        let ptr = self.reg(offset)?;
        // SAFETY: in-bounds, aligned, mapped for the lifetime of self
        let value = unsafe { ptr.read_volatile() };
        tracing::trace!("read32 {offset:#06x} = {value:#010x}");
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        let ptr = self.reg(offset)?;
        tracing::trace!("write32 {offset:#06x} = {value:#010x}");
        // SAFETY: in-bounds, aligned, mapped for the lifetime of self
        unsafe { ptr.write_volatile(value) };
        Ok(())
    }
}

impl Drop for DevMemRegion {
    fn drop(&mut self) {
        tracing::debug!("Unmapping registers at {:#x}", self.phys_base);
        // SAFETY: map/map_len are exactly what mmap returned in map_from
        if let Err(e) = unsafe { munmap(self.map.as_ptr().cast(), self.map_len) } {
            tracing::error!("munmap failed during drop: {e}");
        }
    }
}

// SAFETY: the mapping is owned exclusively by this value; moving it to
// another thread does not invalidate it.
unsafe impl Send for DevMemRegion {}
