//! RK3568 crypto-block TRNG
//!
//! Single-shot generator: set `START`, wait for the hardware to clear it,
//! copy the eight `DOUT` words.

use crate::device::RngHw;
use crate::error::Result;
use crate::poll::poll_register;
use rkrng_chip::regs::rk3568::{ctl, masked_ctl, RNG_CTL, RNG_DOUT, RNG_SAMPLE_CNT};
use rkrng_chip::regs::MAX_BYTES_PER_READ;
use tracing::debug;

fn write_ctl(hw: &mut RngHw, value: u32, mask: u32) -> Result<()> {
    hw.regs.write32(RNG_CTL, masked_ctl(value, mask))
}

pub(super) fn init(hw: &mut RngHw) -> Result<()> {
    hw.enable_clks()?;

    let programmed = hw
        .regs
        .write32(RNG_SAMPLE_CNT, hw.config.sample_count)
        .and_then(|()| {
            // osc ring speed and enable
            write_ctl(
                hw,
                ctl::LEN_256_BIT | ctl::OSC_RING_SEL_GRP0 | ctl::ENABLE,
                ctl::MASK,
            )
        });
    if let Err(e) = programmed {
        hw.clocks.disable_unprepare();
        return Err(e);
    }

    debug!("rk3568 trng enabled, sample count {}", hw.config.sample_count);
    Ok(())
}

pub(super) fn cleanup(hw: &mut RngHw) {
    if let Err(e) = write_ctl(hw, 0, ctl::MASK) {
        tracing::warn!("Failed to stop TRNG: {e}");
    }
    hw.clocks.disable_unprepare();
}

pub(super) fn read(hw: &mut RngHw, buf: &mut [u8]) -> Result<usize> {
    let to_read = buf.len().min(MAX_BYTES_PER_READ);

    write_ctl(hw, ctl::START, ctl::START)?;

    let timing = hw.slow_poll();
    poll_register(&*hw.regs, RNG_CTL, timing, |reg| reg & ctl::START == 0)?
        .or_timeout("random data", timing)?;

    hw.regs.read_bytes(RNG_DOUT, &mut buf[..to_read])?;
    Ok(to_read)
}
