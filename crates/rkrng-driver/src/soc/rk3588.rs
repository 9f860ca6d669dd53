//! RK3588 TRNG v1
//!
//! The block seeds itself at power-on and reseeds on its own after a
//! programmed number of requests. Reads busy-poll the ready flag with no
//! delay: a 256-bit request completes faster than an interrupt round trip,
//! so arming a completion only costs throughput.

use crate::device::RngHw;
use crate::error::{Result, RngError};
use crate::poll::{poll_register, PollOutcome};
use rkrng_chip::regs::trng_v1::{
    ctrl, istat, mode, stat, AUTO_RQSTS, CTRL, ISTAT, MODE, RAND0, STAT, VERSION, VERSION_CODE,
};
use rkrng_chip::regs::MAX_BYTES_PER_READ;
use rkrng_chip::timing::auto_reseed_requests;
use tracing::{debug, error};

pub(super) fn init(hw: &mut RngHw) -> Result<()> {
    hw.enable_clks()?;
    if let Err(e) = bring_up(hw) {
        hw.clocks.disable_unprepare();
        return Err(e);
    }
    Ok(())
}

fn bring_up(hw: &mut RngHw) -> Result<()> {
    let version = hw.regs.read32(VERSION)?;
    if version != VERSION_CODE {
        error!("wrong trng version, expected = {VERSION_CODE:08x}, actual = {version:08x}");
        return Err(RngError::VersionMismatch {
            expected: VERSION_CODE,
            actual: version,
        });
    }

    let mask = stat::SEEDED | stat::GENERATING | stat::RESEEDING;
    let timing = hw.slow_poll();
    let seeded = poll_register(&*hw.regs, STAT, timing, |s| s & mask == stat::SEEDED)?;
    if let Err(e) = seeded.or_timeout("hwrng to reseed", timing) {
        error!("timed out waiting for hwrng to reseed");
        return Err(e);
    }

    // Stale ISTAT flags would trigger an auto reseed right after power on.
    let pending = hw.regs.read32(ISTAT)?;
    hw.regs.write32(ISTAT, pending)?;

    let requests = auto_reseed_requests(hw.config.auto_reseed_bytes);
    hw.regs.write32(AUTO_RQSTS, requests)?;

    debug!("trng v1 seeded, auto reseed every {requests} requests");
    Ok(())
}

pub(super) fn cleanup(hw: &mut RngHw) {
    hw.clocks.disable_unprepare();
}

pub(super) fn read(hw: &mut RngHw, buf: &mut [u8]) -> Result<usize> {
    let to_read = buf.len().min(MAX_BYTES_PER_READ);

    // ISTAT updates even with interrupts disabled
    let pending = hw.regs.read32(ISTAT)?;
    hw.regs.write32(ISTAT, pending)?;

    hw.regs.write32(MODE, mode::BITS_256)?;
    hw.regs.write32(CTRL, ctrl::RAND)?;

    let timing = hw.busy_poll();
    let outcome = poll_register(&*hw.regs, ISTAT, timing, |reg| reg & istat::RAND_RDY != 0);

    let last = outcome.as_ref().map_or(0, |o| o.value);
    let copied = match outcome {
        Ok(PollOutcome { done: true, .. }) => hw.regs.read_bytes(RAND0, &mut buf[..to_read]),
        Ok(o) => o.or_timeout("random data", timing).map(drop),
        Err(e) => Err(e),
    };

    // Acknowledge whatever status was last seen and close the generator,
    // on success and on timeout alike.
    hw.regs.write32(ISTAT, last)?;
    hw.regs.write32(CTRL, ctrl::NOP)?;

    copied.map(|()| to_read)
}
