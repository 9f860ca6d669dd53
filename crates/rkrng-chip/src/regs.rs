//! Register maps for both Rockchip TRNG blocks.
//!
//! The two IPs share nothing but the fact that their control register sits
//! at offset zero. Offsets and bit positions come from the RK3568 and RK3588
//! TRMs and match what the vendor BSP drivers program.
//!
//! ## Probing results
//!
//! ```text
//! RK3568 crypto TRNG @ 0xfe388000
//!   0x0000: RNG_CTL         hiword-masked, START self-clears when done
//!   0x0004: RNG_SAMPLE_CNT  osc ring sample period
//!   0x0010: RNG_DOUT[0..8]  256 bits of output
//!
//! RK3588 TRNG v1 @ 0xfe378000
//!   0x00f0: VERSION         0x000046bc
//!   0x0004: STAT            0x00000200 after power-on self seeding
//! ```

/// Registers of the TRNG embedded in the RK3568 crypto block.
pub mod rk3568 {
    // ── Control ──────────────────────────────────────────────────────────────

    /// Control register. The upper 16 bits are a write mask for the lower 16.
    pub const RNG_CTL: usize = 0x0000;
    /// Sample period: the osc ring output is collected every `n` cycles.
    pub const RNG_SAMPLE_CNT: usize = 0x0004;
    /// First of eight output words.
    pub const RNG_DOUT: usize = 0x0010;
    /// Number of 32-bit output words.
    pub const RNG_DOUT_WORDS: usize = 8;

    /// `RNG_CTL` bit definitions.
    pub mod ctl {
        /// Start collecting random data; hardware clears it when done.
        pub const START: u32 = 1 << 0;
        /// Enable the osc ring.
        pub const ENABLE: u32 = 1 << 1;

        /// Osc ring group 0 (fastest).
        pub const OSC_RING_SEL_GRP0: u32 = 0x00 << 2;
        /// Osc ring group 1.
        pub const OSC_RING_SEL_GRP1: u32 = 0x01 << 2;
        /// Osc ring group 2.
        pub const OSC_RING_SEL_GRP2: u32 = 0x02 << 2;
        /// Osc ring group 3 (slowest).
        pub const OSC_RING_SEL_GRP3: u32 = 0x03 << 2;

        /// Generate 64 bits per request.
        pub const LEN_64_BIT: u32 = 0x00 << 4;
        /// Generate 128 bits per request.
        pub const LEN_128_BIT: u32 = 0x01 << 4;
        /// Generate 192 bits per request.
        pub const LEN_192_BIT: u32 = 0x02 << 4;
        /// Generate 256 bits per request.
        pub const LEN_256_BIT: u32 = 0x03 << 4;

        /// All writable control bits.
        pub const MASK: u32 = 0xffff;
    }

    /// Encode a masked write to `RNG_CTL`: only bits set in `mask` change.
    #[must_use]
    pub const fn masked_ctl(value: u32, mask: u32) -> u32 {
        (mask << 16) | value
    }
}

/// Registers of the standalone TRNG v1 IP found in the RK3588.
pub mod trng_v1 {
    // ── Command / status ─────────────────────────────────────────────────────

    /// Command register.
    pub const CTRL: usize = 0x0000;
    /// Status register.
    pub const STAT: usize = 0x0004;
    /// Generation mode.
    pub const MODE: usize = 0x0008;
    /// Interrupt enable. Unused: polling beats IRQ dispatch for 32 bytes.
    pub const IE: usize = 0x0010;
    /// Interrupt status, write one to clear.
    pub const ISTAT: usize = 0x0014;

    // ── Output ───────────────────────────────────────────────────────────────

    /// First output word (`RAND0`).
    pub const RAND0: usize = 0x0020;
    /// Last output word (`RAND7`).
    pub const RAND7: usize = 0x003C;

    // ── Reseeding / identity ─────────────────────────────────────────────────

    /// Auto reseed threshold, counted in 16-byte requests.
    pub const AUTO_RQSTS: usize = 0x0060;
    /// IP version register.
    pub const VERSION: usize = 0x00F0;
    /// Value of `VERSION` on every known TRNG v1 instance.
    pub const VERSION_CODE: u32 = 0x46bc;

    /// `CTRL` commands.
    pub mod ctrl {
        /// No operation; closes the generator after a read.
        pub const NOP: u32 = 0x00;
        /// Generate random data.
        pub const RAND: u32 = 0x01;
        /// Force a reseed.
        pub const SEED: u32 = 0x02;
    }

    /// `STAT` bit definitions.
    pub mod stat {
        /// Initial seeding has completed.
        pub const SEEDED: u32 = 1 << 9;
        /// A generation request is in flight.
        pub const GENERATING: u32 = 1 << 30;
        /// The block is reseeding.
        pub const RESEEDING: u32 = 1 << 31;
    }

    /// `MODE` values.
    pub mod mode {
        /// 128 bits per request.
        pub const BITS_128: u32 = 0x00 << 3;
        /// 256 bits per request.
        pub const BITS_256: u32 = 0x01 << 3;
    }

    /// `IE` bit definitions.
    pub mod ie {
        /// Global interrupt enable.
        pub const GLBL_EN: u32 = 1 << 31;
        /// Seed done interrupt.
        pub const SEED_DONE_EN: u32 = 1 << 1;
        /// Random data ready interrupt.
        pub const RAND_RDY_EN: u32 = 1 << 0;
    }

    /// `ISTAT` bit definitions.
    pub mod istat {
        /// Random data is ready in `RAND0..RAND7`.
        pub const RAND_RDY: u32 = 1 << 0;
    }
}

/// Largest number of bytes a single read may return on either block.
pub const MAX_BYTES_PER_READ: usize = 32;

// Raising the read size past the RAND0..RAND7 window would read past the
// TRNG v1 output registers.
const _: () = assert!(MAX_BYTES_PER_READ <= trng_v1::RAND7 + 4 - trng_v1::RAND0);
const _: () = assert!(MAX_BYTES_PER_READ <= rk3568::RNG_DOUT_WORDS * 4);
