// SPDX-License-Identifier: AGPL-3.0-only

//! Software TRNG backend
//!
//! A register-level model of both Rockchip TRNG blocks. It implements
//! [`Mmio`] and hands out clock and reset handles that share its state, so
//! the real variant code runs unmodified against it:
//!
//! 1. **CI without hardware**: probe, init, read, runtime PM and cleanup all
//!    run end to end.
//! 2. **Fault injection**: wrong IP version, a block that never seeds, a
//!    stalled generator, slow completions, clocks that refuse to enable.
//! 3. **Register audit**: every write is logged for tests to inspect.
//!
//! ## Behaviour
//!
//! ```text
//! RK3568   RNG_CTL write  → hiword mask applied; START with ENABLE queues a
//!                           request, START clears when it completes
//! TRNG v1  CTRL = RAND    → STAT.GENERATING until done, then ISTAT.RAND_RDY
//!          ISTAT write    → write one to clear
//!          STAT           → SEEDED after the power-on seeding delay
//! both     status reads   → advance the pending request by one poll
//!          any access with clocks gated → error (the bus would hang)
//! ```
//!
//! Output comes from a splitmix64 stream: statistically flat, not secure.

use crate::device::Resources;
use crate::error::{Result, RngError};
use crate::mmio::{check_bounds, Mmio};
use crate::resources::{ClockBulk, ResetControl};
use rkrng_chip::regs::{rk3568, trng_v1};
use rkrng_chip::soc::SocVariant;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Injected misbehaviour
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// Report this value from the TRNG v1 `VERSION` register
    pub version: Option<u32>,
    /// TRNG v1 never finishes its power-on seeding
    pub never_seeds: bool,
    /// Requests never complete
    pub stalled: bool,
    /// Status polls before a request completes
    pub latency_polls: u32,
    /// Status polls before power-on seeding completes
    pub seed_polls: u32,
    /// Clock enable fails
    pub clock_fails: bool,
}

#[derive(Debug)]
struct SimState {
    variant: SocVariant,
    regs: Vec<u32>,
    faults: Faults,
    clock_count: u32,
    clock_enables: u32,
    reset_asserted: bool,
    reset_pulses: u32,
    pending: Option<u32>,
    seed_remaining: u32,
    requests: u32,
    writes: Vec<(usize, u32)>,
    stream: u64,
}

impl SimState {
    fn new(variant: SocVariant, faults: Faults, seed: u64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let words = variant.reference_window().size as usize / 4;
        let mut state = Self {
            variant,
            regs: vec![0; words],
            seed_remaining: faults.seed_polls,
            faults,
            clock_count: 0,
            clock_enables: 0,
            reset_asserted: false,
            reset_pulses: 0,
            pending: None,
            requests: 0,
            writes: Vec::new(),
            stream: seed,
        };
        state.power_on();
        state
    }

    /// Register values after reset
    fn power_on(&mut self) {
        self.regs.fill(0);
        self.pending = None;
        self.seed_remaining = self.faults.seed_polls;
        if self.variant == SocVariant::Rk3588 {
            let version = self.faults.version.unwrap_or(trng_v1::VERSION_CODE);
            self.regs[trng_v1::VERSION / 4] = version;
            // stale ready flag left over from the boot firmware
            self.regs[trng_v1::ISTAT / 4] = trng_v1::istat::RAND_RDY;
            self.regs[trng_v1::STAT / 4] = trng_v1::stat::RESEEDING;
        }
    }

    fn next_word(&mut self) -> u32 {
        self.stream = self.stream.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.stream;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        #[allow(clippy::cast_possible_truncation)]
        let word = (z ^ (z >> 31)) as u32;
        word
    }

    fn check_access(&self, offset: usize) -> Result<()> {
        check_bounds(offset, 4, self.regs.len() * 4)?;
        if self.clock_count == 0 {
            return Err(RngError::invalid_state(format!(
                "register {offset:#x} accessed with clocks gated"
            )));
        }
        if self.reset_asserted {
            return Err(RngError::invalid_state(format!(
                "register {offset:#x} accessed in reset"
            )));
        }
        Ok(())
    }

    fn read(&mut self, offset: usize) -> Result<u32> {
        self.check_access(offset)?;
        match (self.variant, offset) {
            (SocVariant::Rk3568, rk3568::RNG_CTL) | (SocVariant::Rk3588, trng_v1::ISTAT) => {
                self.advance_request();
            }
            (SocVariant::Rk3588, trng_v1::STAT) => self.advance_seeding(),
            _ => {}
        }
        Ok(self.regs[offset / 4])
    }

    fn write(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check_access(offset)?;
        trace!("sim write {offset:#06x} = {value:#010x}");
        self.writes.push((offset, value));
        match self.variant {
            SocVariant::Rk3568 => self.write_rk3568(offset, value),
            SocVariant::Rk3588 => self.write_trng_v1(offset, value),
        }
        Ok(())
    }

    fn write_rk3568(&mut self, offset: usize, value: u32) {
        use rk3568::ctl;

        if offset != rk3568::RNG_CTL {
            self.regs[offset / 4] = value;
            return;
        }
        let mask = value >> 16;
        let old = self.regs[offset / 4];
        let new = (old & !mask) | (value & mask & ctl::MASK);
        self.regs[offset / 4] = new;

        let started = old & ctl::START == 0 && new & ctl::START != 0;
        if started && new & ctl::ENABLE != 0 {
            self.queue_request();
        } else if new & ctl::START == 0 {
            self.pending = None;
        }
    }

    fn write_trng_v1(&mut self, offset: usize, value: u32) {
        use trng_v1::{ctrl, stat};

        match offset {
            trng_v1::VERSION => {}
            trng_v1::ISTAT => self.regs[offset / 4] &= !value,
            trng_v1::CTRL => {
                self.regs[offset / 4] = value;
                match value {
                    ctrl::RAND => {
                        self.regs[trng_v1::STAT / 4] |= stat::GENERATING;
                        self.queue_request();
                    }
                    ctrl::SEED => self.seed_remaining = self.faults.seed_polls,
                    _ => {}
                }
            }
            _ => self.regs[offset / 4] = value,
        }
    }

    fn queue_request(&mut self) {
        self.pending = if self.faults.stalled {
            None
        } else {
            Some(self.faults.latency_polls)
        };
        if self.faults.stalled {
            trace!("sim request stalled");
        }
    }

    fn advance_request(&mut self) {
        match self.pending {
            Some(0) => self.complete_request(),
            Some(n) => self.pending = Some(n - 1),
            None => {}
        }
    }

    fn complete_request(&mut self) {
        self.pending = None;
        self.requests += 1;
        let (base, words) = match self.variant {
            SocVariant::Rk3568 => (rk3568::RNG_DOUT, rk3568::RNG_DOUT_WORDS),
            SocVariant::Rk3588 => {
                let words = if self.regs[trng_v1::MODE / 4] == trng_v1::mode::BITS_256 {
                    8
                } else {
                    4
                };
                (trng_v1::RAND0, words)
            }
        };
        for i in 0..words {
            let word = self.next_word();
            self.regs[base / 4 + i] = word;
        }
        match self.variant {
            SocVariant::Rk3568 => self.regs[rk3568::RNG_CTL / 4] &= !rk3568::ctl::START,
            SocVariant::Rk3588 => {
                self.regs[trng_v1::STAT / 4] &= !trng_v1::stat::GENERATING;
                self.regs[trng_v1::ISTAT / 4] |= trng_v1::istat::RAND_RDY;
            }
        }
    }

    fn advance_seeding(&mut self) {
        use trng_v1::stat;

        let status = &mut self.regs[trng_v1::STAT / 4];
        if *status & stat::SEEDED != 0 || self.faults.never_seeds {
            return;
        }
        if self.seed_remaining == 0 {
            *status = (*status & !stat::RESEEDING) | stat::SEEDED;
        } else {
            self.seed_remaining -= 1;
        }
    }
}

fn lock(state: &Mutex<SimState>) -> Result<MutexGuard<'_, SimState>> {
    state
        .lock()
        .map_err(|_| RngError::invalid_state("software TRNG state poisoned"))
}

/// Software model of a Rockchip TRNG register window
#[derive(Debug, Clone)]
pub struct SoftwareTrng {
    state: Arc<Mutex<SimState>>,
    size: usize,
}

impl SoftwareTrng {
    /// Healthy model of `variant`
    pub fn new(variant: SocVariant) -> Self {
        Self::with_faults(variant, Faults::default())
    }

    /// Model of `variant` with injected faults
    pub fn with_faults(variant: SocVariant, faults: Faults) -> Self {
        Self::with_seed(variant, faults, 0x5eed_0f_7a11_9e57)
    }

    /// Model with an explicit output stream seed
    pub fn with_seed(variant: SocVariant, faults: Faults, seed: u64) -> Self {
        let state = SimState::new(variant, faults, seed);
        let size = state.regs.len() * 4;
        Self {
            state: Arc::new(Mutex::new(state)),
            size,
        }
    }

    /// Clock set sharing this model's state
    pub fn clocks(&self) -> SimClocks {
        SimClocks {
            state: Arc::clone(&self.state),
            enabled: false,
        }
    }

    /// Reset line sharing this model's state
    pub fn reset(&self) -> SimReset {
        SimReset {
            state: Arc::clone(&self.state),
        }
    }

    /// Inspection handle for tests and diagnostics
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Probe resources backed by this model
    pub fn into_resources(self, with_reset: bool) -> Resources {
        let clocks = Box::new(self.clocks());
        let reset = with_reset.then(|| Box::new(self.reset()) as Box<dyn ResetControl>);
        Resources {
            regs: Box::new(self),
            clocks,
            reset,
        }
    }
}

impl Mmio for SoftwareTrng {
    fn size(&self) -> usize {
        self.size
    }

    fn read32(&self, offset: usize) -> Result<u32> {
        lock(&self.state)?.read(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        lock(&self.state)?.write(offset, value)
    }
}

/// Clock handle of a [`SoftwareTrng`]
#[derive(Debug)]
pub struct SimClocks {
    state: Arc<Mutex<SimState>>,
    enabled: bool,
}

impl ClockBulk for SimClocks {
    fn count(&self) -> usize {
        lock(&self.state).map_or(0, |s| s.variant.clock_count())
    }

    fn prepare_enable(&mut self) -> Result<()> {
        let mut state = lock(&self.state)?;
        if state.faults.clock_fails {
            return Err(RngError::clock("simulated clock gate failure"));
        }
        state.clock_count += 1;
        state.clock_enables += 1;
        self.enabled = true;
        Ok(())
    }

    fn disable_unprepare(&mut self) {
        if let Ok(mut state) = lock(&self.state) {
            state.clock_count = state.clock_count.saturating_sub(1);
            self.enabled = state.clock_count > 0;
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Reset handle of a [`SoftwareTrng`]
#[derive(Debug)]
pub struct SimReset {
    state: Arc<Mutex<SimState>>,
}

impl ResetControl for SimReset {
    fn assert(&mut self) -> Result<()> {
        let mut state = lock(&self.state)?;
        state.reset_asserted = true;
        state.power_on();
        Ok(())
    }

    fn deassert(&mut self) -> Result<()> {
        let mut state = lock(&self.state)?;
        if state.reset_asserted {
            state.reset_pulses += 1;
        }
        state.reset_asserted = false;
        Ok(())
    }
}

/// Read-only view into a [`SoftwareTrng`]
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    fn with<T>(&self, f: impl FnOnce(&SimState) -> T) -> T {
        match self.state.lock() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Raw register value, bypassing clock checks and side effects
    pub fn register(&self, offset: usize) -> u32 {
        self.with(|s| s.regs[offset / 4])
    }

    /// Whether any clock enable is outstanding
    pub fn clocks_enabled(&self) -> bool {
        self.with(|s| s.clock_count > 0)
    }

    /// Total successful clock enables
    pub fn clock_enables(&self) -> u32 {
        self.with(|s| s.clock_enables)
    }

    /// Completed reset pulses
    pub fn reset_pulses(&self) -> u32 {
        self.with(|s| s.reset_pulses)
    }

    /// Completed generation requests
    pub fn requests(&self) -> u32 {
        self.with(|s| s.requests)
    }

    /// Every register write so far
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.with(|s| s.writes.clone())
    }

    /// Last value written to `offset`
    pub fn last_write(&self, offset: usize) -> Option<u32> {
        self.with(|s| {
            s.writes
                .iter()
                .rev()
                .find(|(o, _)| *o == offset)
                .map(|(_, v)| *v)
        })
    }

    /// Replace the injected faults
    pub fn set_faults(&self, faults: Faults) {
        match self.state.lock() {
            Ok(mut state) => state.faults = faults,
            Err(poisoned) => poisoned.into_inner().faults = faults,
        }
    }
}
