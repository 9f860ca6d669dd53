//! Hardware RNG core
//!
//! The contract a driver implements ([`Hwrng`]), the per-device
//! [`Registration`] that serializes access and owns the init/cleanup
//! lifecycle, and [`HwrngCore`], which tracks every registered source and
//! hands out the best one by quality.

use crate::error::{Result, RngError};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Hardware RNG driver contract
///
/// Calls are serialized by [`Registration`]; implementations never see two
/// concurrent calls.
pub trait Hwrng: Debug + Send {
    /// Name under which the rng is registered
    fn name(&self) -> &str;

    /// Entropy per 1024 bits of output; higher is preferred
    fn quality(&self) -> u16;

    /// Called once at registration
    ///
    /// # Errors
    ///
    /// Returns error if the hardware cannot be brought up.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read at most `buf.len()` bytes, returning the count
    ///
    /// `wait` is accepted for the contract; hardware reads here always block
    /// until data is ready or the poll times out.
    ///
    /// # Errors
    ///
    /// Returns error on timeout or register failure; no partial data.
    fn read(&mut self, buf: &mut [u8], wait: bool) -> Result<usize>;

    /// Called once at unregistration
    fn cleanup(&mut self) {}

    /// Called when no reader is active; drivers may power down here
    fn idle(&mut self) {}
}

/// A registered rng
///
/// Owns the driver for its lifetime: `init` on construction, `cleanup` on
/// drop.
#[derive(Debug)]
pub struct Registration {
    name: String,
    quality: u16,
    rng: Mutex<Box<dyn Hwrng>>,
}

impl Registration {
    /// Register `rng`, running its `init`
    ///
    /// # Errors
    ///
    /// Returns the `init` error; the rng is dropped without `cleanup`.
    pub fn register(mut rng: Box<dyn Hwrng>) -> Result<Self> {
        rng.init()?;
        let name = rng.name().to_string();
        let quality = rng.quality();
        info!("Registered hwrng {name} (quality {quality})");
        Ok(Self {
            name,
            quality,
            rng: Mutex::new(rng),
        })
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered quality
    pub const fn quality(&self) -> u16 {
        self.quality
    }

    /// Entropy credited for `bytes` of output: `bytes * 8 * quality / 1024`
    pub fn entropy_credit(&self, bytes: usize) -> usize {
        bytes * 8 * usize::from(self.quality) / 1024
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Hwrng>>> {
        self.rng
            .lock()
            .map_err(|_| RngError::invalid_state(format!("{} lock poisoned", self.name)))
    }

    /// One driver read, bounded by what the hardware returns per request
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    pub fn read(&self, buf: &mut [u8], wait: bool) -> Result<usize> {
        self.lock()?.read(buf, wait)
    }

    /// Fill `buf` completely with repeated driver reads
    ///
    /// # Errors
    ///
    /// Returns the first driver error, or [`RngError::ShortRead`] if the
    /// driver returns no data.
    pub fn fill(&self, buf: &mut [u8]) -> Result<()> {
        let mut rng = self.lock()?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = rng.read(&mut buf[filled..], true)?;
            if n == 0 {
                return Err(RngError::ShortRead {
                    name: self.name.clone(),
                });
            }
            filled += n;
        }
        debug!("{}: filled {} bytes", self.name, buf.len());
        Ok(())
    }

    /// Let the driver power down if it has been idle long enough
    pub fn idle(&self) {
        match self.lock() {
            Ok(mut rng) => rng.idle(),
            Err(e) => warn!("{e}"),
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        match self.rng.get_mut() {
            Ok(rng) => rng.cleanup(),
            Err(poisoned) => poisoned.into_inner().cleanup(),
        }
        info!("Unregistered hwrng {}", self.name);
    }
}

impl rand_core::TryRngCore for Registration {
    type Error = RngError;

    fn try_next_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn try_next_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        self.fill(dest)
    }
}

impl rand_core::TryCryptoRng for Registration {}

/// Set of registered rngs with a current selection
#[derive(Debug, Default)]
pub struct HwrngCore {
    rngs: Vec<Arc<Registration>>,
    selected: Option<String>,
}

impl HwrngCore {
    /// Empty core
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration
    ///
    /// # Errors
    ///
    /// Returns error if the name is already registered.
    pub fn add(&mut self, rng: Registration) -> Result<Arc<Registration>> {
        if self.rngs.iter().any(|r| r.name() == rng.name()) {
            return Err(RngError::invalid_state(format!(
                "hwrng {} already registered",
                rng.name()
            )));
        }
        let rng = Arc::new(rng);
        self.rngs.push(Arc::clone(&rng));
        Ok(rng)
    }

    /// Remove a registration by name
    pub fn remove(&mut self, name: &str) -> Option<Arc<Registration>> {
        let idx = self.rngs.iter().position(|r| r.name() == name)?;
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        Some(self.rngs.remove(idx))
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.rngs.iter().map(|r| r.name()).collect()
    }

    /// Pin the current rng by name
    ///
    /// # Errors
    ///
    /// Returns error if no rng of that name is registered.
    pub fn select(&mut self, name: &str) -> Result<()> {
        if !self.rngs.iter().any(|r| r.name() == name) {
            return Err(RngError::device_not_found(name));
        }
        self.selected = Some(name.to_string());
        Ok(())
    }

    /// Current rng: the pinned one, else the highest quality (earliest
    /// registration wins ties)
    pub fn current(&self) -> Option<Arc<Registration>> {
        if let Some(name) = &self.selected {
            return self.rngs.iter().find(|r| r.name() == name).cloned();
        }
        self.rngs
            .iter()
            .rev()
            .max_by_key(|r| r.quality())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::TryRngCore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counter {
        name: &'static str,
        quality: u16,
        next: u8,
        chunk: usize,
        cleanups: Arc<AtomicUsize>,
    }

    impl Counter {
        fn boxed(name: &'static str, quality: u16, chunk: usize) -> Box<dyn Hwrng> {
            Box::new(Self {
                name,
                quality,
                next: 0,
                chunk,
                cleanups: Arc::default(),
            })
        }
    }

    impl Hwrng for Counter {
        fn name(&self) -> &str {
            self.name
        }

        fn quality(&self) -> u16 {
            self.quality
        }

        fn read(&mut self, buf: &mut [u8], _wait: bool) -> Result<usize> {
            let n = buf.len().min(self.chunk);
            for b in &mut buf[..n] {
                *b = self.next;
                self.next = self.next.wrapping_add(1);
            }
            Ok(n)
        }

        fn cleanup(&mut self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fill_spans_many_reads() {
        let reg = Registration::register(Counter::boxed("counter", 1024, 32)).unwrap();
        let mut buf = [0u8; 100];
        reg.fill(&mut buf).unwrap();
        assert!(buf.iter().enumerate().all(|(i, &b)| b == i as u8));
    }

    #[test]
    fn zero_byte_read_is_an_error() {
        let reg = Registration::register(Counter::boxed("empty", 1024, 0)).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(reg.fill(&mut buf), Err(RngError::ShortRead { .. })));
        assert!(reg.fill(&mut []).is_ok());
    }

    #[test]
    fn cleanup_runs_on_drop() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let rng = Box::new(Counter {
            name: "c",
            quality: 1,
            next: 0,
            chunk: 4,
            cleanups: Arc::clone(&cleanups),
        });
        drop(Registration::register(rng).unwrap());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn entropy_credit_scales_with_quality() {
        let reg = Registration::register(Counter::boxed("q", 900, 32)).unwrap();
        assert_eq!(reg.entropy_credit(32), 225);
        let full = Registration::register(Counter::boxed("full", 1024, 32)).unwrap();
        assert_eq!(full.entropy_credit(32), 256);
    }

    #[test]
    fn try_rng_core_draws_words() {
        let mut reg = Registration::register(Counter::boxed("w", 1024, 3)).unwrap();
        assert_eq!(reg.try_next_u32().unwrap(), u32::from_le_bytes([0, 1, 2, 3]));
        assert_eq!(reg.try_next_u64().unwrap(), u64::from_le_bytes([4, 5, 6, 7, 8, 9, 10, 11]));
    }

    #[test]
    fn core_prefers_quality_then_selection() {
        let mut core = HwrngCore::new();
        assert!(core.current().is_none());
        core.add(Registration::register(Counter::boxed("a", 900, 32)).unwrap()).unwrap();
        core.add(Registration::register(Counter::boxed("b", 999, 32)).unwrap()).unwrap();
        core.add(Registration::register(Counter::boxed("c", 999, 32)).unwrap()).unwrap();
        assert_eq!(core.current().unwrap().name(), "b");

        core.select("a").unwrap();
        assert_eq!(core.current().unwrap().name(), "a");
        assert!(core.select("zzz").is_err());

        core.remove("a").unwrap();
        assert_eq!(core.current().unwrap().name(), "b");
        assert_eq!(core.names(), vec!["b", "c"]);
        assert!(core
            .add(Registration::register(Counter::boxed("b", 1, 1)).unwrap())
            .is_err());
    }
}
