//! Runtime power management
//!
//! A small model of the kernel's runtime PM core for one device: a usage
//! count, an active/suspended state and an autosuspend timer. The device
//! supplies its resume (variant `init`) and suspend (variant `cleanup`)
//! callbacks at each call site, so this type owns no hardware.
//!
//! ```text
//!            resume_and_get                put_autosuspend (usage → 0)
//! Suspended ───────────────▶ Active ─────────────────────────────▶ Idle
//!     ▲                        ▲                                     │
//!     │                        └──────── resume_and_get ─────────────┤
//!     └──────────────── autosuspend delay expired ───────────────────┘
//! ```

use crate::error::{Result, RngError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Runtime PM state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmState {
    /// Hardware powered down (clocks off)
    Suspended,
    /// Hardware initialised
    Active,
}

/// Runtime PM bookkeeping for one device
#[derive(Debug)]
pub struct RuntimePm {
    enabled: bool,
    state: PmState,
    usage: u32,
    autosuspend_delay: Duration,
    last_busy: Instant,
    needs_force_resume: bool,
}

impl RuntimePm {
    /// Runtime PM with autosuspend after `autosuspend_delay` of idleness
    pub fn new(autosuspend_delay: Duration) -> Self {
        Self {
            enabled: true,
            state: PmState::Suspended,
            usage: 0,
            autosuspend_delay,
            last_busy: Instant::now(),
            needs_force_resume: false,
        }
    }

    /// Runtime PM disabled: callbacks never run, the owner initialises the
    /// hardware itself
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(Duration::ZERO)
        }
    }

    /// Whether runtime PM drives the hardware
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current state
    pub const fn state(&self) -> PmState {
        self.state
    }

    /// Outstanding references
    pub const fn usage(&self) -> u32 {
        self.usage
    }

    /// Configured autosuspend delay
    pub const fn autosuspend_delay(&self) -> Duration {
        self.autosuspend_delay
    }

    /// Take a reference, resuming the device first if it is suspended
    ///
    /// On resume failure the reference is dropped again and the device stays
    /// suspended.
    ///
    /// # Errors
    ///
    /// Returns the error of the `resume` callback.
    pub fn resume_and_get<F>(&mut self, resume: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        self.usage += 1;
        if !self.enabled || self.state == PmState::Active {
            return Ok(());
        }
        debug!("runtime resume");
        if let Err(e) = resume() {
            self.usage -= 1;
            return Err(e);
        }
        self.state = PmState::Active;
        Ok(())
    }

    /// Record activity; restarts the autosuspend timer
    pub fn mark_last_busy(&mut self) {
        self.last_busy = Instant::now();
    }

    /// Drop a reference; with a zero delay the device suspends synchronously
    ///
    /// # Errors
    ///
    /// Returns error if no reference is held.
    pub fn put_autosuspend<F>(&mut self, suspend: F) -> Result<()>
    where
        F: FnOnce(),
    {
        if self.usage == 0 {
            return Err(RngError::invalid_state("runtime PM usage count underflow"));
        }
        self.usage -= 1;
        trace!("runtime put, usage {}", self.usage);
        if self.enabled && self.usage == 0 && self.autosuspend_delay.is_zero() {
            self.suspend_now(suspend);
        }
        Ok(())
    }

    /// Suspend if idle for at least the autosuspend delay
    ///
    /// Returns whether the device was suspended by this call.
    pub fn run_autosuspend<F>(&mut self, now: Instant, suspend: F) -> bool
    where
        F: FnOnce(),
    {
        if !self.enabled || self.usage > 0 || self.state == PmState::Suspended {
            return false;
        }
        if now.saturating_duration_since(self.last_busy) < self.autosuspend_delay {
            return false;
        }
        self.suspend_now(suspend);
        true
    }

    /// Suspend regardless of the autosuspend timer (system sleep, unbind)
    ///
    /// # Errors
    ///
    /// Returns error if a reference is still held.
    pub fn force_suspend<F>(&mut self, suspend: F) -> Result<()>
    where
        F: FnOnce(),
    {
        if self.usage > 0 {
            return Err(RngError::invalid_state(format!(
                "cannot suspend with {} active user(s)",
                self.usage
            )));
        }
        if self.enabled && self.state == PmState::Active {
            self.suspend_now(suspend);
            self.needs_force_resume = true;
        }
        Ok(())
    }

    /// Undo [`force_suspend`](Self::force_suspend): resume only if the
    /// device was active when it was forced down and no user has resumed it
    /// since
    ///
    /// # Errors
    ///
    /// Returns the error of the `resume` callback; the device stays
    /// suspended and the next user retries.
    pub fn force_resume<F>(&mut self, resume: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if !std::mem::take(&mut self.needs_force_resume) || self.state == PmState::Active {
            return Ok(());
        }
        debug!("forced resume");
        resume()?;
        self.state = PmState::Active;
        self.last_busy = Instant::now();
        Ok(())
    }

    fn suspend_now<F: FnOnce()>(&mut self, suspend: F) {
        debug!("runtime suspend");
        suspend();
        self.state = PmState::Suspended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn resume_once_for_nested_users() {
        let resumes = Cell::new(0);
        let mut pm = RuntimePm::new(Duration::from_millis(100));
        for _ in 0..2 {
            pm.resume_and_get(|| {
                resumes.set(resumes.get() + 1);
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(resumes.get(), 1);
        assert_eq!(pm.usage(), 2);
        assert_eq!(pm.state(), PmState::Active);
    }

    #[test]
    fn autosuspend_waits_for_delay_and_idle() {
        let suspended = Cell::new(false);
        let mut pm = RuntimePm::new(Duration::from_millis(100));
        pm.resume_and_get(|| Ok(())).unwrap();
        pm.mark_last_busy();
        let t0 = Instant::now();

        // in use: never suspends
        assert!(!pm.run_autosuspend(t0 + Duration::from_secs(1), || suspended.set(true)));

        pm.put_autosuspend(|| suspended.set(true)).unwrap();
        assert_eq!(pm.state(), PmState::Active);
        assert!(!pm.run_autosuspend(t0, || suspended.set(true)));
        assert!(pm.run_autosuspend(t0 + Duration::from_millis(150), || suspended.set(true)));
        assert!(suspended.get());
        assert_eq!(pm.state(), PmState::Suspended);
    }

    #[test]
    fn zero_delay_suspends_on_last_put() {
        let suspends = Cell::new(0);
        let mut pm = RuntimePm::new(Duration::ZERO);
        pm.resume_and_get(|| Ok(())).unwrap();
        pm.put_autosuspend(|| suspends.set(suspends.get() + 1)).unwrap();
        assert_eq!(suspends.get(), 1);
        assert_eq!(pm.state(), PmState::Suspended);
    }

    #[test]
    fn failed_resume_drops_reference() {
        let mut pm = RuntimePm::new(Duration::ZERO);
        let err = pm
            .resume_and_get(|| Err(RngError::clock("gate stuck")))
            .unwrap_err();
        assert!(matches!(err, RngError::Clock { .. }));
        assert_eq!(pm.usage(), 0);
        assert_eq!(pm.state(), PmState::Suspended);
        assert!(pm.put_autosuspend(|| {}).is_err());
    }

    #[test]
    fn disabled_pm_never_calls_back() {
        let mut pm = RuntimePm::disabled();
        pm.resume_and_get(|| panic!("resume called")).unwrap();
        pm.put_autosuspend(|| panic!("suspend called")).unwrap();
        pm.force_suspend(|| panic!("suspend called")).unwrap();
    }

    #[test]
    fn force_suspend_refuses_while_busy() {
        let mut pm = RuntimePm::new(Duration::from_secs(10));
        pm.resume_and_get(|| Ok(())).unwrap();
        assert!(pm.force_suspend(|| {}).is_err());
        pm.put_autosuspend(|| {}).unwrap();
        pm.force_suspend(|| {}).unwrap();
        assert_eq!(pm.state(), PmState::Suspended);
    }

    #[test]
    fn force_resume_restores_only_active_devices() {
        let resumes = Cell::new(0);
        let bump = || {
            resumes.set(resumes.get() + 1);
            Ok(())
        };
        let mut pm = RuntimePm::new(Duration::from_secs(10));

        // already suspended: stays down
        pm.force_suspend(|| {}).unwrap();
        pm.force_resume(bump).unwrap();
        assert_eq!(resumes.get(), 0);
        assert_eq!(pm.state(), PmState::Suspended);

        pm.resume_and_get(bump).unwrap();
        pm.put_autosuspend(|| {}).unwrap();
        pm.force_suspend(|| {}).unwrap();
        pm.force_resume(bump).unwrap();
        assert_eq!(resumes.get(), 2);
        assert_eq!(pm.state(), PmState::Active);
    }

    #[test]
    fn force_resume_skips_device_resumed_by_a_user() {
        let resumes = Cell::new(0);
        let bump = || {
            resumes.set(resumes.get() + 1);
            Ok(())
        };
        let mut pm = RuntimePm::new(Duration::from_secs(10));
        pm.resume_and_get(bump).unwrap();
        pm.put_autosuspend(|| {}).unwrap();
        pm.force_suspend(|| {}).unwrap();

        // a user brings it back before system resume
        pm.resume_and_get(bump).unwrap();
        pm.put_autosuspend(|| {}).unwrap();
        assert_eq!(resumes.get(), 2);

        pm.force_resume(bump).unwrap();
        assert_eq!(resumes.get(), 2);
        assert_eq!(pm.state(), PmState::Active);

        // the flag is consumed
        pm.force_resume(bump).unwrap();
        assert_eq!(resumes.get(), 2);
    }
}
