//! Probe rules, runtime PM and the hwrng core, end to end on the software model

use rand_core::TryRngCore;
use rkrng_driver::chip::SocVariant;
use rkrng_driver::{
    DriverConfig, Hwrng, HwrngCore, PmState, Registration, RkRng, RngError, SoftwareTrng,
};
use std::time::{Duration, Instant};

fn config() -> DriverConfig {
    DriverConfig::default()
        .with_poll_period(Duration::from_micros(10))
        .with_poll_timeout(Duration::from_millis(5))
}

fn probe(sim: &SoftwareTrng, variant: SocVariant, with_reset: bool) -> Result<RkRng, RngError> {
    RkRng::probe(
        format!("{variant:?}").to_lowercase(),
        &[variant.compatible()],
        sim.clone().into_resources(with_reset),
        config(),
    )
}

#[test]
fn rk3568_requires_reset() {
    let sim = SoftwareTrng::new(SocVariant::Rk3568);
    assert!(matches!(
        probe(&sim, SocVariant::Rk3568, false),
        Err(RngError::MissingResource { resource: "reset" })
    ));

    let rng = probe(&sim, SocVariant::Rk3568, true).unwrap();
    assert_eq!(sim.handle().reset_pulses(), 1);
    assert_eq!(rng.quality(), 900);
}

#[test]
fn rk3588_reset_is_optional() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let rng = probe(&sim, SocVariant::Rk3588, false).unwrap();
    assert_eq!(sim.handle().reset_pulses(), 0);
    assert_eq!(rng.quality(), 999);

    probe(&sim, SocVariant::Rk3588, true).unwrap();
    assert_eq!(sim.handle().reset_pulses(), 1);
}

#[test]
fn unknown_compatible_does_not_bind() {
    let sim = SoftwareTrng::new(SocVariant::Rk3568);
    let err = RkRng::probe(
        "crypto",
        &["rockchip,rk3288-crypto"],
        sim.into_resources(true),
        config(),
    )
    .unwrap_err();
    assert!(matches!(err, RngError::NoMatch { .. }));
    assert_eq!(err.errno(), -19);
}

#[test]
fn fallback_compatible_binds() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let rng = RkRng::probe(
        "rng",
        &["vendor,board-rng", "rockchip,rk3588-rng"],
        sim.into_resources(false),
        config(),
    )
    .unwrap();
    assert_eq!(rng.variant(), SocVariant::Rk3588);
}

#[test]
fn runtime_pm_resumes_on_first_read_and_autosuspends() {
    let sim = SoftwareTrng::new(SocVariant::Rk3568);
    let handle = sim.handle();
    let mut rng = probe(&sim, SocVariant::Rk3568, true).unwrap();

    rng.init().unwrap();
    assert_eq!(handle.clock_enables(), 0);
    assert_eq!(rng.pm_state(), PmState::Suspended);

    let mut buf = [0u8; 32];
    rng.read(&mut buf, true).unwrap();
    rng.read(&mut buf, true).unwrap();
    assert_eq!(handle.clock_enables(), 1);
    assert_eq!(rng.pm_state(), PmState::Active);
    assert!(rng.clocks_enabled());

    // within the 100 ms delay nothing happens
    assert!(!rng.run_autosuspend(Instant::now()));
    assert!(rng.run_autosuspend(Instant::now() + Duration::from_millis(150)));
    assert_eq!(rng.pm_state(), PmState::Suspended);
    assert!(!handle.clocks_enabled());
    assert_eq!(handle.last_write(0x0), Some(0xffff_0000));

    rng.read(&mut buf, true).unwrap();
    assert_eq!(handle.clock_enables(), 2);
}

#[test]
fn failed_resume_surfaces_on_read() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3588,
        rkrng_driver::Faults {
            version: Some(0),
            ..Default::default()
        },
    );
    let reg = Registration::register(Box::new(probe(&sim, SocVariant::Rk3588, false).unwrap()))
        .unwrap();

    let mut buf = [0u8; 8];
    assert!(matches!(
        reg.read(&mut buf, true),
        Err(RngError::VersionMismatch { .. })
    ));
    assert!(!sim.handle().clocks_enabled());
}

#[test]
fn unregister_powers_down_active_device() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let reg = Registration::register(Box::new(probe(&sim, SocVariant::Rk3588, false).unwrap()))
        .unwrap();
    let mut buf = [0u8; 16];
    reg.fill(&mut buf).unwrap();
    assert!(sim.handle().clocks_enabled());

    drop(reg);
    assert!(!sim.handle().clocks_enabled());
}

#[test]
fn fill_assembles_from_bounded_reads() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let reg = Registration::register(Box::new(probe(&sim, SocVariant::Rk3588, false).unwrap()))
        .unwrap();

    let mut buf = [0u8; 100];
    reg.fill(&mut buf).unwrap();
    assert_eq!(sim.handle().requests(), 4);
    assert_eq!(reg.entropy_credit(buf.len()), 100 * 8 * 999 / 1024);
}

#[test]
fn output_looks_random() {
    let sim = SoftwareTrng::new(SocVariant::Rk3568);
    let reg = Registration::register(Box::new(probe(&sim, SocVariant::Rk3568, true).unwrap()))
        .unwrap();

    let mut buf = vec![0u8; 4096];
    reg.fill(&mut buf).unwrap();

    let mean = buf.iter().map(|&b| f64::from(b)).sum::<f64>() / buf.len() as f64;
    assert!((115.0..140.0).contains(&mean), "byte mean {mean:.1}");

    let distinct = buf.iter().collect::<std::collections::HashSet<_>>().len();
    assert!(distinct > 200, "only {distinct} distinct byte values");
}

#[test]
fn registration_implements_try_rng_core() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let mut reg =
        Registration::register(Box::new(probe(&sim, SocVariant::Rk3588, false).unwrap()))
            .unwrap();
    let a = reg.try_next_u64().unwrap();
    let b = reg.try_next_u64().unwrap();
    assert_ne!(a, b);
}

#[test]
fn core_prefers_rk3588() {
    let slow = SoftwareTrng::new(SocVariant::Rk3568);
    let fast = SoftwareTrng::new(SocVariant::Rk3588);

    let mut core = HwrngCore::new();
    core.add(Registration::register(Box::new(probe(&slow, SocVariant::Rk3568, true).unwrap())).unwrap())
        .unwrap();
    core.add(Registration::register(Box::new(probe(&fast, SocVariant::Rk3588, false).unwrap())).unwrap())
        .unwrap();

    let current = core.current().unwrap();
    assert_eq!(current.name(), "rk3588");
    let mut buf = [0u8; 32];
    current.fill(&mut buf).unwrap();
    assert_eq!(fast.handle().requests(), 1);
    assert_eq!(slow.handle().requests(), 0);
}

#[test]
fn system_sleep_round_trip() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let handle = sim.handle();
    let mut rng = probe(&sim, SocVariant::Rk3588, false).unwrap();

    let mut buf = [0u8; 32];
    rng.read(&mut buf, true).unwrap();
    rng.suspend().unwrap();
    assert!(!handle.clocks_enabled());

    rng.resume().unwrap();
    assert!(handle.clocks_enabled());
    assert_eq!(rng.pm_state(), PmState::Active);
    assert_eq!(rng.read(&mut buf, true).unwrap(), 32);
    assert_eq!(handle.clock_enables(), 2);
}

#[test]
fn read_during_system_sleep_does_not_double_init() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let handle = sim.handle();
    let mut rng = probe(&sim, SocVariant::Rk3588, false).unwrap();

    let mut buf = [0u8; 32];
    rng.read(&mut buf, true).unwrap();
    rng.suspend().unwrap();
    rng.read(&mut buf, true).unwrap();
    assert_eq!(handle.clock_enables(), 2);

    rng.resume().unwrap();
    assert_eq!(handle.clock_enables(), 2);
    assert_eq!(rng.pm_state(), PmState::Active);

    assert!(rng.run_autosuspend(Instant::now() + Duration::from_secs(1)));
    assert!(!handle.clocks_enabled());
}
