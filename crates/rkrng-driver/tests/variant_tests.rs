//! Register-level behaviour of both TRNG variants against the software model

use rkrng_driver::chip::SocVariant;
use rkrng_driver::{DriverConfig, Faults, Hwrng, Registration, RkRng, RngError, SoftwareTrng};
use std::time::Duration;

const RNG_CTL: usize = 0x0;
const RNG_SAMPLE_CNT: usize = 0x4;
const RNG_DOUT: usize = 0x10;

const TRNG_CTRL: usize = 0x0;
const TRNG_ISTAT: usize = 0x14;
const TRNG_RAND0: usize = 0x20;
const TRNG_AUTO_RQSTS: usize = 0x60;

fn config() -> DriverConfig {
    DriverConfig::default()
        .with_poll_period(Duration::from_micros(10))
        .with_poll_timeout(Duration::from_millis(5))
        .with_runtime_pm(false)
}

fn bind(sim: &SoftwareTrng, variant: SocVariant) -> RkRng {
    let resources = sim.clone().into_resources(true);
    RkRng::probe("trng", &[variant.compatible()], resources, config()).expect("probe")
}

fn registers(sim: &SoftwareTrng, base: usize) -> Vec<u8> {
    let handle = sim.handle();
    (0..8)
        .flat_map(|i| handle.register(base + i * 4).to_le_bytes())
        .collect()
}

#[test]
fn rk3568_init_programs_sample_count_and_control() {
    let sim = SoftwareTrng::new(SocVariant::Rk3568);
    let reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3568))).unwrap();

    let handle = sim.handle();
    assert_eq!(
        handle.writes(),
        vec![(RNG_SAMPLE_CNT, 1000), (RNG_CTL, 0xffff_0032)]
    );
    assert!(handle.clocks_enabled());

    drop(reg);
    assert_eq!(handle.last_write(RNG_CTL), Some(0xffff_0000));
    assert!(!handle.clocks_enabled());
}

#[test]
fn rk3568_read_returns_dout_words() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3568,
        Faults {
            latency_polls: 3,
            ..Faults::default()
        },
    );
    let reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3568))).unwrap();

    let mut buf = [0u8; 48];
    assert_eq!(reg.read(&mut buf, true).unwrap(), 32);
    assert_eq!(sim.handle().last_write(RNG_CTL), Some(0x0001_0001));
    assert_eq!(&buf[..32], registers(&sim, RNG_DOUT).as_slice());
    assert!(buf[32..].iter().all(|&b| b == 0));

    let mut small = [0u8; 5];
    assert_eq!(reg.read(&mut small, true).unwrap(), 5);
    assert_eq!(&small[..], &registers(&sim, RNG_DOUT)[..5]);
}

#[test]
fn rk3568_stuck_start_bit_times_out() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3568,
        Faults {
            stalled: true,
            ..Faults::default()
        },
    );
    let reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3568))).unwrap();

    let mut buf = [0xaau8; 32];
    let err = reg.read(&mut buf, true).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.errno(), -110);
    assert_eq!(sim.handle().requests(), 0);
}

#[test]
fn trng_v1_init_sets_auto_reseed() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3588,
        Faults {
            seed_polls: 4,
            ..Faults::default()
        },
    );
    let _reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3588))).unwrap();

    let handle = sim.handle();
    assert_eq!(handle.last_write(TRNG_AUTO_RQSTS), Some(62));
    // stale ready flag from power on acknowledged
    assert_eq!(handle.register(TRNG_ISTAT), 0);
}

#[test]
fn trng_v1_read_leaves_generator_idle() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3588))).unwrap();

    let mut buf = [0u8; 64];
    assert_eq!(reg.read(&mut buf, true).unwrap(), 32);
    assert_eq!(&buf[..32], registers(&sim, TRNG_RAND0).as_slice());

    let handle = sim.handle();
    assert_eq!(handle.last_write(TRNG_CTRL), Some(0));
    assert_eq!(handle.register(TRNG_ISTAT), 0);
}

#[test]
fn trng_v1_timeout_still_closes_generator() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3588,
        Faults {
            stalled: true,
            ..Faults::default()
        },
    );
    let reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3588))).unwrap();

    let mut buf = [0u8; 32];
    assert!(reg.read(&mut buf, true).unwrap_err().is_timeout());
    let handle = sim.handle();
    assert_eq!(handle.last_write(TRNG_CTRL), Some(0));
    assert_eq!(handle.register(TRNG_ISTAT), 0);
}

#[test]
fn trng_v1_stall_mid_run_times_out_then_recovers() {
    let sim = SoftwareTrng::new(SocVariant::Rk3588);
    let handle = sim.handle();
    let reg = Registration::register(Box::new(bind(&sim, SocVariant::Rk3588))).unwrap();

    let mut buf = [0u8; 32];
    assert_eq!(reg.read(&mut buf, true).unwrap(), 32);

    handle.set_faults(Faults {
        stalled: true,
        ..Faults::default()
    });
    let err = reg.read(&mut buf, true).unwrap_err();
    assert!(matches!(
        err,
        RngError::Timeout {
            duration_us: 5_000,
            ..
        }
    ));
    assert_eq!(handle.requests(), 1);

    handle.set_faults(Faults::default());
    assert_eq!(reg.read(&mut buf, true).unwrap(), 32);
    assert_eq!(handle.requests(), 2);
}

#[test]
fn trng_v1_wrong_version_fails_init_and_gates_clocks() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3588,
        Faults {
            version: Some(0x1234),
            ..Faults::default()
        },
    );
    let err = Registration::register(Box::new(bind(&sim, SocVariant::Rk3588))).unwrap_err();
    assert!(matches!(
        err,
        RngError::VersionMismatch {
            expected: 0x46bc,
            actual: 0x1234
        }
    ));
    assert!(!sim.handle().clocks_enabled());
}

#[test]
fn trng_v1_unseeded_block_times_out() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3588,
        Faults {
            never_seeds: true,
            ..Faults::default()
        },
    );
    let err = Registration::register(Box::new(bind(&sim, SocVariant::Rk3588))).unwrap_err();
    assert!(err.is_timeout());
    assert!(!sim.handle().clocks_enabled());
}

#[test]
fn clock_failure_aborts_init() {
    let sim = SoftwareTrng::with_faults(
        SocVariant::Rk3568,
        Faults {
            clock_fails: true,
            ..Faults::default()
        },
    );
    let mut rng = bind(&sim, SocVariant::Rk3568);
    assert!(matches!(rng.init(), Err(RngError::Clock { .. })));
    assert!(sim.handle().writes().is_empty());
}
