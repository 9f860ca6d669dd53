// SPDX-License-Identifier: AGPL-3.0-only
//! Read random bytes from a simulated TRNG
//!
//! Runs the full bind, register, read and unregister sequence against the
//! software model, so it works on any host.

use rkrng_driver::chip::SocVariant;
use rkrng_driver::{
    select_backend, BackendSelection, DriverConfig, PlatformDevice, Registration, Result, RkRng,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("rkrng_driver=debug")
        .init();

    for variant in [SocVariant::Rk3568, SocVariant::Rk3588] {
        let dev = PlatformDevice::reference(variant);
        let (backend, resources) = select_backend(BackendSelection::Software, &dev)?;
        let rng = RkRng::probe(&dev.name, &dev.compatibles, resources, DriverConfig::from_env())?;
        let reg = Registration::register(Box::new(rng))?;

        let mut buf = [0u8; 48];
        reg.fill(&mut buf)?;

        println!("{variant} via {backend} (quality {}):", reg.quality());
        for line in buf.chunks(16) {
            let hex: Vec<_> = line.iter().map(|b| format!("{b:02x}")).collect();
            println!("   {}", hex.join(" "));
        }
        println!(
            "   {} bytes, {} bits of entropy credited\n",
            buf.len(),
            reg.entropy_credit(buf.len())
        );
    }

    Ok(())
}
