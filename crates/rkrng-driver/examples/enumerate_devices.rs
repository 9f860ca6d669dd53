// SPDX-License-Identifier: AGPL-3.0-only
//! Enumerate the TRNG nodes in the device tree
//!
//! This example demonstrates device-tree discovery. Set `RKRNG_DT_ROOT` to
//! scan a copied tree instead of the live one.

use rkrng_driver::{DeviceManager, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("rkrng_driver=debug")
        .init();

    println!("Rockchip TRNG enumeration\n");

    let manager = DeviceManager::discover()?;

    println!(
        "Found {} device(s) under {}:\n",
        manager.devices().len(),
        manager.root().display()
    );

    for device in manager.devices() {
        let variant = device
            .variant()
            .map_or_else(|| "unsupported".to_string(), |v| v.to_string());

        println!("{}:", device.path);
        println!("   Variant:    {variant}");
        println!("   Compatible: {}", device.compatibles.join(", "));
        println!("   Registers:  {:#x} + {:#x}", device.base, device.size);
        println!("   Clocks:     {:?}", device.clock_names);
        println!("   Resets:     {}", device.reset_count);
        println!();
    }

    Ok(())
}
