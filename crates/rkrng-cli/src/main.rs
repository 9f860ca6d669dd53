// SPDX-License-Identifier: AGPL-3.0-only
//! `rkrng`: command-line interface for Rockchip hardware RNGs.
//!
//! ```text
//! USAGE:
//!   rkrng enumerate                       List TRNG nodes in the device tree
//!   rkrng info <device>                   Detailed info for one device
//!   rkrng read <device> [--bytes N]       Read random bytes (hex or raw)
//!   rkrng bench <device> [--bytes N]      Measure throughput
//!
//!   --simulate rk3568|rk3588              Use the software TRNG model
//!   --dt-root <dir>                       Scan a copied device tree
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rkrng_driver::chip::SocVariant;
use rkrng_driver::{
    select_backend, BackendSelection, DeviceManager, DriverConfig, PlatformDevice, Registration,
    RkRng,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rkrng", about = "Rockchip hardware RNG CLI", version)]
struct Cli {
    /// Device-tree root to scan (default: live tree, or $RKRNG_DT_ROOT).
    #[arg(long, global = true)]
    dt_root: Option<PathBuf>,

    /// Use a simulated TRNG instead of hardware.
    #[arg(long, global = true, value_enum)]
    simulate: Option<Variant>,

    /// Poll timeout in microseconds.
    #[arg(long, global = true)]
    poll_timeout_us: Option<u64>,

    /// Initialise at registration instead of on first read.
    #[arg(long, global = true)]
    no_runtime_pm: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List TRNG nodes in the device tree.
    Enumerate,
    /// Print detailed information for one device.
    Info {
        /// Node name, node path or index.
        device: String,
    },
    /// Read random bytes.
    Read {
        /// Node name, node path or index.
        device: String,
        /// Number of bytes.
        #[arg(long, short = 'n', default_value_t = 32)]
        bytes: usize,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Hex)]
        format: Format,
    },
    /// Measure read throughput.
    Bench {
        /// Node name, node path or index.
        device: String,
        /// Total bytes to read.
        #[arg(long, short = 'n', default_value_t = 1 << 20)]
        bytes: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Rk3568,
    Rk3588,
}

impl From<Variant> for SocVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Rk3568 => Self::Rk3568,
            Variant::Rk3588 => Self::Rk3588,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Hex,
    Raw,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Cmd::Enumerate => cmd_enumerate(&cli)?,
        Cmd::Info { device } => cmd_info(&cli, device)?,
        Cmd::Read {
            device,
            bytes,
            format,
        } => cmd_read(&cli, device, *bytes, *format)?,
        Cmd::Bench { device, bytes } => cmd_bench(&cli, device, *bytes)?,
    }

    Ok(())
}

impl Cli {
    fn config(&self) -> DriverConfig {
        let mut config = DriverConfig::from_env();
        if let Some(us) = self.poll_timeout_us {
            config = config.with_poll_timeout(Duration::from_micros(us));
        }
        if self.no_runtime_pm {
            config = config.with_runtime_pm(false);
        }
        config
    }

    fn backend(&self) -> BackendSelection {
        if self.simulate.is_some() {
            BackendSelection::Software
        } else {
            BackendSelection::Auto
        }
    }

    fn devices(&self) -> Result<Vec<PlatformDevice>> {
        if let Some(variant) = self.simulate {
            return Ok(vec![PlatformDevice::reference(variant.into())]);
        }
        let mgr = match &self.dt_root {
            Some(root) => DeviceManager::discover_in(root),
            None => DeviceManager::discover(),
        }
        .context("device-tree scan failed")?;
        Ok(mgr.devices().to_vec())
    }

    fn device(&self, name: &str) -> Result<PlatformDevice> {
        let mut devices = self.devices()?;
        let idx = match name.parse::<usize>() {
            Ok(idx) if idx < devices.len() => idx,
            _ => devices
                .iter()
                .position(|d| d.name == name || d.path == name)
                .with_context(|| format!("Device not found: {name}"))?,
        };
        Ok(devices.swap_remove(idx))
    }

    fn open(&self, name: &str) -> Result<Registration> {
        let dev = self.device(name)?;
        let (backend, resources) = select_backend(self.backend(), &dev)
            .with_context(|| format!("cannot map registers of {}", dev.path))?;
        tracing::info!("{} via {backend}", dev.path);
        let rng = RkRng::probe(&dev.name, &dev.compatibles, resources, self.config())
            .with_context(|| format!("probe of {} failed", dev.path))?;
        Registration::register(Box::new(rng)).context("hwrng registration failed")
    }
}

fn cmd_enumerate(cli: &Cli) -> Result<()> {
    let devices = cli.devices()?;
    println!("Rockchip TRNG devices: {}", devices.len());
    println!();

    for (idx, dev) in devices.iter().enumerate() {
        let variant = dev
            .variant()
            .map_or_else(|| "unsupported".to_string(), |v| v.to_string());
        println!("[{idx}] {variant} @ {:#x}  {}", dev.base, dev.path);
    }
    Ok(())
}

fn cmd_info(cli: &Cli, name: &str) -> Result<()> {
    let dev = cli.device(name)?;
    let Some(variant) = dev.variant() else {
        bail!("{} has no supported compatible", dev.path);
    };

    println!("Node         : {}", dev.path);
    println!("Compatible   : {}", dev.compatibles.join(", "));
    println!("Variant      : {variant}");
    println!("Registers    : {:#x} + {:#x}", dev.base, dev.size);
    println!("Clocks       : {}", fmt_clocks(&dev.clock_names));
    println!(
        "Resets       : {} ({})",
        dev.reset_count,
        if variant.reset_optional() { "optional" } else { "required" }
    );
    println!("Quality      : {} / 1024", variant.quality());
    println!("Poll timeout : {} us", cli.config().poll_timeout_us());
    println!(
        "Max per read : {} bytes",
        rkrng_driver::chip::MAX_BYTES_PER_READ
    );
    Ok(())
}

fn fmt_clocks(names: &[String]) -> String {
    if names.is_empty() {
        "unnamed".to_string()
    } else {
        names.join(", ")
    }
}

fn cmd_read(cli: &Cli, name: &str, bytes: usize, format: Format) -> Result<()> {
    let reg = cli.open(name)?;
    let mut buf = vec![0u8; bytes];
    reg.fill(&mut buf).context("read failed")?;

    let mut out = std::io::stdout().lock();
    match format {
        Format::Raw => out.write_all(&buf)?,
        Format::Hex => {
            for line in buf.chunks(32) {
                for b in line {
                    write!(out, "{b:02x}")?;
                }
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn cmd_bench(cli: &Cli, name: &str, bytes: usize) -> Result<()> {
    let reg = cli.open(name)?;
    let mut buf = vec![0u8; bytes.min(64 * 1024)];

    let start = Instant::now();
    let mut done = 0;
    while done < bytes {
        let n = buf.len().min(bytes - done);
        reg.fill(&mut buf[..n]).context("read failed")?;
        done += n;
    }
    let elapsed = start.elapsed();

    #[allow(clippy::cast_precision_loss)]
    let kib_s = done as f64 / 1024.0 / elapsed.as_secs_f64();
    println!("{}: {done} bytes in {elapsed:.2?}", reg.name());
    println!("  throughput  {kib_s:.1} KiB/s");
    println!("  entropy     {} bits credited", reg.entropy_credit(done));
    Ok(())
}
