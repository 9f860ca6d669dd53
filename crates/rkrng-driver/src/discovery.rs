//! Device-tree discovery
//!
//! Walks the flattened device tree the kernel exports under
//! `/sys/firmware/devicetree/base` and collects every enabled node whose
//! `compatible` list names a supported TRNG. Property files are raw
//! big-endian cells and NUL-separated strings.

use crate::error::{Result, RngError};
use rkrng_chip::soc::SocVariant;
use std::fs;
use std::path::{Path, PathBuf};

/// Kernel export of the live device tree
pub const SYSFS_DT_ROOT: &str = "/sys/firmware/devicetree/base";

/// Legacy procfs alias of [`SYSFS_DT_ROOT`]
pub const PROC_DT_ROOT: &str = "/proc/device-tree";

/// Environment override for the device-tree root
pub const DT_ROOT_ENV: &str = "RKRNG_DT_ROOT";

const DEFAULT_ADDRESS_CELLS: u32 = 2;
const DEFAULT_SIZE_CELLS: u32 = 1;

/// Cells per `resets` specifier: phandle plus the CRU's single index cell
const RESET_SPECIFIER_CELLS: usize = 2;

/// A TRNG node found in the device tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDevice {
    /// Node name (`rng@fe378000`)
    pub name: String,
    /// Full node path (`/rng@fe378000`)
    pub path: String,
    /// Compatible list, most specific first
    pub compatibles: Vec<String>,
    /// Physical base of the first `reg` entry
    pub base: u64,
    /// Size of the first `reg` entry
    pub size: u64,
    /// `clock-names`, empty if the node has unnamed clocks
    pub clock_names: Vec<String>,
    /// Number of `resets` specifiers
    pub reset_count: usize,
}

impl PlatformDevice {
    /// Synthetic device matching the reference SoC layout
    pub fn reference(variant: SocVariant) -> Self {
        let window = variant.reference_window();
        let clock_names = match variant {
            SocVariant::Rk3568 => vec!["core".to_string(), "ahb".to_string()],
            SocVariant::Rk3588 => Vec::new(),
        };
        let name = format!("rng@{:x}", window.base);
        Self {
            path: format!("/{name}"),
            name,
            compatibles: vec![variant.compatible().to_string()],
            base: window.base,
            size: window.size,
            clock_names,
            reset_count: usize::from(!variant.reset_optional()),
        }
    }

    /// Variant selected by the compatible list
    pub fn variant(&self) -> Option<SocVariant> {
        self.compatibles
            .iter()
            .find_map(|c| SocVariant::from_compatible(c))
    }
}

/// Discovered TRNG devices
#[derive(Debug)]
pub struct DeviceManager {
    root: PathBuf,
    devices: Vec<PlatformDevice>,
}

impl DeviceManager {
    /// Discover devices in the live device tree
    ///
    /// Honours `RKRNG_DT_ROOT`, then tries sysfs and procfs.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::NoDevicesFound`] if no supported node is enabled.
    pub fn discover() -> Result<Self> {
        Self::discover_in(default_root())
    }

    /// Discover devices under an explicit device-tree root
    ///
    /// # Errors
    ///
    /// Returns [`RngError::DeviceNotFound`] if `root` does not exist, or
    /// [`RngError::NoDevicesFound`] if no supported node is enabled.
    pub fn discover_in(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tracing::info!("Scanning device tree at {}", root.display());
        if !root.is_dir() {
            return Err(RngError::device_not_found(&root));
        }

        let mut devices = Vec::new();
        walk(&root, "", &mut devices)?;
        devices.sort_by(|a, b| a.path.cmp(&b.path));

        if devices.is_empty() {
            tracing::error!("No Rockchip TRNG devices found");
            return Err(RngError::NoDevicesFound);
        }
        tracing::info!("Discovered {} TRNG device(s)", devices.len());
        Ok(Self { root, devices })
    }

    /// Device-tree root that was scanned
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All discovered devices, ordered by path
    pub fn devices(&self) -> &[PlatformDevice] {
        &self.devices
    }

    /// Look up a device by node name or full path
    ///
    /// # Errors
    ///
    /// Returns [`RngError::DeviceNotFound`] if nothing matches.
    pub fn device(&self, name: &str) -> Result<&PlatformDevice> {
        self.devices
            .iter()
            .find(|d| d.name == name || d.path == name)
            .ok_or_else(|| RngError::device_not_found(name))
    }
}

/// Device-tree root to scan when none is given
pub fn default_root() -> PathBuf {
    if let Some(root) = std::env::var_os(DT_ROOT_ENV) {
        return PathBuf::from(root);
    }
    let sysfs = Path::new(SYSFS_DT_ROOT);
    if sysfs.is_dir() {
        sysfs.to_path_buf()
    } else {
        PathBuf::from(PROC_DT_ROOT)
    }
}

/// Visit the children of `dir`. The cell counts of `dir` apply to its
/// children's `reg`.
///
/// Only a failure at `dir` itself is returned; a child subtree that cannot
/// be read is logged and skipped.
fn walk(dir: &Path, path: &str, out: &mut Vec<PlatformDevice>) -> Result<()> {
    let address_cells = read_cell(&dir.join("#address-cells"))?.unwrap_or(DEFAULT_ADDRESS_CELLS);
    let size_cells = read_cell(&dir.join("#size-cells"))?.unwrap_or(DEFAULT_SIZE_CELLS);

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping entry under {}: {e}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let node_path = format!("{path}/{name}");
        let node = entry.path();

        match probe_node(&node, &name, &node_path, address_cells, size_cells) {
            Ok(Some(device)) => {
                tracing::debug!(
                    "Found {} at {:#x} ({})",
                    device.compatibles[0],
                    device.base,
                    device.path
                );
                out.push(device);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping {node_path}: {e}"),
        }
        if let Err(e) = walk(&node, &node_path, out) {
            tracing::warn!("Skipping subtree {node_path}: {e}");
        }
    }
    Ok(())
}

fn probe_node(
    node: &Path,
    name: &str,
    path: &str,
    address_cells: u32,
    size_cells: u32,
) -> Result<Option<PlatformDevice>> {
    let Some(compatibles) = read_strings(&node.join("compatible"))? else {
        return Ok(None);
    };
    if !compatibles
        .iter()
        .any(|c| SocVariant::from_compatible(c).is_some())
    {
        return Ok(None);
    }

    if let Some(status) = read_strings(&node.join("status"))? {
        let status = status.first().map_or("", String::as_str);
        if status != "okay" && status != "ok" {
            tracing::debug!("{path} is {status}");
            return Ok(None);
        }
    }

    let reg = fs::read(node.join("reg"))
        .map_err(|_| RngError::invalid_device_tree(node, "missing reg"))?;
    let (base, size) = parse_reg(&reg, address_cells, size_cells)
        .ok_or_else(|| RngError::invalid_device_tree(node.join("reg"), "malformed reg"))?;

    let clock_names = read_strings(&node.join("clock-names"))?.unwrap_or_default();
    let reset_count = match fs::read(node.join("resets")) {
        Ok(raw) => raw.len() / (4 * RESET_SPECIFIER_CELLS),
        Err(_) => 0,
    };

    Ok(Some(PlatformDevice {
        name: name.to_string(),
        path: path.to_string(),
        compatibles,
        base,
        size,
        clock_names,
        reset_count,
    }))
}

fn read_cell(path: &Path) -> Result<Option<u32>> {
    match fs::read(path) {
        Ok(raw) => {
            let cell: [u8; 4] = raw
                .get(..4)
                .and_then(|c| c.try_into().ok())
                .ok_or_else(|| RngError::invalid_device_tree(path, "short cell"))?;
            Ok(Some(u32::from_be_bytes(cell)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_strings(path: &Path) -> Result<Option<Vec<String>>> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(
            raw.split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// First `(address, size)` pair of a `reg` property
fn parse_reg(raw: &[u8], address_cells: u32, size_cells: u32) -> Option<(u64, u64)> {
    if address_cells == 0 || address_cells > 2 || size_cells > 2 {
        return None;
    }
    let mut cells = raw
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]));
    let mut take = |n: u32| -> Option<u64> {
        (0..n).try_fold(0u64, |acc, _| Some((acc << 32) | u64::from(cells.next()?)))
    };
    let base = take(address_cells)?;
    let size = take(size_cells)?;
    Some((base, size))
}
