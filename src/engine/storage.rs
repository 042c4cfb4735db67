//! Storage Layout Planner
//!
//! Translates a `StorageMode` plus the selected disks into a `CapacityPlan`
//! (how many GiB go to boot, the Nix store, the shell-history dataset and
//! home) and a `PoolLayout` (which partitions land on which device).
//!
//! # Capacity Rules
//!
//! | Mode             | Pool size            | Datasets |
//! |------------------|----------------------|----------|
//! | single-encrypted | disk                 | boot + store + aux + home |
//! | single-plain     | disk                 | boot + root |
//! | multi-stripe     | sum                  | boot + store + aux + home |
//! | multi-parity-1   | sum × (n-1)/n        | boot + store + aux + home |
//! | multi-parity-2   | sum × (n-2)/n        | boot + store + aux + home |
//!
//! Redundancy math runs first on whole-GiB device sizes; the fixed boot
//! allocation is then taken once, from the first device's share.
//!
//! # Design
//!
//! - **Pure logic**: No I/O. Device sizes are handed in by the caller.
//! - **Integer GiB**: Every figure is floored to whole GiB.
//! - **No negative plans**: A device that cannot hold the fixed overheads is a
//!   `PlanningError`, never a zero or wrapped allocation.

use crate::error::PlanningError;
use crate::types::{Redundancy, StorageMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const GIB: u64 = 1024 * 1024 * 1024;

/// Fixed EFI/boot allocation on the first device.
pub const BOOT_GIB: u64 = 5;

/// Size assumed for a device whose size is zero or unreadable.
pub const FALLBACK_DEVICE_GIB: u64 = 100;

/// Floor for the Nix store dataset.
pub const METADATA_FLOOR_GIB: u64 = 20;

/// Floor for the shell-history (atuin) dataset.
pub const AUXILIARY_FLOOR_GIB: u64 = 1;

// ============================================================================
// Capacity Plan
// ============================================================================

/// Computed split of pool capacity. All sizes in GiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub mode: StorageMode,
    /// Usable capacity after redundancy, before the boot allocation
    pub pool_gib: u64,
    pub boot_gib: u64,
    /// Nix store dataset (pool modes only)
    pub metadata_gib: Option<u64>,
    /// Shell-history dataset (pool modes only)
    pub auxiliary_gib: Option<u64>,
    /// Home dataset, or the root filesystem in plain mode
    pub general_gib: u64,
}

impl CapacityPlan {
    /// Sum of every allocation; equals `pool_gib` for any plan the planner returns.
    pub fn allocated_gib(&self) -> u64 {
        self.boot_gib
            + self.metadata_gib.unwrap_or(0)
            + self.auxiliary_gib.unwrap_or(0)
            + self.general_gib
    }

    /// Boot size in descriptor notation (e.g. "5G").
    pub fn space_boot(&self) -> String {
        gib_label(self.boot_gib)
    }

    pub fn space_nix(&self) -> Option<String> {
        self.metadata_gib.map(gib_label)
    }

    pub fn space_atuin(&self) -> Option<String> {
        self.auxiliary_gib.map(gib_label)
    }

    pub fn space_home(&self) -> String {
        gib_label(self.general_gib)
    }
}

impl fmt::Display for CapacityPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool={}G boot={}G", self.pool_gib, self.boot_gib)?;
        if let Some(nix) = self.metadata_gib {
            write!(f, " nix={}G", nix)?;
        }
        if let Some(atuin) = self.auxiliary_gib {
            write!(f, " atuin={}G", atuin)?;
        }
        write!(f, " home={}G", self.general_gib)
    }
}

fn gib_label(gib: u64) -> String {
    format!("{}G", gib)
}

/// Convert a raw byte count to whole GiB, substituting the fallback for
/// devices whose size is unknown or rounds down to zero.
pub fn device_gib(size_bytes: Option<u64>) -> u64 {
    match size_bytes.map(|b| b / GIB) {
        Some(gib) if gib > 0 => gib,
        _ => FALLBACK_DEVICE_GIB,
    }
}

/// Usable pool capacity for `mode` given per-device sizes in GiB.
///
/// Single-disk modes use the first device only.
///
/// # Errors
///
/// - `NoDevices` if `sizes_gib` is empty
/// - `NotEnoughDevices` if a multi-disk mode gets fewer than its minimum
pub fn pool_gib(mode: StorageMode, sizes_gib: &[u64]) -> Result<u64, PlanningError> {
    let Some(&first) = sizes_gib.first() else {
        return Err(PlanningError::NoDevices);
    };

    if !mode.requires_multiple_devices() {
        return Ok(first);
    }

    let n = sizes_gib.len();
    if n < mode.minimum_device_count() {
        return Err(PlanningError::NotEnoughDevices {
            mode,
            required: mode.minimum_device_count(),
            found: n,
        });
    }

    let sum: u64 = sizes_gib.iter().sum();
    let data_devices = (n - mode.parity_devices()) as u64;
    Ok(sum * data_devices / n as u64)
}

/// Compute the capacity plan for `mode` from raw device sizes in bytes.
///
/// `None` or zero sizes fall back to `FALLBACK_DEVICE_GIB`.
///
/// # Errors
///
/// Returns `DeviceTooSmall` when the pool cannot hold boot plus the dataset
/// floors. A pool that holds them exactly gets a 0 GiB general area.
pub fn plan_capacity(
    mode: StorageMode,
    device_sizes: &[Option<u64>],
) -> Result<CapacityPlan, PlanningError> {
    let sizes: Vec<u64> = device_sizes.iter().map(|s| device_gib(*s)).collect();
    let pool = pool_gib(mode, &sizes)?;

    if pool < BOOT_GIB {
        return Err(PlanningError::DeviceTooSmall {
            required: BOOT_GIB,
            available: pool,
        });
    }
    let after_boot = pool - BOOT_GIB;

    if !mode.uses_pool() {
        return Ok(CapacityPlan {
            mode,
            pool_gib: pool,
            boot_gib: BOOT_GIB,
            metadata_gib: None,
            auxiliary_gib: None,
            general_gib: after_boot,
        });
    }

    let metadata = (after_boot * 5 / 100).max(METADATA_FLOOR_GIB);
    let auxiliary = (pool * 5 / 10_000).max(AUXILIARY_FLOOR_GIB);
    let overhead = metadata + auxiliary;

    if after_boot < overhead {
        return Err(PlanningError::DeviceTooSmall {
            required: BOOT_GIB + overhead,
            available: pool,
        });
    }

    Ok(CapacityPlan {
        mode,
        pool_gib: pool,
        boot_gib: BOOT_GIB,
        metadata_gib: Some(metadata),
        auxiliary_gib: Some(auxiliary),
        general_gib: after_boot - overhead,
    })
}

// ============================================================================
// Pool Layout
// ============================================================================

/// What a device contributes to the installed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceRole {
    /// ESP + plain root filesystem (single-plain)
    BootAndData,
    /// ESP + pool member (first device of every pool mode)
    BootAndPool,
    /// Pool member only
    PoolMember,
}

/// One device in the layout, with the partitions it will carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAssignment {
    pub device: PathBuf,
    pub role: DeviceRole,
    pub boot_partition: Option<PathBuf>,
    pub data_partition: PathBuf,
}

/// Structural description consumed by the descriptor generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLayout {
    pub mode: StorageMode,
    pub redundancy: Redundancy,
    /// `None` for the plain mode
    pub pool_name: Option<String>,
    pub devices: Vec<DeviceAssignment>,
}

impl PoolLayout {
    /// The device hosting the boot partition.
    pub fn boot_device(&self) -> Option<&DeviceAssignment> {
        self.devices.first()
    }

    pub fn pool_members(&self) -> impl Iterator<Item = &DeviceAssignment> {
        self.devices
            .iter()
            .filter(|d| d.role != DeviceRole::BootAndData)
    }
}

/// Lay out partitions across `disks` (boot device first).
///
/// # Errors
///
/// - `NoDevices` if `disks` is empty
/// - `NotEnoughDevices` if a multi-disk mode gets fewer than its minimum
pub fn plan_layout(
    mode: StorageMode,
    disks: &[String],
    pool_name: &str,
) -> Result<PoolLayout, PlanningError> {
    if disks.is_empty() {
        return Err(PlanningError::NoDevices);
    }
    if disks.len() < mode.minimum_device_count() {
        return Err(PlanningError::NotEnoughDevices {
            mode,
            required: mode.minimum_device_count(),
            found: disks.len(),
        });
    }

    let used = if mode.requires_multiple_devices() { disks.len() } else { 1 };
    let devices = disks
        .iter()
        .take(used)
        .enumerate()
        .map(|(i, disk)| {
            let device = PathBuf::from(disk);
            if i == 0 {
                DeviceAssignment {
                    role: if mode.uses_pool() {
                        DeviceRole::BootAndPool
                    } else {
                        DeviceRole::BootAndData
                    },
                    boot_partition: Some(partition_path(&device, 1)),
                    data_partition: partition_path(&device, 2),
                    device,
                }
            } else {
                DeviceAssignment {
                    role: DeviceRole::PoolMember,
                    boot_partition: None,
                    data_partition: partition_path(&device, 1),
                    device,
                }
            }
        })
        .collect();

    Ok(PoolLayout {
        mode,
        redundancy: mode.redundancy(),
        pool_name: mode.uses_pool().then(|| pool_name.to_string()),
        devices,
    })
}

// ============================================================================
// Combined Plan
// ============================================================================

/// Capacity and structure for one storage selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePlan {
    pub capacity: CapacityPlan,
    pub layout: PoolLayout,
}

impl StoragePlan {
    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Storage Plan: {}", self.layout.mode.label()),
            format!("  Redundancy: {}", self.layout.redundancy),
            format!("  Capacity: {}", self.capacity),
            format!("  Devices ({}):", self.layout.devices.len()),
        ];
        for (i, dev) in self.layout.devices.iter().enumerate() {
            let boot = dev
                .boot_partition
                .as_ref()
                .map(|p| format!(" boot={}", p.display()))
                .unwrap_or_default();
            lines.push(format!(
                "    {}. {} [{:?}]{} data={}",
                i + 1,
                dev.device.display(),
                dev.role,
                boot,
                dev.data_partition.display()
            ));
        }
        lines.join("\n")
    }
}

/// Plan capacity and layout together. `disks` pairs each path with its raw size.
pub fn calculate_storage_plan(
    mode: StorageMode,
    disks: &[(String, Option<u64>)],
    pool_name: &str,
) -> Result<StoragePlan, PlanningError> {
    let paths: Vec<String> = disks.iter().map(|(p, _)| p.clone()).collect();
    let layout = plan_layout(mode, &paths, pool_name)?;
    let sizes: Vec<Option<u64>> = disks.iter().map(|(_, s)| *s).collect();
    let sizes = if mode.requires_multiple_devices() { &sizes[..] } else { &sizes[..1] };
    let capacity = plan_capacity(mode, sizes)?;
    Ok(StoragePlan { capacity, layout })
}

// ============================================================================
// Helpers
// ============================================================================

/// Generate a partition device path from a disk path and partition number.
///
/// Handles both `/dev/sdX` → `/dev/sdX1` and `/dev/nvme0n1` → `/dev/nvme0n1p1` patterns.
pub fn partition_path(disk: &std::path::Path, partition_num: u32) -> PathBuf {
    let disk_str = disk.display().to_string();

    // NVMe and loop devices use 'p' separator (e.g., /dev/nvme0n1p1, /dev/loop0p1)
    if disk_str.ends_with(|c: char| c.is_ascii_digit()) {
        PathBuf::from(format!("{}p{}", disk_str, partition_num))
    } else {
        PathBuf::from(format!("{}{}", disk_str, partition_num))
    }
}

// ============================================================================
// Tests
// ============================================================================
