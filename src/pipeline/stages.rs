//! Install stages
//!
//! The fixed, ordered list of provisioning stages. Two of them only apply
//! when the root lives on a ZFS pool.
//!
//! # Stage Flow
//!
//! ```text
//! GenerateHostConfig
//!     ↓
//! FormatDisks            (destructive)
//!     ↓
//! GenerateHardwareConfig
//!     ↓
//! InstallBaseSystem
//!     ↓
//! ConfigureBootPool      (pool modes)
//!     ↓
//! CopyConfigTree
//!     ↓
//! SetupUserTree
//!     ↓
//! CopyInstallLog
//!     ↓
//! FinalizePool           (pool modes, unmounts the target)
//! ```

use crate::types::StorageMode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Write host, user and disk descriptors into the work dir
    GenerateHostConfig = 1,

    /// Partition, encrypt and mount the target disks.
    /// This is a DESTRUCTIVE stage
    FormatDisks = 2,

    /// Run hardware detection and write hardware.nix
    GenerateHardwareConfig = 3,

    /// Run the base-system installer against the flake
    InstallBaseSystem = 4,

    /// Point the pool's bootfs at the root dataset
    ConfigureBootPool = 5,

    /// Copy the flake tree into the target's /etc
    CopyConfigTree = 6,

    /// Clone the flake for the user and record the install in its history
    SetupUserTree = 7,

    /// Copy the diagnostics log onto the target
    CopyInstallLog = 8,

    /// Unmount and export the pool
    FinalizePool = 9,
}

// The log copy writes into the target, which FinalizePool unmounts.
const _: () = assert!(InstallStage::CopyInstallLog.ordinal() < InstallStage::FinalizePool.ordinal());

impl InstallStage {
    /// Every stage in execution order.
    pub const ALL: [Self; 9] = [
        Self::GenerateHostConfig,
        Self::FormatDisks,
        Self::GenerateHardwareConfig,
        Self::InstallBaseSystem,
        Self::ConfigureBootPool,
        Self::CopyConfigTree,
        Self::SetupUserTree,
        Self::CopyInstallLog,
        Self::FinalizePool,
    ];

    /// Position in the full list (1-9)
    #[inline]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns true if this stage writes to the target disks
    #[inline]
    pub const fn is_destructive(self) -> bool {
        matches!(self, Self::FormatDisks)
    }

    /// Whether the stage runs for `mode`.
    pub const fn applies_to(self, mode: StorageMode) -> bool {
        match self {
            Self::ConfigureBootPool | Self::FinalizePool => mode.uses_pool(),
            _ => true,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::GenerateHostConfig => "Generating host configuration",
            Self::FormatDisks => "Formatting disk(s)",
            Self::GenerateHardwareConfig => "Generating hardware configuration",
            Self::InstallBaseSystem => "Installing NixOS",
            Self::ConfigureBootPool => "Configuring ZFS boot",
            Self::CopyConfigTree => "Copying flake to target",
            Self::SetupUserTree => "Setting up user flake",
            Self::CopyInstallLog => "Copying install log",
            Self::FinalizePool => "Finalizing ZFS pool",
        }
    }

    /// Stages that run for `mode`, in order.
    pub fn for_mode(mode: StorageMode) -> Vec<Self> {
        Self::ALL.into_iter().filter(|s| s.applies_to(mode)).collect()
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
