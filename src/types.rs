//! Type-safe configuration types for the installer
//!
//! `StorageMode` is the one variant every downstream branch keys off: the
//! wizard path, the capacity math and which pipeline stages run. Its
//! capability queries are the only place those decisions are encoded.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Disk redundancy/encryption strategy chosen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// Encrypted ZFS on a single disk
    #[default]
    #[strum(to_string = "single-encrypted", serialize = "zfs")]
    SingleEncrypted,
    /// Unencrypted XFS on a single disk
    #[strum(to_string = "single-plain", serialize = "xfs")]
    SinglePlain,
    /// Encrypted ZFS stripe across all selected disks
    #[strum(to_string = "multi-stripe", serialize = "stripe")]
    MultiStripe,
    /// Encrypted ZFS raidz (single parity)
    #[strum(to_string = "multi-parity-1", serialize = "raidz")]
    MultiParity1,
    /// Encrypted ZFS raidz2 (double parity)
    #[strum(to_string = "multi-parity-2", serialize = "raidz2")]
    MultiParity2,
}

impl StorageMode {
    /// All modes in the order the wizard offers them.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Whether the pool is encrypted and a passphrase must be collected.
    pub const fn requires_encryption(self) -> bool {
        !matches!(self, Self::SinglePlain)
    }

    /// Whether the mode aggregates several devices into one pool.
    pub const fn requires_multiple_devices(self) -> bool {
        matches!(self, Self::MultiStripe | Self::MultiParity1 | Self::MultiParity2)
    }

    pub const fn minimum_device_count(self) -> usize {
        match self {
            Self::SingleEncrypted | Self::SinglePlain => 1,
            Self::MultiStripe => 2,
            Self::MultiParity1 => 3,
            Self::MultiParity2 => 4,
        }
    }

    /// Whether the root lives on a ZFS pool (every mode but plain XFS).
    pub const fn uses_pool(self) -> bool {
        !matches!(self, Self::SinglePlain)
    }

    /// Number of devices' worth of capacity spent on parity.
    pub const fn parity_devices(self) -> usize {
        match self {
            Self::MultiParity1 => 1,
            Self::MultiParity2 => 2,
            _ => 0,
        }
    }

    pub const fn redundancy(self) -> Redundancy {
        match self {
            Self::SingleEncrypted => Redundancy::Single,
            Self::SinglePlain => Redundancy::None,
            Self::MultiStripe => Redundancy::Stripe,
            Self::MultiParity1 => Redundancy::Raidz,
            Self::MultiParity2 => Redundancy::Raidz2,
        }
    }

    /// Human-readable label shown to the user.
    pub const fn label(self) -> &'static str {
        match self {
            Self::SingleEncrypted => "Encrypted ZFS (single disk)",
            Self::SinglePlain => "XFS unencrypted (max performance)",
            Self::MultiStripe => "Encrypted ZFS stripe (combined space)",
            Self::MultiParity1 => "Encrypted ZFS raidz (1-disk fault tolerance)",
            Self::MultiParity2 => "Encrypted ZFS raidz2 (2-disk fault tolerance)",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::SingleEncrypted => {
                "Single disk with AES-256-GCM encryption, compression, and snapshots"
            }
            Self::SinglePlain => "Single disk, no encryption. Maximum raw I/O performance",
            Self::MultiStripe => "Multiple disks combined for maximum space (no redundancy)",
            Self::MultiParity1 => {
                "Multiple disks with single parity. Tolerates 1 disk failure (min 3 disks)"
            }
            Self::MultiParity2 => {
                "Multiple disks with double parity. Tolerates 2 disk failures (min 4 disks)"
            }
        }
    }
}

/// Pool vdev arrangement recorded for the provisioning descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Redundancy {
    /// No pool at all (plain filesystem)
    None,
    /// One-device pool
    Single,
    Stripe,
    Raidz,
    Raidz2,
}

impl Redundancy {
    /// The zpool vdev keyword; empty for plain striping/single vdevs.
    pub const fn vdev_keyword(self) -> &'static str {
        match self {
            Self::Raidz => "raidz",
            Self::Raidz2 => "raidz2",
            Self::None | Self::Single | Self::Stripe => "",
        }
    }
}

/// A discovered block device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Device path (e.g., `/dev/sda`)
    pub path: String,
    /// Human-readable size (e.g., "500G")
    pub size: String,
    pub model: String,
    /// Raw size when the enumerator could read it
    pub size_bytes: Option<u64>,
}

impl Disk {
    /// Stand-in entry used when enumeration finds nothing.
    pub fn placeholder() -> Self {
        Self {
            path: "/dev/sda".to_string(),
            size: "100G".to_string(),
            model: "No disks found".to_string(),
            size_bytes: None,
        }
    }
}

/// Keyboard layout with its X11 and console spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeymapEntry {
    pub label: &'static str,
    pub xkb_layout: &'static str,
    pub console_map: &'static str,
}

pub const LOCALES: &[&str] = &[
    "en_US.UTF-8",
    "en_GB.UTF-8",
    "pt_PT.UTF-8",
    "pt_BR.UTF-8",
    "de_DE.UTF-8",
    "fr_FR.UTF-8",
    "es_ES.UTF-8",
];

pub const KEYMAPS: &[KeymapEntry] = &[
    KeymapEntry { label: "us", xkb_layout: "us", console_map: "us" },
    KeymapEntry { label: "uk", xkb_layout: "gb", console_map: "uk" },
    KeymapEntry { label: "pt", xkb_layout: "pt", console_map: "pt-latin1" },
    KeymapEntry { label: "br", xkb_layout: "br", console_map: "br-abnt2" },
    KeymapEntry { label: "de", xkb_layout: "de", console_map: "de-latin1" },
    KeymapEntry { label: "fr", xkb_layout: "fr", console_map: "fr-latin1" },
    KeymapEntry { label: "es", xkb_layout: "es", console_map: "es" },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_minimum_device_counts() {
        assert_eq!(StorageMode::SingleEncrypted.minimum_device_count(), 1);
        assert_eq!(StorageMode::SinglePlain.minimum_device_count(), 1);
        assert_eq!(StorageMode::MultiStripe.minimum_device_count(), 2);
        assert_eq!(StorageMode::MultiParity1.minimum_device_count(), 3);
        assert_eq!(StorageMode::MultiParity2.minimum_device_count(), 4);
    }

    #[test]
    fn test_only_plain_mode_is_unencrypted() {
        for mode in StorageMode::all() {
            assert_eq!(mode.requires_encryption(), mode != StorageMode::SinglePlain);
            assert_eq!(mode.uses_pool(), mode.requires_encryption());
        }
    }

    #[test]
    fn test_multi_device_modes_need_more_than_one_disk() {
        for mode in StorageMode::all() {
            assert_eq!(
                mode.requires_multiple_devices(),
                mode.minimum_device_count() > 1
            );
        }
    }

    #[test]
    fn test_mode_parses_from_cli_aliases() {
        assert_eq!(StorageMode::from_str("raidz").ok(), Some(StorageMode::MultiParity1));
        assert_eq!(
            StorageMode::from_str("multi-parity-2").ok(),
            Some(StorageMode::MultiParity2)
        );
        assert_eq!(StorageMode::from_str("xfs").ok(), Some(StorageMode::SinglePlain));
        assert!(StorageMode::from_str("mirror").is_err());
    }

    #[test]
    fn test_mode_display_is_canonical_name() {
        assert_eq!(StorageMode::MultiStripe.to_string(), "multi-stripe");
        assert_eq!(StorageMode::SingleEncrypted.to_string(), "single-encrypted");
    }

    #[test]
    fn test_wizard_offers_modes_in_declaration_order() {
        let modes = StorageMode::all();
        assert_eq!(modes.len(), 5);
        assert_eq!(modes[0], StorageMode::SingleEncrypted);
        assert_eq!(modes[4], StorageMode::MultiParity2);
    }

    #[test]
    fn test_keymaps_have_console_variants() {
        let uk = KEYMAPS.iter().find(|k| k.label == "uk").expect("uk keymap");
        assert_eq!(uk.xkb_layout, "gb");
        assert_eq!(uk.console_map, "uk");
    }
}
