use crate::config::{
    DEFAULT_LOG_PATH, DEFAULT_POOL_NAME, DEFAULT_TARGET, DEFAULT_WORK_DIR, InstallerSettings,
    PROJECT_ROOT_CANDIDATES, find_project_root,
};
use crate::types::StorageMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const GIB: u64 = 1024 * 1024 * 1024;

/// tuinix installer - NixOS on encrypted ZFS or XFS
#[derive(Parser, Debug)]
#[command(name = "tuinix-installer")]
#[command(about = "Terminal wizard that installs tuinix (NixOS) onto one or more disks")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: log every provisioning command instead of running it.
    ///
    /// Files are still generated in the work directory so the output can be
    /// inspected. The root check is skipped.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Diagnostics log, copied onto the installed system at the end
    #[arg(long, global = true, default_value = DEFAULT_LOG_PATH)]
    pub log_file: PathBuf,

    /// Flake tree to install (default: first of the known locations with a flake.nix)
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    /// Scratch directory for the generated configuration
    #[arg(long, global = true, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// ZFS pool name
    #[arg(long, global = true, default_value = DEFAULT_POOL_NAME)]
    pub pool_name: String,

    /// Mount point of the target system
    #[arg(long, global = true, default_value = DEFAULT_TARGET)]
    pub target: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive TUI installer (default)
    Install,
    /// Print the storage plan for a mode and set of disk sizes
    Plan {
        /// Storage mode (single-encrypted, single-plain, multi-stripe, multi-parity-1, multi-parity-2)
        #[arg(short, long)]
        mode: StorageMode,
        /// Size of each disk in GiB, boot disk first; 0 means unknown
        #[arg(short, long = "size-gib", num_args = 1.., required = true)]
        size_gib: Vec<u64>,
        /// Device paths matching the sizes (default: /dev/sda, /dev/sdb, ...)
        #[arg(short, long = "disk")]
        disks: Vec<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the disks the installer would offer
    Disks {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Process settings for the installer from the global flags.
    pub fn settings(&self) -> InstallerSettings {
        InstallerSettings {
            pool_name: self.pool_name.clone(),
            project_root: self
                .project_root
                .clone()
                .unwrap_or_else(|| find_project_root(PROJECT_ROOT_CANDIDATES)),
            work_dir: self.work_dir.clone(),
            target: self.target.clone(),
            log_path: self.log_file.clone(),
            dry_run: self.dry_run,
            ..InstallerSettings::default()
        }
    }
}

/// Pair sizes with device paths for the `plan` subcommand.
///
/// A size of 0 is passed on as unknown; missing paths are named `/dev/sdX`.
pub fn plan_disks(size_gib: &[u64], disks: &[String]) -> Vec<(String, Option<u64>)> {
    size_gib
        .iter()
        .enumerate()
        .map(|(i, &gib)| {
            let path = disks.get(i).cloned().unwrap_or_else(|| {
                let letter = char::from(b'a' + (i % 26) as u8);
                format!("/dev/sd{}", letter)
            });
            let bytes = (gib > 0).then(|| gib.saturating_mul(GIB));
            (path, bytes)
        })
        .collect()
}
