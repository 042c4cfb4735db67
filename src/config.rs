//! Configuration management module
//!
//! `Config` is the record the wizard fills in step by step. `FrozenConfig` is
//! the validated, read-only snapshot the install pipeline consumes.
//! `InstallerSettings` holds process-level values that never come from the
//! operator's answers.

use crate::engine::storage::{self, CapacityPlan, PoolLayout};
use crate::error::{PlanningError, ValidationError};
use crate::types::StorageMode;
use crate::validation;
use serde::Serialize;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub const DEFAULT_POOL_NAME: &str = "NIXROOT";
pub const DEFAULT_WORK_DIR: &str = "/tmp/tuinix-install";
pub const DEFAULT_TARGET: &str = "/mnt";
pub const DEFAULT_LOG_PATH: &str = "/tmp/tuinix-install.log";
pub const DEFAULT_FLAKE_REPO: &str = "https://github.com/timlinux/tuinix.git";

/// Locations searched for the flake tree, in order.
pub const PROJECT_ROOT_CANDIDATES: &[&str] = &["/home/tuinix", "/iso/tuinix", "/etc/tuinix", "."];

// ============================================================================
// Config
// ============================================================================

/// Everything the operator told the wizard.
///
/// Empty strings and `None` mean "not collected yet". Fields that do not
/// apply to the chosen storage mode or SSH choice stay empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub username: String,
    pub full_name: String,
    pub email: String,
    /// Account password (overwritten on drop, never serialized)
    #[serde(skip)]
    pub password: String,
    pub hostname: String,
    pub storage_mode: StorageMode,
    /// Boot device
    pub disk: String,
    /// Pool members for multi-disk modes, boot device first
    pub disks: Vec<String>,
    pub host_id: String,
    /// Pool encryption passphrase (overwritten on drop, never serialized)
    #[serde(skip)]
    pub passphrase: Option<String>,
    pub locale: String,
    /// XKB layout
    pub keymap: String,
    pub console_keymap: String,
    pub enable_ssh: bool,
    pub github_user: Option<String>,
    pub ssh_keys: Option<Vec<String>>,
    pub capacity: Option<CapacityPlan>,
}

impl Config {
    /// Devices that will be wiped, boot device first.
    pub fn target_disks(&self) -> Vec<String> {
        if self.disks.is_empty() {
            if self.disk.is_empty() {
                Vec::new()
            } else {
                vec![self.disk.clone()]
            }
        } else {
            self.disks.clone()
        }
    }

    /// Check every field the storage mode and SSH choice require and return a
    /// snapshot with irrelevant fields cleared.
    ///
    /// # Errors
    ///
    /// The first missing or invalid field, as a `ValidationError`.
    pub fn freeze(&self) -> Result<FrozenConfig, ValidationError> {
        if !validation::is_valid_username(&self.username) {
            return Err(missing_or(&self.username, "username", ValidationError::Username));
        }
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::Missing("full name"));
        }
        if !validation::is_valid_email(&self.email) {
            return Err(missing_or(&self.email, "email", ValidationError::Email));
        }
        if !validation::is_strong_secret(&self.password) {
            return Err(missing_or(&self.password, "password", ValidationError::PasswordTooShort));
        }
        if !validation::is_valid_hostname(&self.hostname) {
            return Err(missing_or(&self.hostname, "hostname", ValidationError::Hostname));
        }
        if self.disk.is_empty() {
            return Err(ValidationError::Missing("disk"));
        }

        let mode = self.storage_mode;
        if mode.requires_multiple_devices() {
            if self.disks.len() < mode.minimum_device_count() {
                return Err(ValidationError::Missing("disks"));
            }
            if self.disks.first() != Some(&self.disk) {
                return Err(ValidationError::Missing("boot disk in disk set"));
            }
        }
        if self.host_id.is_empty() {
            return Err(ValidationError::Missing("host id"));
        }

        let passphrase = if mode.requires_encryption() {
            match &self.passphrase {
                Some(p) if validation::is_strong_secret(p) => Some(p.clone()),
                Some(_) => return Err(ValidationError::PassphraseTooShort),
                None => return Err(ValidationError::Missing("passphrase")),
            }
        } else {
            None
        };

        if self.locale.is_empty() {
            return Err(ValidationError::Missing("locale"));
        }
        if self.keymap.is_empty() || self.console_keymap.is_empty() {
            return Err(ValidationError::Missing("keymap"));
        }

        let (github_user, ssh_keys) = if self.enable_ssh {
            let user = match &self.github_user {
                Some(u) if !u.is_empty() => u.clone(),
                _ => return Err(ValidationError::Missing("GitHub username")),
            };
            let keys = match &self.ssh_keys {
                Some(k) if !k.is_empty() => k.clone(),
                _ => return Err(ValidationError::NoSshKeys(user)),
            };
            (Some(user), Some(keys))
        } else {
            (None, None)
        };

        let capacity = match self.capacity {
            Some(plan) if plan.mode == mode => plan,
            _ => return Err(ValidationError::Missing("capacity plan")),
        };

        Ok(FrozenConfig {
            inner: Config {
                username: self.username.clone(),
                full_name: self.full_name.trim().to_string(),
                email: self.email.clone(),
                password: self.password.clone(),
                hostname: self.hostname.clone(),
                storage_mode: mode,
                disk: self.disk.clone(),
                disks: if mode.requires_multiple_devices() {
                    self.disks.clone()
                } else {
                    Vec::new()
                },
                host_id: self.host_id.clone(),
                passphrase,
                locale: self.locale.clone(),
                keymap: self.keymap.clone(),
                console_keymap: self.console_keymap.clone(),
                enable_ssh: self.enable_ssh,
                github_user,
                ssh_keys,
                capacity: Some(capacity),
            },
            capacity,
        })
    }

    /// Overwrite the password and passphrase buffers with zeros and release
    /// them. Copies made earlier by reallocation while typing are not reached.
    pub fn zero_sensitive_data(&mut self) {
        wipe(&mut self.password);
        if let Some(mut p) = self.passphrase.take() {
            wipe(&mut p);
        }
    }
}

/// Zero a secret's heap buffer, then free it and leave `secret` empty.
fn wipe(secret: &mut String) {
    let mut bytes = std::mem::take(secret).into_bytes();
    wipe_bytes(&mut bytes);
}

fn wipe_bytes(bytes: &mut [u8]) {
    bytes.fill(0);
    // Keeps the stores from being dropped as dead writes
    std::hint::black_box(&*bytes);
}

impl Drop for Config {
    fn drop(&mut self) {
        self.zero_sensitive_data();
    }
}

fn missing_or(value: &str, field: &'static str, invalid: ValidationError) -> ValidationError {
    if value.is_empty() {
        ValidationError::Missing(field)
    } else {
        invalid
    }
}

// ============================================================================
// FrozenConfig
// ============================================================================

/// A `Config` that passed `freeze`. Read-only; derefs to `Config`.
#[derive(Debug, Clone, Serialize)]
pub struct FrozenConfig {
    #[serde(flatten)]
    inner: Config,
    #[serde(skip)]
    capacity: CapacityPlan,
}

impl FrozenConfig {
    pub fn capacity(&self) -> &CapacityPlan {
        &self.capacity
    }

    /// Partition layout across the target disks.
    pub fn pool_layout(&self, pool_name: &str) -> Result<PoolLayout, PlanningError> {
        storage::plan_layout(self.inner.storage_mode, &self.inner.target_disks(), pool_name)
    }
}

impl Deref for FrozenConfig {
    type Target = Config;

    fn deref(&self) -> &Config {
        &self.inner
    }
}

// ============================================================================
// InstallerSettings
// ============================================================================

/// Process-level settings taken from CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerSettings {
    pub pool_name: String,
    /// Tree containing `flake.nix` that gets copied into the work dir
    pub project_root: PathBuf,
    pub work_dir: PathBuf,
    /// Mount point of the target system
    pub target: PathBuf,
    pub flake_repo: String,
    pub log_path: PathBuf,
    /// Log commands instead of running them
    pub dry_run: bool,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            pool_name: DEFAULT_POOL_NAME.to_string(),
            project_root: find_project_root(PROJECT_ROOT_CANDIDATES),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            target: PathBuf::from(DEFAULT_TARGET),
            flake_repo: DEFAULT_FLAKE_REPO.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            dry_run: false,
        }
    }
}

impl InstallerSettings {
    /// `<work_dir>/hosts/<hostname>`
    pub fn host_dir(&self, hostname: &str) -> PathBuf {
        self.work_dir.join("hosts").join(hostname)
    }

    /// `<work_dir>/users/<username>.nix`
    pub fn user_file(&self, username: &str) -> PathBuf {
        self.work_dir.join("users").join(format!("{}.nix", username))
    }

    /// `<work_dir>/hosts/<hostname>/disks.nix`
    pub fn disks_file(&self, hostname: &str) -> PathBuf {
        self.host_dir(hostname).join("disks.nix")
    }

    /// `<target>/<rel>`, tolerating absolute `rel`.
    pub fn in_target(&self, rel: &str) -> PathBuf {
        self.target.join(rel.trim_start_matches('/'))
    }
}

/// First candidate directory that contains `flake.nix`, or `.` when none do.
pub fn find_project_root<P: AsRef<Path>>(candidates: &[P]) -> PathBuf {
    candidates
        .iter()
        .map(|c| c.as_ref())
        .find(|c| c.join("flake.nix").is_file())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
