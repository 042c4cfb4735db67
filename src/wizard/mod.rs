//! Configuration wizard
//!
//! A UI-agnostic state machine that builds one `Config` from a sequence of
//! `WizardInput`s. The presentation layer translates keys into inputs and
//! renders whatever `Wizard` exposes; it never mutates the config itself.
//!
//! # Invariants
//!
//! - A rejected input leaves both the state and the config untouched and sets
//!   `error()`.
//! - An accepted input clears `error()`.
//! - Passwords and passphrases reach the config only after a byte-exact
//!   confirmation.
//! - `Ready` is returned exactly once, with a config that passed `freeze`.

pub mod state;

pub use state::WizardState;

use crate::config::{Config, FrozenConfig};
use crate::engine::storage::{self, CapacityPlan};
use crate::error::{InstallerError, PlanningError, ValidationError};
use crate::hardware::{DiskProbe, NetworkState};
use crate::keys::KeyRetriever;
use crate::pipeline::{InstallStage, PipelineError};
use crate::types::{Disk, KEYMAPS, LOCALES, StorageMode};
use crate::validation;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Text the operator must type to start the destructive pipeline.
pub const CONFIRMATION_PHRASE: &str = "DESTROY";

/// Options on the SSH step.
pub const SSH_OPTIONS: [&str; 2] = ["Yes, enable SSH with GitHub keys", "No, skip SSH"];

/// One operator action, already decoded from keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    /// Result of the connectivity probe
    Network(NetworkState),
    /// Submitted text field
    Text(String),
    /// Index into the current list
    Choice(usize),
    /// Flip one disk in the multi-disk list
    ToggleDisk(usize),
    /// Key lookup finished off the UI thread; `Err` carries the failure text
    KeysFetched {
        handle: String,
        keys: Result<Vec<String>, String>,
    },
    Continue,
    Abort,
}

/// Outcome of `Wizard::handle`.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Rejected; see `Wizard::error`
    Stayed,
    Moved(WizardState),
    /// Confirmation accepted; the wizard is now `Installing`
    Ready(FrozenConfig),
    Aborted,
    /// Not meaningful in the current state
    Ignored,
}

/// Why the install ended in `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: InstallStage,
    pub message: String,
    /// Target disks may have been modified
    pub irrecoverable: bool,
}

/// The wizard and its collaborators.
pub struct Wizard {
    state: WizardState,
    config: Config,
    error: Option<InstallerError>,
    network: Option<NetworkState>,
    disks: Vec<Disk>,
    selected: Vec<bool>,
    /// First entry of a password/passphrase awaiting confirmation
    pending_secret: Option<String>,
    failure: Option<StageFailure>,
    probe: Box<dyn DiskProbe>,
    keys: Arc<dyn KeyRetriever>,
}

impl Wizard {
    pub fn new(probe: Box<dyn DiskProbe>, keys: Box<dyn KeyRetriever>) -> Self {
        Self {
            state: WizardState::default(),
            config: Config::default(),
            error: None,
            network: None,
            disks: Vec::new(),
            selected: Vec::new(),
            pending_secret: None,
            failure: None,
            probe,
            keys: Arc::from(keys),
        }
    }

    /// Shared handle for fetching keys on another thread.
    pub fn key_retriever(&self) -> Arc<dyn KeyRetriever> {
        Arc::clone(&self.keys)
    }

    // ------------------------------------------------------------------
    // Read-only views for the presentation layer
    // ------------------------------------------------------------------

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Why the last input was rejected.
    pub fn error(&self) -> Option<&InstallerError> {
        self.error.as_ref()
    }

    pub fn network(&self) -> Option<NetworkState> {
        self.network
    }

    /// Disks read when the storage step was reached.
    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    /// Toggle flags parallel to `disks()` (multi-disk step).
    pub fn selected(&self) -> &[bool] {
        &self.selected
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    /// Labels for the list on the current step; empty for non-list steps.
    pub fn options(&self) -> Vec<String> {
        match self.state {
            WizardState::StorageMode => StorageMode::all()
                .into_iter()
                .map(|m| m.label().to_string())
                .collect(),
            WizardState::DiskSingle | WizardState::DiskMulti => self
                .disks
                .iter()
                .map(|d| {
                    if d.model.is_empty() {
                        format!("{} ({})", d.path, d.size)
                    } else {
                        format!("{} ({}) - {}", d.path, d.size, d.model)
                    }
                })
                .collect(),
            WizardState::Locale => LOCALES.iter().map(|l| l.to_string()).collect(),
            WizardState::Keymap => KEYMAPS.iter().map(|k| k.label.to_string()).collect(),
            WizardState::SshChoice => SSH_OPTIONS.iter().map(|s| s.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Key/value rows for the summary screen.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let c = &self.config;
        let mut rows = vec![
            ("Username", c.username.clone()),
            ("Full name", c.full_name.clone()),
            ("Email", c.email.clone()),
            ("Hostname", c.hostname.clone()),
            ("Storage", c.storage_mode.label().to_string()),
        ];
        if c.disks.is_empty() {
            rows.push(("Disk", c.disk.clone()));
        } else {
            rows.push(("Disks", c.disks.join(", ")));
        }
        rows.push(("Host ID", c.host_id.clone()));
        if let Some(plan) = &c.capacity {
            rows.push(("Layout", plan.to_string()));
        }
        rows.push(("Locale", c.locale.clone()));
        rows.push(("Keymap", format!("{} (console: {})", c.keymap, c.console_keymap)));
        match (&c.github_user, &c.ssh_keys) {
            (Some(user), Some(keys)) if c.enable_ssh => {
                rows.push(("SSH", format!("enabled, {} key(s) from {}", keys.len(), user)));
            }
            _ => rows.push(("SSH", "disabled".to_string())),
        }
        rows
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Apply one input.
    pub fn handle(&mut self, input: WizardInput) -> Transition {
        if input == WizardInput::Abort {
            return if self.state == WizardState::Installing {
                Transition::Ignored
            } else {
                tracing::info!("Wizard aborted at {:?}", self.state);
                Transition::Aborted
            };
        }

        let outcome = match (self.state, input) {
            (WizardState::NetworkCheck, WizardInput::Network(net)) => self.on_network(net),
            (WizardState::NetworkCheck, WizardInput::Continue) => {
                if self.network == Some(NetworkState::Online) {
                    Ok(WizardState::Username)
                } else {
                    return Transition::Ignored;
                }
            }
            (WizardState::Username, WizardInput::Text(s)) => self.on_username(&s),
            (WizardState::FullName, WizardInput::Text(s)) => self.on_full_name(&s),
            (WizardState::Email, WizardInput::Text(s)) => self.on_email(&s),
            (WizardState::Password, WizardInput::Text(s)) => {
                self.on_first_secret(s, ValidationError::PasswordTooShort, WizardState::PasswordConfirm)
            }
            (WizardState::PasswordConfirm, WizardInput::Text(s)) => self.on_password_confirm(&s),
            (WizardState::Hostname, WizardInput::Text(s)) => self.on_hostname(&s),
            (WizardState::StorageMode, WizardInput::Choice(i)) => self.on_storage_mode(i),
            (WizardState::DiskSingle, WizardInput::Choice(i)) => self.on_disk_single(i),
            (WizardState::DiskMulti, WizardInput::ToggleDisk(i)) => {
                if let Some(flag) = self.selected.get_mut(i) {
                    *flag = !*flag;
                }
                return Transition::Ignored;
            }
            (WizardState::DiskMulti, WizardInput::Continue) => self.on_disk_multi(),
            (WizardState::Passphrase, WizardInput::Text(s)) => self.on_first_secret(
                s,
                ValidationError::PassphraseTooShort,
                WizardState::PassphraseConfirm,
            ),
            (WizardState::PassphraseConfirm, WizardInput::Text(s)) => self.on_passphrase_confirm(&s),
            (WizardState::Locale, WizardInput::Choice(i)) => self.on_locale(i),
            (WizardState::Keymap, WizardInput::Choice(i)) => self.on_keymap(i),
            (WizardState::SshChoice, WizardInput::Choice(i)) => self.on_ssh_choice(i),
            (WizardState::GithubUser, WizardInput::Text(s)) => self.on_github_user(&s),
            (WizardState::GithubUser, WizardInput::KeysFetched { handle, keys }) => {
                self.on_keys_fetched(&handle, keys)
            }
            (WizardState::Summary, WizardInput::Continue) => Ok(WizardState::Confirm),
            (WizardState::Confirm, WizardInput::Text(s)) => return self.on_confirm(&s),
            _ => return Transition::Ignored,
        };

        match outcome {
            Ok(next) => {
                self.error = None;
                tracing::debug!("Wizard {:?} -> {:?}", self.state, next);
                self.state = next;
                Transition::Moved(next)
            }
            Err(err) => {
                tracing::info!("Wizard input rejected at {:?}: {}", self.state, err);
                self.error = Some(err);
                Transition::Stayed
            }
        }
    }

    /// Record the pipeline outcome. Only meaningful while installing.
    pub fn finish(&mut self, result: Result<(), PipelineError>) -> WizardState {
        if self.state != WizardState::Installing {
            tracing::warn!("finish() called in {:?}, ignoring", self.state);
            return self.state;
        }
        self.config.zero_sensitive_data();
        self.state = match result {
            Ok(()) => WizardState::Complete,
            Err(err) => {
                self.failure = Some(StageFailure {
                    stage: err.stage,
                    message: err.message(),
                    irrecoverable: err.is_irrecoverable(),
                });
                WizardState::Error
            }
        };
        self.state
    }

    // ------------------------------------------------------------------
    // Per-state handlers. Each returns the next state or the rejection,
    // and only mutates `config` on success.
    // ------------------------------------------------------------------

    fn on_network(&mut self, net: NetworkState) -> Result<WizardState, InstallerError> {
        self.network = Some(net);
        if net.is_online() {
            Ok(WizardState::Username)
        } else {
            Err(InstallerError::Collaborator {
                step: WizardState::NetworkCheck.title().to_string(),
                message: "no internet connection; connect a network and press Enter to retry"
                    .to_string(),
            })
        }
    }

    fn on_username(&mut self, raw: &str) -> Result<WizardState, InstallerError> {
        let value = raw.trim();
        if !validation::is_valid_username(value) {
            return Err(ValidationError::Username.into());
        }
        self.config.username = value.to_string();
        Ok(WizardState::FullName)
    }

    fn on_full_name(&mut self, raw: &str) -> Result<WizardState, InstallerError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ValidationError::FullName.into());
        }
        self.config.full_name = value.to_string();
        Ok(WizardState::Email)
    }

    fn on_email(&mut self, raw: &str) -> Result<WizardState, InstallerError> {
        let value = raw.trim();
        if !validation::is_valid_email(value) {
            return Err(ValidationError::Email.into());
        }
        self.config.email = value.to_string();
        Ok(WizardState::Password)
    }

    fn on_first_secret(
        &mut self,
        value: String,
        too_short: ValidationError,
        next: WizardState,
    ) -> Result<WizardState, InstallerError> {
        if !validation::is_strong_secret(&value) {
            return Err(too_short.into());
        }
        self.pending_secret = Some(value);
        Ok(next)
    }

    /// Compare against the pending entry; on a match hand it over.
    fn take_confirmed_secret(&mut self, value: &str) -> Option<String> {
        match &self.pending_secret {
            Some(pending) if pending.as_bytes() == value.as_bytes() => self.pending_secret.take(),
            _ => None,
        }
    }

    fn on_password_confirm(&mut self, value: &str) -> Result<WizardState, InstallerError> {
        let secret = self
            .take_confirmed_secret(value)
            .ok_or(ValidationError::PasswordMismatch)?;
        self.config.password = secret;
        Ok(WizardState::Hostname)
    }

    fn on_hostname(&mut self, raw: &str) -> Result<WizardState, InstallerError> {
        let value = raw.trim();
        if !validation::is_valid_hostname(value) {
            return Err(ValidationError::Hostname.into());
        }
        self.config.hostname = value.to_string();
        if self.disks.is_empty() {
            self.disks = self.probe.enumerate();
            tracing::info!("Storage step reached, {} disk(s) listed", self.disks.len());
        }
        Ok(WizardState::StorageMode)
    }

    fn on_storage_mode(&mut self, index: usize) -> Result<WizardState, InstallerError> {
        let modes = StorageMode::all();
        let mode = *modes.get(index).ok_or(ValidationError::OutOfRange {
            index,
            len: modes.len(),
        })?;

        if mode.requires_multiple_devices() {
            if self.disks.len() < mode.minimum_device_count() {
                return Err(PlanningError::NotEnoughDevices {
                    mode,
                    required: mode.minimum_device_count(),
                    found: self.disks.len(),
                }
                .into());
            }
            self.selected = vec![false; self.disks.len()];
        }

        self.config.storage_mode = mode;
        self.config.disk.clear();
        self.config.disks.clear();
        self.config.capacity = None;
        if !mode.requires_encryption() {
            self.config.passphrase = None;
        }
        Ok(if mode.requires_multiple_devices() {
            WizardState::DiskMulti
        } else {
            WizardState::DiskSingle
        })
    }

    fn after_disks(&self) -> WizardState {
        if self.config.storage_mode.requires_encryption() {
            WizardState::Passphrase
        } else {
            WizardState::Locale
        }
    }

    fn on_disk_single(&mut self, index: usize) -> Result<WizardState, InstallerError> {
        let disk = self.disks.get(index).ok_or(ValidationError::OutOfRange {
            index,
            len: self.disks.len(),
        })?;
        storage::plan_capacity(self.config.storage_mode, &[disk.size_bytes])?;

        self.config.disk = disk.path.clone();
        self.config.disks.clear();
        self.config.host_id = generate_host_id();
        tracing::info!(
            "Selected {} (host id {})",
            self.config.disk,
            self.config.host_id
        );
        Ok(self.after_disks())
    }

    fn on_disk_multi(&mut self) -> Result<WizardState, InstallerError> {
        let mode = self.config.storage_mode;
        let chosen: Vec<&Disk> = self
            .disks
            .iter()
            .zip(&self.selected)
            .filter(|(_, sel)| **sel)
            .map(|(d, _)| d)
            .collect();

        if chosen.len() < mode.minimum_device_count() {
            return Err(ValidationError::TooFewDisks {
                mode,
                required: mode.minimum_device_count(),
            }
            .into());
        }
        let sizes: Vec<Option<u64>> = chosen.iter().map(|d| d.size_bytes).collect();
        storage::plan_capacity(mode, &sizes)?;

        self.config.disks = chosen.iter().map(|d| d.path.clone()).collect();
        self.config.disk = self.config.disks[0].clone();
        self.config.host_id = generate_host_id();
        tracing::info!(
            "Selected {} (boot {}, host id {})",
            self.config.disks.join(", "),
            self.config.disk,
            self.config.host_id
        );
        Ok(self.after_disks())
    }

    fn on_passphrase_confirm(&mut self, value: &str) -> Result<WizardState, InstallerError> {
        let secret = self
            .take_confirmed_secret(value)
            .ok_or(ValidationError::PassphraseMismatch)?;
        self.config.passphrase = Some(secret);
        Ok(WizardState::Locale)
    }

    fn on_locale(&mut self, index: usize) -> Result<WizardState, InstallerError> {
        let locale = LOCALES.get(index).ok_or(ValidationError::OutOfRange {
            index,
            len: LOCALES.len(),
        })?;
        self.config.locale = locale.to_string();
        Ok(WizardState::Keymap)
    }

    fn on_keymap(&mut self, index: usize) -> Result<WizardState, InstallerError> {
        let entry = KEYMAPS.get(index).ok_or(ValidationError::OutOfRange {
            index,
            len: KEYMAPS.len(),
        })?;
        let plan = match self.plan_with_fresh_sizes() {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!("Re-read disk sizes rejected ({}), using sizes from the disk list", err);
                self.plan_with_listed_sizes()?
            }
        };

        self.config.keymap = entry.xkb_layout.to_string();
        self.config.console_keymap = entry.console_map.to_string();
        tracing::info!("Capacity plan: {}", plan);
        self.config.capacity = Some(plan);
        Ok(WizardState::SshChoice)
    }

    fn listed_size(&self, path: &str) -> Option<u64> {
        self.disks
            .iter()
            .find(|d| d.path == path)
            .and_then(|d| d.size_bytes)
    }

    /// Re-probe each selected disk; fall back to the size seen at listing.
    fn plan_with_fresh_sizes(&self) -> Result<CapacityPlan, PlanningError> {
        let sizes: Vec<Option<u64>> = self
            .config
            .target_disks()
            .iter()
            .map(|path| self.probe.size_bytes(path).or_else(|| self.listed_size(path)))
            .collect();
        storage::plan_capacity(self.config.storage_mode, &sizes)
    }

    /// Sizes the disk step already accepted.
    fn plan_with_listed_sizes(&self) -> Result<CapacityPlan, PlanningError> {
        let sizes: Vec<Option<u64>> = self
            .config
            .target_disks()
            .iter()
            .map(|path| self.listed_size(path))
            .collect();
        storage::plan_capacity(self.config.storage_mode, &sizes)
    }

    fn on_ssh_choice(&mut self, index: usize) -> Result<WizardState, InstallerError> {
        match index {
            0 => {
                self.config.enable_ssh = true;
                Ok(WizardState::GithubUser)
            }
            1 => {
                self.config.enable_ssh = false;
                self.config.github_user = None;
                self.config.ssh_keys = None;
                Ok(WizardState::Summary)
            }
            _ => Err(ValidationError::OutOfRange {
                index,
                len: SSH_OPTIONS.len(),
            }
            .into()),
        }
    }

    fn on_github_user(&mut self, raw: &str) -> Result<WizardState, InstallerError> {
        let handle = raw.trim();
        if handle.is_empty() {
            return Err(ValidationError::GithubUserEmpty.into());
        }
        let keys = self
            .keys
            .fetch(handle)
            .map_err(|e| InstallerError::collaborator(WizardState::GithubUser.title(), &e))?;
        self.accept_keys(handle, keys)
    }

    fn on_keys_fetched(
        &mut self,
        raw: &str,
        keys: Result<Vec<String>, String>,
    ) -> Result<WizardState, InstallerError> {
        let handle = raw.trim();
        if handle.is_empty() {
            return Err(ValidationError::GithubUserEmpty.into());
        }
        let keys = keys.map_err(|message| InstallerError::Collaborator {
            step: WizardState::GithubUser.title().to_string(),
            message,
        })?;
        self.accept_keys(handle, keys)
    }

    fn accept_keys(&mut self, handle: &str, keys: Vec<String>) -> Result<WizardState, InstallerError> {
        if keys.is_empty() {
            return Err(ValidationError::NoSshKeys(handle.to_string()).into());
        }
        self.config.github_user = Some(handle.to_string());
        self.config.ssh_keys = Some(keys);
        Ok(WizardState::Summary)
    }

    fn on_confirm(&mut self, value: &str) -> Transition {
        if value != CONFIRMATION_PHRASE {
            self.error = Some(ValidationError::ConfirmationPhrase.into());
            return Transition::Stayed;
        }
        match self.config.freeze() {
            Ok(frozen) => {
                self.error = None;
                self.state = WizardState::Installing;
                tracing::info!("Installation confirmed for {}", frozen.hostname);
                Transition::Ready(frozen)
            }
            Err(e) => {
                self.error = Some(e.into());
                Transition::Stayed
            }
        }
    }
}

/// Eight lowercase hex digits from the low 32 bits of `nanos`.
pub fn host_id_from_nanos(nanos: u128) -> String {
    format!("{:08x}", (nanos & 0xFFFF_FFFF) as u32)
}

/// Host identifier derived from the wall clock.
pub fn generate_host_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    host_id_from_nanos(nanos)
}
