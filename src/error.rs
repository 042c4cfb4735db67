//! Error handling module for the installer
//!
//! Provides the error taxonomy shared by the wizard, the storage planner and
//! the install pipeline. Validation and planning errors stay inside the
//! wizard; collaborator and stage errors carry the step or stage they came from.

use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::types::StorageMode;

/// Main error type for the installer
#[derive(Error, Debug)]
pub enum InstallerError {
    /// User-correctable input errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Disk layout cannot be satisfied
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// An external collaborator failed while serving a wizard step
    #[error("{step}: {message}")]
    Collaborator { step: String, message: String },

    /// A pipeline stage failed (terminal for the run)
    #[error(transparent)]
    Stage(#[from] PipelineError),

    /// Startup privilege check failed
    #[error("This installer must be run as root (use: sudo tuinix-installer)")]
    NotRoot,

    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// Wrap a collaborator failure with the wizard step that triggered it.
    pub fn collaborator(step: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Collaborator {
            step: step.into(),
            message: format!("{:#}", err),
        }
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }
}

/// Rejected wizard input. The message is shown inline next to the field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid username: use lowercase letters, numbers, underscores, hyphens")]
    Username,

    #[error("full name is required")]
    FullName,

    #[error("please enter a valid email address")]
    Email,

    #[error("password must be at least 8 characters")]
    PasswordTooShort,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("invalid hostname: use letters, numbers, and hyphens only")]
    Hostname,

    #[error("passphrase must be at least 8 characters")]
    PassphraseTooShort,

    #[error("passphrases do not match")]
    PassphraseMismatch,

    #[error("GitHub username is required for SSH key setup")]
    GithubUserEmpty,

    #[error("no public SSH keys found for GitHub user {0:?}")]
    NoSshKeys(String),

    #[error("select at least {required} disks for {}", .mode.label())]
    TooFewDisks { mode: StorageMode, required: usize },

    #[error("type DESTROY to confirm, or press q to cancel")]
    ConfirmationPhrase,

    #[error("selection {index} is out of range (only {len} entries)")]
    OutOfRange { index: usize, len: usize },

    /// Raised by `Config::freeze` when a required field was never populated
    #[error("configuration incomplete: {0} is missing")]
    Missing(&'static str),
}

/// Storage layout cannot be produced for the chosen mode and devices.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("no target disk selected")]
    NoDevices,

    #[error("{} requires at least {required} disks, but only {found} found", .mode.label())]
    NotEnoughDevices {
        mode: StorageMode,
        required: usize,
        found: usize,
    },

    #[error("disk too small: layout needs at least {required}G, only {available}G usable")]
    DeviceTooSmall { required: u64, available: u64 },
}
