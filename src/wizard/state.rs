//! Wizard positions
//!
//! ```text
//! NetworkCheck -> Username -> FullName -> Email -> Password -> PasswordConfirm
//!   -> Hostname -> StorageMode -> DiskSingle | DiskMulti
//!   -> [Passphrase -> PassphraseConfirm]      (encrypted modes)
//!   -> Locale -> Keymap -> SshChoice -> [GithubUser]   (SSH enabled)
//!   -> Summary -> Confirm -> Installing -> Complete | Error
//! ```
//!
//! The branches are decided by `Wizard`; this enum only names the positions.

/// Position in the input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WizardState {
    /// Waiting for the connectivity probe.
    #[default]
    NetworkCheck,
    Username,
    FullName,
    Email,
    /// **SECURITY**: Masked input, held pending until confirmed.
    Password,
    PasswordConfirm,
    Hostname,
    StorageMode,
    /// Pick one disk (single-disk modes).
    DiskSingle,
    /// Toggle several disks (multi-disk modes).
    DiskMulti,
    Passphrase,
    PassphraseConfirm,
    Locale,
    Keymap,
    SshChoice,
    GithubUser,
    Summary,
    /// Typed `DESTROY` gesture.
    Confirm,
    /// Pipeline running - no user interaction.
    Installing,
    Complete,
    Error,
}

impl WizardState {
    /// Number of numbered wizard steps.
    pub const TOTAL_STEPS: usize = 16;

    /// Get the display title for this state.
    pub fn title(&self) -> &'static str {
        match self {
            Self::NetworkCheck => "Network Check",
            Self::Username => "Username",
            Self::FullName => "Full Name",
            Self::Email => "Email Address",
            Self::Password => "Account Password",
            Self::PasswordConfirm => "Confirm Password",
            Self::Hostname => "Hostname",
            Self::StorageMode => "Storage Mode",
            Self::DiskSingle => "Target Disk",
            Self::DiskMulti => "Target Disks",
            Self::Passphrase => "ZFS Encryption Passphrase",
            Self::PassphraseConfirm => "Confirm Passphrase",
            Self::Locale => "Locale",
            Self::Keymap => "Keyboard Layout",
            Self::SshChoice => "SSH Access",
            Self::GithubUser => "GitHub Username",
            Self::Summary => "Summary",
            Self::Confirm => "Confirm Installation",
            Self::Installing => "Installing tuinix",
            Self::Complete => "Installation Complete",
            Self::Error => "Installation Failed",
        }
    }

    /// 1-based step shown as "Step N of 16"; `None` outside the numbered steps.
    pub fn step_number(&self) -> Option<usize> {
        let n = match self {
            Self::Username => 1,
            Self::FullName => 2,
            Self::Email => 3,
            Self::Password => 4,
            Self::PasswordConfirm => 5,
            Self::Hostname => 6,
            Self::StorageMode => 7,
            Self::DiskSingle | Self::DiskMulti => 8,
            Self::Passphrase => 9,
            Self::PassphraseConfirm => 10,
            Self::Locale => 11,
            Self::Keymap => 12,
            Self::SshChoice => 13,
            Self::GithubUser => 14,
            Self::Summary => 15,
            Self::Confirm => 16,
            Self::NetworkCheck | Self::Installing | Self::Complete | Self::Error => return None,
        };
        Some(n)
    }

    /// Complete or Error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// States whose input is free text (so `q` must reach the field).
    pub fn takes_text(&self) -> bool {
        matches!(
            self,
            Self::Username
                | Self::FullName
                | Self::Email
                | Self::Password
                | Self::PasswordConfirm
                | Self::Hostname
                | Self::Passphrase
                | Self::PassphraseConfirm
                | Self::GithubUser
                | Self::Confirm
        )
    }

    /// Text states whose echo must be masked.
    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            Self::Password | Self::PasswordConfirm | Self::Passphrase | Self::PassphraseConfirm
        )
    }

    /// States that present a list to choose from.
    pub fn takes_choice(&self) -> bool {
        matches!(
            self,
            Self::StorageMode
                | Self::DiskSingle
                | Self::DiskMulti
                | Self::Locale
                | Self::Keymap
                | Self::SshChoice
        )
    }

    /// Placeholder text for the input field.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Username => "e.g., john, alice",
            Self::FullName => "e.g., John Smith",
            Self::Email => "e.g., john@example.com",
            Self::Password => "Enter account password",
            Self::PasswordConfirm => "Re-enter password to confirm",
            Self::Hostname => "e.g., laptop, desktop, server",
            Self::Passphrase => "Enter ZFS encryption passphrase",
            Self::PassphraseConfirm => "Re-enter passphrase to confirm",
            Self::GithubUser => "e.g., octocat",
            Self::Confirm => "Type DESTROY to confirm",
            _ => "",
        }
    }
}
