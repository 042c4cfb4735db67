//! Tests for the configuration wizard
//!
//! These tests verify:
//! - Branching by storage mode (disk step, passphrase step)
//! - Minimum disk counts at mode choice and at disk confirmation
//! - Secret confirmation never stores a mismatched value
//! - SSH key retrieval outcomes, inline and delivered from a worker
//! - Capacity planning when a re-read disk size disagrees with the listing
//! - Abort handling before and during the install
//! - Recording the pipeline outcome

use tuinix_installer::config::Config;
use tuinix_installer::error::{InstallerError, PlanningError, ValidationError};
use tuinix_installer::hardware::{DiskProbe, NetworkState};
use tuinix_installer::keys::KeyRetriever;
use tuinix_installer::pipeline::{InstallStage, PipelineError};
use tuinix_installer::types::{Disk, StorageMode};
use tuinix_installer::wizard::{Transition, Wizard, WizardInput, WizardState};

const GIB: u64 = 1024 * 1024 * 1024;

// =============================================================================
// Test doubles
// =============================================================================

struct FixedDisks {
    disks: Vec<Disk>,
}

impl DiskProbe for FixedDisks {
    fn enumerate(&self) -> Vec<Disk> {
        self.disks.clone()
    }

    fn size_bytes(&self, path: &str) -> Option<u64> {
        self.disks
            .iter()
            .find(|d| d.path == path)
            .and_then(|d| d.size_bytes)
    }
}

/// Lists disks normally but reports a different size when re-read.
struct ShrinkingDisks {
    disks: Vec<Disk>,
    reread_gib: u64,
}

impl DiskProbe for ShrinkingDisks {
    fn enumerate(&self) -> Vec<Disk> {
        self.disks.clone()
    }

    fn size_bytes(&self, _path: &str) -> Option<u64> {
        Some(self.reread_gib * GIB)
    }
}

enum KeysReply {
    Keys(Vec<String>),
    Fail,
}

struct ScriptedKeys(KeysReply);

impl KeyRetriever for ScriptedKeys {
    fn fetch(&self, handle: &str) -> anyhow::Result<Vec<String>> {
        match &self.0 {
            KeysReply::Keys(keys) => Ok(keys.clone()),
            KeysReply::Fail => Err(anyhow::anyhow!("connection refused")
                .context(format!("fetch keys for {}", handle))),
        }
    }
}

fn disk(path: &str, gib: u64) -> Disk {
    Disk {
        path: path.to_string(),
        size: format!("{}.0G", gib),
        model: "QEMU HARDDISK".to_string(),
        size_bytes: Some(gib * GIB),
    }
}

fn disks(n: usize, gib: u64) -> Vec<Disk> {
    (0..n)
        .map(|i| disk(&format!("/dev/vd{}", char::from(b'a' + i as u8)), gib))
        .collect()
}

fn wizard_with(disks: Vec<Disk>, keys: KeysReply) -> Wizard {
    let probe = FixedDisks { disks };
    Wizard::new(Box::new(probe), Box::new(ScriptedKeys(keys)))
}

fn text(w: &mut Wizard, s: &str) -> Transition {
    w.handle(WizardInput::Text(s.to_string()))
}

/// Drive a fresh wizard to the storage-mode step.
fn to_storage(w: &mut Wizard) {
    assert!(matches!(
        w.handle(WizardInput::Network(NetworkState::Online)),
        Transition::Moved(WizardState::Username)
    ));
    for value in ["alice", "Alice Example", "alice@example.com", "hunter22", "hunter22", "laptop"] {
        assert!(matches!(text(w, value), Transition::Moved(_)), "rejected {value}");
    }
    assert_eq!(w.state(), WizardState::StorageMode);
}

fn mode_index(mode: StorageMode) -> usize {
    StorageMode::all()
        .iter()
        .position(|m| *m == mode)
        .expect("mode is offered")
}

fn choose_mode(w: &mut Wizard, mode: StorageMode) -> Transition {
    w.handle(WizardInput::Choice(mode_index(mode)))
}

/// From the locale step through keymap, SSH "no" and summary to Confirm.
fn finish_without_ssh(w: &mut Wizard) {
    assert!(matches!(w.handle(WizardInput::Choice(0)), Transition::Moved(WizardState::Keymap)));
    assert!(matches!(w.handle(WizardInput::Choice(2)), Transition::Moved(WizardState::SshChoice)));
    assert!(matches!(w.handle(WizardInput::Choice(1)), Transition::Moved(WizardState::Summary)));
    assert!(matches!(w.handle(WizardInput::Continue), Transition::Moved(WizardState::Confirm)));
}

fn confirm(w: &mut Wizard) -> tuinix_installer::FrozenConfig {
    match text(w, "DESTROY") {
        Transition::Ready(frozen) => frozen,
        other => panic!("expected Ready, got {:?} (error: {:?})", other, w.error()),
    }
}

// =============================================================================
// Network step
// =============================================================================

#[test]
fn test_offline_blocks_and_retry_recovers() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    assert!(matches!(
        w.handle(WizardInput::Network(NetworkState::Offline)),
        Transition::Stayed
    ));
    assert!(matches!(w.error(), Some(InstallerError::Collaborator { .. })));
    assert!(matches!(w.handle(WizardInput::Continue), Transition::Ignored));

    assert!(matches!(
        w.handle(WizardInput::Network(NetworkState::Online)),
        Transition::Moved(WizardState::Username)
    ));
    assert!(w.error().is_none());
}

// =============================================================================
// Field validation
// =============================================================================

#[test]
fn test_rejection_keeps_state_and_earlier_fields() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    w.handle(WizardInput::Network(NetworkState::Online));
    text(&mut w, "alice");
    text(&mut w, "Alice Example");

    assert!(matches!(text(&mut w, "not-an-email"), Transition::Stayed));
    assert_eq!(w.state(), WizardState::Email);
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::Email))
    ));
    assert_eq!(w.config().username, "alice");
    assert!(w.config().email.is_empty());

    // Next valid input clears the error
    assert!(matches!(text(&mut w, "alice@example.com"), Transition::Moved(WizardState::Password)));
    assert!(w.error().is_none());
}

#[test]
fn test_values_are_trimmed() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    w.handle(WizardInput::Network(NetworkState::Online));
    text(&mut w, "  alice  ");
    assert_eq!(w.config().username, "alice");
}

#[test]
fn test_short_password_rejected() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    w.handle(WizardInput::Network(NetworkState::Online));
    for value in ["alice", "Alice", "alice@example.com"] {
        text(&mut w, value);
    }
    assert!(matches!(text(&mut w, "1234567"), Transition::Stayed));
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::PasswordTooShort))
    ));
    assert!(matches!(text(&mut w, "12345678"), Transition::Moved(WizardState::PasswordConfirm)));
}

#[test]
fn test_password_mismatch_reprompts_confirmation() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    w.handle(WizardInput::Network(NetworkState::Online));
    for value in ["alice", "Alice", "alice@example.com", "hunter22"] {
        text(&mut w, value);
    }
    assert_eq!(w.state(), WizardState::PasswordConfirm);

    assert!(matches!(text(&mut w, "hunter23"), Transition::Stayed));
    assert_eq!(w.state(), WizardState::PasswordConfirm);
    assert!(w.config().password.is_empty());
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::PasswordMismatch))
    ));

    // Byte-exact: surrounding whitespace is not forgiven
    assert!(matches!(text(&mut w, " hunter22"), Transition::Stayed));
    assert!(w.config().password.is_empty());

    assert!(matches!(text(&mut w, "hunter22"), Transition::Moved(WizardState::Hostname)));
    assert_eq!(w.config().password, "hunter22");
}

// =============================================================================
// Storage branching
// =============================================================================

#[test]
fn test_disks_enumerated_when_storage_step_reached() {
    let mut w = wizard_with(disks(2, 100), KeysReply::Keys(vec![]));
    assert!(w.disks().is_empty());
    to_storage(&mut w);
    assert_eq!(w.disks().len(), 2);
    assert_eq!(w.options().len(), StorageMode::all().len());
}

#[test]
fn test_single_encrypted_asks_for_passphrase() {
    let mut w = wizard_with(disks(2, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    assert!(matches!(
        choose_mode(&mut w, StorageMode::SingleEncrypted),
        Transition::Moved(WizardState::DiskSingle)
    ));
    assert!(matches!(
        w.handle(WizardInput::Choice(1)),
        Transition::Moved(WizardState::Passphrase)
    ));
    assert_eq!(w.config().disk, "/dev/vdb");
    assert_eq!(w.config().host_id.len(), 8);

    text(&mut w, "correct horse");
    assert!(matches!(text(&mut w, "correct hors"), Transition::Stayed));
    assert!(w.config().passphrase.is_none());
    assert!(matches!(text(&mut w, "correct horse"), Transition::Moved(WizardState::Locale)));
    assert_eq!(w.config().passphrase.as_deref(), Some("correct horse"));
}

#[test]
fn test_single_plain_skips_passphrase() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SinglePlain);
    assert!(matches!(
        w.handle(WizardInput::Choice(0)),
        Transition::Moved(WizardState::Locale)
    ));
    assert!(w.config().passphrase.is_none());
}

#[test]
fn test_out_of_range_choice_rejected() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    assert!(matches!(w.handle(WizardInput::Choice(42)), Transition::Stayed));
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::OutOfRange { index: 42, .. }))
    ));
}

#[test]
fn test_multi_mode_needs_enough_disks_present() {
    let mut w = wizard_with(disks(3, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    assert!(matches!(choose_mode(&mut w, StorageMode::MultiParity2), Transition::Stayed));
    assert_eq!(w.state(), WizardState::StorageMode);
    assert!(matches!(
        w.error(),
        Some(InstallerError::Planning(PlanningError::NotEnoughDevices {
            required: 4,
            found: 3,
            ..
        }))
    ));
    assert!(matches!(
        choose_mode(&mut w, StorageMode::MultiParity1),
        Transition::Moved(WizardState::DiskMulti)
    ));
}

#[test]
fn test_minimum_count_checked_at_confirmation_for_every_mode() {
    for mode in [
        StorageMode::MultiStripe,
        StorageMode::MultiParity1,
        StorageMode::MultiParity2,
    ] {
        let k = mode.minimum_device_count();
        let n = k + 1;
        let mut w = wizard_with(disks(n, 100), KeysReply::Keys(vec![]));
        to_storage(&mut w);
        choose_mode(&mut w, mode);

        for i in 0..k - 1 {
            w.handle(WizardInput::ToggleDisk(i));
        }
        assert!(matches!(w.handle(WizardInput::Continue), Transition::Stayed));
        assert!(
            matches!(
                w.error(),
                Some(InstallerError::Validation(ValidationError::TooFewDisks { required, .. })) if *required == k
            ),
            "{mode}: expected TooFewDisks"
        );
        assert!(w.config().disks.is_empty());

        w.handle(WizardInput::ToggleDisk(k - 1));
        assert!(
            matches!(w.handle(WizardInput::Continue), Transition::Moved(WizardState::Passphrase)),
            "{mode}: exactly {k} disks should be accepted"
        );
        assert_eq!(w.config().disks.len(), k);
    }
}

#[test]
fn test_boot_disk_is_first_in_list_order_not_toggle_order() {
    let mut w = wizard_with(disks(3, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::MultiStripe);

    w.handle(WizardInput::ToggleDisk(2));
    w.handle(WizardInput::ToggleDisk(1));
    // Toggle twice: deselected again
    w.handle(WizardInput::ToggleDisk(0));
    w.handle(WizardInput::ToggleDisk(0));
    assert_eq!(w.selected(), &[false, true, true]);

    w.handle(WizardInput::Continue);
    assert_eq!(w.config().disks, vec!["/dev/vdb", "/dev/vdc"]);
    assert_eq!(w.config().disk, "/dev/vdb");
}

#[test]
fn test_too_small_disk_is_a_planning_error() {
    let mut w = wizard_with(vec![disk("/dev/vda", 20)], KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SingleEncrypted);
    assert!(matches!(w.handle(WizardInput::Choice(0)), Transition::Stayed));
    assert!(matches!(
        w.error(),
        Some(InstallerError::Planning(PlanningError::DeviceTooSmall { .. }))
    ));
    assert!(w.config().disk.is_empty());
}

#[test]
fn test_keymap_step_records_capacity_plan() {
    let mut w = wizard_with(disks(3, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::MultiParity1);
    for i in 0..3 {
        w.handle(WizardInput::ToggleDisk(i));
    }
    w.handle(WizardInput::Continue);
    text(&mut w, "passphrase");
    text(&mut w, "passphrase");
    w.handle(WizardInput::Choice(0));
    assert!(w.config().capacity.is_none());

    w.handle(WizardInput::Choice(2));
    let plan = w.config().capacity.expect("capacity planned");
    assert_eq!(plan.pool_gib, 200);
    assert_eq!(plan.allocated_gib(), plan.pool_gib);
    assert_eq!(w.config().keymap, "pt");
    assert_eq!(w.config().console_keymap, "pt-latin1");
}

#[test]
fn test_shrunk_reread_size_falls_back_to_listing() {
    let shrinking = ShrinkingDisks {
        disks: vec![disk("/dev/vda", 100)],
        reread_gib: 10,
    };
    let mut w = Wizard::new(Box::new(shrinking), Box::new(ScriptedKeys(KeysReply::Keys(vec![]))));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SingleEncrypted);
    w.handle(WizardInput::Choice(0));
    text(&mut w, "passphrase");
    text(&mut w, "passphrase");
    w.handle(WizardInput::Choice(0));
    assert_eq!(w.state(), WizardState::Keymap);

    assert!(matches!(
        w.handle(WizardInput::Choice(0)),
        Transition::Moved(WizardState::SshChoice)
    ));
    assert!(w.error().is_none());
    let plan = w.config().capacity.expect("capacity planned");
    assert_eq!(plan.pool_gib, 100);
    assert_eq!(plan.general_gib, 74);
}

#[test]
fn test_grown_reread_size_is_used() {
    let shrinking = ShrinkingDisks {
        disks: vec![disk("/dev/vda", 100)],
        reread_gib: 200,
    };
    let mut w = Wizard::new(Box::new(shrinking), Box::new(ScriptedKeys(KeysReply::Keys(vec![]))));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SinglePlain);
    w.handle(WizardInput::Choice(0));
    w.handle(WizardInput::Choice(0));
    w.handle(WizardInput::Choice(0));
    assert_eq!(w.state(), WizardState::SshChoice);
    assert_eq!(w.config().capacity.map(|p| p.pool_gib), Some(200));
}

// =============================================================================
// SSH
// =============================================================================

fn to_ssh_choice(w: &mut Wizard) {
    to_storage(w);
    choose_mode(w, StorageMode::SinglePlain);
    w.handle(WizardInput::Choice(0));
    w.handle(WizardInput::Choice(0));
    w.handle(WizardInput::Choice(0));
    assert_eq!(w.state(), WizardState::SshChoice);
}

#[test]
fn test_zero_keys_rejects_handle() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_ssh_choice(&mut w);
    assert!(matches!(
        w.handle(WizardInput::Choice(0)),
        Transition::Moved(WizardState::GithubUser)
    ));

    assert!(matches!(text(&mut w, "nobody"), Transition::Stayed));
    assert_eq!(w.state(), WizardState::GithubUser);
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::NoSshKeys(h))) if h == "nobody"
    ));
    assert!(w.config().ssh_keys.is_none());
    assert!(w.config().github_user.is_none());
}

#[test]
fn test_empty_handle_rejected_before_fetch() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Fail);
    to_ssh_choice(&mut w);
    w.handle(WizardInput::Choice(0));
    assert!(matches!(text(&mut w, "   "), Transition::Stayed));
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::GithubUserEmpty))
    ));
}

#[test]
fn test_retrieval_failure_names_the_step() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Fail);
    to_ssh_choice(&mut w);
    w.handle(WizardInput::Choice(0));
    assert!(matches!(text(&mut w, "octocat"), Transition::Stayed));
    let msg = w.error().expect("error").to_string();
    assert!(msg.contains("connection refused"), "{msg}");
    assert!(matches!(w.error(), Some(InstallerError::Collaborator { .. })));
}

#[test]
fn test_keys_are_stored_and_frozen() {
    let keys = vec!["ssh-ed25519 AAAA one".to_string(), "ssh-rsa BBBB two".to_string()];
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(keys.clone()));
    to_ssh_choice(&mut w);
    w.handle(WizardInput::Choice(0));
    assert!(matches!(text(&mut w, "octocat"), Transition::Moved(WizardState::Summary)));
    assert_eq!(w.config().ssh_keys.as_ref(), Some(&keys));

    w.handle(WizardInput::Continue);
    let frozen = confirm(&mut w);
    assert!(frozen.enable_ssh);
    assert_eq!(frozen.github_user.as_deref(), Some("octocat"));
}

#[test]
fn test_keys_delivered_from_worker_are_accepted() {
    // Inline retrieval would fail; the delivered result is used instead
    let mut w = wizard_with(disks(1, 100), KeysReply::Fail);
    to_ssh_choice(&mut w);
    w.handle(WizardInput::Choice(0));

    let delivered = WizardInput::KeysFetched {
        handle: " octocat ".to_string(),
        keys: Ok(vec!["ssh-ed25519 AAAA one".to_string()]),
    };
    assert!(matches!(w.handle(delivered), Transition::Moved(WizardState::Summary)));
    assert_eq!(w.config().github_user.as_deref(), Some("octocat"));
    assert_eq!(w.config().ssh_keys.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_delivered_failures_keep_the_step() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_ssh_choice(&mut w);
    w.handle(WizardInput::Choice(0));

    let failed = WizardInput::KeysFetched {
        handle: "octocat".to_string(),
        keys: Err("GitHub user \"octocat\" not found".to_string()),
    };
    assert!(matches!(w.handle(failed), Transition::Stayed));
    assert!(matches!(
        w.error(),
        Some(InstallerError::Collaborator { step, message })
            if step == "GitHub Username" && message.contains("not found")
    ));

    let empty = WizardInput::KeysFetched {
        handle: "nobody".to_string(),
        keys: Ok(vec![]),
    };
    assert!(matches!(w.handle(empty), Transition::Stayed));
    assert!(matches!(
        w.error(),
        Some(InstallerError::Validation(ValidationError::NoSshKeys(h))) if h == "nobody"
    ));
    assert_eq!(w.state(), WizardState::GithubUser);
    assert!(w.config().github_user.is_none());
}

#[test]
fn test_late_key_delivery_is_ignored_elsewhere() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_ssh_choice(&mut w);
    let late = WizardInput::KeysFetched {
        handle: "octocat".to_string(),
        keys: Ok(vec!["ssh-ed25519 AAAA one".to_string()]),
    };
    assert!(matches!(w.handle(late), Transition::Ignored));
    assert!(w.config().ssh_keys.is_none());
}

// =============================================================================
// Confirmation and install lifecycle
// =============================================================================

#[test]
fn test_confirmation_phrase_is_exact() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SinglePlain);
    w.handle(WizardInput::Choice(0));
    finish_without_ssh(&mut w);

    for attempt in ["destroy", "DESTROY ", " DESTROY", "yes"] {
        assert!(matches!(text(&mut w, attempt), Transition::Stayed), "{attempt:?}");
        assert_eq!(w.state(), WizardState::Confirm);
        assert!(matches!(
            w.error(),
            Some(InstallerError::Validation(ValidationError::ConfirmationPhrase))
        ));
    }
    let frozen = confirm(&mut w);
    assert_eq!(w.state(), WizardState::Installing);
    assert_eq!(frozen.storage_mode, StorageMode::SinglePlain);
    assert!(frozen.passphrase.is_none());
    assert_eq!(frozen.capacity().general_gib, 95);
}

#[test]
fn test_abort_before_install_and_ignored_during() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    assert!(matches!(w.handle(WizardInput::Abort), Transition::Aborted));

    to_storage(&mut w);
    assert!(matches!(w.handle(WizardInput::Abort), Transition::Aborted));

    choose_mode(&mut w, StorageMode::SinglePlain);
    w.handle(WizardInput::Choice(0));
    finish_without_ssh(&mut w);
    confirm(&mut w);
    assert!(matches!(w.handle(WizardInput::Abort), Transition::Ignored));
    assert!(matches!(w.handle(WizardInput::Text("x".into())), Transition::Ignored));
    assert_eq!(w.state(), WizardState::Installing);
}

#[test]
fn test_finish_records_failure_and_zeroes_secrets() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SingleEncrypted);
    w.handle(WizardInput::Choice(0));
    text(&mut w, "passphrase");
    text(&mut w, "passphrase");
    finish_without_ssh(&mut w);
    confirm(&mut w);

    let state = w.finish(Err(PipelineError {
        stage: InstallStage::InstallBaseSystem,
        index: 4,
        source: anyhow::anyhow!("exit code 1").context("nixos-install"),
    }));
    assert_eq!(state, WizardState::Error);
    let failure = w.failure().expect("failure recorded");
    assert_eq!(failure.stage, InstallStage::InstallBaseSystem);
    assert_eq!(failure.message, "nixos-install: exit code 1");
    assert!(failure.irrecoverable);
    assert!(w.config().password.is_empty());
    assert!(w.config().passphrase.is_none());
}

#[test]
fn test_finish_success_and_outside_install() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    assert_eq!(w.finish(Ok(())), WizardState::NetworkCheck);

    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SinglePlain);
    w.handle(WizardInput::Choice(0));
    finish_without_ssh(&mut w);
    confirm(&mut w);
    assert_eq!(w.finish(Ok(())), WizardState::Complete);
    assert!(w.failure().is_none());
}

#[test]
fn test_summary_lists_choices() {
    let mut w = wizard_with(disks(1, 100), KeysReply::Keys(vec![]));
    to_storage(&mut w);
    choose_mode(&mut w, StorageMode::SinglePlain);
    w.handle(WizardInput::Choice(0));
    finish_without_ssh(&mut w);

    let rows = w.summary();
    let get = |k: &str| {
        rows.iter()
            .find(|(key, _)| *key == k)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    assert_eq!(get("Hostname"), "laptop");
    assert_eq!(get("Disk"), "/dev/vda");
    assert_eq!(get("SSH"), "disabled");
    assert!(!rows.iter().any(|(_, v)| v.contains("hunter22")));
}

#[test]
fn test_default_config_does_not_freeze() {
    let cfg = Config::default();
    assert!(matches!(cfg.freeze(), Err(ValidationError::Missing(_))));
}
