//! Tests for the install pipeline
//!
//! These tests verify:
//! - Stage selection per storage mode
//! - Event ordering and 1-based indices
//! - Fail-fast behavior: nothing after a failed stage runs
//! - A dry-run provisioner driven end to end through the pipeline

use std::fs;
use std::path::Path;
use tuinix_installer::config::{Config, FrozenConfig, InstallerSettings};
use tuinix_installer::engine::storage::plan_capacity;
use tuinix_installer::pipeline::{
    InstallPipeline, InstallStage, PipelineEvent, StageExecutor,
};
use tuinix_installer::provision::CommandProvisioner;
use tuinix_installer::provision::credentials::CredentialHasher;
use tuinix_installer::types::StorageMode;

const GIB: u64 = 1024 * 1024 * 1024;

// =============================================================================
// Fixtures
// =============================================================================

fn frozen(mode: StorageMode) -> FrozenConfig {
    let disks: Vec<String> = (0..mode.minimum_device_count())
        .map(|i| format!("/dev/vd{}", char::from(b'a' + i as u8)))
        .collect();
    let sizes: Vec<Option<u64>> = disks.iter().map(|_| Some(250 * GIB)).collect();

    let mut cfg = Config::default();
    cfg.username = "alice".into();
    cfg.full_name = "Alice Example".into();
    cfg.email = "alice@example.com".into();
    cfg.password = "hunter22".into();
    cfg.hostname = "workstation".into();
    cfg.storage_mode = mode;
    cfg.disk = disks[0].clone();
    if mode.requires_multiple_devices() {
        cfg.disks = disks;
    }
    cfg.host_id = "1a2b3c4d".into();
    cfg.passphrase = mode.requires_encryption().then(|| "correct horse".to_string());
    cfg.locale = "en_US.UTF-8".into();
    cfg.keymap = "us".into();
    cfg.console_keymap = "us".into();
    cfg.capacity = plan_capacity(mode, &sizes).ok();
    cfg.freeze().expect("fixture config should freeze")
}

/// Records every stage it is asked to run and fails on one of them.
#[derive(Default)]
struct ScriptedExecutor {
    fail_at: Option<InstallStage>,
    executed: Vec<InstallStage>,
}

impl StageExecutor for ScriptedExecutor {
    fn execute(&mut self, stage: InstallStage, _config: &FrozenConfig) -> anyhow::Result<()> {
        self.executed.push(stage);
        if self.fail_at == Some(stage) {
            anyhow::bail!("exit status 1");
        }
        Ok(())
    }
}

fn run_collecting(
    mode: StorageMode,
    exec: &mut ScriptedExecutor,
) -> (Result<usize, tuinix_installer::PipelineError>, Vec<PipelineEvent>) {
    let mut events = Vec::new();
    let result = InstallPipeline::new(frozen(mode)).run(exec, |e| events.push(e));
    (result, events)
}

// =============================================================================
// Stage selection
// =============================================================================

#[test]
fn test_plain_mode_runs_seven_stages() {
    let pipeline = InstallPipeline::new(frozen(StorageMode::SinglePlain));
    assert_eq!(pipeline.stages().len(), 7);
    assert!(!pipeline.stages().contains(&InstallStage::ConfigureBootPool));
    assert!(!pipeline.stages().contains(&InstallStage::FinalizePool));
}

#[test]
fn test_pool_modes_run_all_nine_stages() {
    for mode in [
        StorageMode::SingleEncrypted,
        StorageMode::MultiStripe,
        StorageMode::MultiParity1,
        StorageMode::MultiParity2,
    ] {
        let pipeline = InstallPipeline::new(frozen(mode));
        assert_eq!(pipeline.stages(), &InstallStage::ALL, "{mode}");
    }
}

#[test]
fn test_log_copy_precedes_finalize() {
    let stages = InstallStage::for_mode(StorageMode::SingleEncrypted);
    let log = stages.iter().position(|s| *s == InstallStage::CopyInstallLog);
    let fin = stages.iter().position(|s| *s == InstallStage::FinalizePool);
    assert!(log < fin);
    assert_eq!(stages.last(), Some(&InstallStage::FinalizePool));
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_success_events_are_ordered() {
    let mut exec = ScriptedExecutor::default();
    let (result, events) = run_collecting(StorageMode::SinglePlain, &mut exec);
    assert_eq!(result.expect("pipeline should succeed"), 7);
    assert_eq!(exec.executed, InstallStage::for_mode(StorageMode::SinglePlain));

    // Started/Completed pairs, then Finished
    assert_eq!(events.len(), 7 * 2 + 1);
    let mut expected_index = 1;
    for pair in events[..14].chunks(2) {
        match pair {
            [
                PipelineEvent::StageStarted { index: a, total: 7, stage: s1 },
                PipelineEvent::StageCompleted { index: b, total: 7, stage: s2 },
            ] => {
                assert_eq!(*a, expected_index);
                assert_eq!(*b, expected_index);
                assert_eq!(s1, s2);
            }
            other => panic!("unexpected events {:?}", other),
        }
        expected_index += 1;
    }
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::Finished { completed: 7, total: 7 })
    );
}

#[test]
fn test_failure_at_fourth_stage_stops_the_run() {
    let mut exec = ScriptedExecutor {
        fail_at: Some(InstallStage::InstallBaseSystem),
        ..Default::default()
    };
    let (result, events) = run_collecting(StorageMode::SingleEncrypted, &mut exec);

    let err = result.expect_err("pipeline should fail");
    assert_eq!(err.index, 4);
    assert_eq!(err.stage, InstallStage::InstallBaseSystem);
    assert!(err.is_irrecoverable());
    assert_eq!(err.to_string(), "Installing NixOS: exit status 1");

    // Stages 5-9 never ran
    assert_eq!(exec.executed, InstallStage::ALL[..4].to_vec());

    let completed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageCompleted { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3]);

    assert_eq!(
        events.last(),
        Some(&PipelineEvent::StageFailed {
            index: 4,
            stage: InstallStage::InstallBaseSystem,
            message: "exit status 1".to_string(),
        })
    );
    assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Finished { .. })));
}

#[test]
fn test_failure_before_format_is_recoverable() {
    let mut exec = ScriptedExecutor {
        fail_at: Some(InstallStage::GenerateHostConfig),
        ..Default::default()
    };
    let (result, events) = run_collecting(StorageMode::MultiStripe, &mut exec);
    let err = result.expect_err("pipeline should fail");
    assert_eq!(err.index, 1);
    assert!(!err.is_irrecoverable());
    assert_eq!(exec.executed.len(), 1);
    assert_eq!(events.len(), 2);
}

#[test]
fn test_plain_mode_indices_skip_pool_stages() {
    // In plain mode the config-tree copy is the 5th included stage
    let mut exec = ScriptedExecutor {
        fail_at: Some(InstallStage::CopyConfigTree),
        ..Default::default()
    };
    let (result, _) = run_collecting(StorageMode::SinglePlain, &mut exec);
    let err = result.expect_err("pipeline should fail");
    assert_eq!(err.index, 5);
    assert_eq!(err.stage.ordinal(), 6);
}

// =============================================================================
// Dry-run provisioner
// =============================================================================

struct FixedHasher;

impl CredentialHasher for FixedHasher {
    fn hash(&self, _password: &str) -> anyhow::Result<String> {
        Ok("$6$saltsalt$fixedhash".to_string())
    }
}

fn dry_run_settings(root: &Path, work: &Path, target: &Path) -> InstallerSettings {
    InstallerSettings {
        project_root: root.to_path_buf(),
        work_dir: work.join("install"),
        target: target.to_path_buf(),
        log_path: work.join("install.log"),
        dry_run: true,
        ..InstallerSettings::default()
    }
}

#[test]
fn test_dry_run_provisioner_completes_every_mode() {
    for mode in StorageMode::all() {
        let root = tempfile::tempdir().expect("tempdir");
        let work = tempfile::tempdir().expect("tempdir");
        let target = tempfile::tempdir().expect("tempdir");
        fs::write(root.path().join("flake.nix"), "{ outputs = _: {}; }").expect("write flake");

        let settings = dry_run_settings(root.path(), work.path(), target.path());
        let work_dir = settings.work_dir.clone();
        let mut prov = CommandProvisioner::new(settings).with_hasher(Box::new(FixedHasher));

        let pipeline = InstallPipeline::new(frozen(mode));
        let expected = pipeline.stages().len();
        let completed = pipeline
            .run(&mut prov, |_| {})
            .unwrap_or_else(|e| panic!("{mode}: {e}"));
        assert_eq!(completed, expected);

        // Commands were only logged, but the host files were generated
        assert!(
            work_dir.join("hosts/workstation/hardware.nix").is_file(),
            "{mode}"
        );
        let disks_nix =
            fs::read_to_string(work_dir.join("hosts/workstation/disks.nix")).expect("disks.nix");
        assert!(disks_nix.contains("/dev/vda"), "{mode}");
        let user_nix = fs::read_to_string(work_dir.join("users/alice.nix")).expect("user nix");
        assert!(user_nix.contains("$6$saltsalt$fixedhash"));
        assert!(!user_nix.contains("hunter22"));
    }
}

#[test]
fn test_provisioner_stops_pipeline_on_missing_project_root() {
    let work = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let settings = dry_run_settings(Path::new("/nonexistent/tuinix"), work.path(), target.path());
    let mut prov = CommandProvisioner::new(settings).with_hasher(Box::new(FixedHasher));

    let mut events = Vec::new();
    let err = InstallPipeline::new(frozen(StorageMode::SingleEncrypted))
        .run(&mut prov, |e| events.push(e))
        .expect_err("missing project root should fail");
    assert_eq!(err.stage, InstallStage::GenerateHostConfig);
    assert!(!err.is_irrecoverable());
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::StageFailed { index: 1, .. })
    ));
}
