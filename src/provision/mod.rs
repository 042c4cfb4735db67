//! Provisioning executor
//!
//! Maps each `InstallStage` onto the external tools that perform it. Every
//! tool goes through `CommandRunner`, so dry-run and process-group cleanup
//! apply uniformly. Files under the work dir are written directly; anything
//! under the target mount is touched only through commands.
//!
//! # Stage Actions
//!
//! | Stage                  | Tools |
//! |------------------------|-------|
//! | GenerateHostConfig     | cp, mkpasswd, file writes |
//! | FormatDisks            | zgenhostid, umount, zpool export, disko |
//! | GenerateHardwareConfig | nixos-generate-config, file write |
//! | InstallBaseSystem      | nixos-install |
//! | ConfigureBootPool      | zpool set/get bootfs |
//! | CopyConfigTree         | mkdir, cp, chown |
//! | SetupUserTree          | git clone/config/add/commit, cp, chown, nixos-enter |
//! | CopyInstallLog         | cp, chown (best effort) |
//! | FinalizePool           | umount, zpool export/import |

pub mod artifacts;
pub mod credentials;

use crate::command_runner::{CommandRunner, CommandSpec};
use crate::config::{FrozenConfig, InstallerSettings};
use crate::engine::descriptor;
use crate::pipeline::{InstallStage, StageExecutor};
use anyhow::{Context, Result};
use chrono::Utc;
use credentials::{CredentialHasher, MkpasswdHasher};
use std::fs;
use std::path::{Path, PathBuf};

/// Scratch output of `nixos-generate-config`.
pub const HARDWARE_SCAN_DIR: &str = "/tmp/nixos-config";

/// Production `StageExecutor`.
pub struct CommandProvisioner {
    settings: InstallerSettings,
    runner: CommandRunner,
    hasher: Box<dyn CredentialHasher>,
}

impl CommandProvisioner {
    pub fn new(settings: InstallerSettings) -> Self {
        let runner = CommandRunner::new(settings.dry_run);
        Self {
            settings,
            runner,
            hasher: Box::new(MkpasswdHasher::new(runner)),
        }
    }

    /// Replace the password hasher.
    pub fn with_hasher(mut self, hasher: Box<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    fn target(&self, rel: &str) -> PathBuf {
        self.settings.in_target(rel)
    }

    fn user_home(&self, config: &FrozenConfig) -> PathBuf {
        self.target(&format!("home/{}", config.username))
    }

    // ========================================================================
    // Stage 1: host configuration
    // ========================================================================

    fn generate_host_config(&self, config: &FrozenConfig) -> Result<()> {
        let work = &self.settings.work_dir;
        let root = &self.settings.project_root;

        match fs::remove_dir_all(work) {
            Ok(()) => tracing::info!("Removed old work dir {}", work.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("remove work dir {}", work.display()));
            }
        }
        fs::create_dir_all(work).with_context(|| format!("create work dir {}", work.display()))?;

        if !root.is_dir() {
            anyhow::bail!("project root does not exist: {}", root.display());
        }
        self.runner
            .run_checked(
                &CommandSpec::new("cp")
                    .arg("-rL")
                    .arg(format!("{}/.", root.display()))
                    .arg(format!("{}/", work.display())),
            )
            .with_context(|| format!("copy project from {}", root.display()))?;

        let host_dir = self.settings.host_dir(&config.hostname);
        fs::create_dir_all(&host_dir).context("create host dir")?;
        let user_file = self.settings.user_file(&config.username);
        if let Some(users_dir) = user_file.parent() {
            fs::create_dir_all(users_dir).context("create users dir")?;
        }

        let hashed = self.hasher.hash(&config.password).context("hash password")?;

        write_file(&user_file, &artifacts::render_user_module(config, &hashed, Utc::now()))?;
        write_file(&host_dir.join("default.nix"), &artifacts::render_host_module(config))?;

        let layout = config
            .pool_layout(&self.settings.pool_name)
            .context("plan disk layout")?;
        let disks_nix = descriptor::render_disko(&layout, config.capacity(), &config.hostname);
        write_file(&self.settings.disks_file(&config.hostname), &disks_nix)?;
        Ok(())
    }

    // ========================================================================
    // Stage 2: format (destructive)
    // ========================================================================

    fn format_disks(&self, config: &FrozenConfig) -> Result<()> {
        let mode = config.storage_mode;

        if mode.uses_pool() {
            self.runner.run_best_effort(&CommandSpec::new("rm").args(["-f", "/etc/hostid"]));
            self.runner
                .run_checked(&CommandSpec::new("zgenhostid").arg(&config.host_id))
                .context("zgenhostid")?;
        }

        for disk in config.target_disks() {
            self.unmount_partitions(&disk);
        }
        if mode.uses_pool() {
            self.runner.run_best_effort(&CommandSpec::new("zpool").args(["export", "-a"]));
        }

        let mut disko = CommandSpec::new("disko")
            .args(["--mode", "disko"])
            .path(&self.settings.disks_file(&config.hostname));
        if let Some(passphrase) = &config.passphrase {
            // Entered once, then confirmed
            disko = disko.stdin(format!("{0}\n{0}\n", passphrase));
        }
        self.runner.run_checked(&disko).context("disko failed")?;
        Ok(())
    }

    fn unmount_partitions(&self, disk: &str) {
        let listed = match self
            .runner
            .run(&CommandSpec::new("lsblk").args(["-nr", "-o", "NAME", disk]))
        {
            Ok(out) => out.stdout,
            Err(e) => {
                tracing::warn!("Could not list partitions of {}: {:#}", disk, e);
                return;
            }
        };
        // First line is the disk itself
        for part in listed.lines().skip(1).map(str::trim).filter(|p| !p.is_empty()) {
            self.runner
                .run_best_effort(&CommandSpec::new("umount").arg(format!("/dev/{}", part)));
        }
    }

    // ========================================================================
    // Stage 3-5: hardware, base install, boot pool
    // ========================================================================

    fn generate_hardware_config(&self, config: &FrozenConfig) -> Result<()> {
        if !self.runner.is_dry_run() {
            fs::create_dir_all(HARDWARE_SCAN_DIR).context("create hardware scan dir")?;
        }
        self.runner
            .run_checked(
                &CommandSpec::new("nixos-generate-config")
                    .arg("--root")
                    .path(&self.settings.target)
                    .args(["--dir", HARDWARE_SCAN_DIR]),
            )
            .context("nixos-generate-config")?;

        let path = self.settings.host_dir(&config.hostname).join("hardware.nix");
        write_file(&path, &artifacts::render_hardware_module(config))
    }

    fn install_base_system(&self, config: &FrozenConfig) -> Result<()> {
        let flake = format!("{}#{}", self.settings.work_dir.display(), config.hostname);
        self.runner
            .run_checked(
                &CommandSpec::new("nixos-install")
                    .args(["--flake", flake.as_str(), "--no-root-passwd"])
                    .env("NIX_CONFIG", artifacts::NIX_CONFIG),
            )
            .context("nixos-install")?;
        Ok(())
    }

    fn configure_boot_pool(&self) -> Result<()> {
        let pool = &self.settings.pool_name;
        let bootfs = format!("{}/root", pool);
        self.runner
            .run_checked(
                &CommandSpec::new("zpool")
                    .arg("set")
                    .arg(format!("bootfs={}", bootfs))
                    .arg(pool),
            )
            .context("set bootfs")?;

        let out = self
            .runner
            .run_checked(&CommandSpec::new("zpool").args(["get", "-H", "-o", "value", "bootfs", pool]))
            .context("get bootfs")?;
        if self.runner.is_dry_run() {
            return Ok(());
        }
        let actual = out.stdout.trim();
        if actual != bootfs {
            anyhow::bail!("bootfs not set correctly, got: {}", actual);
        }
        Ok(())
    }

    // ========================================================================
    // Stage 6-8: copy trees and log into the target
    // ========================================================================

    fn copy_config_tree(&self) -> Result<()> {
        let dest = self.target("etc/tuinix");
        self.runner
            .run_checked(&CommandSpec::new("mkdir").arg("-p").path(&dest))
            .context("create target dir")?;
        self.runner
            .run_checked(
                &CommandSpec::new("cp")
                    .arg("-r")
                    .arg(format!("{}/.", self.settings.work_dir.display()))
                    .arg(format!("{}/", dest.display())),
            )
            .context("copy flake")?;
        self.runner
            .run_checked(&CommandSpec::new("chown").args(["-R", "root:root"]).path(&dest))
            .context("chown")?;
        Ok(())
    }

    fn setup_user_tree(&self, config: &FrozenConfig) -> Result<()> {
        let home = self.user_home(config);
        let user_dir = home.join("tuinix");
        let user_dir_s = user_dir.to_string_lossy().to_string();

        self.runner
            .run_checked(&CommandSpec::new("mkdir").arg("-p").path(&home))
            .context("create user home")?;
        self.runner.run_best_effort(&CommandSpec::new("rm").arg("-rf").path(&user_dir));
        self.runner
            .run_checked(
                &CommandSpec::new("git")
                    .args(["clone", "--depth", "1", self.settings.flake_repo.as_str()])
                    .path(&user_dir),
            )
            .context("git clone")?;

        let hosts = user_dir.join("hosts");
        self.runner
            .run_checked(&CommandSpec::new("mkdir").arg("-p").path(&hosts))
            .context("create hosts dir")?;
        self.runner
            .run_checked(
                &CommandSpec::new("cp")
                    .arg("-r")
                    .path(&self.settings.host_dir(&config.hostname))
                    .path(&hosts.join(&config.hostname)),
            )
            .context("copy host config")?;
        self.runner
            .run_checked(
                &CommandSpec::new("cp")
                    .path(&self.settings.user_file(&config.username))
                    .path(&user_dir.join("users").join(format!("{}.nix", config.username))),
            )
            .context("copy user config")?;

        let git = |args: &[&str]| CommandSpec::new("git").args(["-C", user_dir_s.as_str()]).args(args);
        self.runner
            .run_best_effort(&git(&["config", "user.name", config.full_name.as_str()]));
        self.runner
            .run_best_effort(&git(&["config", "user.email", config.email.as_str()]));
        let host_rel = format!("hosts/{}", config.hostname);
        let user_rel = format!("users/{}.nix", config.username);
        self.runner
            .run_best_effort(&git(&["add", host_rel.as_str(), user_rel.as_str()]));
        let message = artifacts::commit_message(config, Utc::now());
        self.runner
            .run_best_effort(&git(&["commit", "-m", message.as_str()]));

        self.runner.run_best_effort(
            &CommandSpec::new("chown")
                .args(["-R", artifacts::USER_OWNER])
                .path(&home),
        );
        self.runner.run_best_effort(
            &CommandSpec::new("nixos-enter")
                .arg("--root")
                .path(&self.settings.target)
                .arg("--command")
                .arg(format!(
                    "ln -sf /home/{}/tuinix /etc/tuinix-user",
                    config.username
                )),
        );
        Ok(())
    }

    /// Never fails the run; problems are logged.
    fn copy_install_log(&self, config: &FrozenConfig) -> Result<()> {
        let dest = self.user_home(config).join("tuinix-install.log");
        tracing::info!(
            "Copying install log from {} to {}",
            self.settings.log_path.display(),
            dest.display()
        );
        let copied = self.runner.run_best_effort(
            &CommandSpec::new("cp")
                .path(&self.settings.log_path)
                .path(&dest),
        );
        if !copied {
            tracing::error!("Failed to copy install log");
            return Ok(());
        }
        self.runner
            .run_best_effort(&CommandSpec::new("chown").arg(artifacts::USER_OWNER).path(&dest));
        Ok(())
    }

    // ========================================================================
    // Stage 9: finalize (unmounts the target)
    // ========================================================================

    fn finalize_pool(&self) -> Result<()> {
        let pool = self.settings.pool_name.as_str();
        self.runner
            .run_best_effort(&CommandSpec::new("umount").arg("-R").path(&self.settings.target));
        self.runner
            .run_checked(&CommandSpec::new("zpool").args(["export", pool]))
            .context("export pool")?;
        self.runner
            .run_checked(&CommandSpec::new("zpool").args(["import", "-f", pool]))
            .context("import pool")?;
        self.runner
            .run_checked(&CommandSpec::new("zpool").args(["export", pool]))
            .context("final export")?;
        Ok(())
    }
}

impl StageExecutor for CommandProvisioner {
    fn execute(&mut self, stage: InstallStage, config: &FrozenConfig) -> Result<()> {
        match stage {
            InstallStage::GenerateHostConfig => self.generate_host_config(config),
            InstallStage::FormatDisks => self.format_disks(config),
            InstallStage::GenerateHardwareConfig => self.generate_hardware_config(config),
            InstallStage::InstallBaseSystem => self.install_base_system(config),
            InstallStage::ConfigureBootPool => self.configure_boot_pool(),
            InstallStage::CopyConfigTree => self.copy_config_tree(),
            InstallStage::SetupUserTree => self.setup_user_tree(config),
            InstallStage::CopyInstallLog => self.copy_install_log(config),
            InstallStage::FinalizePool => self.finalize_pool(),
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}
