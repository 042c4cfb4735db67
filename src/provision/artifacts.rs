//! Generated files
//!
//! Text of the host, user and hardware modules written into the work dir, the
//! commit message recorded in the user's flake, and the `NIX_CONFIG` used by
//! the base install. All renderers are pure; the provisioner writes them.

use crate::config::Config;
use chrono::{DateTime, Utc};

/// Settings passed to `nixos-install` through `NIX_CONFIG`.
pub const NIX_CONFIG: &str = "\
extra-substituters = https://cache.nixos.org/
extra-trusted-public-keys = cache.nixos.org-1:6NCHdD59X431o0gWypbMrAURkbJ16ZPMQFGspcDShjY=
max-jobs = auto
cores = 0
keep-outputs = true
keep-derivations = true
";

/// Uid/gid the first normal user receives on NixOS.
pub const USER_OWNER: &str = "1000:100";

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Nix string literal with `"`, `\` and `${` escaped.
fn nix_str(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "\\${");
    format!("\"{}\"", escaped)
}

/// `hosts/<host>/default.nix`
pub fn render_host_module(config: &Config) -> String {
    let mode = config.storage_mode;
    let zfs = if mode.uses_pool() {
        format!(
            "  tuinix.zfs.enable = true;\n  tuinix.zfs.encryption = {};\n",
            mode.requires_encryption()
        )
    } else {
        "  tuinix.zfs.enable = false;\n".to_string()
    };
    let ssh = if config.enable_ssh {
        "\n  # SSH and firewall\n  tuinix.security.ssh.enable = true;\n  tuinix.security.firewall.enable = true;\n"
    } else {
        ""
    };

    format!(
        r#"{{ config, lib, pkgs, inputs, hostname, ... }}:

{{
  imports = [
    ./disks.nix
    ./hardware.nix
    ../../users/{user}.nix
    ../../users/admin.nix
  ];

  networking.hostName = hostname;
  system.stateVersion = "25.11";

  environment.systemPackages = with pkgs; [
    vim
    git
  ];

{zfs}{ssh}
  boot.consoleLogLevel = 3;

  i18n.defaultLocale = {locale};
  services.xserver.xkb.layout = {keymap};
  console.keyMap = {console};
}}
"#,
        user = config.username,
        zfs = zfs,
        ssh = ssh,
        locale = nix_str(&config.locale),
        keymap = nix_str(&config.keymap),
        console = nix_str(&config.console_keymap),
    )
}

/// `users/<user>.nix`
pub fn render_user_module(config: &Config, hashed_password: &str, at: DateTime<Utc>) -> String {
    let keys = match (&config.ssh_keys, config.enable_ssh) {
        (Some(keys), true) if !keys.is_empty() => {
            let lines: String = keys
                .iter()
                .map(|k| format!("      {}\n", nix_str(k)))
                .collect();
            format!("    openssh.authorizedKeys.keys = [\n{}    ];\n", lines)
        }
        _ => String::new(),
    };

    format!(
        r#"# User configuration for {user}
# Generated by tuinix installer on {when}
{{ config, lib, pkgs, ... }}:

{{
  users.users.{user} = {{
    isNormalUser = true;
    description = {name};
    extraGroups = [ "wheel" "networkmanager" "audio" "video" "docker" ];
    home = "/home/{user}";
    createHome = true;
    hashedPassword = {hash};
{keys}  }};

  home-manager.users.{user} = {{ pkgs, ... }}: {{
    programs.git = {{
      enable = true;
      userName = {name};
      userEmail = {email};
      extraConfig = {{
        init.defaultBranch = "main";
        pull.rebase = true;
        push.autoSetupRemote = true;
      }};
    }};
    home.stateVersion = "24.11";
  }};
}}
"#,
        user = config.username,
        when = timestamp(at),
        name = nix_str(&config.full_name),
        email = nix_str(&config.email),
        hash = nix_str(hashed_password),
        keys = keys,
    )
}

/// `hosts/<host>/hardware.nix`
pub fn render_hardware_module(config: &Config) -> String {
    let mode = config.storage_mode;
    let (host_id, boot_head, scrub) = if mode.uses_pool() {
        (
            format!("  networking.hostId = {};\n", nix_str(&config.host_id)),
            format!(
                "  boot = {{\n    supportedFilesystems = [ \"zfs\" ];\n    zfs = {{\n      requestEncryptionCredentials = {};\n      forceImportRoot = true;\n    }};\n",
                mode.requires_encryption()
            ),
            "\n  services.zfs.autoScrub.enable = true;",
        )
    } else {
        (String::new(), "  boot = {\n".to_string(), "")
    };

    format!(
        r#"{{ config, lib, pkgs, modulesPath, ... }}:

{{
{host_id}  imports = [ (modulesPath + "/installer/scan/not-detected.nix") ];

{boot_head}    initrd = {{
      availableKernelModules = [
        "ahci" "xhci_pci" "virtio_pci" "virtio_blk" "virtio_scsi"
        "sd_mod" "sr_mod" "nvme" "ehci_pci" "usbhid"
        "usb_storage" "sdhci_pci"
      ];
      kernelModules = [ ];
    }};
    kernelModules = [ "kvm-intel" "kvm-amd" ];
    extraModulePackages = [ ];
  }};

  hardware = {{
    enableAllFirmware = true;
    cpu.intel.updateMicrocode = lib.mkDefault true;
  }};

  powerManagement.cpuFreqGovernor = lib.mkDefault "powersave";{scrub}
}}
"#
    )
}

/// Message for the commit that records this install in the user's flake.
pub fn commit_message(config: &Config, at: DateTime<Utc>) -> String {
    let disk = if config.disks.is_empty() {
        config.disk.clone()
    } else {
        config.disks.join(", ")
    };
    format!(
        "Add host and user configuration for {host}\n\
         \n\
         Generated by tuinix installer on {when}\n\
         Host: {host}\n\
         User: {user} ({name} <{email}>)\n\
         Host ID: {host_id}\n\
         Storage: {mode}\n\
         Disk: {disk}\n\
         Locale: {locale}\n\
         Keymap: {keymap}",
        host = config.hostname,
        when = timestamp(at),
        user = config.username,
        name = config.full_name,
        email = config.email,
        host_id = config.host_id,
        mode = config.storage_mode,
        disk = disk,
        locale = config.locale,
        keymap = config.keymap,
    )
}
