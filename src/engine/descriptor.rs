//! Disk descriptor generation.
//!
//! Renders a `PoolLayout` and its `CapacityPlan` as a disko device
//! expression (`disks.nix`). The output is consumed by `disko --mode disko`.

use crate::engine::storage::{CapacityPlan, DeviceRole, PoolLayout};

/// Where the shell-history dataset is mounted on the installed system.
const AUXILIARY_MOUNTPOINT: &str = "/var/lib/atuin";

struct NixWriter {
    out: String,
    depth: usize,
}

impl NixWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("};");
    }
}

/// Render the disko expression for `layout`.
pub fn render_disko(layout: &PoolLayout, capacity: &CapacityPlan, hostname: &str) -> String {
    let mut w = NixWriter::new();
    w.line(&format!("# Disk layout for {} ({})", hostname, layout.mode.label()));
    w.open("{");
    w.open("disko.devices = {");
    w.open("disk = {");

    for (i, dev) in layout.devices.iter().enumerate() {
        w.open(&format!("disk{} = {{", i));
        w.line("type = \"disk\";");
        w.line(&format!("device = \"{}\";", dev.device.display()));
        w.open("content = {");
        w.line("type = \"gpt\";");
        w.open("partitions = {");

        if dev.boot_partition.is_some() {
            w.open("ESP = {");
            w.line(&format!("size = \"{}\";", capacity.space_boot()));
            w.line("type = \"EF00\";");
            w.open("content = {");
            w.line("type = \"filesystem\";");
            w.line("format = \"vfat\";");
            w.line("mountpoint = \"/boot\";");
            w.line("mountOptions = [ \"umask=0077\" ];");
            w.close();
            w.close();
        }

        match (dev.role, &layout.pool_name) {
            (DeviceRole::BootAndData, _) | (_, None) => {
                w.open("root = {");
                w.line("size = \"100%\";");
                w.open("content = {");
                w.line("type = \"filesystem\";");
                w.line("format = \"xfs\";");
                w.line("mountpoint = \"/\";");
                w.close();
                w.close();
            }
            (_, Some(pool)) => {
                w.open("zfs = {");
                w.line("size = \"100%\";");
                w.open("content = {");
                w.line("type = \"zfs\";");
                w.line(&format!("pool = \"{}\";", pool));
                w.close();
                w.close();
            }
        }

        w.close(); // partitions
        w.close(); // content
        w.close(); // diskN
    }
    w.close(); // disk

    if let Some(pool) = &layout.pool_name {
        render_zpool(&mut w, layout, capacity, pool);
    }

    w.close(); // disko.devices
    w.line("}");
    w.out
}

fn render_zpool(w: &mut NixWriter, layout: &PoolLayout, capacity: &CapacityPlan, pool: &str) {
    w.open("zpool = {");
    w.open(&format!("{} = {{", pool));
    w.line("type = \"zpool\";");
    let keyword = layout.redundancy.vdev_keyword();
    if !keyword.is_empty() {
        w.line(&format!("mode = \"{}\";", keyword));
    }
    w.line("options.ashift = \"12\";");

    w.open("rootFsOptions = {");
    w.line("compression = \"zstd\";");
    w.line("acltype = \"posixacl\";");
    w.line("xattr = \"sa\";");
    w.line("atime = \"off\";");
    w.line("mountpoint = \"none\";");
    if layout.mode.requires_encryption() {
        w.line("encryption = \"aes-256-gcm\";");
        w.line("keyformat = \"passphrase\";");
        w.line("keylocation = \"prompt\";");
    }
    w.close();

    w.open("datasets = {");
    dataset(w, "root", "/", None);
    dataset(w, "nix", "/nix", capacity.space_nix());
    dataset(w, "atuin", AUXILIARY_MOUNTPOINT, capacity.space_atuin());
    dataset(w, "home", "/home", Some(capacity.space_home()));
    w.close();

    w.close();
    w.close();
}

fn dataset(w: &mut NixWriter, name: &str, mountpoint: &str, quota: Option<String>) {
    w.open(&format!("{} = {{", name));
    w.line("type = \"zfs_fs\";");
    w.line(&format!("mountpoint = \"{}\";", mountpoint));
    w.line("options.mountpoint = \"legacy\";");
    if let Some(q) = quota {
        w.line(&format!("options.quota = \"{}\";", q));
    }
    w.close();
}
