//! Child process lifecycle
//!
//! Every external tool the installer launches (disko, zpool, nixos-install,
//! git, ...) runs in its own process group and is recorded here. If the
//! installer is interrupted or dropped, the recorded groups are sent SIGTERM,
//! then SIGKILL once the grace period runs out.
//!
//! Interrupting a run mid-format leaves the target disks in an undefined
//! state. The guard only stops the tools; it does not undo their work.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Grace period used when the guard is dropped.
pub const DROP_GRACE: Duration = Duration::from_secs(5);

/// Grace period used from the signal thread.
pub const SIGNAL_GRACE: Duration = Duration::from_secs(3);

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Running children keyed by PID (which is also their process group id).
#[derive(Debug, Default)]
pub struct ChildRegistry {
    children: HashMap<u32, String>,
    shutting_down: bool,
}

impl ChildRegistry {
    /// The process-wide registry used by the command runner.
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32, program: &str) {
        self.children.insert(pid, program.to_string());
        tracing::debug!(pid, program, "tracking child");
    }

    pub fn unregister(&mut self, pid: u32) {
        if let Some(program) = self.children.remove(&pid) {
            tracing::debug!(pid, program = %program, "child finished");
        }
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// Signal every tracked group, escalating to SIGKILL after `grace`.
    ///
    /// Only the first call does anything; later calls return 0.
    /// Returns the number of groups that had to be killed.
    pub fn terminate_all(&mut self, grace: Duration) -> usize {
        if self.shutting_down {
            return 0;
        }
        self.shutting_down = true;

        if self.children.is_empty() {
            return 0;
        }

        let pids: Vec<u32> = self.children.keys().copied().collect();
        tracing::warn!("Stopping {} running tool(s)", pids.len());

        for &pid in &pids {
            let program = self.children.get(&pid).map(String::as_str).unwrap_or("?");
            if signal_group(pid, Signal::SIGTERM).is_err() {
                // Group already gone or never formed; try the leader directly
                let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
            tracing::info!(pid, program, "sent SIGTERM");
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if pids.iter().all(|&pid| !is_alive(pid)) {
                self.children.clear();
                tracing::info!("All tools stopped");
                return 0;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        let mut killed = 0;
        for &pid in pids.iter().filter(|&&pid| is_alive(pid)) {
            tracing::error!(pid, "tool ignored SIGTERM, sending SIGKILL");
            if signal_group(pid, Signal::SIGKILL).is_err() {
                let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
            killed += 1;
        }
        self.children.clear();
        killed
    }
}

/// Negative PID addresses the whole group, so grandchildren are reached too.
fn signal_group(pgid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), sig)
}

/// Exists and is not a zombie.
fn is_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // The state field follows the parenthesised command name
        Ok(stat) => stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next())
            .is_none_or(|state| !matches!(state, 'Z' | 'X')),
        Err(_) => true,
    }
}

/// Stops tracked children when dropped. Held by `main` for the whole run.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(DROP_GRACE);
        }
    }
}

/// Install SIGINT/SIGTERM/SIGHUP handling on a dedicated thread.
///
/// On delivery, running tools are stopped and the process exits with
/// `128 + signal`. Call once, before the terminal is put in raw mode.
pub fn init_signal_handlers() -> std::io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                tracing::warn!(signal = sig, "interrupted, stopping running tools");
                if let Ok(mut registry) = ChildRegistry::global().lock() {
                    registry.terminate_all(SIGNAL_GRACE);
                }
                std::process::exit(128 + sig);
            }
        })?;
    Ok(())
}

/// Launch a `Command` as the leader of a new process group.
pub trait CommandProcessGroup {
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: only async-signal-safe calls (setpgid, prctl) run between fork and exec
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;
                // Die with the installer rather than keep writing to disks
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}
