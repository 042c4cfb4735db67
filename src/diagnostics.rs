//! Diagnostics log
//!
//! All tracing output goes to a plain-text log file so it never fights the
//! TUI for the terminal. The install screen shows the last few lines of that
//! file through a poller thread; the same file is copied onto the target at
//! the end of the run.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Lines shown under the progress bar while installing.
pub const TAIL_LINES: usize = 3;

/// How often the poller re-reads the log.
pub const TAIL_INTERVAL: Duration = Duration::from_millis(500);

/// Only the end of the file is read when tailing.
const TAIL_WINDOW: u64 = 64 * 1024;

/// Install the global subscriber writing to `path` (appending).
///
/// The filter defaults to `info`; `RUST_LOG` overrides it.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
    Ok(())
}

/// Last `n` lines of the file at `path`.
pub fn tail(path: &Path, n: usize) -> std::io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(TAIL_WINDOW);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    let text = String::from_utf8_lossy(&buf);

    let mut lines: Vec<&str> = text.lines().collect();
    if start > 0 && !lines.is_empty() {
        // First line is probably cut in half
        lines.remove(0);
    }
    let lines: Vec<String> = lines
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();
    let skip = lines.len().saturating_sub(n);
    Ok(lines.into_iter().skip(skip).collect())
}

/// Periodically send the log tail until the receiver is dropped.
///
/// Only changed tails are sent. Read errors (e.g. file not created yet) are
/// skipped silently.
pub fn spawn_tail_poller(
    path: PathBuf,
    lines: usize,
    interval: Duration,
    tx: Sender<Vec<String>>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("log-tail".into())
        .spawn(move || {
            let mut last: Vec<String> = Vec::new();
            loop {
                if let Ok(current) = tail(&path, lines) {
                    if current != last {
                        if tx.send(current.clone()).is_err() {
                            break;
                        }
                        last = current;
                    }
                }
                std::thread::sleep(interval);
            }
        })
}
