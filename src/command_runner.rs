//! External command execution
//!
//! The only sanctioned way to launch provisioning tools. Every command:
//!
//! - runs in its own process group and is registered with the
//!   `ChildRegistry` for the lifetime of the child
//! - is logged (program and arguments, never stdin) to the diagnostics log
//! - is skipped, and reported as successful, under dry-run
//!
//! Stdin content (passphrases, passwords for hashing) is written through a
//! pipe and never appears in argv or the log.

use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One command invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: Option<String>,
    cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// Path argument, passed lossily as UTF-8.
    pub fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed `input` on stdin. Not logged.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `program arg1 arg2 ...` for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal or skipped)
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    /// Error out with `context`, the exit code and trimmed stderr on failure.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            let code = self.exit_code.unwrap_or(-1);
            let detail = if self.stderr.trim().is_empty() {
                self.stdout.trim()
            } else {
                self.stderr.trim()
            };
            anyhow::bail!("{} failed (exit code {}): {}", context, code, detail)
        }
    }
}

/// Launches commands, or just logs them under dry-run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner {
    dry_run: bool,
}

impl CommandRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `spec` and capture its output. A non-zero exit is not an error
    /// here; see `run_checked`.
    pub fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if self.dry_run {
            tracing::info!("[dry-run] $ {}", spec.display());
            return Ok(CommandOutput {
                success: true,
                ..CommandOutput::default()
            });
        }

        tracing::info!("$ {}", spec.display());

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group();
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {}", spec.program))?;
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid, &spec.program);
        }

        if let (Some(input), Some(mut pipe)) = (&spec.stdin, child.stdin.take()) {
            // Dropping the pipe closes stdin so the tool sees EOF
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                tracing::warn!("{}: writing stdin failed: {}", spec.program, e);
            }
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = waited.with_context(|| format!("Failed waiting for {}", spec.program))?;
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };

        for line in result.stdout.lines().chain(result.stderr.lines()) {
            if !line.trim().is_empty() {
                tracing::debug!(target: "tool", "{}: {}", spec.program, line);
            }
        }
        if result.success {
            tracing::info!("{} finished", spec.program);
        } else {
            tracing::warn!(
                "{} exited with code {}",
                spec.program,
                result.exit_code.unwrap_or(-1)
            );
        }
        Ok(result)
    }

    /// Run `spec` and fail on a non-zero exit.
    pub fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec)?;
        output.ensure_success(spec.program())?;
        Ok(output)
    }

    /// Run `spec`, logging instead of failing. Returns whether it succeeded.
    pub fn run_best_effort(&self, spec: &CommandSpec) -> bool {
        match self.run_checked(spec) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("ignored failure: {:#}", e);
                false
            }
        }
    }
}
