//! Password hashing for the generated user record.

use crate::command_runner::{CommandRunner, CommandSpec};
use anyhow::{Context, Result};

/// Produces a crypt(3) hash suitable for `hashedPassword`.
pub trait CredentialHasher: Send {
    fn hash(&self, password: &str) -> Result<String>;
}

/// `mkpasswd -m sha-512 --stdin`; the password travels over stdin only.
#[derive(Debug, Clone, Copy)]
pub struct MkpasswdHasher {
    runner: CommandRunner,
}

impl MkpasswdHasher {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl CredentialHasher for MkpasswdHasher {
    fn hash(&self, password: &str) -> Result<String> {
        if self.runner.is_dry_run() {
            // Nothing is installed, but the user file still gets written
            return Ok("$6$dry-run$placeholder".to_string());
        }
        let spec = CommandSpec::new("mkpasswd")
            .args(["-m", "sha-512", "--stdin"])
            .stdin(password);
        let output = self
            .runner
            .run_checked(&spec)
            .context("Failed to hash password")?;
        parse_crypt_hash(&output.stdout)
    }
}

/// Validate mkpasswd output: a single `$id$...` token.
pub fn parse_crypt_hash(stdout: &str) -> Result<String> {
    let hash = stdout.trim();
    if hash.is_empty() {
        anyhow::bail!("mkpasswd produced no output");
    }
    if !hash.starts_with('$') || hash.contains(char::is_whitespace) {
        anyhow::bail!("mkpasswd produced an unexpected hash format");
    }
    Ok(hash.to_string())
}
