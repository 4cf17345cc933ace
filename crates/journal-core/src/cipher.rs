//! Encryption capability consumed by the engine.
//!
//! The engine never touches key material. It hands paths and the recipient
//! identity to a `Cipher`, which must run non-interactively and overwrite any
//! existing output.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{JournalError, Result};

/// Encrypt/decrypt files for a recipient.
pub trait Cipher: Send + Sync {
    /// Decrypt `encrypted` into `plaintext`, overwriting it if present.
    fn decrypt(&self, encrypted: &Path, plaintext: &Path, recipient: &str) -> Result<()>;

    /// Encrypt `plaintext` for `recipient` into `encrypted`, overwriting it if present.
    fn encrypt(&self, plaintext: &Path, encrypted: &Path, recipient: &str) -> Result<()>;
}

/// Cipher backed by an external `gpg`-compatible command.
#[derive(Debug, Clone)]
pub struct GpgCipher {
    command: String,
    extra_args: Vec<String>,
}

impl Default for GpgCipher {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl GpgCipher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            extra_args: Vec::new(),
        }
    }

    /// Extra arguments inserted before the operation flags (e.g. `--homedir`).
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--batch".to_string(),
            "--yes".to_string(),
            "--quiet".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn run(&self, args: Vec<String>, subject: &Path) -> Result<()> {
        debug!(command = %self.command, args = ?args, "running cipher command");

        let output = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| JournalError::ExternalTool {
                tool: self.command.clone(),
                path: subject.to_path_buf(),
                message: format!("could not launch: {}", err),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            format!("exited with {}: {}", output.status, stderr)
        };
        Err(JournalError::ExternalTool {
            tool: self.command.clone(),
            path: subject.to_path_buf(),
            message,
        })
    }
}

impl Cipher for GpgCipher {
    fn decrypt(&self, encrypted: &Path, plaintext: &Path, _recipient: &str) -> Result<()> {
        let mut args = self.base_args();
        args.push("--output".to_string());
        args.push(plaintext.to_string_lossy().into_owned());
        args.push("--decrypt".to_string());
        args.push(encrypted.to_string_lossy().into_owned());
        self.run(args, encrypted)
    }

    fn encrypt(&self, plaintext: &Path, encrypted: &Path, recipient: &str) -> Result<()> {
        let mut args = self.base_args();
        args.push("--recipient".to_string());
        args.push(recipient.to_string());
        args.push("--output".to_string());
        args.push(encrypted.to_string_lossy().into_owned());
        args.push("--encrypt".to_string());
        args.push(plaintext.to_string_lossy().into_owned());
        self.run(args, plaintext)
    }
}
