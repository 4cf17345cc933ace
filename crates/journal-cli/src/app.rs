//! Per-invocation context: configuration merged with command-line overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use journal_core::{Cipher, GpgCipher, Journal, JournalOptions, UnlockMode};
use tracing::debug;

use crate::cli::Cli;
use crate::config::{load_config, JournalConfig, LogFormat};
use crate::errors::CliError;
use crate::ui::UiContext;

pub struct AppContext {
    config: JournalConfig,
    gpg_override: Option<String>,
    log_level_override: Option<String>,
    no_color: bool,
    ascii: bool,
    quiet: bool,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = load_config(cli.config.as_deref())
            .map_err(|e| CliError::invalid_input(format!("{:#}", e)))?;
        Ok(Self::with_config(cli, config))
    }

    pub fn with_config(cli: &Cli, config: JournalConfig) -> Self {
        Self {
            config,
            gpg_override: cli.gpg.clone(),
            log_level_override: cli.log_level.clone(),
            no_color: cli.no_color,
            ascii: cli.ascii,
            quiet: cli.quiet,
        }
    }

    pub fn ui_context(&self, json: bool) -> UiContext {
        UiContext::from_env(json, self.no_color, self.ascii, self.quiet)
    }

    pub fn log_level(&self) -> &str {
        self.log_level_override
            .as_deref()
            .unwrap_or(&self.config.log.level)
    }

    pub fn log_format(&self) -> LogFormat {
        self.config.log.format
    }

    pub fn cipher(&self) -> Arc<dyn Cipher> {
        let command = self
            .gpg_override
            .clone()
            .unwrap_or_else(|| self.config.gpg.command.clone());
        Arc::new(GpgCipher::new(command).with_extra_args(self.config.gpg.extra_args.clone()))
    }

    /// Engine options from the config file, overridden by unlock flags.
    pub fn options(
        &self,
        sequential: bool,
        queue_depth: Option<usize>,
    ) -> Result<JournalOptions, CliError> {
        let queue_depth = queue_depth.unwrap_or(self.config.unlock.queue_depth);
        if queue_depth == 0 {
            return Err(CliError::invalid_input("queue depth must be at least 1"));
        }
        let suffix = self.config.journal.suffix.clone();
        if suffix.is_empty() {
            return Err(CliError::invalid_input("[journal] suffix must not be empty"));
        }

        let unlock_mode = if sequential || !self.config.unlock.pipeline {
            UnlockMode::Sequential
        } else {
            UnlockMode::Pipelined
        };

        Ok(JournalOptions {
            suffix,
            unlock_mode,
            queue_depth,
        })
    }

    pub fn open(&self, dir: &Path, options: JournalOptions) -> anyhow::Result<Journal> {
        debug!(root = %dir.display(), mode = %options.unlock_mode, "opening journal");
        Ok(Journal::open(dir, options, self.cipher())?)
    }
}

/// The directory argument, or the current working directory.
pub fn resolve_dir(dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("Cannot determine current directory: {}", e)),
    }
}
