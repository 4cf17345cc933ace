use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use journal_core::pair::DEFAULT_SUFFIX;
use journal_core::pipeline::DEFAULT_QUEUE_DEPTH;

/// Optional settings file. Every section and key may be omitted.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub gpg: GpgSection,
    pub journal: JournalSection,
    pub unlock: UnlockSection,
    pub log: LogSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GpgSection {
    pub command: String,
    pub extra_args: Vec<String>,
}

impl Default for GpgSection {
    fn default() -> Self {
        Self {
            command: "gpg".to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSection {
    /// Suffix identifying encrypted entries.
    pub suffix: String,
}

impl Default for JournalSection {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockSection {
    /// Overlap decryption and fingerprinting; `false` decrypts one file at a time.
    pub pipeline: bool,
    pub queue_depth: usize,
}

impl Default for UnlockSection {
    fn default() -> Self {
        Self {
            pipeline: true,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

/// Read the config at `path`, or the default location when `None`.
///
/// A missing file at the default location yields defaults; an explicitly
/// named file must exist.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<JournalConfig> {
    match path {
        Some(path) => read_config(path),
        None => {
            let path = default_config_path()?;
            if path.exists() {
                read_config(&path)
            } else {
                Ok(JournalConfig::default())
            }
        }
    }
}

pub fn read_config(path: &Path) -> anyhow::Result<JournalConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("journal"));
        }
    }
    Ok(home_dir()?.join(".config").join("journal"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
