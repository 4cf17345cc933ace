//! File pairs: one document as an encrypted artifact plus its plaintext working copy.
//!
//! While a pair is open for editing, its encrypted artifact is renamed to a
//! hidden form (`notes.gpg` -> `.notes.gpg`). That rename is the footprint:
//! the filesystem itself records which pairs are open, so an interrupted
//! session can be locked again after a restart.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::checklist::{checklist_key, Checklist};
use crate::error::{IoContext, JournalError, Result};
use crate::fs::{is_hidden_name, remove_if_exists, HIDDEN_PREFIX};

/// Suffix identifying encrypted artifacts unless configured otherwise.
pub const DEFAULT_SUFFIX: &str = ".gpg";

/// Where a pair's encrypted artifact currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the normal name exists.
    Visible,
    /// Only the hidden footprint exists.
    Hidden,
    /// Both names exist (an interrupted lock re-encrypted but did not clean up).
    Both,
    /// Neither name exists.
    Missing,
}

/// One logical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    encrypted: PathBuf,
    plaintext: PathBuf,
}

impl FilePair {
    /// Build a pair from the visible name of its encrypted artifact.
    ///
    /// Returns `None` if the path does not end in `suffix` or nothing is left
    /// once the suffix is removed.
    pub fn from_encrypted(encrypted: impl Into<PathBuf>, suffix: &str) -> Option<Self> {
        let encrypted = encrypted.into();
        let name = encrypted.file_name()?.to_str()?;
        let stem = name.strip_suffix(suffix)?;
        if stem.is_empty() {
            return None;
        }
        let plaintext = encrypted.with_file_name(stem);
        Some(Self {
            encrypted,
            plaintext,
        })
    }

    /// Path of the ciphertext under its normal, visible name.
    pub fn encrypted(&self) -> &Path {
        &self.encrypted
    }

    pub fn plaintext(&self) -> &Path {
        &self.plaintext
    }

    /// Path of the ciphertext while the pair is open (`.name.gpg`).
    pub fn hidden(&self) -> PathBuf {
        hidden_path(&self.encrypted)
    }

    /// Inspect the filesystem for the current footprint state.
    pub fn visibility(&self) -> Visibility {
        match (self.encrypted.exists(), self.hidden().exists()) {
            (true, false) => Visibility::Visible,
            (false, true) => Visibility::Hidden,
            (true, true) => Visibility::Both,
            (false, false) => Visibility::Missing,
        }
    }

    /// Whether a footprint marks this pair as open.
    pub fn is_open(&self) -> bool {
        self.hidden().exists()
    }

    /// Hide the encrypted artifact, marking the pair as open.
    pub fn leave_footprint(&self) -> Result<()> {
        let hidden = self.hidden();
        fs::rename(&self.encrypted, &hidden).at(&self.encrypted)?;
        debug!(path = %hidden.display(), "left footprint");
        Ok(())
    }

    /// Un-hide the original encrypted artifact, leaving its bytes untouched.
    pub fn restore_footprint(&self) -> Result<()> {
        let hidden = self.hidden();
        fs::rename(&hidden, &self.encrypted).at(&hidden)?;
        debug!(path = %self.encrypted.display(), "restored footprint");
        Ok(())
    }

    /// Delete the hidden artifact once a fresh ciphertext has replaced it.
    pub fn remove_footprint(&self) -> Result<()> {
        let hidden = self.hidden();
        remove_if_exists(&hidden).at(&hidden)?;
        debug!(path = %hidden.display(), "removed footprint");
        Ok(())
    }

    /// Delete the plaintext working copy. Returns whether one existed.
    pub fn remove_plaintext(&self) -> Result<bool> {
        remove_if_exists(&self.plaintext).at(&self.plaintext)
    }
}

/// Hidden-marker form of `path`: the same directory, base name prefixed with a dot.
pub fn hidden_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", HIDDEN_PREFIX, name))
}

/// Find every encrypted artifact under `root`.
///
/// Entries whose name ends in `suffix` qualify. A hidden-marker file
/// (`.notes.gpg`) is mapped back to its visible identity (`notes.gpg`), so the
/// same logical set, in the same order, is found whether the journal is locked
/// or unlocked. A dot-prefixed artifact only counts as a marker while its
/// plaintext (`notes`) exists or the checklist records it; otherwise it is a
/// document of its own (`.notes.gpg` decrypting to `.notes`). Hidden
/// directories are not descended into. Pairs are ordered by their visible path.
pub fn discover(root: &Path, suffix: &str) -> Result<Vec<FilePair>> {
    let mut pairs: Vec<FilePair> = Vec::new();
    let mut seen = HashSet::new();
    let recorded = recorded_keys(root);

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry.file_name().to_str().map(is_hidden_name).unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            JournalError::io(path, io::Error::from(err))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !name.ends_with(suffix) {
            continue;
        }

        let marked = name
            .strip_prefix(HIDDEN_PREFIX)
            .and_then(|visible| FilePair::from_encrypted(entry.path().with_file_name(visible), suffix))
            .filter(|pair| is_marker_of(root, pair, &recorded));
        let Some(pair) = marked.or_else(|| FilePair::from_encrypted(entry.path(), suffix)) else {
            continue;
        };
        // `notes.gpg` and `.notes.gpg` can coexist after an interrupted lock.
        if seen.insert(pair.encrypted.clone()) {
            pairs.push(pair);
        }
    }
    pairs.sort_by(|a, b| a.encrypted.cmp(&b.encrypted));

    debug!(root = %root.display(), pairs = pairs.len(), "discovered file pairs");
    Ok(pairs)
}

/// Whether a dot-prefixed artifact is the footprint of `pair` rather than a
/// document in its own right.
fn is_marker_of(root: &Path, pair: &FilePair, recorded: &HashSet<String>) -> bool {
    if pair.plaintext.exists() {
        return true;
    }
    checklist_key(root, &pair.plaintext)
        .map(|key| recorded.contains(&key))
        .unwrap_or(false)
}

/// Paths recorded in the checklist at `root`, if one is readable.
fn recorded_keys(root: &Path) -> HashSet<String> {
    match Checklist::load(root) {
        Ok(checklist) => checklist
            .iter()
            .filter_map(|entry| entry.path().to_str().map(str::to_string))
            .collect(),
        Err(JournalError::MissingChecklist { .. }) => HashSet::new(),
        Err(err) => {
            debug!(error = %err, "checklist unreadable during discovery");
            HashSet::new()
        }
    }
}
