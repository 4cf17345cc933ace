//! Outcomes of journal operations, shaped for both text and JSON output.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::pair::Visibility;

/// How unlock schedules its per-file work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMode {
    /// Decrypt, fingerprint, and record on overlapping workers.
    #[default]
    Pipelined,
    /// Decrypt and hide one pair at a time, then scan the directory.
    Sequential,
}

impl fmt::Display for UnlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockMode::Pipelined => write!(f, "pipelined"),
            UnlockMode::Sequential => write!(f, "sequential"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlockReport {
    pub mode: UnlockMode,
    /// Pairs decrypted and hidden.
    pub opened: usize,
    /// Records written to the checklist.
    pub recorded: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LockReport {
    /// Encrypted artifacts rewritten from edited plaintext.
    pub resealed: Vec<PathBuf>,
    /// Encrypted artifacts un-hidden with their original bytes.
    pub restored: Vec<PathBuf>,
    /// Pairs that were not open (already sealed).
    pub skipped: usize,
    /// Plaintext working copies deleted.
    pub removed_plaintexts: usize,
}

/// Per-pair state as reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    /// Encrypted artifact visible, no footprint.
    Sealed,
    /// Open, plaintext matches the checklist.
    Open,
    /// Plaintext differs from the checklist or was never recorded; the next
    /// lock re-encrypts it.
    Modified,
    /// Open, but the plaintext working copy is gone.
    Missing,
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PairState::Sealed => "sealed",
            PairState::Open => "open",
            PairState::Modified => "modified",
            PairState::Missing => "missing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairStatus {
    /// Encrypted artifact, relative to the journal root.
    pub encrypted: PathBuf,
    /// Plaintext working copy, relative to the journal root.
    pub plaintext: PathBuf,
    pub state: PairState,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalStatus {
    pub root: PathBuf,
    pub recipient: String,
    /// Whether a checklist from a previous unlock is present.
    pub checklist: bool,
    pub files: Vec<PairStatus>,
}

impl JournalStatus {
    /// Whether any pair is currently open.
    pub fn is_unlocked(&self) -> bool {
        self.files.iter().any(|f| f.state != PairState::Sealed)
    }

    pub fn count(&self, state: PairState) -> usize {
        self.files.iter().filter(|f| f.state == state).count()
    }
}
