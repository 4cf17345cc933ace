//! Error types for Journal core operations.
//!
//! Every error that can abort an unlock or lock surfaces here. Errors name
//! the path they concern; the CLI layer maps them to exit codes and hints.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for Journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Core error type for Journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The recipient identity file is missing from the journal root.
    #[error("Journal at {} is not initialized (no .gpgid file)", root.display())]
    NotInitialized { root: PathBuf },

    /// Lock was invoked without a checklist from a prior unlock.
    #[error("No checklist found at {}", path.display())]
    MissingChecklist { path: PathBuf },

    /// Init refused because a recipient identity already exists.
    #[error("Journal at {} is already initialized", path.display())]
    AlreadyInitialized { path: PathBuf },

    /// Unlock refused because a file is already open for editing.
    #[error("{} is already unlocked", path.display())]
    AlreadyUnlocked { path: PathBuf },

    /// Filesystem read/write/rename/remove failure.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The encryption or decryption tool reported a failure.
    #[error("{tool} failed on {}: {message}", path.display())]
    ExternalTool {
        tool: String,
        path: PathBuf,
        message: String,
    },

    /// Malformed checklist line.
    #[error("Checklist line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid user input (empty recipient, bad configuration value).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pipeline worker stopped before finishing its work.
    #[error("Unlock pipeline error: {0}")]
    Pipeline(String),
}

impl JournalError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        JournalError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        JournalError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Attach a path to bare `io::Result`s.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|err| JournalError::io(path, err))
    }
}
