//! # Journal Core
//!
//! Core library for Journal - keeps a directory of encrypted text files that
//! can be opened for plaintext editing and re-sealed afterwards.
//!
//! This crate holds the synchronization engine independent of the CLI.
//!
//! ## Architecture
//!
//! - **checklist**: Fingerprint store written at unlock and diffed at lock
//! - **pair**: Encrypted/plaintext file pairs, footprints, and discovery
//! - **cipher**: The external encryption capability (`gpg`)
//! - **pipeline**: Concurrent decrypt -> fingerprint -> persist runner
//! - **journal**: The `Journal` engine driving unlock, lock, and status
//!
//! ## Protocol
//!
//! `unlock` decrypts every `name.gpg` to `name`, hides the ciphertext as
//! `.name.gpg`, and records a fingerprint of every plaintext in `.check`.
//! `lock` re-encrypts only the plaintexts whose fingerprint changed, restores
//! the untouched ciphertexts, and removes the plaintexts and the checklist.

pub mod checklist;
pub mod cipher;
pub mod error;
pub mod fs;
pub mod journal;
pub mod pair;
pub mod pipeline;
pub mod report;

pub use checklist::{Checklist, ChecklistEntry, Fingerprint};
pub use cipher::{Cipher, GpgCipher};
pub use error::{JournalError, Result};
pub use journal::{Journal, JournalOptions};
pub use pair::{FilePair, Visibility};
pub use pipeline::ProgressFn;
pub use report::{JournalStatus, LockReport, PairState, PairStatus, UnlockMode, UnlockReport};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
