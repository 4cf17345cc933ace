//! The synchronization engine: unlock, lock, and status for one journal root.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::checklist::{
    checklist_key, Checklist, Fingerprint, CHECKLIST_FILE, CHECKLIST_STAGING_FILE,
};
use crate::cipher::Cipher;
use crate::error::{IoContext, JournalError, Result};
use crate::fs::{is_hidden_below, remove_if_exists};
use crate::pair::{discover, FilePair, DEFAULT_SUFFIX};
use crate::pipeline::{ProgressFn, UnlockPipeline, DEFAULT_QUEUE_DEPTH};
use crate::report::{JournalStatus, LockReport, PairState, PairStatus, UnlockMode, UnlockReport};

/// File at the journal root holding the recipient identity.
pub const RECIPIENT_FILE: &str = ".gpgid";

/// Engine settings that are not stored in the journal itself.
#[derive(Debug, Clone)]
pub struct JournalOptions {
    /// Suffix identifying encrypted artifacts.
    pub suffix: String,
    pub unlock_mode: UnlockMode,
    /// Capacity of each pipeline queue.
    pub queue_depth: usize,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            unlock_mode: UnlockMode::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// One journal directory, its recipient, and the pairs found in it.
///
/// Built fresh per invocation; the filesystem is the only persisted state.
#[derive(Clone)]
pub struct Journal {
    root: PathBuf,
    recipient: Arc<str>,
    pairs: Vec<FilePair>,
    options: JournalOptions,
    cipher: Arc<dyn Cipher>,
}

impl Journal {
    /// Write the recipient identity file, creating `root` if needed.
    pub fn init(root: &Path, recipient: &str, force: bool) -> Result<PathBuf> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(JournalError::InvalidInput(
                "recipient must not be empty".to_string(),
            ));
        }
        if recipient.contains(['\n', '\r']) {
            return Err(JournalError::InvalidInput(
                "recipient must fit on one line".to_string(),
            ));
        }

        fs::create_dir_all(root).at(root)?;
        let path = root.join(RECIPIENT_FILE);
        if path.exists() && !force {
            return Err(JournalError::AlreadyInitialized { path });
        }
        fs::write(&path, format!("{}\n", recipient)).at(&path)?;
        info!(path = %path.display(), "initialized journal");
        Ok(path)
    }

    /// Read the recipient identity and discover every pair under `root`.
    pub fn open(
        root: impl Into<PathBuf>,
        options: JournalOptions,
        cipher: Arc<dyn Cipher>,
    ) -> Result<Self> {
        let root = root.into();
        let recipient = read_recipient(&root)?;
        let pairs = discover(&root, &options.suffix)?;

        debug!(root = %root.display(), pairs = pairs.len(), "opened journal");
        Ok(Self {
            root,
            recipient: Arc::from(recipient),
            pairs,
            options,
            cipher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pairs(&self) -> &[FilePair] {
        &self.pairs
    }

    /// Decrypt every pair, hide its ciphertext, and snapshot the plaintexts.
    ///
    /// All or nothing: on failure, hidden artifacts are restored, plaintexts
    /// written by this run are removed, and any previous checklist is left as
    /// it was.
    pub async fn unlock(&self, progress: Option<ProgressFn>) -> Result<UnlockReport> {
        self.ensure_sealed()?;

        let report = match self.options.unlock_mode {
            UnlockMode::Pipelined => self.unlock_pipelined(progress).await?,
            UnlockMode::Sequential => {
                let journal = self.clone();
                tokio::task::spawn_blocking(move || journal.unlock_sequential(progress))
                    .await
                    .map_err(|err| JournalError::Pipeline(format!("unlock worker failed: {}", err)))??
            }
        };

        info!(
            mode = %report.mode,
            opened = report.opened,
            recorded = report.recorded,
            "journal unlocked"
        );
        Ok(report)
    }

    async fn unlock_pipelined(&self, progress: Option<ProgressFn>) -> Result<UnlockReport> {
        let pipeline = UnlockPipeline::new(
            self.root.clone(),
            self.recipient.clone(),
            self.cipher.clone(),
        )
        .queue_depth(self.options.queue_depth)
        .progress(progress);

        let output = match pipeline.run(self.pairs.clone()).await {
            Ok(output) => output,
            Err(err) => {
                self.rollback(&[]);
                return Err(err);
            }
        };

        let mut hidden = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            if let Err(err) = pair.leave_footprint() {
                output.staged.discard();
                self.rollback(&hidden);
                return Err(err);
            }
            hidden.push(pair);
        }

        let recorded = output.checklist.len();
        if let Err(err) = output.staged.commit() {
            self.rollback(&hidden);
            return Err(err);
        }

        Ok(UnlockReport {
            mode: UnlockMode::Pipelined,
            opened: hidden.len(),
            recorded,
        })
    }

    fn unlock_sequential(&self, progress: Option<ProgressFn>) -> Result<UnlockReport> {
        let total = self.pairs.len();
        let mut hidden = Vec::with_capacity(total);

        for (done, pair) in self.pairs.iter().enumerate() {
            let opened = self
                .cipher
                .decrypt(pair.encrypted(), pair.plaintext(), &self.recipient)
                .and_then(|()| pair.leave_footprint());
            if let Err(err) = opened {
                self.rollback(&hidden);
                return Err(err);
            }
            hidden.push(pair);
            if let Some(progress) = progress.as_ref() {
                progress(done + 1, total, pair.plaintext());
            }
        }

        let root = self.root.as_path();
        let checklist = Checklist::from_dir(root, |path, metadata| {
            metadata.is_file() && !is_hidden_below(root, path)
        })
        .and_then(|checklist| checklist.persist(root).map(|()| checklist));

        match checklist {
            Ok(checklist) => Ok(UnlockReport {
                mode: UnlockMode::Sequential,
                opened: hidden.len(),
                recorded: checklist.len(),
            }),
            Err(err) => {
                self.rollback(&hidden);
                Err(err)
            }
        }
    }

    /// Re-seal changed plaintexts, restore untouched ciphertexts, and clean up.
    ///
    /// Plaintexts and the checklist are only removed after every pair has been
    /// handled, so a lock aborted by a cipher failure can simply be re-run. A
    /// re-run also re-encrypts pairs the aborted run already sealed if their
    /// plaintext has changed since the checklist was taken.
    pub fn lock(&self) -> Result<LockReport> {
        let checklist = Checklist::load(&self.root)?;
        let changed: HashSet<PathBuf> = checklist.diff(&self.root)?.into_iter().collect();
        debug!(changed = changed.len(), recorded = checklist.len(), "computed diff");

        let mut report = LockReport::default();
        let mut resealed_keys = HashSet::new();

        for pair in &self.pairs {
            let key = PathBuf::from(checklist_key(&self.root, pair.plaintext())?);

            if !pair.is_open() {
                // Sealed by an aborted lock that left the plaintext behind.
                if changed.contains(&key) && pair.plaintext().exists() {
                    self.cipher
                        .encrypt(pair.plaintext(), pair.encrypted(), &self.recipient)?;
                    debug!(path = %pair.encrypted().display(), "re-encrypted sealed pair");
                    report.resealed.push(self.relative(pair.encrypted()));
                    resealed_keys.insert(key);
                } else {
                    debug!(path = %pair.encrypted().display(), "already sealed");
                    report.skipped += 1;
                }
                continue;
            }

            let recorded = checklist.contains(&key);

            if recorded && !changed.contains(&key) {
                pair.restore_footprint()?;
                report.restored.push(self.relative(pair.encrypted()));
                continue;
            }

            if !recorded {
                warn!(
                    path = %pair.plaintext().display(),
                    "plaintext not in checklist, re-encrypting"
                );
                if !pair.plaintext().exists() {
                    return Err(JournalError::io(
                        pair.plaintext(),
                        io::Error::new(io::ErrorKind::NotFound, "plaintext working copy is missing"),
                    ));
                }
            }

            self.cipher
                .encrypt(pair.plaintext(), pair.encrypted(), &self.recipient)?;
            pair.remove_footprint()?;
            debug!(path = %pair.encrypted().display(), "re-encrypted");
            report.resealed.push(self.relative(pair.encrypted()));
            resealed_keys.insert(key);
        }

        for pair in &self.pairs {
            let key = PathBuf::from(checklist_key(&self.root, pair.plaintext())?);
            if (checklist.contains(&key) || resealed_keys.contains(&key)) && pair.remove_plaintext()? {
                report.removed_plaintexts += 1;
            }
        }

        let checklist_path = self.root.join(CHECKLIST_FILE);
        fs::remove_file(&checklist_path).at(&checklist_path)?;

        info!(
            resealed = report.resealed.len(),
            restored = report.restored.len(),
            skipped = report.skipped,
            "journal locked"
        );
        Ok(report)
    }

    /// Report the state of every pair without touching the tree.
    pub fn status(&self) -> Result<JournalStatus> {
        let checklist = match Checklist::load(&self.root) {
            Ok(checklist) => Some(checklist),
            Err(JournalError::MissingChecklist { .. }) => None,
            Err(err) => return Err(err),
        };

        let mut files = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            let key = checklist_key(&self.root, pair.plaintext())?;
            let recorded = checklist
                .as_ref()
                .and_then(|checklist| checklist.get(Path::new(&key)));
            let matches_record = |fingerprint: Fingerprint| {
                Fingerprint::of_file(pair.plaintext()).ok() == Some(fingerprint)
            };

            let state = if !pair.is_open() {
                // A leftover plaintext edited after an aborted lock still needs sealing.
                match recorded {
                    Some(fingerprint)
                        if pair.plaintext().exists() && !matches_record(fingerprint) =>
                    {
                        PairState::Modified
                    }
                    _ => PairState::Sealed,
                }
            } else if !pair.plaintext().exists() {
                PairState::Missing
            } else {
                match recorded {
                    Some(fingerprint) if matches_record(fingerprint) => PairState::Open,
                    _ => PairState::Modified,
                }
            };

            files.push(PairStatus {
                encrypted: self.relative(pair.encrypted()),
                plaintext: self.relative(pair.plaintext()),
                state,
                visibility: pair.visibility(),
            });
        }

        Ok(JournalStatus {
            root: self.root.clone(),
            recipient: self.recipient.to_string(),
            checklist: checklist.is_some(),
            files,
        })
    }

    /// Refuse to unlock over open pairs or existing plaintexts.
    fn ensure_sealed(&self) -> Result<()> {
        for pair in &self.pairs {
            if pair.is_open() {
                return Err(JournalError::AlreadyUnlocked { path: pair.hidden() });
            }
            if pair.plaintext().exists() {
                return Err(JournalError::AlreadyUnlocked {
                    path: pair.plaintext().to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Undo a failed unlock. Failures here are logged, not returned, so the
    /// original error reaches the caller.
    fn rollback(&self, hidden: &[&FilePair]) {
        warn!(hidden = hidden.len(), "rolling back unlock");

        for pair in hidden {
            if let Err(err) = pair.restore_footprint() {
                warn!(error = %err, "could not restore footprint");
            }
        }
        // `ensure_sealed` guaranteed no plaintext existed before this run.
        for pair in &self.pairs {
            if let Err(err) = pair.remove_plaintext() {
                warn!(error = %err, "could not remove plaintext");
            }
        }
        let staging = self.root.join(CHECKLIST_STAGING_FILE);
        if let Err(err) = remove_if_exists(&staging) {
            warn!(path = %staging.display(), error = %err, "could not remove staging checklist");
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }
}

/// Read the recipient identity at the journal root.
///
/// The file holds exactly one non-blank line; surrounding whitespace and blank
/// lines are ignored.
pub fn read_recipient(root: &Path) -> Result<String> {
    let path = root.join(RECIPIENT_FILE);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(JournalError::NotInitialized {
                root: root.to_path_buf(),
            });
        }
        Err(err) => return Err(JournalError::io(&path, err)),
    };

    let mut lines = contents.lines().map(str::trim).filter(|line| !line.is_empty());
    match (lines.next(), lines.next()) {
        (Some(recipient), None) => Ok(recipient.to_string()),
        (None, _) => Err(JournalError::InvalidInput(format!(
            "{} does not name a recipient",
            path.display()
        ))),
        (Some(_), Some(_)) => Err(JournalError::InvalidInput(format!(
            "{} must name a single recipient on one line",
            path.display()
        ))),
    }
}
