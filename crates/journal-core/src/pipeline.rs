//! Concurrent unlock: decrypt -> fingerprint -> persist, connected by bounded queues.
//!
//! Each stage runs on its own blocking worker and hands items downstream over a
//! bounded channel, so a slow stage back-pressures the ones before it. Ordering
//! across files is not preserved; per file, a fingerprint is only taken after
//! its decrypt finished and only recorded after it was taken.
//!
//! Workers never terminate the process. The first failure is sent to the
//! supervisor, which cancels the remaining stages, waits for them to wind
//! down, and discards the staged checklist.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checklist::{checklist_key, Checklist, ChecklistEntry, Fingerprint, StagedChecklist};
use crate::cipher::Cipher;
use crate::error::{JournalError, Result};
use crate::pair::FilePair;

/// Progress callback: (files recorded, total files, plaintext just recorded).
pub type ProgressFn = Arc<dyn Fn(usize, usize, &Path) + Send + Sync>;

/// Default capacity of each inter-stage queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Counts down once per recorded file and wakes the supervisor at zero.
#[derive(Debug)]
pub struct CompletionCounter {
    remaining: AtomicUsize,
    notify: Notify,
}

impl CompletionCounter {
    pub fn new(expected: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(expected),
            notify: Notify::new(),
        }
    }

    /// Mark one item complete. Returns how many are still outstanding.
    pub fn record(&self) -> usize {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);
        if previous == 1 {
            self.notify.notify_waiters();
        }
        previous.saturating_sub(1)
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Resolve once every expected item has been recorded.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Result of a completed pipeline run. The checklist is staged, not committed.
pub struct PipelineOutput {
    pub checklist: Checklist,
    pub staged: StagedChecklist,
}

/// Fingerprinted plaintext on its way to the persist stage.
struct Record {
    key: String,
    fingerprint: Fingerprint,
    plaintext: PathBuf,
}

/// State shared read-only by every stage.
struct StageContext {
    root: PathBuf,
    recipient: Arc<str>,
    cipher: Arc<dyn Cipher>,
    cancel: CancellationToken,
}

pub struct UnlockPipeline {
    root: PathBuf,
    recipient: Arc<str>,
    cipher: Arc<dyn Cipher>,
    queue_depth: usize,
    progress: Option<ProgressFn>,
}

impl UnlockPipeline {
    pub fn new(root: PathBuf, recipient: Arc<str>, cipher: Arc<dyn Cipher>) -> Self {
        Self {
            root,
            recipient,
            cipher,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            progress: None,
        }
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    pub fn progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Decrypt, fingerprint, and record every pair.
    ///
    /// On success the returned checklist holds exactly one record per pair and
    /// has been written to the staging file. On failure every worker has
    /// stopped and the staging file is gone; plaintexts already written are
    /// left for the caller to roll back.
    pub async fn run(self, pairs: Vec<FilePair>) -> Result<PipelineOutput> {
        let total = pairs.len();
        let staged = StagedChecklist::create(&self.root)?;
        let counter = Arc::new(CompletionCounter::new(total));
        let cancel = CancellationToken::new();
        let ctx = Arc::new(StageContext {
            root: self.root.clone(),
            recipient: self.recipient.clone(),
            cipher: self.cipher.clone(),
            cancel: cancel.clone(),
        });

        let (pair_tx, pair_rx) = mpsc::channel::<FilePair>(self.queue_depth);
        let (decrypted_tx, decrypted_rx) = mpsc::channel::<FilePair>(self.queue_depth);
        let (record_tx, record_rx) = mpsc::channel::<Record>(self.queue_depth);
        let (error_tx, mut error_rx) = mpsc::channel::<JournalError>(3);

        info!(files = total, queue_depth = self.queue_depth, "starting unlock pipeline");

        let feeder = tokio::spawn(feed(pairs, pair_tx, cancel.clone()));
        let decrypt = {
            let (ctx, errors) = (ctx.clone(), error_tx.clone());
            tokio::task::spawn_blocking(move || decrypt_stage(&ctx, pair_rx, decrypted_tx, errors))
        };
        let fingerprint = {
            let (ctx, errors) = (ctx.clone(), error_tx.clone());
            tokio::task::spawn_blocking(move || {
                fingerprint_stage(&ctx, decrypted_rx, record_tx, errors)
            })
        };
        let persist = {
            let (ctx, counter, progress) = (ctx.clone(), counter.clone(), self.progress.clone());
            let errors = error_tx;
            tokio::task::spawn_blocking(move || {
                persist_stage(&ctx, staged, record_rx, &counter, total, progress, errors)
            })
        };

        let outcome = tokio::select! {
            biased;
            _ = counter.wait() => Ok(()),
            failure = error_rx.recv() => Err(failure.unwrap_or_else(|| {
                JournalError::Pipeline(format!(
                    "workers stopped with {} of {} files unrecorded",
                    counter.remaining(),
                    total
                ))
            })),
        };

        if outcome.is_err() {
            cancel.cancel();
        }

        let joined = join_stages(feeder, decrypt, fingerprint, persist).await;

        let err = match (outcome, joined) {
            (Ok(()), Ok(Some((staged, checklist)))) => {
                info!(records = checklist.len(), "unlock pipeline finished");
                return Ok(PipelineOutput { checklist, staged });
            }
            (Ok(()), Ok(None)) => JournalError::Pipeline(
                "persist stage stopped without producing a checklist".to_string(),
            ),
            (Ok(()), Err(err)) => err,
            (Err(err), Ok(Some((staged, _)))) => {
                staged.discard();
                err
            }
            (Err(err), _) => err,
        };
        warn!(error = %err, "unlock pipeline aborted");
        Err(err)
    }
}

async fn feed(pairs: Vec<FilePair>, tx: mpsc::Sender<FilePair>, cancel: CancellationToken) {
    for pair in pairs {
        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = tx.send(pair) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

fn decrypt_stage(
    ctx: &StageContext,
    mut rx: mpsc::Receiver<FilePair>,
    tx: mpsc::Sender<FilePair>,
    errors: mpsc::Sender<JournalError>,
) {
    while let Some(pair) = rx.blocking_recv() {
        if ctx.cancel.is_cancelled() {
            return;
        }
        if let Err(err) = ctx
            .cipher
            .decrypt(pair.encrypted(), pair.plaintext(), &ctx.recipient)
        {
            let _ = errors.try_send(err);
            return;
        }
        debug!(path = %pair.plaintext().display(), "decrypted");
        if tx.blocking_send(pair).is_err() {
            return;
        }
    }
}

fn fingerprint_stage(
    ctx: &StageContext,
    mut rx: mpsc::Receiver<FilePair>,
    tx: mpsc::Sender<Record>,
    errors: mpsc::Sender<JournalError>,
) {
    while let Some(pair) = rx.blocking_recv() {
        if ctx.cancel.is_cancelled() {
            return;
        }
        let record = checklist_key(&ctx.root, pair.plaintext()).and_then(|key| {
            Ok(Record {
                key,
                fingerprint: Fingerprint::of_file(pair.plaintext())?,
                plaintext: pair.plaintext().to_path_buf(),
            })
        });
        match record {
            Ok(record) => {
                if tx.blocking_send(record).is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = errors.try_send(err);
                return;
            }
        }
    }
}

fn persist_stage(
    ctx: &StageContext,
    mut staged: StagedChecklist,
    mut rx: mpsc::Receiver<Record>,
    counter: &CompletionCounter,
    total: usize,
    progress: Option<ProgressFn>,
    errors: mpsc::Sender<JournalError>,
) -> Option<(StagedChecklist, Checklist)> {
    let mut checklist = Checklist::new();

    while let Some(record) = rx.blocking_recv() {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let entry = ChecklistEntry::new(record.key.clone(), record.fingerprint);
        if let Err(err) = staged.append(&entry) {
            let _ = errors.try_send(err);
            staged.discard();
            return None;
        }
        checklist.add_file(record.key, record.fingerprint);

        let remaining = counter.record();
        if let Some(progress) = progress.as_ref() {
            progress(total - remaining, total, &record.plaintext);
        }
    }

    if ctx.cancel.is_cancelled() {
        staged.discard();
        return None;
    }
    Some((staged, checklist))
}

async fn join_stages(
    feeder: JoinHandle<()>,
    decrypt: JoinHandle<()>,
    fingerprint: JoinHandle<()>,
    persist: JoinHandle<Option<(StagedChecklist, Checklist)>>,
) -> Result<Option<(StagedChecklist, Checklist)>> {
    // Await every handle before reporting, so no worker outlives the run.
    let results = (
        feeder.await,
        decrypt.await,
        fingerprint.await,
        persist.await,
    );
    results.0.map_err(|err| stage_panicked("feeder", err))?;
    results.1.map_err(|err| stage_panicked("decrypt", err))?;
    results.2.map_err(|err| stage_panicked("fingerprint", err))?;
    results.3.map_err(|err| stage_panicked("persist", err))
}

fn stage_panicked(stage: &str, err: JoinError) -> JournalError {
    JournalError::Pipeline(format!("{} stage failed: {}", stage, err))
}
