use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use journal_core::checklist::{Checklist, CHECKLIST_FILE, CHECKLIST_STAGING_FILE};
use journal_core::journal::RECIPIENT_FILE;
use journal_core::{
    Cipher, Journal, JournalError, JournalOptions, PairState, ProgressFn, UnlockMode,
};
use tempfile::{tempdir, TempDir};

const SEAL: &[u8] = b"sealed:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Encrypt,
    Decrypt,
}

/// Misbehaviour injected for one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fault {
    /// Report a tool failure.
    Fail(String),
    /// Report a successful decrypt without writing the plaintext.
    SkipWrite(String),
    /// Decrypt normally, then occupy the hidden-marker path with a directory.
    BlockFootprint(String),
}

impl Fault {
    fn name(&self) -> &str {
        match self {
            Fault::Fail(name) | Fault::SkipWrite(name) | Fault::BlockFootprint(name) => name,
        }
    }
}

/// In-process cipher: ciphertext is the plaintext prefixed with `sealed:`.
#[derive(Default)]
struct RecordingCipher {
    calls: Mutex<Vec<(Op, PathBuf)>>,
    fault: Mutex<Option<Fault>>,
}

impl RecordingCipher {
    fn failing_on(name: &str) -> Self {
        Self::with_fault(Fault::Fail(name.to_string()))
    }

    fn with_fault(fault: Fault) -> Self {
        let cipher = Self::default();
        *cipher.fault.lock().unwrap() = Some(fault);
        cipher
    }

    fn fail_on(&self, name: Option<&str>) {
        *self.fault.lock().unwrap() = name.map(|name| Fault::Fail(name.to_string()));
    }

    fn fault_for(&self, path: &Path) -> Option<Fault> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.fault
            .lock()
            .unwrap()
            .clone()
            .filter(|fault| fault.name() == name)
    }

    fn calls(&self, op: Op) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn check_failure(&self, path: &Path) -> journal_core::Result<()> {
        if let Some(Fault::Fail(_)) = self.fault_for(path) {
            return Err(JournalError::ExternalTool {
                tool: "fake-gpg".to_string(),
                path: path.to_path_buf(),
                message: "no secret key".to_string(),
            });
        }
        Ok(())
    }
}

impl Cipher for RecordingCipher {
    fn decrypt(&self, encrypted: &Path, plaintext: &Path, _recipient: &str) -> journal_core::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((Op::Decrypt, encrypted.to_path_buf()));
        self.check_failure(encrypted)?;
        let fault = self.fault_for(encrypted);
        if let Some(Fault::SkipWrite(_)) = fault {
            return Ok(());
        }
        let sealed = fs::read(encrypted).expect("ciphertext should exist");
        let body = sealed.strip_prefix(SEAL).expect("ciphertext should be sealed");
        fs::write(plaintext, body).expect("write plaintext");
        if let Some(Fault::BlockFootprint(name)) = fault {
            let marker = encrypted.with_file_name(format!(".{}", name));
            fs::create_dir(&marker).unwrap();
            fs::write(marker.join("occupied"), b"").unwrap();
        }
        Ok(())
    }

    fn encrypt(&self, plaintext: &Path, encrypted: &Path, _recipient: &str) -> journal_core::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((Op::Encrypt, plaintext.to_path_buf()));
        self.check_failure(plaintext)?;
        let mut sealed = SEAL.to_vec();
        sealed.extend(fs::read(plaintext).expect("plaintext should exist"));
        fs::write(encrypted, sealed).expect("write ciphertext");
        Ok(())
    }
}

fn journal_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(RECIPIENT_FILE), "me@example.com\n").unwrap();
    for (name, body) in files {
        let path = dir.path().join(format!("{}.gpg", name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut sealed = SEAL.to_vec();
        sealed.extend(body.as_bytes());
        fs::write(path, sealed).unwrap();
    }
    dir
}

fn open(dir: &Path, mode: UnlockMode, cipher: &Arc<RecordingCipher>) -> Journal {
    let options = JournalOptions {
        unlock_mode: mode,
        queue_depth: 2,
        ..JournalOptions::default()
    };
    Journal::open(dir, options, cipher.clone()).expect("journal should open")
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != RECIPIENT_FILE)
        .collect();
    names.sort();
    names
}

async fn scenario_unlock_edit_lock(mode: UnlockMode) {
    let dir = journal_dir(&[("a", "alpha"), ("b", "bravo")]);
    let cipher = Arc::new(RecordingCipher::default());
    let original_a = fs::read(dir.path().join("a.gpg")).unwrap();

    let report = open(dir.path(), mode, &cipher).unlock(None).await.unwrap();
    assert_eq!(report.opened, 2);
    assert_eq!(report.recorded, 2);
    assert_eq!(listing(dir.path()), vec![".a.gpg", ".b.gpg", ".check", "a", "b"]);
    assert_eq!(fs::read_to_string(dir.path().join("a")).unwrap(), "alpha");

    let checklist = Checklist::load(dir.path()).unwrap();
    assert_eq!(checklist.len(), 2);

    fs::write(dir.path().join("b"), "bravo, revised").unwrap();

    let report = open(dir.path(), mode, &cipher).lock().unwrap();
    assert_eq!(report.resealed, vec![PathBuf::from("b.gpg")]);
    assert_eq!(report.restored, vec![PathBuf::from("a.gpg")]);
    assert_eq!(report.removed_plaintexts, 2);

    assert_eq!(listing(dir.path()), vec!["a.gpg", "b.gpg"]);
    assert_eq!(fs::read(dir.path().join("a.gpg")).unwrap(), original_a);
    assert_eq!(
        fs::read(dir.path().join("b.gpg")).unwrap(),
        b"sealed:bravo, revised"
    );
    assert_eq!(cipher.calls(Op::Encrypt), vec!["b"]);
}

#[tokio::test]
async fn test_unlock_edit_lock_pipelined() {
    scenario_unlock_edit_lock(UnlockMode::Pipelined).await;
}

#[tokio::test]
async fn test_unlock_edit_lock_sequential() {
    scenario_unlock_edit_lock(UnlockMode::Sequential).await;
}

#[tokio::test]
async fn test_lock_reencrypts_only_changed_file() {
    let dir = journal_dir(&[("a", "1"), ("b", "2"), ("c", "3")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    fs::write(dir.path().join("b"), "two").unwrap();

    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();

    assert_eq!(cipher.calls(Op::Encrypt), vec!["b"]);
    assert_eq!(report.restored.len(), 2);
    assert_eq!(listing(dir.path()), vec!["a.gpg", "b.gpg", "c.gpg"]);
}

#[tokio::test]
async fn test_lock_without_edits_rewrites_nothing_and_consumes_checklist() {
    let dir = journal_dir(&[("a", "1"), ("b", "2")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();
    assert!(report.resealed.is_empty());
    assert!(cipher.calls(Op::Encrypt).is_empty());
    assert!(!dir.path().join(CHECKLIST_FILE).exists());

    let err = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .lock()
        .unwrap_err();
    assert!(matches!(err, JournalError::MissingChecklist { .. }));
}

#[test]
fn test_lock_without_unlock_reports_missing_checklist() {
    let dir = journal_dir(&[("a", "1")]);
    let cipher = Arc::new(RecordingCipher::default());

    let err = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .lock()
        .unwrap_err();
    assert!(matches!(err, JournalError::MissingChecklist { .. }));
    assert_eq!(listing(dir.path()), vec!["a.gpg"]);
}

async fn scenario_failed_unlock_rolls_back(mode: UnlockMode) {
    let dir = journal_dir(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")]);
    fs::write(dir.path().join(CHECKLIST_FILE), "previous").unwrap();
    let cipher = Arc::new(RecordingCipher::failing_on("c.gpg"));

    let err = open(dir.path(), mode, &cipher)
        .unlock(None)
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::ExternalTool { .. }));

    assert_eq!(
        listing(dir.path()),
        vec![".check", "a.gpg", "b.gpg", "c.gpg", "d.gpg", "e.gpg"]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join(CHECKLIST_FILE)).unwrap(),
        "previous"
    );
    assert!(!dir.path().join(CHECKLIST_STAGING_FILE).exists());
}

#[tokio::test]
async fn test_failed_unlock_rolls_back_pipelined() {
    scenario_failed_unlock_rolls_back(UnlockMode::Pipelined).await;
}

#[tokio::test]
async fn test_failed_unlock_rolls_back_sequential() {
    scenario_failed_unlock_rolls_back(UnlockMode::Sequential).await;
}

#[tokio::test]
async fn test_failed_lock_can_be_rerun() {
    let dir = journal_dir(&[("a", "1"), ("b", "2"), ("c", "3")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    fs::write(dir.path().join("a"), "one").unwrap();
    fs::write(dir.path().join("c"), "three").unwrap();

    cipher.fail_on(Some("c"));
    let err = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .lock()
        .unwrap_err();
    assert!(matches!(err, JournalError::ExternalTool { .. }));
    // Checklist and plaintexts survive; c is still open.
    assert!(dir.path().join(CHECKLIST_FILE).exists());
    assert!(dir.path().join("c").exists());
    assert!(dir.path().join(".c.gpg").exists());

    cipher.fail_on(None);
    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();
    // `a` was sealed by the failed run but still differs from the checklist.
    assert_eq!(
        report.resealed,
        vec![PathBuf::from("a.gpg"), PathBuf::from("c.gpg")]
    );
    assert_eq!(report.skipped, 1);

    assert_eq!(listing(dir.path()), vec!["a.gpg", "b.gpg", "c.gpg"]);
    assert_eq!(fs::read(dir.path().join("a.gpg")).unwrap(), b"sealed:one");
    assert_eq!(fs::read(dir.path().join("b.gpg")).unwrap(), b"sealed:2");
    assert_eq!(fs::read(dir.path().join("c.gpg")).unwrap(), b"sealed:three");
}

#[tokio::test]
async fn test_rerun_lock_keeps_edits_made_after_failed_lock() {
    let dir = journal_dir(&[("a", "1"), ("c", "3")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    fs::write(dir.path().join("c"), "three").unwrap();

    cipher.fail_on(Some("c"));
    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .lock()
        .unwrap_err();
    // `a` was restored untouched; its plaintext is still on disk and gets edited.
    assert!(dir.path().join("a.gpg").exists());
    fs::write(dir.path().join("a"), "important edit").unwrap();

    let status = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .status()
        .unwrap();
    assert_eq!(status.files[0].state, PairState::Modified);
    assert_eq!(status.files[1].state, PairState::Modified);

    cipher.fail_on(None);
    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();
    assert_eq!(
        report.resealed,
        vec![PathBuf::from("a.gpg"), PathBuf::from("c.gpg")]
    );
    assert_eq!(report.removed_plaintexts, 2);

    assert_eq!(listing(dir.path()), vec!["a.gpg", "c.gpg"]);
    assert_eq!(
        fs::read(dir.path().join("a.gpg")).unwrap(),
        b"sealed:important edit"
    );
    assert_eq!(fs::read(dir.path().join("c.gpg")).unwrap(), b"sealed:three");
}

#[tokio::test]
async fn test_rerun_lock_skips_untouched_sealed_pairs() {
    let dir = journal_dir(&[("a", "1"), ("c", "3")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    fs::write(dir.path().join("c"), "three").unwrap();

    cipher.fail_on(Some("c"));
    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .lock()
        .unwrap_err();

    let status = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .status()
        .unwrap();
    assert_eq!(status.files[0].state, PairState::Sealed);

    cipher.fail_on(None);
    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();
    assert_eq!(report.resealed, vec![PathBuf::from("c.gpg")]);
    assert_eq!(report.skipped, 1);
    assert_eq!(cipher.calls(Op::Encrypt), vec!["c", "c"]);
    assert_eq!(listing(dir.path()), vec!["a.gpg", "c.gpg"]);
}

#[tokio::test]
async fn test_unreadable_plaintext_aborts_pipelined_unlock() {
    let dir = journal_dir(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
    let cipher = Arc::new(RecordingCipher::with_fault(Fault::SkipWrite(
        "c.gpg".to_string(),
    )));
    let options = JournalOptions {
        queue_depth: 1,
        ..JournalOptions::default()
    };

    let err = Journal::open(dir.path(), options, cipher.clone())
        .unwrap()
        .unlock(None)
        .await
        .unwrap_err();
    match err {
        JournalError::Io { path, .. } => assert_eq!(path, dir.path().join("c")),
        other => panic!("unexpected: {:?}", other),
    }

    assert_eq!(listing(dir.path()), vec!["a.gpg", "b.gpg", "c.gpg", "d.gpg"]);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_checklist_write_failure_aborts_pipelined_unlock() {
    if !Path::new("/dev/full").exists() {
        return;
    }
    // Enough records to overflow the writer's buffer mid-run.
    let names: Vec<String> = (0..200).map(|i| format!("entry-{:03}", i)).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), n.as_str())).collect();
    let dir = journal_dir(&files);
    let staging = dir.path().join(CHECKLIST_STAGING_FILE);
    std::os::unix::fs::symlink("/dev/full", &staging).unwrap();
    let cipher = Arc::new(RecordingCipher::default());

    let err = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Io { .. }), "{:?}", err);

    assert!(fs::symlink_metadata(&staging).is_err());
    let expected: Vec<String> = names.iter().map(|n| format!("{}.gpg", n)).collect();
    assert_eq!(listing(dir.path()), expected);
}

async fn scenario_checklist_commit_failure_rolls_back(mode: UnlockMode) {
    let dir = journal_dir(&[("a", "1"), ("b", "2"), ("c", "3")]);
    // A non-empty directory where the checklist belongs cannot be replaced.
    fs::create_dir(dir.path().join(CHECKLIST_FILE)).unwrap();
    fs::write(dir.path().join(CHECKLIST_FILE).join("keep"), b"").unwrap();
    let cipher = Arc::new(RecordingCipher::default());

    let err = open(dir.path(), mode, &cipher)
        .unlock(None)
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Io { .. }), "{:?}", err);

    assert_eq!(
        listing(dir.path()),
        vec![".check", "a.gpg", "b.gpg", "c.gpg"]
    );
    assert!(dir.path().join(CHECKLIST_FILE).join("keep").exists());
    assert!(!dir.path().join(CHECKLIST_STAGING_FILE).exists());
}

#[tokio::test]
async fn test_checklist_commit_failure_rolls_back_pipelined() {
    scenario_checklist_commit_failure_rolls_back(UnlockMode::Pipelined).await;
}

#[tokio::test]
async fn test_checklist_commit_failure_rolls_back_sequential() {
    scenario_checklist_commit_failure_rolls_back(UnlockMode::Sequential).await;
}

async fn scenario_blocked_footprint_rolls_back(mode: UnlockMode) {
    let dir = journal_dir(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
    let cipher = Arc::new(RecordingCipher::with_fault(Fault::BlockFootprint(
        "c.gpg".to_string(),
    )));

    let err = open(dir.path(), mode, &cipher)
        .unlock(None)
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Io { .. }), "{:?}", err);

    // Only the obstruction placed by the cipher remains besides the sealed set.
    assert_eq!(
        listing(dir.path()),
        vec![".c.gpg", "a.gpg", "b.gpg", "c.gpg", "d.gpg"]
    );
    assert!(dir.path().join(".c.gpg").is_dir());
    assert!(!dir.path().join(CHECKLIST_FILE).exists());
    assert!(!dir.path().join(CHECKLIST_STAGING_FILE).exists());
    assert_eq!(fs::read(dir.path().join("a.gpg")).unwrap(), b"sealed:1");
}

#[tokio::test]
async fn test_blocked_footprint_rolls_back_pipelined() {
    scenario_blocked_footprint_rolls_back(UnlockMode::Pipelined).await;
}

#[tokio::test]
async fn test_blocked_footprint_rolls_back_sequential() {
    scenario_blocked_footprint_rolls_back(UnlockMode::Sequential).await;
}

#[tokio::test]
async fn test_dotted_document_unlocks_and_locks() {
    let dir = journal_dir(&[("a", "alpha"), (".secret", "hidden body")]);
    let cipher = Arc::new(RecordingCipher::default());

    let status = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .status()
        .unwrap();
    assert_eq!(status.count(PairState::Sealed), 2);

    let report = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    assert_eq!(report.opened, 2);
    assert_eq!(
        listing(dir.path()),
        vec!["..secret.gpg", ".a.gpg", ".check", ".secret", "a"]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join(".secret")).unwrap(),
        "hidden body"
    );

    fs::write(dir.path().join(".secret"), "revised body").unwrap();
    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();
    assert_eq!(report.resealed, vec![PathBuf::from(".secret.gpg")]);
    assert_eq!(report.restored, vec![PathBuf::from("a.gpg")]);

    assert_eq!(listing(dir.path()), vec![".secret.gpg", "a.gpg"]);
    assert_eq!(
        fs::read(dir.path().join(".secret.gpg")).unwrap(),
        b"sealed:revised body"
    );
}

#[tokio::test]
async fn test_unlock_refuses_when_already_unlocked() {
    let dir = journal_dir(&[("a", "1")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    fs::write(dir.path().join("a"), "edited").unwrap();

    let err = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::AlreadyUnlocked { .. }));
    assert_eq!(fs::read_to_string(dir.path().join("a")).unwrap(), "edited");
}

#[tokio::test]
async fn test_unlock_refuses_to_overwrite_existing_plaintext() {
    let dir = journal_dir(&[("a", "1")]);
    fs::write(dir.path().join("a"), "stray").unwrap();
    let cipher = Arc::new(RecordingCipher::default());

    let err = open(dir.path(), UnlockMode::Sequential, &cipher)
        .unlock(None)
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::AlreadyUnlocked { .. }));
    assert!(cipher.calls(Op::Decrypt).is_empty());
    assert_eq!(fs::read_to_string(dir.path().join("a")).unwrap(), "stray");
}

#[tokio::test]
async fn test_pipeline_records_every_file_with_small_queues() {
    let names: Vec<String> = (0..40).map(|i| format!("entry-{:02}", i)).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), n.as_str())).collect();
    let dir = journal_dir(&files);
    let cipher = Arc::new(RecordingCipher::default());

    let seen = Arc::new(AtomicUsize::new(0));
    let progress: ProgressFn = {
        let seen = seen.clone();
        Arc::new(move |done: usize, total: usize, _path: &Path| {
            assert!(done <= total);
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };

    let options = JournalOptions {
        queue_depth: 1,
        ..JournalOptions::default()
    };
    let journal = Journal::open(dir.path(), options, cipher.clone()).unwrap();
    let report = journal.unlock(Some(progress)).await.unwrap();

    assert_eq!(report.recorded, 40);
    assert_eq!(seen.load(Ordering::SeqCst), 40);
    let checklist = Checklist::load(dir.path()).unwrap();
    for name in &names {
        assert!(checklist.contains(Path::new(name)));
    }
}

#[tokio::test]
async fn test_nested_directories_round_trip() {
    let dir = journal_dir(&[("2024/01/new-year", "resolutions"), ("top", "level")]);
    let cipher = Arc::new(RecordingCipher::default());

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    assert!(dir.path().join("2024/01/.new-year.gpg").exists());
    let checklist = Checklist::load(dir.path()).unwrap();
    assert!(checklist.contains(Path::new("2024/01/new-year")));

    fs::write(dir.path().join("2024/01/new-year"), "fewer resolutions").unwrap();
    let report = open(dir.path(), UnlockMode::Pipelined, &cipher).lock().unwrap();
    assert_eq!(report.resealed, vec![PathBuf::from("2024/01/new-year.gpg")]);
    assert!(!dir.path().join("2024/01/new-year").exists());
}

#[tokio::test]
async fn test_status_tracks_pair_states() {
    let dir = journal_dir(&[("a", "1"), ("b", "2")]);
    let cipher = Arc::new(RecordingCipher::default());

    let status = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .status()
        .unwrap();
    assert!(!status.checklist);
    assert!(!status.is_unlocked());
    assert_eq!(status.count(PairState::Sealed), 2);

    open(dir.path(), UnlockMode::Pipelined, &cipher)
        .unlock(None)
        .await
        .unwrap();
    fs::write(dir.path().join("b"), "changed").unwrap();

    let status = open(dir.path(), UnlockMode::Pipelined, &cipher)
        .status()
        .unwrap();
    assert!(status.checklist);
    assert!(status.is_unlocked());
    let states: Vec<_> = status.files.iter().map(|f| f.state).collect();
    assert_eq!(states, vec![PairState::Open, PairState::Modified]);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["files"][1]["state"], "modified");
    assert_eq!(json["files"][1]["visibility"], "hidden");
}

#[test]
fn test_open_without_recipient_is_not_initialized() {
    let dir = tempdir().unwrap();
    let cipher: Arc<RecordingCipher> = Arc::new(RecordingCipher::default());
    let err = Journal::open(dir.path(), JournalOptions::default(), cipher)
        .err()
        .expect("open should fail");
    assert!(matches!(err, JournalError::NotInitialized { .. }));
}
