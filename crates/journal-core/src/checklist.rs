//! Checklist: the ordered (path, fingerprint) snapshot taken at unlock time.
//!
//! The on-disk form is one record per line, `"<hex-fingerprint> <path>"`, in
//! insertion order. Paths are stored relative to the journal root with `/`
//! separators; an absolute path read from disk is used as-is.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{IoContext, JournalError, Result};
use crate::fs::{remove_if_exists, rename_with_fallback};

/// File name of the persisted checklist at the journal root.
pub const CHECKLIST_FILE: &str = ".check";

/// Staging name the checklist is written under before it is committed.
pub const CHECKLIST_STAGING_FILE: &str = ".check.tmp";

/// Content digest used for change detection (BLAKE3, 32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Width of the hex form.
    pub const HEX_LEN: usize = 64;

    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Read a whole file and fingerprint its exact bytes.
    pub fn of_file(path: &Path) -> Result<Self> {
        let content = fs::read(path).at(path)?;
        Ok(Self::of(&content))
    }

    /// Parse the 64-character hex form.
    pub fn from_hex(value: &str) -> Option<Self> {
        if value.len() != Self::HEX_LEN || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        blake3::Hash::from_hex(value)
            .ok()
            .map(|hash| Self(*hash.as_bytes()))
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One checklist record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistEntry {
    path: String,
    fingerprint: Fingerprint,
}

impl ChecklistEntry {
    pub fn new(path: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }

    /// Path as recorded (relative to the root unless it was stored absolute).
    pub fn path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The serialized line, without a trailing newline.
    pub fn to_line(&self) -> String {
        format!("{} {}", self.fingerprint, self.path)
    }
}

/// Ordered fingerprint store with unique paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checklist {
    entries: Vec<ChecklistEntry>,
    index: HashMap<String, usize>,
}

impl Checklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` and fingerprint every file for which `filter` holds.
    ///
    /// The walk is sorted by file name so repeated scans of an unchanged tree
    /// produce the same order. The first unreadable entry aborts the scan.
    pub fn from_dir<F>(root: &Path, mut filter: F) -> Result<Self>
    where
        F: FnMut(&Path, &fs::Metadata) -> bool,
    {
        let mut checklist = Self::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(root).to_path_buf();
                JournalError::io(path, io::Error::from(err))
            })?;
            let metadata = entry.metadata().map_err(|err| {
                JournalError::io(entry.path(), io::Error::from(err))
            })?;

            if !filter(entry.path(), &metadata) {
                continue;
            }

            checklist.collect(root, entry.path())?;
        }

        debug!(root = %root.display(), files = checklist.len(), "scanned directory");
        Ok(checklist)
    }

    /// Parse a serialized checklist, one `"<fingerprint> <path>"` record per line.
    ///
    /// End of input terminates parsing; a read failure or a malformed line is a
    /// `Parse` error naming the 1-based line number.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut checklist = Self::new();
        let mut buf = String::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            line_no += 1;
            let read = reader
                .read_line(&mut buf)
                .map_err(|err| JournalError::parse(line_no, format!("read failed: {}", err)))?;
            if read == 0 {
                break;
            }

            let line = buf.strip_suffix('\n').unwrap_or(&buf);
            let (hex, path) = line.split_once(' ').ok_or_else(|| {
                JournalError::parse(line_no, "expected \"<fingerprint> <path>\"")
            })?;
            let fingerprint = Fingerprint::from_hex(hex).ok_or_else(|| {
                JournalError::parse(line_no, format!("invalid fingerprint {:?}", hex))
            })?;
            if path.is_empty() {
                return Err(JournalError::parse(line_no, "empty path"));
            }
            if !checklist.add_file(path, fingerprint) {
                return Err(JournalError::parse(
                    line_no,
                    format!("duplicate path {}", path),
                ));
            }
        }

        Ok(checklist)
    }

    /// Load the checklist persisted at the journal root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CHECKLIST_FILE);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(JournalError::MissingChecklist { path });
            }
            Err(err) => return Err(JournalError::io(&path, err)),
        };
        Self::from_reader(io::BufReader::new(file))
    }

    /// Append a record. Returns `false` (and leaves the store untouched) if
    /// the path is already present.
    pub fn add_file(&mut self, path: impl Into<String>, fingerprint: Fingerprint) -> bool {
        let path = path.into();
        if self.index.contains_key(&path) {
            return false;
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push(ChecklistEntry::new(path, fingerprint));
        true
    }

    /// Fingerprint `path` (absolute, below `root`) and record it relative to `root`.
    pub fn collect(&mut self, root: &Path, path: &Path) -> Result<Fingerprint> {
        let fingerprint = Fingerprint::of_file(path)?;
        let key = checklist_key(root, path)?;
        if !self.add_file(key, fingerprint) {
            return Err(JournalError::io(
                path,
                io::Error::new(io::ErrorKind::AlreadyExists, "recorded twice"),
            ));
        }
        Ok(fingerprint)
    }

    /// Re-fingerprint every recorded file and return the paths whose content changed.
    ///
    /// A recorded file that no longer exists is an error, not a change.
    pub fn diff(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for entry in &self.entries {
            let live = Fingerprint::of_file(&root.join(entry.path()))?;
            if live != entry.fingerprint {
                changed.push(entry.path().to_path_buf());
            }
        }
        Ok(changed)
    }

    /// Serialize every record in stored order, one per line.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{}", entry.to_line())?;
        }
        writer.flush()
    }

    /// Write the checklist to the journal root via the staging file.
    pub fn persist(&self, root: &Path) -> Result<()> {
        let mut staged = StagedChecklist::create(root)?;
        for entry in &self.entries {
            if let Err(err) = staged.append(entry) {
                staged.discard();
                return Err(err);
            }
        }
        staged.commit()
    }

    pub fn get(&self, path: &Path) -> Option<Fingerprint> {
        let key = path.to_str()?;
        self.index.get(key).map(|&i| self.entries[i].fingerprint)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecklistEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Checklist output being written record by record.
///
/// Records go to `.check.tmp`; only `commit` moves the file onto `.check`, so
/// an aborted unlock never leaves a finalized but incomplete checklist.
pub struct StagedChecklist {
    writer: BufWriter<File>,
    staging: PathBuf,
    destination: PathBuf,
    written: usize,
}

impl StagedChecklist {
    pub fn create(root: &Path) -> Result<Self> {
        let staging = root.join(CHECKLIST_STAGING_FILE);
        let file = File::create(&staging).at(&staging)?;
        Ok(Self {
            writer: BufWriter::new(file),
            staging,
            destination: root.join(CHECKLIST_FILE),
            written: 0,
        })
    }

    pub fn append(&mut self, entry: &ChecklistEntry) -> Result<()> {
        writeln!(self.writer, "{}", entry.to_line()).at(&self.staging)?;
        self.written += 1;
        Ok(())
    }

    /// Flush, sync, and rename the staging file onto the checklist path.
    pub fn commit(self) -> Result<()> {
        let file = self
            .writer
            .into_inner()
            .map_err(|err| JournalError::io(&self.staging, err.into_error()))?;
        file.sync_all().at(&self.staging)?;
        drop(file);
        rename_with_fallback(&self.staging, &self.destination).at(&self.destination)?;
        debug!(path = %self.destination.display(), records = self.written, "checklist committed");
        Ok(())
    }

    /// Drop the staging file without touching any existing checklist.
    pub fn discard(self) {
        let staging = self.staging.clone();
        drop(self.writer);
        let _ = remove_if_exists(&staging);
    }
}

/// Render `path` relative to `root` as a checklist key.
pub fn checklist_key(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| invalid_name(path, "is not valid UTF-8"))?;
                parts.push(name);
            }
            Component::CurDir => {}
            _ => return path_string(path),
        }
    }
    let key = parts.join("/");
    if key.contains('\n') {
        return Err(invalid_name(path, "contains a newline"));
    }
    Ok(key)
}

fn path_string(path: &Path) -> Result<String> {
    let value = path
        .to_str()
        .ok_or_else(|| invalid_name(path, "is not valid UTF-8"))?;
    if value.contains('\n') {
        return Err(invalid_name(path, "contains a newline"));
    }
    Ok(value.to_string())
}

fn invalid_name(path: &Path, reason: &str) -> JournalError {
    JournalError::io(
        path,
        io::Error::new(io::ErrorKind::InvalidData, format!("file name {}", reason)),
    )
}
