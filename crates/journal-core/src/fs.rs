//! Filesystem helpers shared by the checklist, footprints, and the engine.

use std::fs;
use std::io;
use std::path::{Component, Path};

/// Prefix that marks a file or directory as hidden.
pub const HIDDEN_PREFIX: char = '.';

/// Atomically rename a file, with fallback for platforms where rename fails if target exists.
///
/// On some platforms (notably Windows), `fs::rename` fails if the destination already exists.
/// In that case the destination is removed and the rename retried once. If the retry also
/// fails, the source file is removed so no stale staging file is left behind.
pub fn rename_with_fallback(source: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(source, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(source, destination).map_err(|retry_err| {
            let _ = fs::remove_file(source);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "Atomic rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Whether a single file name starts with the hidden prefix.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Whether `path` (below `root`) is hidden itself or sits inside a hidden directory.
///
/// The root is never considered hidden, even if its own name starts with a dot.
pub fn is_hidden_below(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_str().map(is_hidden_name).unwrap_or(false),
        _ => false,
    })
}
