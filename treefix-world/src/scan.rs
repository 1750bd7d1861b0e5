//! World directory traversal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use treefix_anvil::ChunkError;

/// World files that are not chunks.
pub const EXCLUDED_FILES: [&str; 3] = ["level.dat", "level.dat_old", "session.lock"];

/// Recursively collect every chunk file under `root`.
///
/// Entries are visited in file-name order. Only an unreadable `root` is an
/// error; unreadable subdirectories are logged and skipped.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>, ChunkError> {
    let entries = read_sorted(root).map_err(|e| ChunkError::io(root, e))?;
    let mut found = Vec::new();
    walk(entries, &mut found);
    Ok(found)
}

pub fn is_excluded(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| EXCLUDED_FILES.contains(&name))
}

fn walk(entries: Vec<PathBuf>, found: &mut Vec<PathBuf>) {
    for path in entries {
        if path.is_dir() {
            match read_sorted(&path) {
                Ok(children) => walk(children, found),
                Err(e) => log::warn!("Skipping unreadable directory {}: {}", path.display(), e),
            }
        } else if !is_excluded(&path) {
            found.push(path);
        }
    }
}

fn read_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}
