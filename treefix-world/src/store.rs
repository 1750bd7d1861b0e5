//! Where chunks are listed, loaded and saved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use treefix_anvil::{ChunkError, ChunkTree};

use crate::scan;

/// Abstract chunk storage.
///
/// - `FileChunkStore` - chunk files on disk
/// - `MemoryChunkStore` - in-memory map (for testing)
pub trait ChunkStore: Send + Sync {
    /// All chunk paths below `root`, in a stable order.
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ChunkError>;

    fn load(&self, path: &Path) -> Result<ChunkTree, ChunkError>;

    fn save(&self, path: &Path, chunk: &ChunkTree) -> Result<(), ChunkError>;
}

/// Chunk files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileChunkStore;

impl ChunkStore for FileChunkStore {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ChunkError> {
        scan::scan(root)
    }

    fn load(&self, path: &Path) -> Result<ChunkTree, ChunkError> {
        ChunkTree::load(path)
    }

    fn save(&self, path: &Path, chunk: &ChunkTree) -> Result<(), ChunkError> {
        chunk.save(path)
    }
}

/// In-memory chunk store keyed by path, holding encoded chunk bytes.
///
/// Counts saves so callers can check that untouched chunks are never written.
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<PathBuf, Vec<u8>>>,
    saves: AtomicUsize,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw file contents, valid or not.
    pub fn insert_bytes(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.chunks.write().unwrap().insert(path.into(), bytes);
    }

    pub fn insert(&self, path: impl Into<PathBuf>, chunk: &ChunkTree) -> Result<(), ChunkError> {
        self.insert_bytes(path, chunk.to_bytes()?);
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<ChunkTree> {
        let chunks = self.chunks.read().unwrap();
        chunks.get(path).and_then(|bytes| ChunkTree::from_bytes(bytes).ok())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl ChunkStore for MemoryChunkStore {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ChunkError> {
        let mut paths: Vec<PathBuf> = self
            .chunks
            .read()
            .unwrap()
            .keys()
            .filter(|p| p.starts_with(root) && !scan::is_excluded(p))
            .cloned()
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn load(&self, path: &Path) -> Result<ChunkTree, ChunkError> {
        let chunks = self.chunks.read().unwrap();
        let bytes = chunks.get(path).ok_or_else(|| {
            ChunkError::io(path, std::io::Error::new(std::io::ErrorKind::NotFound, "no such chunk"))
        })?;
        ChunkTree::from_bytes(bytes)
    }

    fn save(&self, path: &Path, chunk: &ChunkTree) -> Result<(), ChunkError> {
        let bytes = chunk.to_bytes()?;
        self.chunks.write().unwrap().insert(path.to_path_buf(), bytes);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
