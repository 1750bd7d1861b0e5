use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while reading, patching or writing one chunk.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode chunk: {0}")]
    Parse(String),

    #[error("missing byte array tag `{0}`")]
    MissingTag(String),

    #[error("malformed chunk: {types} block ids but {packed} data bytes")]
    Structural { types: usize, packed: usize },

    #[error("cannot pack an odd number of nibbles ({0})")]
    InvalidLength(usize),
}

impl ChunkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChunkError::Io {
            path: path.into(),
            source,
        }
    }
}
