//! Chunk files as NBT trees.
//!
//! Legacy chunk files are gzip-compressed NBT, but zlib and raw NBT are
//! accepted too. A tree remembers how it was stored and is written back the
//! same way.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use fastnbt::{ByteArray, Value};
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use tempfile::NamedTempFile;

use crate::{BLOCKS_TAG, ChunkError, DATA_PATH, DATA_TAG};

/// How a chunk file is compressed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    None,
}

impl Compression {
    /// Sniff the compression from the first bytes of a file.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0x1f, 0x8b, ..] => Compression::Gzip,
            // zlib CMF byte for deflate with a 32K window
            [0x78, ..] => Compression::Zlib,
            _ => Compression::None,
        }
    }

    fn decompress(self, bytes: &[u8]) -> Result<Vec<u8>, ChunkError> {
        let mut decompressed = Vec::new();
        let res = match self {
            Compression::Gzip => GzDecoder::new(bytes).read_to_end(&mut decompressed),
            Compression::Zlib => ZlibDecoder::new(bytes).read_to_end(&mut decompressed),
            Compression::None => return Ok(bytes.to_vec()),
        };
        res.map_err(|e| ChunkError::Parse(format!("{:?} decompression failed: {}", self, e)))?;
        Ok(decompressed)
    }

    fn compress(self, nbt: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(nbt)?;
                encoder.finish()
            }
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(nbt)?;
                encoder.finish()
            }
            Compression::None => Ok(nbt.to_vec()),
        }
    }
}

/// The two parallel per-cell arrays of a chunk.
#[derive(Debug)]
pub struct CellArrays<'a> {
    /// Block ids, reinterpreted as unsigned.
    pub types: Vec<u8>,
    /// Packed block data, two cells per byte.
    pub packed: &'a [i8],
}

/// A loaded chunk: its NBT root compound and on-disk compression.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTree {
    root: Value,
    compression: Compression,
}

impl ChunkTree {
    pub fn new(root: Value, compression: Compression) -> Self {
        Self { root, compression }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Decode a chunk file's contents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChunkError> {
        let compression = Compression::detect(bytes);
        let nbt = compression.decompress(bytes)?;

        let root: Value = fastnbt::from_bytes(&nbt)
            .map_err(|e| ChunkError::Parse(format!("NBT parse failed: {}", e)))?;
        if !matches!(root, Value::Compound(_)) {
            return Err(ChunkError::Parse("NBT root is not a compound".to_string()));
        }

        Ok(Self { root, compression })
    }

    /// Encode the tree, compressed the way it was loaded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        let nbt = fastnbt::to_bytes(&self.root)
            .map_err(|e| ChunkError::Parse(format!("NBT serialization failed: {}", e)))?;
        self.compression
            .compress(&nbt)
            .map_err(|e| ChunkError::Parse(format!("{:?} compression failed: {}", self.compression, e)))
    }

    pub fn load(path: &Path) -> Result<Self, ChunkError> {
        let bytes = fs::read(path).map_err(|e| ChunkError::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    /// Write the tree to `path` through a temporary sibling file, so a failed
    /// write never leaves a truncated chunk behind.
    pub fn save(&self, path: &Path) -> Result<(), ChunkError> {
        let bytes = self.to_bytes()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ChunkError::io(dir, e))?;
        tmp.write_all(&bytes).map_err(|e| ChunkError::io(tmp.path(), e))?;

        // The temp file is created owner-only; keep the replaced file's mode.
        if let Ok(meta) = fs::metadata(path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| ChunkError::io(tmp.path(), e))?;
        }
        tmp.persist(path).map_err(|e| ChunkError::io(path, e.error))?;
        Ok(())
    }

    /// The tag called `name` directly under `Level`, where legacy chunks keep
    /// their cell arrays; otherwise a depth-first search for the first tag
    /// with that name.
    pub fn find(&self, name: &str) -> Option<&Value> {
        let in_level = match &self.root {
            Value::Compound(root) => match root.get(DATA_PATH[0]) {
                Some(Value::Compound(level)) => level.get(name),
                _ => None,
            },
            _ => None,
        };
        in_level.or_else(|| find_in(&self.root, name))
    }

    /// Find a byte array tag by name.
    pub fn find_byte_array(&self, name: &str) -> Result<&[i8], ChunkError> {
        match self.find(name) {
            Some(Value::ByteArray(arr)) => Ok(&arr[..]),
            _ => Err(ChunkError::MissingTag(name.to_string())),
        }
    }

    /// Set the tag at `path` (names below the root compound). Every compound
    /// on the way must already exist; the last component is inserted or
    /// replaced.
    pub fn set(&mut self, path: &[&str], value: Value) -> Result<(), ChunkError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(ChunkError::MissingTag(String::new()));
        };

        let mut node = &mut self.root;
        for name in parents {
            node = match node {
                Value::Compound(map) => map
                    .get_mut(*name)
                    .ok_or_else(|| ChunkError::MissingTag(name.to_string()))?,
                _ => return Err(ChunkError::MissingTag(name.to_string())),
            };
        }

        match node {
            Value::Compound(map) => {
                map.insert(last.to_string(), value);
                Ok(())
            }
            _ => Err(ChunkError::MissingTag(last.to_string())),
        }
    }

    /// Block ids and packed block data, with their length relationship checked.
    pub fn cell_arrays(&self) -> Result<CellArrays<'_>, ChunkError> {
        let types: Vec<u8> = self
            .find_byte_array(BLOCKS_TAG)?
            .iter()
            .map(|&b| b as u8)
            .collect();
        let packed = self.find_byte_array(DATA_TAG)?;

        if packed.len() * 2 != types.len() {
            return Err(ChunkError::Structural {
                types: types.len(),
                packed: packed.len(),
            });
        }

        Ok(CellArrays { types, packed })
    }

    /// Replace the packed block data at `Level.Data`.
    pub fn write_packed_data(&mut self, packed: Vec<i8>) -> Result<(), ChunkError> {
        self.set(&DATA_PATH, Value::ByteArray(ByteArray::new(packed)))
    }
}

fn find_in<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    match node {
        Value::Compound(map) => {
            if let Some(found) = map.get(name) {
                return Some(found);
            }
            map.values().find_map(|child| find_in(child, name))
        }
        Value::List(items) => items.iter().find_map(|child| find_in(child, name)),
        _ => None,
    }
}
