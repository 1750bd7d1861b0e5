//! Legacy chunk format handling: NBT load/save, the packed block-data nibble
//! codec and the per-chunk rewrite of block data.
//!
//! Alpha-era chunks store one block id per cell in `Blocks` (32768 bytes) and
//! one 4-bit data value per cell in `Data` (16384 bytes, two cells per byte).

pub mod chunk;
pub mod error;
pub mod locate;
pub mod nibble;
pub mod rewrite;

pub use chunk::{ChunkTree, Compression};
pub use error::ChunkError;
pub use locate::locate;
pub use nibble::{NibbleSlot, nibble_at, pack, set_nibble_at, unpack};
pub use rewrite::{RewriteOutcome, rewrite};

/// Cells in one legacy chunk (16 x 16 x 128).
pub const CELLS_PER_CHUNK: usize = 32768;

/// Bytes in the packed `Data` array of a full chunk.
pub const PACKED_BYTES: usize = CELLS_PER_CHUNK / 2;

/// Block id of leaves.
pub const LEAVES: u8 = 18;

pub const BLOCKS_TAG: &str = "Blocks";
pub const DATA_TAG: &str = "Data";

/// Where the rewritten data array is stored, below the (unnamed) root compound.
pub const DATA_PATH: [&str; 2] = ["Level", DATA_TAG];
