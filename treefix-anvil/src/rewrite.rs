use crate::{ChunkError, ChunkTree, locate, pack, unpack};

/// Result of rewriting the block data of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Nothing to do; the tree was not touched and must not be saved.
    Unchanged,
    /// The tree now holds new block data and should be saved.
    Rewritten {
        /// Cells of the target type.
        matched: usize,
        /// Cells whose data value actually differed.
        changed: usize,
    },
}

/// Set the data nibble of every `target_type` cell in `chunk` to `new_value`.
pub fn rewrite(chunk: &mut ChunkTree, target_type: u8, new_value: u8) -> Result<RewriteOutcome, ChunkError> {
    let new_value = new_value & 0x0F;

    let (packed, matched, changed) = {
        let cells = chunk.cell_arrays()?;
        let indices = locate(&cells.types, target_type);
        if indices.is_empty() {
            return Ok(RewriteOutcome::Unchanged);
        }

        let mut nibbles = unpack(cells.packed);
        let mut changed = 0;
        for &i in &indices {
            if nibbles[i] != new_value {
                nibbles[i] = new_value;
                changed += 1;
            }
        }

        let new_packed = pack(&nibbles)?;
        if new_packed == cells.packed {
            return Ok(RewriteOutcome::Unchanged);
        }
        log::debug!("{} of {} cells of type {} changed", changed, indices.len(), target_type);
        (new_packed, indices.len(), changed)
    };

    chunk.write_packed_data(packed)?;
    Ok(RewriteOutcome::Rewritten { matched, changed })
}
