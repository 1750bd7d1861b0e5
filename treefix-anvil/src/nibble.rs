//! Packed nibble arrays.
//!
//! Each byte holds two cells: the low nibble is the even cell index, the high
//! nibble the odd one. NBT byte arrays are signed, so packed bytes are `i8` and
//! every bit operation works on the raw bit pattern.

use crate::ChunkError;

/// Location of one cell's nibble inside a packed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NibbleSlot {
    pub byte: usize,
    pub high: bool,
}

impl NibbleSlot {
    #[inline]
    pub fn for_cell(index: usize) -> Self {
        Self {
            byte: index / 2,
            high: index % 2 == 1,
        }
    }
}

/// Expand a packed array into one nibble per cell (low nibble first).
pub fn unpack(packed: &[i8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(packed.len() * 2);
    for &byte in packed {
        let raw = byte as u8;
        nibbles.push(raw & 0x0F);
        nibbles.push((raw >> 4) & 0x0F);
    }
    nibbles
}

/// Combine `(low, high)` pairs back into signed bytes.
///
/// Values above 15 are masked to their low four bits rather than rejected.
pub fn pack(nibbles: &[u8]) -> Result<Vec<i8>, ChunkError> {
    if nibbles.len() % 2 != 0 {
        return Err(ChunkError::InvalidLength(nibbles.len()));
    }

    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| {
            let raw = ((pair[1] & 0x0F) << 4) | (pair[0] & 0x0F);
            // Two's complement: 128..=255 become -128..=-1
            raw as i8
        })
        .collect())
}

/// Read the nibble of a single cell. `None` if the cell lies past the array.
pub fn nibble_at(packed: &[i8], index: usize) -> Option<u8> {
    let slot = NibbleSlot::for_cell(index);
    let raw = *packed.get(slot.byte)? as u8;
    Some(if slot.high { raw >> 4 } else { raw & 0x0F })
}

/// Overwrite the nibble of a single cell in place, keeping its neighbour.
/// Returns `false` if the cell lies past the array.
pub fn set_nibble_at(packed: &mut [i8], index: usize, value: u8) -> bool {
    let slot = NibbleSlot::for_cell(index);
    let Some(byte) = packed.get_mut(slot.byte) else {
        return false;
    };

    let raw = *byte as u8;
    let value = value & 0x0F;
    let patched = if slot.high {
        (raw & 0x0F) | (value << 4)
    } else {
        (raw & 0xF0) | value
    };
    *byte = patched as i8;
    true
}
