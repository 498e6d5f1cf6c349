//! Physical sector placement
//!
//! The 512 sectors are split into two arrays of 256. Each array holds four
//! blocks of 64 sectors, and each block is drawn as a 4 column grid folded
//! around a reserved gap row:
//!
//! ```text
//!   col:   0    1    2    3
//! row 0:  48   32   16    0
//!  ...
//! row 7:  55   39   23    7
//! row 8:  ---- periphery gap ----
//! row 9:  63   47   31   15
//!  ...
//! row 16: 56   40   24    8
//! ```
//!
//! Local ids 0..7 of a 16-sector group run down from row 0, ids 8..15 run
//! back up from row 16 towards the gap.

mod grid;

pub use grid::*;

use serde::{Deserialize, Serialize};

use crate::addressing::{validate_sector, SECTOR_COUNT};
use crate::error::{Error, Result};

/// Rows in a folded block, including the gap
pub const BLOCK_ROWS: u32 = 17;
/// Columns in a folded block
pub const BLOCK_COLS: u32 = 4;
/// Row index reserved for the physical gap
pub const GAP_ROW: u32 = 8;
/// Sectors per folded block
pub const SECTORS_PER_BLOCK: u32 = 64;
/// Blocks per array
pub const BLOCKS_PER_ARRAY: u32 = 4;
/// Sectors per array
pub const SECTORS_PER_ARRAY: u32 = SECTORS_PER_BLOCK * BLOCKS_PER_ARRAY;
/// Number of arrays on the die
pub const ARRAY_COUNT: u32 = SECTOR_COUNT / SECTORS_PER_ARRAY;

/// A cell of a folded 64-sector block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoldedCell {
    /// Row in 0..=7 or 9..=16
    pub row: u32,
    /// Column in 0..=3
    pub col: u32,
}

/// Array, block and local id of a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayBlockLocal {
    /// Array index (0 or 1)
    pub array_idx: u32,
    /// Block index within the array (0..=3)
    pub block_idx: u32,
    /// Local id within the block (0..=63)
    pub local_id: u32,
}

/// Grid placement of a sector within its array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorGridPosition {
    /// Array index (0 or 1)
    pub array_idx: u32,
    /// Row within the folded block
    pub row: u32,
    /// Column across all blocks of the array (0..=15)
    pub global_col: u32,
}

/// Map a local id (0..63) to its folded cell
pub fn folded64_cell(local_id: u32) -> Result<FoldedCell> {
    if local_id >= SECTORS_PER_BLOCK {
        return Err(Error::InvalidLocalId { local_id });
    }
    let group = local_id / 16;
    let pos = local_id % 16;
    let row = if pos < 8 { pos } else { (15 - pos) + 9 };
    Ok(FoldedCell {
        row,
        col: 3 - group,
    })
}

/// Map a folded cell back to its local id
///
/// Rejects the gap row and anything outside the 17x4 block.
pub fn inverse_folded64_cell(row: u32, col: u32) -> Result<u32> {
    if row == GAP_ROW || row >= BLOCK_ROWS || col >= BLOCK_COLS {
        return Err(Error::InvalidCell { row, col });
    }
    let group = 3 - col;
    let pos = if row < GAP_ROW { row } else { 24 - row };
    Ok(group * 16 + pos)
}

/// Split a sector id into array, block and local id
pub fn sector_to_array_block_local(sector_id: u32) -> Result<ArrayBlockLocal> {
    validate_sector(sector_id)?;
    let array_idx = sector_id / SECTORS_PER_ARRAY;
    let in_array = sector_id % SECTORS_PER_ARRAY;
    Ok(ArrayBlockLocal {
        array_idx,
        block_idx: in_array / SECTORS_PER_BLOCK,
        local_id: in_array % SECTORS_PER_BLOCK,
    })
}

/// Grid placement of a sector
pub fn sector_grid_position(sector_id: u32) -> Result<SectorGridPosition> {
    let abl = sector_to_array_block_local(sector_id)?;
    let cell = folded64_cell(abl.local_id)?;
    Ok(SectorGridPosition {
        array_idx: abl.array_idx,
        row: cell.row,
        global_col: abl.block_idx * BLOCK_COLS + cell.col,
    })
}

fn validate_array(array_idx: u32) -> Result<()> {
    if array_idx >= ARRAY_COUNT {
        return Err(Error::InvalidArray { array: array_idx });
    }
    Ok(())
}

/// The 16 sectors on one grid row of an array, ordered by global column
pub fn row_sector_ids(array_idx: u32, row: u32) -> Result<[u32; 16]> {
    validate_array(array_idx)?;
    let mut ids = [0u32; 16];
    for block in 0..BLOCKS_PER_ARRAY {
        for col in 0..BLOCK_COLS {
            let local = inverse_folded64_cell(row, col)?;
            ids[(block * BLOCK_COLS + col) as usize] =
                array_idx * SECTORS_PER_ARRAY + block * SECTORS_PER_BLOCK + local;
        }
    }
    Ok(ids)
}

/// Row sectors in tape-reading order
///
/// The first eight are returned as-is, the last eight reversed, matching how
/// the two halves of a row are read from the die.
pub fn row_strip_order(array_idx: u32, row: u32) -> Result<([u32; 8], [u32; 8])> {
    let ids = row_sector_ids(array_idx, row)?;
    let mut left = [0u32; 8];
    let mut right = [0u32; 8];
    left.copy_from_slice(&ids[..8]);
    for (dst, src) in right.iter_mut().zip(ids[8..].iter().rev()) {
        *dst = *src;
    }
    Ok((left, right))
}
