//! Die placement configuration and grid export

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    folded64_cell, sector_to_array_block_local, BLOCK_COLS, BLOCK_ROWS, GAP_ROW,
    SECTORS_PER_ARRAY, SECTORS_PER_BLOCK,
};
use crate::addressing::SECTOR_COUNT;
use crate::error::Result;

/// How the two arrays are laid out on the die view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Blocks drawn per array
    pub blocks_per_array: u32,
    /// Width of one block in cells
    pub block_width: u32,
    /// Height of one block in cells, gap row included
    pub block_height: u32,
    /// Blocks of array 0 that are not drawn
    pub hidden_blocks_array0: Vec<u32>,
    /// Blocks of array 1 that are not drawn
    pub hidden_blocks_array1: Vec<u32>,
    /// Only draw the first N sectors of each array
    pub sectors_per_array_shown: Option<u32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            blocks_per_array: 4,
            block_width: BLOCK_COLS,
            block_height: BLOCK_ROWS,
            hidden_blocks_array0: Vec::new(),
            hidden_blocks_array1: Vec::new(),
            sectors_per_array_shown: None,
        }
    }
}

impl LayoutConfig {
    fn is_hidden(&self, array_idx: u32, block_idx: u32) -> bool {
        let hidden = if array_idx == 0 {
            &self.hidden_blocks_array0
        } else {
            &self.hidden_blocks_array1
        };
        hidden.contains(&block_idx)
    }
}

/// Where one sector is drawn on the die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPlacement {
    /// Sector id
    pub sector_id: u32,
    /// Array index
    pub array_idx: u32,
    /// Block index within the array
    pub block_idx: u32,
    /// Local id within the block
    pub local_id: u32,
    /// Row within the block
    pub row: u32,
    /// Column within the block
    pub col: u32,
    /// Die-wide cell column
    pub x: u32,
    /// Die-wide cell row; arrays are separated by one spare row
    pub y: u32,
}

/// Placement of one sector under `cfg`
pub fn placement(sector_id: u32, cfg: &LayoutConfig) -> Result<CellPlacement> {
    let abl = sector_to_array_block_local(sector_id)?;
    let cell = folded64_cell(abl.local_id)?;
    Ok(CellPlacement {
        sector_id,
        array_idx: abl.array_idx,
        block_idx: abl.block_idx,
        local_id: abl.local_id,
        row: cell.row,
        col: cell.col,
        x: abl.block_idx * cfg.block_width + cell.col,
        y: abl.array_idx * (cfg.block_height + 1) + cell.row,
    })
}

/// Placements of every sector `cfg` does not hide
pub fn visible_placements(cfg: &LayoutConfig) -> Vec<CellPlacement> {
    (0..SECTOR_COUNT)
        .filter_map(|sid| placement(sid, cfg).ok())
        .filter(|p| p.block_idx < cfg.blocks_per_array)
        .filter(|p| !cfg.is_hidden(p.array_idx, p.block_idx))
        .filter(|p| match cfg.sectors_per_array_shown {
            Some(limit) => p.sector_id % SECTORS_PER_ARRAY < limit,
            None => true,
        })
        .collect()
}

/// Cell map of one folded block; `None` marks the gap row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutGrid {
    /// Number of rows
    pub rows: u32,
    /// Number of columns
    pub cols: u32,
    /// Local id at each cell, row-major
    pub cells: Vec<Vec<Option<u32>>>,
    /// Label drawn across the gap row
    pub central_label: String,
}

impl LayoutGrid {
    /// The folded 64-sector block
    pub fn folded64() -> Self {
        let mut cells = vec![vec![None; BLOCK_COLS as usize]; BLOCK_ROWS as usize];
        for local in 0..SECTORS_PER_BLOCK {
            if let Ok(cell) = folded64_cell(local) {
                cells[cell.row as usize][cell.col as usize] = Some(local);
            }
        }
        Self {
            rows: BLOCK_ROWS,
            cols: BLOCK_COLS,
            cells,
            central_label: "Logic/Periphery".into(),
        }
    }

    /// Local id at a cell, `None` for the gap row or out-of-range cells
    pub fn local_at(&self, row: u32, col: u32) -> Option<u32> {
        if row == GAP_ROW {
            return None;
        }
        self.cells
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .flatten()
    }

    /// Serialize to a RON string
    pub fn to_ron_string(&self) -> core::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Parse from a RON string
    pub fn from_ron_str(content: &str) -> core::result::Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    /// Write to a RON file
    pub fn to_ron_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = self
            .to_ron_string()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }
}
