//! Bit-exact band tiles
//!
//! A sector is read as 256-bit words laid out row-major, 256 words per
//! row. Band `b` is bit `b` of every word, so one band tile shows a single
//! bit position of each word at its word's place, with no smoothing or
//! resampling. Set bits draw in the erased color and clear bits in the
//! programmed color; each bit becomes a `cell_size` square.

use super::{BitMatrix, BitOrder, Palette, Raster, BITLINES};
use crate::addressing::SECTOR_SIZE;
use crate::error::{Error, Result};

/// Bytes per word
pub const WORD_BYTES: usize = 32;
/// Bit positions per word, the number of bands
pub const BANDS: usize = WORD_BYTES * 8;
/// Words per band tile row
pub const BAND_COLS: usize = 256;
/// Band tile rows in one sector
pub const BAND_ROWS: usize = SECTOR_SIZE as usize / WORD_BYTES / BAND_COLS;
/// Default pixel size of one bit
pub const DEFAULT_CELL_SIZE: usize = 3;

const WORDS_PER_PAGE: usize = BITLINES / BANDS;

/// Word index of a band tile cell
pub fn word_index(row: usize, col: usize) -> usize {
    row * BAND_COLS + col
}

impl BitMatrix {
    /// Bit `band` of every word, `BAND_ROWS x BAND_COLS` row-major
    pub fn band(&self, band: usize) -> Result<Vec<u8>> {
        if band >= BANDS {
            return Err(Error::InvalidBand { band });
        }
        let mut out = Vec::with_capacity(BAND_ROWS * BAND_COLS);
        for row in 0..BAND_ROWS {
            for col in 0..BAND_COLS {
                let word = word_index(row, col);
                let page = word / WORDS_PER_PAGE;
                let bitline = (word % WORDS_PER_PAGE) * BANDS + band;
                out.push(self.get(page, bitline));
            }
        }
        Ok(out)
    }
}

/// Color a `BAND_ROWS x BAND_COLS` bit tile, `cell_size` pixels per bit
pub fn band_tile_raster(bits: &[u8], cell_size: usize, palette: &Palette) -> Result<Raster> {
    let (width, height) = (BAND_COLS * cell_size, BAND_ROWS * cell_size);
    if cell_size == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if bits.len() != BAND_ROWS * BAND_COLS {
        return Err(Error::InvalidLength {
            expected: BAND_ROWS * BAND_COLS,
            actual: bits.len(),
        });
    }

    let mut raster = Raster::new(width, height, palette.erased);
    for (i, &bit) in bits.iter().enumerate() {
        if bit == 1 {
            continue;
        }
        let (row, col) = (i / BAND_COLS, i % BAND_COLS);
        for dy in 0..cell_size {
            for dx in 0..cell_size {
                raster.set(col * cell_size + dx, row * cell_size + dy, palette.programmed);
            }
        }
    }
    Ok(raster)
}

/// Render the band tile of one 64 KiB sector
pub fn render_band_tile(
    sector: &[u8],
    band: usize,
    bit_order: BitOrder,
    cell_size: usize,
    palette: &Palette,
) -> Result<Raster> {
    let matrix = BitMatrix::unpack(sector, bit_order)?;
    band_tile_raster(&matrix.band(band)?, cell_size, palette)
}
