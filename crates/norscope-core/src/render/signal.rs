//! Bit matrix and 1-D signal helpers

use super::{BitOrder, Smoothing};
use crate::addressing::{PAGES_PER_SECTOR, PAGE_SIZE, SECTOR_SIZE};
use crate::error::{Error, Result};

/// Pages per sector, the row count of a [`BitMatrix`]
pub const PAGES: usize = PAGES_PER_SECTOR as usize;
/// Bit positions per page, the column count of a [`BitMatrix`]
pub const BITLINES: usize = PAGE_SIZE as usize * 8;

/// Set-bit count of every byte value
pub const POPCOUNT: [u8; 256] = popcount_table();

const fn popcount_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() as u8;
        i += 1;
    }
    table
}

pub(crate) fn check_sector_len(sector: &[u8]) -> Result<()> {
    if sector.len() != SECTOR_SIZE as usize {
        return Err(Error::InvalidLength {
            expected: SECTOR_SIZE as usize,
            actual: sector.len(),
        });
    }
    Ok(())
}

/// One sector unpacked to one byte per bit, `PAGES x BITLINES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    bits: Vec<u8>,
    order: BitOrder,
}

impl BitMatrix {
    /// Unpack a 64 KiB sector
    pub fn unpack(sector: &[u8], order: BitOrder) -> Result<Self> {
        check_sector_len(sector)?;
        let mut bits = Vec::with_capacity(PAGES * BITLINES);
        for &byte in sector {
            for i in 0..8 {
                bits.push(order.bit(byte, i));
            }
        }
        Ok(Self { bits, order })
    }

    /// Order the sector was unpacked with
    pub fn order(&self) -> BitOrder {
        self.order
    }

    /// Bit at `(page, bitline)`
    pub fn get(&self, page: usize, bitline: usize) -> u8 {
        self.bits[page * BITLINES + bitline]
    }

    /// All bits of one page
    pub fn page(&self, page: usize) -> &[u8] {
        &self.bits[page * BITLINES..(page + 1) * BITLINES]
    }

    /// Fraction of zero bits in each page
    pub fn page_zero_ratios(&self) -> Vec<f32> {
        self.bits
            .chunks_exact(BITLINES)
            .map(|page| {
                let ones: u32 = page.iter().map(|&b| b as u32).sum();
                1.0 - ones as f32 / BITLINES as f32
            })
            .collect()
    }

    /// Fraction of zero bits at each bit position across pages
    pub fn bitline_zero_ratios(&self) -> Vec<f32> {
        let mut ones = vec![0u32; BITLINES];
        for page in self.bits.chunks_exact(BITLINES) {
            for (acc, &b) in ones.iter_mut().zip(page) {
                *acc += b as u32;
            }
        }
        ones.into_iter()
            .map(|n| 1.0 - n as f32 / PAGES as f32)
            .collect()
    }
}

/// Per-page zero ratio via [`POPCOUNT`], no unpacking
pub fn fast_page_zero_ratios(sector: &[u8]) -> Result<Vec<f32>> {
    check_sector_len(sector)?;
    Ok(sector
        .chunks_exact(PAGE_SIZE as usize)
        .map(|page| {
            let ones: u32 = page.iter().map(|&b| POPCOUNT[b as usize] as u32).sum();
            1.0 - ones as f32 / BITLINES as f32
        })
        .collect())
}

/// Per-byte-column zero ratio, each column repeated for its eight bitlines
///
/// Bit order inside a byte is lost; the result has [`BITLINES`] samples.
pub fn fast_bitline_zero_ratios(sector: &[u8]) -> Result<Vec<f32>> {
    check_sector_len(sector)?;
    let mut ones = vec![0u32; PAGE_SIZE as usize];
    for page in sector.chunks_exact(PAGE_SIZE as usize) {
        for (acc, &b) in ones.iter_mut().zip(page) {
            *acc += POPCOUNT[b as usize] as u32;
        }
    }
    let per_column = (PAGES * 8) as f32;
    Ok(ones
        .into_iter()
        .flat_map(|n| core::iter::repeat(1.0 - n as f32 / per_column).take(8))
        .collect())
}

/// Nearest-index sample positions of `out` points spread over `0..n`
///
/// Position `i` maps to `floor(i * (n - 1) / (out - 1))`, so the first and
/// last samples are always kept.
pub fn resample_indices(n: usize, out: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    if out <= 1 {
        return vec![0; out];
    }
    (0..out).map(|i| i * (n - 1) / (out - 1)).collect()
}

/// Nearest-index resample of `signal` to `out` samples
pub fn resample(signal: &[f32], out: usize) -> Vec<f32> {
    resample_indices(signal.len(), out)
        .into_iter()
        .map(|i| signal[i])
        .collect()
}

/// Convolve `signal` with the normalized kernel, `passes` times
///
/// Output has the input's length, centered, with zeros assumed past the
/// edges, so the ends fall off slightly.
pub fn smooth(signal: &[f32], smoothing: &Smoothing) -> Vec<f32> {
    let kernel = smoothing.normalized_kernel();
    let mut cur = signal.to_vec();
    if kernel.is_empty() {
        return cur;
    }
    let half = (kernel.len() / 2) as isize;
    for _ in 0..smoothing.passes {
        cur = (0..cur.len() as isize)
            .map(|i| {
                kernel
                    .iter()
                    .enumerate()
                    .filter_map(|(j, w)| {
                        let src = i + half - j as isize;
                        cur.get(usize::try_from(src).ok()?).map(|v| v * w)
                    })
                    .sum::<f32>()
            })
            .collect();
    }
    cur
}
