//! Simulated check-bit overlay
//!
//! Each 256 byte dataset gets ten deterministic check bits: nine section
//! parities and one overall parity. Section `k` is the XOR of every data
//! bit whose index (MSB-first within each byte) is congruent to `k` mod 9.
//! The overall bit is the XOR of all data bits and all section bits.
//!
//! The vector is laid out as `[overall, section_0, ..., section_8]`. This is
//! an inspection overlay, not a working SECDED code.

use crate::addressing::{PAGES_PER_SECTOR, PAGE_SIZE, SECTOR_SIZE};
use crate::error::{Error, Result};

/// Check bits per dataset
pub const ECC_BITS: usize = 10;
/// Section parity bits per dataset
pub const SECTION_BITS: usize = 9;

/// Check bits of one dataset
pub type EccVector = [u8; ECC_BITS];

/// Compute the check bits of one 256 byte dataset
pub fn ecc_for_dataset(dataset: &[u8; PAGE_SIZE as usize]) -> EccVector {
    let mut sections = [0u8; SECTION_BITS];
    let mut overall = 0u8;
    for (byte_idx, &byte) in dataset.iter().enumerate() {
        for bit in 0..8 {
            let value = (byte >> (7 - bit)) & 1;
            sections[(byte_idx * 8 + bit) % SECTION_BITS] ^= value;
            overall ^= value;
        }
    }
    let mut out = [0u8; ECC_BITS];
    out[0] = sections.iter().fold(overall, |acc, &s| acc ^ s);
    out[1..].copy_from_slice(&sections);
    out
}

/// Check bits of every page of a sector, a 10 x 256 matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccMatrix {
    columns: Vec<EccVector>,
}

impl EccMatrix {
    /// Bit `row` (0..10) of page `page` (0..256)
    pub fn get(&self, row: usize, page: usize) -> u8 {
        self.columns[page][row]
    }

    /// Check-bit vector of one page
    pub fn column(&self, page: usize) -> &EccVector {
        &self.columns[page]
    }

    /// Number of pages covered
    pub fn pages(&self) -> usize {
        self.columns.len()
    }

    /// One row of the matrix across all pages
    pub fn row(&self, row: usize) -> Vec<u8> {
        self.columns.iter().map(|c| c[row]).collect()
    }
}

/// Compute the check-bit matrix of a full 64 KiB sector
pub fn ecc_matrix_for_sector(sector: &[u8]) -> Result<EccMatrix> {
    if sector.len() != SECTOR_SIZE as usize {
        return Err(Error::InvalidLength {
            expected: SECTOR_SIZE as usize,
            actual: sector.len(),
        });
    }
    let columns = sector
        .chunks_exact(PAGE_SIZE as usize)
        .map(|page| {
            let mut dataset = [0u8; PAGE_SIZE as usize];
            dataset.copy_from_slice(page);
            ecc_for_dataset(&dataset)
        })
        .collect::<Vec<_>>();
    debug_assert_eq!(columns.len(), PAGES_PER_SECTOR as usize);
    Ok(EccMatrix { columns })
}
