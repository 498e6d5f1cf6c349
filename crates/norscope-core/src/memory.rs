//! In-memory NOR device
//!
//! [`MemoryModel`] owns the full 32 MiB buffer. It starts fully erased
//! (every byte 0xFF) and changes only through [`MemoryModel::program`],
//! [`MemoryModel::erase`] and the raw [`MemoryModel::overwrite`]. Each of
//! them validates the whole request before touching a single byte, so a
//! failed call leaves the device unchanged.

use crate::addressing::{sector_start, CAPACITY, MAX_ADDRESS, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::pattern::{build_pattern, PatternSegment, ERASED};

/// Sample size used for the entropy estimate in [`SectorState`]
const ENTROPY_SAMPLE: usize = 4096;

/// Summary of one sector's contents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorState {
    /// Every byte is 0xFF
    pub erased: bool,
    /// Fraction of bytes that differ from 0xFF
    pub programmed_ratio: f64,
    /// Shannon entropy of a strided sample, normalized to 0..=1
    pub entropy: f64,
}

/// The simulated device
#[derive(Clone)]
pub struct MemoryModel {
    data: Vec<u8>,
}

impl MemoryModel {
    /// Create a fully erased device
    pub fn new() -> Self {
        Self {
            data: vec![ERASED; CAPACITY],
        }
    }

    /// Create a device from a raw dump of exactly [`CAPACITY`] bytes
    pub fn from_image(image: &[u8]) -> Result<Self> {
        let mut model = Self::new();
        model.load_image(image)?;
        Ok(model)
    }

    /// Check that `start..start+size` lies inside the device
    ///
    /// A zero-size request is valid as long as `start` is a valid address.
    pub fn validate_region(start: u32, size: usize) -> Result<()> {
        let end = start as u64 + size as u64;
        if start > MAX_ADDRESS || end > CAPACITY as u64 {
            return Err(Error::RegionOutOfRange {
                start: start as u64,
                size: size as u64,
            });
        }
        Ok(())
    }

    /// Copy `size` bytes starting at `start`
    pub fn read(&self, start: u32, size: usize) -> Result<Vec<u8>> {
        Self::validate_region(start, size)?;
        let start = start as usize;
        Ok(self.data[start..start + size].to_vec())
    }

    /// Copy one whole sector
    pub fn read_sector(&self, sector_id: u32) -> Result<Vec<u8>> {
        self.read(sector_start(sector_id)?, SECTOR_SIZE as usize)
    }

    /// Set every byte in the range to 0xFF
    pub fn erase(&mut self, start: u32, size: usize) -> Result<()> {
        Self::validate_region(start, size)?;
        log::debug!("erase 0x{:08X}+0x{:X}", start, size);
        let start = start as usize;
        self.data[start..start + size].fill(ERASED);
        Ok(())
    }

    /// Program a range with a generated pattern
    ///
    /// With `enforce_nor` the new data is ANDed into the old, so bits can
    /// only go from 1 to 0. Without it the range is overwritten, which is
    /// only useful for fixtures that do not follow device physics.
    pub fn program(
        &mut self,
        start: u32,
        size: usize,
        segments: &[PatternSegment],
        enforce_nor: bool,
    ) -> Result<()> {
        Self::validate_region(start, size)?;
        let data = build_pattern(segments, size);
        log::debug!(
            "program 0x{:08X}+0x{:X} ({} segment(s), nor={})",
            start,
            size,
            segments.len(),
            enforce_nor
        );
        let start = start as usize;
        let target = &mut self.data[start..start + size];
        if enforce_nor {
            for (old, new) in target.iter_mut().zip(&data) {
                *old &= *new;
            }
        } else {
            target.copy_from_slice(&data);
        }
        Ok(())
    }

    /// Write raw bytes at `start` without the NOR rule
    pub fn overwrite(&mut self, start: u32, bytes: &[u8]) -> Result<()> {
        Self::validate_region(start, bytes.len())?;
        log::debug!("overwrite 0x{:08X}+0x{:X}", start, bytes.len());
        let start = start as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Replace the whole buffer with a raw dump
    pub fn load_image(&mut self, image: &[u8]) -> Result<()> {
        if image.len() != CAPACITY {
            return Err(Error::InvalidLength {
                expected: CAPACITY,
                actual: image.len(),
            });
        }
        self.overwrite(0, image)
    }

    /// Borrow the whole buffer, e.g. to write a raw dump
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Summarize one sector
    pub fn sector_state(&self, sector_id: u32) -> Result<SectorState> {
        let start = sector_start(sector_id)? as usize;
        let block = &self.data[start..start + SECTOR_SIZE as usize];
        let changed = block.iter().filter(|&&b| b != ERASED).count();
        Ok(SectorState {
            erased: changed == 0,
            programmed_ratio: changed as f64 / block.len() as f64,
            entropy: sampled_entropy(block),
        })
    }
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

fn sampled_entropy(block: &[u8]) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    let stride = (block.len() / ENTROPY_SAMPLE).max(1);
    let mut hist = [0usize; 256];
    let mut total = 0usize;
    for &b in block.iter().step_by(stride) {
        hist[b as usize] += 1;
        total += 1;
    }
    let entropy: f64 = hist
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    entropy / 8.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_device_is_erased() {
        let mem = MemoryModel::new();
        assert_eq!(mem.read(0, 4).unwrap(), vec![0xFF; 4]);
        assert_eq!(mem.as_bytes().len(), CAPACITY);
    }

    #[test]
    fn test_program_erase_scenario() {
        let mut mem = MemoryModel::new();
        mem.program(0, 4, &[PatternSegment::fill(0x0F, 4)], false)
            .unwrap();
        assert_eq!(mem.read(0, 4).unwrap(), vec![0x0F; 4]);

        mem.program(0, 4, &[PatternSegment::fill(0xF0, 4)], true)
            .unwrap();
        assert_eq!(mem.read(0, 4).unwrap(), vec![0x00; 4]);

        mem.erase(0, 4).unwrap();
        assert_eq!(mem.read(0, 4).unwrap(), vec![0xFF; 4]);
    }

    #[test]
    fn test_program_then_erase_restores() {
        let mut mem = MemoryModel::new();
        let start = 0x0012_0000;
        mem.program(start, 0x1000, &[PatternSegment::text("Data", 0x1000)], true)
            .unwrap();
        assert_ne!(mem.read(start, 0x1000).unwrap(), vec![0xFF; 0x1000]);
        mem.erase(start, 0x1000).unwrap();
        assert_eq!(mem.read(start, 0x1000).unwrap(), vec![0xFF; 0x1000]);
        // Idempotent
        mem.erase(start, 0x1000).unwrap();
        assert_eq!(mem.read(start, 0x1000).unwrap(), vec![0xFF; 0x1000]);
    }

    #[test]
    fn test_nor_programs_compose_as_and() {
        let a = PatternSegment::hex("CC AA 5A", 64).unwrap();
        let b = PatternSegment::text("Data", 64);

        let mut twice = MemoryModel::new();
        twice.program(0x100, 64, &[a.clone()], true).unwrap();
        twice.program(0x100, 64, &[b.clone()], true).unwrap();

        let and: Vec<u8> = build_pattern(&[a], 64)
            .iter()
            .zip(build_pattern(&[b], 64))
            .map(|(x, y)| x & y)
            .collect();
        let mut once = MemoryModel::new();
        once.overwrite(0x100, &and).unwrap();

        assert_eq!(twice.read(0x100, 64).unwrap(), once.read(0x100, 64).unwrap());
    }

    #[test]
    fn test_nor_cannot_set_bits() {
        let mut mem = MemoryModel::new();
        mem.program(0, 2, &[PatternSegment::fill(0x00, 2)], true)
            .unwrap();
        mem.program(0, 2, &[PatternSegment::fill(0xFF, 2)], true)
            .unwrap();
        assert_eq!(mem.read(0, 2).unwrap(), vec![0x00, 0x00]);
    }

    #[test]
    fn test_out_of_range_is_not_applied() {
        let mut mem = MemoryModel::new();
        let start = MAX_ADDRESS - 1;
        let err = mem
            .program(start, 4, &[PatternSegment::fill(0x00, 4)], false)
            .unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(mem.read(start, 2).unwrap(), vec![0xFF, 0xFF]);

        assert!(mem.erase(MAX_ADDRESS, 2).is_err());
        assert!(mem.read(MAX_ADDRESS + 1, 0).is_err());
        assert!(mem.overwrite(MAX_ADDRESS, &[0, 0]).is_err());
    }

    #[test]
    fn test_zero_size_and_last_byte() {
        let mut mem = MemoryModel::new();
        assert_eq!(mem.read(MAX_ADDRESS, 0).unwrap(), Vec::<u8>::new());
        mem.program(MAX_ADDRESS, 1, &[PatternSegment::fill(0x12, 1)], false)
            .unwrap();
        assert_eq!(mem.read(MAX_ADDRESS, 1).unwrap(), vec![0x12]);
    }

    #[test]
    fn test_read_returns_copy() {
        let mut mem = MemoryModel::new();
        let snapshot = mem.read(0, 4).unwrap();
        mem.program(0, 4, &[PatternSegment::fill(0x00, 4)], true)
            .unwrap();
        assert_eq!(snapshot, vec![0xFF; 4]);
    }

    #[test]
    fn test_image_round_trip() {
        let mut mem = MemoryModel::new();
        mem.program(0x4_0000, 8, &[PatternSegment::text("abc", 8)], true)
            .unwrap();
        let restored = MemoryModel::from_image(mem.as_bytes()).unwrap();
        assert_eq!(restored.as_bytes(), mem.as_bytes());
        assert_eq!(
            MemoryModel::from_image(&[0xFF; 16]).err(),
            Some(Error::InvalidLength {
                expected: CAPACITY,
                actual: 16
            })
        );
    }

    #[test]
    fn test_sector_state() {
        let mut mem = MemoryModel::new();
        let state = mem.sector_state(3).unwrap();
        assert!(state.erased);
        assert_eq!(state.programmed_ratio, 0.0);
        assert_eq!(state.entropy, 0.0);

        mem.program(
            3 * SECTOR_SIZE,
            0x8000,
            &[PatternSegment::fill(0x00, 0x8000)],
            true,
        )
        .unwrap();
        let state = mem.sector_state(3).unwrap();
        assert!(!state.erased);
        assert_eq!(state.programmed_ratio, 0.5);
        assert!(state.entropy > 0.0 && state.entropy <= 1.0);
        assert!(mem.sector_state(512).is_err());
    }
}
