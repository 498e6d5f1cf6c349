//! Training preset
//!
//! Sectors 0..16 get a fixed ladder of text, hex and fill patterns. Some
//! sectors are programmed identically on purpose; their thumbnails must
//! hash the same, which makes the preset a cheap end-to-end regression
//! check of pattern generation and rendering.

use crate::addressing::{sector_start, validate_sector, SECTOR_SIZE};
use crate::error::Result;
use crate::memory::MemoryModel;
use crate::pattern::PatternSegment;
use crate::render::{content_hash, render_thumbnail, BitOrder, Orientation, RenderConfig};

/// Number of sectors the preset programs, starting at sector 0
pub const PRESET_SECTORS: u32 = 16;
/// Sector pairs programmed with identical data
pub const PRESET_PAIRS: [(u32, u32); 4] = [(0, 12), (7, 10), (5, 8), (6, 11)];
/// Thumbnail size used for validation
pub const VALIDATION_SIZE: (usize, usize) = (48, 32);

const LONG_TEXT: &str = "Data Recovery via Advanced Failure Analysis Techniques";
const HALF: usize = SECTOR_SIZE as usize / 2;

/// Segments of one preset sector, `None` past the preset
///
/// Hex payloads go through the same parser as user input.
pub fn preset_segments(sector_id: u32) -> Result<Option<Vec<PatternSegment>>> {
    let full = SECTOR_SIZE as usize;
    let text = |s: &str| vec![PatternSegment::text(s, full)];
    let segments = match sector_id {
        0 | 12 => text("D"),
        1 => text("Da"),
        2 => text("Data"),
        3 => text("Data Rec"),
        4 => text("Data Recovery vi"),
        5 | 8 => text("Data Recovery via Advanced Failu"),
        6 | 11 => vec![
            PatternSegment::text(LONG_TEXT, HALF),
            PatternSegment::fill(0xFF, HALF),
        ],
        7 | 10 => vec![PatternSegment::hex("CC AA", full)?],
        9 => vec![PatternSegment::fill(0x00, full)],
        13 => text("d"),
        14 => vec![PatternSegment::fill(0x55, full)],
        15 => vec![PatternSegment::fill(0xAA, full)],
        _ => return Ok(None),
    };
    Ok(Some(segments))
}

/// Erase one preset sector and program its pattern with the NOR rule;
/// sectors outside the preset are left alone
pub fn apply_preset_sector(memory: &mut MemoryModel, sector_id: u32) -> Result<()> {
    validate_sector(sector_id)?;
    let Some(segments) = preset_segments(sector_id)? else {
        return Ok(());
    };
    let start = sector_start(sector_id)?;
    memory.erase(start, SECTOR_SIZE as usize)?;
    memory.program(start, SECTOR_SIZE as usize, &segments, true)
}

/// Apply the whole preset
pub fn apply_preset(memory: &mut MemoryModel) -> Result<()> {
    for sector_id in 0..PRESET_SECTORS {
        apply_preset_sector(memory, sector_id)?;
    }
    log::debug!("preset applied to sectors 0..{}", PRESET_SECTORS);
    Ok(())
}

/// Outcome of one pair comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCheck {
    /// First sector
    pub a: u32,
    /// Second sector
    pub b: u32,
    /// Thumbnail hash of `a`
    pub hash_a: String,
    /// Thumbnail hash of `b`
    pub hash_b: String,
}

impl PairCheck {
    /// Whether both thumbnails hash the same
    pub fn matches(&self) -> bool {
        self.hash_a == self.hash_b
    }
}

/// Hashes of every preset sector and the pair checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetReport {
    /// `(sector, hash)` for sectors 0..16
    pub hashes: Vec<(u32, String)>,
    /// One entry per [`PRESET_PAIRS`] pair
    pub pairs: Vec<PairCheck>,
}

impl PresetReport {
    /// Whether every pair matched
    pub fn passed(&self) -> bool {
        self.pairs.iter().all(PairCheck::matches)
    }

    /// Hash of one sector
    pub fn hash(&self, sector_id: u32) -> Option<&str> {
        self.hashes
            .iter()
            .find(|(s, _)| *s == sector_id)
            .map(|(_, h)| h.as_str())
    }
}

/// Thumbnail hash of one sector as used for validation
pub fn sector_hash(
    memory: &MemoryModel,
    sector_id: u32,
    bit_order: BitOrder,
    config: &RenderConfig,
) -> Result<String> {
    let bytes = memory.read_sector(sector_id)?;
    let (width, height) = VALIDATION_SIZE;
    let thumb = render_thumbnail(
        &bytes,
        width,
        height,
        bit_order,
        Orientation::Horizontal,
        config,
    )?;
    Ok(content_hash(&thumb))
}

/// Hash every preset sector and compare the pairs
pub fn validate_preset(
    memory: &MemoryModel,
    bit_order: BitOrder,
    config: &RenderConfig,
) -> Result<PresetReport> {
    let hashes = (0..PRESET_SECTORS)
        .map(|sid| Ok((sid, sector_hash(memory, sid, bit_order, config)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(report_from_hashes(hashes))
}

/// Build the report from precomputed `(sector, hash)` pairs
pub fn report_from_hashes(hashes: Vec<(u32, String)>) -> PresetReport {
    let lookup = |sid: u32| {
        hashes
            .iter()
            .find(|(s, _)| *s == sid)
            .map(|(_, h)| h.clone())
            .unwrap_or_default()
    };
    let pairs = PRESET_PAIRS
        .iter()
        .map(|&(a, b)| PairCheck {
            a,
            b,
            hash_a: lookup(a),
            hash_b: lookup(b),
        })
        .collect();
    PresetReport { hashes, pairs }
}
