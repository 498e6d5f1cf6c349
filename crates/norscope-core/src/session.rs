//! Device plus render state
//!
//! [`Session`] is the single owner of a [`MemoryModel`]. Every mutation
//! goes through it so the per-sector revisions stay in step with the
//! bytes, which is what keeps cached tiles honest.
//!
//! Three caches share the revision counters:
//!
//! - unpacked bit matrices, reused by every tile and band view of a sector
//! - sector state summaries
//! - rendered tiles

use std::sync::Arc;

use crate::addressing::{SECTOR_COUNT, SECTOR_SIZE};
use crate::cache::{LruCache, RevisionTable, DEFAULT_MAX_ITEMS};
use crate::error::Result;
use crate::memory::{MemoryModel, SectorState};
use crate::pattern::PatternSegment;
use crate::preset;
use crate::render::{
    band_tile_raster, render_tile, render_tile_bits, BitMatrix, BitOrder, DetailLevel,
    DetailStyle, DrainStats, Orientation, Raster, RenderConfig, RenderJob, RenderScheduler,
    TileCache, TileKey, TILE_CACHE_ITEMS,
};

/// Unpacked sectors keyed by sector, bit order and revision
type BitsCache = LruCache<(u32, BitOrder, u64), Arc<BitMatrix>>;
/// Sector summaries keyed by sector and revision
type StateCache = LruCache<(u32, u64), SectorState>;

/// Memory model with revision tracking and render caches
pub struct Session {
    memory: MemoryModel,
    revisions: RevisionTable,
    tiles: TileCache,
    bits: BitsCache,
    states: StateCache,
    config: Arc<RenderConfig>,
    orientation: Orientation,
    style: DetailStyle,
}

impl Session {
    /// Wrap an existing device
    pub fn new(memory: MemoryModel) -> Self {
        Self {
            memory,
            revisions: RevisionTable::new(),
            tiles: TileCache::new(TILE_CACHE_ITEMS),
            bits: BitsCache::new(DEFAULT_MAX_ITEMS),
            states: StateCache::new(SECTOR_COUNT as usize),
            config: Arc::new(RenderConfig::default()),
            orientation: Orientation::default(),
            style: DetailStyle::default(),
        }
    }

    /// Read-only view of the device
    pub fn memory(&self) -> &MemoryModel {
        &self.memory
    }

    /// Give the device back
    pub fn into_memory(self) -> MemoryModel {
        self.memory
    }

    /// Revision counters
    pub fn revisions(&self) -> &RevisionTable {
        &self.revisions
    }

    /// Current render configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Current orientation
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Detailed-tier settings
    pub fn detail_style(&self) -> DetailStyle {
        self.style
    }

    /// Number of cached tiles
    pub fn cached_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Number of cached bit matrices
    pub fn cached_bits(&self) -> usize {
        self.bits.len()
    }

    /// Switch orientation, dropping cached tiles on change
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if orientation != self.orientation {
            self.orientation = orientation;
            self.invalidate_tiles();
        }
    }

    /// Replace the render configuration, dropping cached tiles on change
    pub fn set_config(&mut self, config: RenderConfig) {
        if *self.config != config {
            self.config = Arc::new(config);
            self.invalidate_tiles();
        }
    }

    /// Replace the detailed-tier settings, dropping cached tiles on change
    pub fn set_detail_style(&mut self, style: DetailStyle) {
        if style != self.style {
            self.style = style;
            self.invalidate_tiles();
        }
    }

    fn invalidate_tiles(&mut self) {
        self.tiles.clear();
        self.bits.clear();
        self.states.clear();
        // In-flight renders were started with the old settings
        self.revisions.bump_all();
    }

    /// See [`MemoryModel::read`]
    pub fn read(&self, start: u32, size: usize) -> Result<Vec<u8>> {
        self.memory.read(start, size)
    }

    /// See [`MemoryModel::program`]
    pub fn program(
        &mut self,
        start: u32,
        size: usize,
        segments: &[PatternSegment],
        enforce_nor: bool,
    ) -> Result<()> {
        self.memory.program(start, size, segments, enforce_nor)?;
        self.revisions.bump_range(start, size)
    }

    /// See [`MemoryModel::erase`]
    pub fn erase(&mut self, start: u32, size: usize) -> Result<()> {
        self.memory.erase(start, size)?;
        self.revisions.bump_range(start, size)
    }

    /// See [`MemoryModel::overwrite`]
    pub fn overwrite(&mut self, start: u32, bytes: &[u8]) -> Result<()> {
        self.memory.overwrite(start, bytes)?;
        self.revisions.bump_range(start, bytes.len())
    }

    /// See [`MemoryModel::load_image`]
    pub fn load_image(&mut self, image: &[u8]) -> Result<()> {
        self.memory.load_image(image)?;
        self.revisions.bump_all();
        Ok(())
    }

    /// Apply the training preset, see [`preset::apply_preset`]
    pub fn apply_preset(&mut self) -> Result<()> {
        preset::apply_preset(&mut self.memory)?;
        self.revisions
            .bump_range(0, (preset::PRESET_SECTORS * SECTOR_SIZE) as usize)
    }

    /// Key a tile of `sector` would be cached under right now
    pub fn tile_key(&self, sector: u32, bit_order: BitOrder, detail: DetailLevel) -> Result<TileKey> {
        Ok(TileKey {
            sector,
            bit_order,
            detail,
            revision: self.revisions.revision(sector)?,
        })
    }

    /// Unpacked bits of `sector`, cached per revision
    pub fn bits(&mut self, sector: u32, bit_order: BitOrder) -> Result<Arc<BitMatrix>> {
        let key = (sector, bit_order, self.revisions.revision(sector)?);
        if let Some(bits) = self.bits.get(&key) {
            return Ok(Arc::clone(bits));
        }
        let bytes = self.memory.read_sector(sector)?;
        let bits = Arc::new(BitMatrix::unpack(&bytes, bit_order)?);
        self.bits.put(key, Arc::clone(&bits));
        Ok(bits)
    }

    /// Summary of `sector`, cached per revision
    pub fn sector_state(&mut self, sector: u32) -> Result<SectorState> {
        let key = (sector, self.revisions.revision(sector)?);
        if let Some(state) = self.states.get(&key) {
            return Ok(*state);
        }
        let state = self.memory.sector_state(sector)?;
        self.states.put(key, state);
        Ok(state)
    }

    /// Bit-exact view of bit `band` of every word in `sector`
    pub fn band_tile(
        &mut self,
        sector: u32,
        band: usize,
        bit_order: BitOrder,
        cell_size: usize,
    ) -> Result<Raster> {
        let bits = self.bits(sector, bit_order)?;
        band_tile_raster(&bits.band(band)?, cell_size, &self.config.palette)
    }

    /// Cached tile, rendered on a miss
    pub fn tile(
        &mut self,
        sector: u32,
        bit_order: BitOrder,
        detail: DetailLevel,
    ) -> Result<Arc<Raster>> {
        let key = self.tile_key(sector, bit_order, detail)?;
        if let Some(tile) = self.tiles.get(&key) {
            return Ok(Arc::clone(tile));
        }
        let bytes = self.memory.read_sector(sector)?;
        let raster = if detail == DetailLevel::Coarse {
            render_tile(&bytes, bit_order, detail, self.orientation, &self.style, &self.config)?
        } else {
            let bits = self.bits(sector, bit_order)?;
            render_tile_bits(&bytes, &bits, detail, self.orientation, &self.style, &self.config)?
        };
        let raster = Arc::new(raster);
        self.tiles.put(key, Arc::clone(&raster));
        Ok(raster)
    }

    /// Cached tile without rendering
    pub fn cached_tile(
        &mut self,
        sector: u32,
        bit_order: BitOrder,
        detail: DetailLevel,
    ) -> Result<Option<Arc<Raster>>> {
        let key = self.tile_key(sector, bit_order, detail)?;
        Ok(self.tiles.get(&key).cloned())
    }

    /// Job rendering `sector` off-thread from a byte copy
    ///
    /// Bits already unpacked for the current revision ride along.
    pub fn render_job(
        &mut self,
        sector: u32,
        bit_order: BitOrder,
        detail: DetailLevel,
    ) -> Result<RenderJob> {
        let key = self.tile_key(sector, bit_order, detail)?;
        let bits = self.bits.get(&(sector, bit_order, key.revision)).cloned();
        Ok(RenderJob {
            key,
            bytes: self.memory.read_sector(sector)?,
            bits,
            orientation: self.orientation,
            style: self.style,
            config: Arc::clone(&self.config),
        })
    }

    /// Apply finished jobs without blocking
    pub fn drain_renders(&mut self, scheduler: &mut RenderScheduler) -> DrainStats {
        scheduler.drain(&mut self.tiles, &self.revisions)
    }

    /// Block for one finished job, `None` once nothing is in flight
    pub fn wait_render(&mut self, scheduler: &mut RenderScheduler) -> Option<DrainStats> {
        scheduler.wait_one(&mut self.tiles, &self.revisions)
    }

    /// Block until every submitted job is applied
    pub fn wait_renders(&mut self, scheduler: &mut RenderScheduler) -> DrainStats {
        scheduler.wait(&mut self.tiles, &self.revisions)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MemoryModel::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderPreset;

    #[test]
    fn test_tile_cached_until_mutation() {
        let mut session = Session::default();
        let a = session.tile(2, BitOrder::Msb, DetailLevel::Coarse).unwrap();
        let b = session.tile(2, BitOrder::Msb, DetailLevel::Coarse).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(session.cached_tiles(), 1);

        session
            .program(2 * SECTOR_SIZE, 16, &[PatternSegment::fill(0x00, 16)], true)
            .unwrap();
        assert!(session
            .cached_tile(2, BitOrder::Msb, DetailLevel::Coarse)
            .unwrap()
            .is_none());
        let c = session.tile(2, BitOrder::Msb, DetailLevel::Coarse).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_mutation_bumps_only_touched_sectors() {
        let mut session = Session::default();
        session.erase(SECTOR_SIZE - 1, 2).unwrap();
        assert_eq!(session.revisions().revision(0).unwrap(), 1);
        assert_eq!(session.revisions().revision(1).unwrap(), 1);
        assert_eq!(session.revisions().revision(2).unwrap(), 0);

        // Failed mutations leave revisions alone
        assert!(session.erase(0x01FF_FFFF, 2).is_err());
        assert_eq!(session.revisions().revision(511).unwrap(), 0);
    }

    #[test]
    fn test_orientation_change_clears_tiles() {
        let mut session = Session::default();
        session.tile(0, BitOrder::Msb, DetailLevel::Coarse).unwrap();
        session.set_orientation(Orientation::Horizontal);
        assert_eq!(session.cached_tiles(), 1);
        session.set_orientation(Orientation::Vertical);
        assert_eq!(session.cached_tiles(), 0);

        session.tile(0, BitOrder::Msb, DetailLevel::Coarse).unwrap();
        session.set_config(RenderPreset::Flat.config());
        assert_eq!(session.cached_tiles(), 0);
    }

    #[test]
    fn test_offloaded_render_matches_inline() {
        let mut session = Session::default();
        session
            .program(0, 0x100, &[PatternSegment::text("Data", 0x100)], true)
            .unwrap();
        let mut scheduler = RenderScheduler::new(2);
        let job = session
            .render_job(0, BitOrder::Msb, DetailLevel::Thumbnail)
            .unwrap();
        assert!(scheduler.submit(job));
        let stats = session.wait_renders(&mut scheduler);
        assert_eq!(stats.applied, 1);

        let cached = session
            .cached_tile(0, BitOrder::Msb, DetailLevel::Thumbnail)
            .unwrap()
            .unwrap();
        let bytes = session.read(0, SECTOR_SIZE as usize).unwrap();
        let inline = render_tile(
            &bytes,
            BitOrder::Msb,
            DetailLevel::Thumbnail,
            session.orientation(),
            &session.detail_style(),
            session.config(),
        )
        .unwrap();
        assert_eq!(*cached, inline);
    }

    #[test]
    fn test_offloaded_render_goes_stale() {
        let mut session = Session::default();
        let mut scheduler = RenderScheduler::new(1);
        let job = session.render_job(4, BitOrder::Lsb, DetailLevel::Coarse).unwrap();
        assert!(scheduler.submit(job));
        session
            .erase(4 * SECTOR_SIZE, SECTOR_SIZE as usize)
            .unwrap();
        let stats = session.wait_renders(&mut scheduler);
        assert_eq!(stats.stale, 1);
        assert_eq!(session.cached_tiles(), 0);
    }

    #[test]
    fn test_program_misses_stale_bits() {
        let mut session = Session::default();
        let a = session.bits(6, BitOrder::Msb).unwrap();
        let b = session.bits(6, BitOrder::Msb).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.get(0, 0), 1);

        session
            .program(6 * SECTOR_SIZE, 1, &[PatternSegment::fill(0x00, 1)], true)
            .unwrap();
        assert_eq!(session.revisions().revision(6).unwrap(), 1);
        let c = session.bits(6, BitOrder::Msb).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.get(0, 0), 0);
        assert_eq!(session.cached_bits(), 2);

        // A different bit order is a separate entry
        let d = session.bits(6, BitOrder::Lsb).unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
    }

    #[test]
    fn test_bits_cache_is_bounded() {
        let mut session = Session::default();
        for sector in 0..(DEFAULT_MAX_ITEMS as u32 + 4) {
            session.bits(sector, BitOrder::Msb).unwrap();
        }
        assert_eq!(session.cached_bits(), DEFAULT_MAX_ITEMS);
    }

    #[test]
    fn test_sector_state_follows_mutations() {
        let mut session = Session::default();
        assert!(session.sector_state(3).unwrap().erased);

        session
            .program(3 * SECTOR_SIZE, 0x100, &[PatternSegment::fill(0x00, 0x100)], true)
            .unwrap();
        let state = session.sector_state(3).unwrap();
        assert!(!state.erased);
        assert_eq!(state, session.memory().sector_state(3).unwrap());

        session.erase(3 * SECTOR_SIZE, SECTOR_SIZE as usize).unwrap();
        assert!(session.sector_state(3).unwrap().erased);
        assert!(session.sector_state(SECTOR_COUNT).is_err());
    }

    #[test]
    fn test_band_tile_matches_direct_render() {
        let mut session = Session::default();
        session
            .program(0, SECTOR_SIZE as usize, &[PatternSegment::fill(0x55, SECTOR_SIZE as usize)], true)
            .unwrap();
        let bytes = session.read(0, SECTOR_SIZE as usize).unwrap();
        let palette = session.config().palette;
        for order in [BitOrder::Msb, BitOrder::Lsb] {
            let tile = session.band_tile(0, 0, order, 2).unwrap();
            let direct = crate::render::render_band_tile(&bytes, 0, order, 2, &palette).unwrap();
            assert_eq!(tile, direct);
        }
        assert!(session.band_tile(0, 256, BitOrder::Msb, 2).is_err());
    }

    #[test]
    fn test_detail_style_reaches_tiles() {
        let mut session = Session::default();
        let full = session.tile(1, BitOrder::Msb, DetailLevel::Detailed).unwrap();
        assert_eq!(full.width(), 512);

        session.set_detail_style(DetailStyle {
            with_ecc: false,
            ..DetailStyle::default()
        });
        assert_eq!(session.cached_tiles(), 0);
        let bare = session.tile(1, BitOrder::Msb, DetailLevel::Detailed).unwrap();
        assert_eq!((bare.width(), bare.height()), (256, 180));

        let mut scheduler = RenderScheduler::new(1);
        session.set_detail_style(DetailStyle {
            periphery: 4,
            ..DetailStyle::default()
        });
        let job = session.render_job(1, BitOrder::Msb, DetailLevel::Detailed).unwrap();
        let key = job.key;
        assert!(scheduler.submit(job));
        assert_eq!(session.wait_render(&mut scheduler).map(|s| s.applied), Some(1));
        assert!(session.wait_render(&mut scheduler).is_none());
        let offloaded = session.cached_tile(1, key.bit_order, key.detail).unwrap().unwrap();
        assert_eq!((offloaded.width(), offloaded.height()), (512, 188));
    }

    #[test]
    fn test_preset_through_session() {
        let mut session = Session::default();
        session.apply_preset().unwrap();
        assert_eq!(session.revisions().revision(15).unwrap(), 1);
        assert_eq!(session.revisions().revision(16).unwrap(), 0);
        assert_eq!(session.read(0, 2).unwrap(), b"DD".to_vec());
    }
}
