//! Zoom-dependent tiles and their cache key

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    render_detailed_bits, render_thumbnail_bits, render_thumbnail_fast, BitMatrix, BitOrder,
    DetailOptions, Orientation, Raster, RenderConfig,
};
use crate::cache::LruCache;
use crate::error::{Error, Result};

/// Default bound of a [`TileCache`]
pub const TILE_CACHE_ITEMS: usize = 2048;

/// Resolution tier of a sector tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Population-count thumbnail for far zoom
    Coarse,
    /// Full thumbnail
    Thumbnail,
    /// Detailed view with check-bit strip
    Detailed,
}

impl DetailLevel {
    /// Tier for a view scale, where 1.0 shows one cell per sector
    pub fn for_scale(scale: f64) -> Self {
        if scale < 0.5 {
            DetailLevel::Coarse
        } else if scale < 2.0 {
            DetailLevel::Thumbnail
        } else {
            DetailLevel::Detailed
        }
    }

    /// Raster size of thumbnail tiers, `None` for [`DetailLevel::Detailed`]
    pub fn size(self, orientation: Orientation) -> Option<(usize, usize)> {
        let (w, h) = match self {
            DetailLevel::Coarse => (32, 8),
            DetailLevel::Thumbnail => (128, 32),
            DetailLevel::Detailed => return None,
        };
        Some(match orientation {
            Orientation::Horizontal => (w, h),
            Orientation::Vertical => (h, w),
        })
    }
}

impl FromStr for DetailLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coarse" => Ok(DetailLevel::Coarse),
            "thumbnail" | "thumb" => Ok(DetailLevel::Thumbnail),
            "detailed" | "detail" => Ok(DetailLevel::Detailed),
            _ => Err(Error::InvalidDetailLevel),
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailLevel::Coarse => write!(f, "coarse"),
            DetailLevel::Thumbnail => write!(f, "thumbnail"),
            DetailLevel::Detailed => write!(f, "detailed"),
        }
    }
}

/// Cache key of one rendered tile
///
/// The revision is the sector's counter when its bytes were read, so a
/// program or erase that bumps the counter orphans older tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Sector id
    pub sector: u32,
    /// Bit order used to unpack
    pub bit_order: BitOrder,
    /// Resolution tier
    pub detail: DetailLevel,
    /// Sector revision at read time
    pub revision: u64,
}

/// Rendered tiles, shared with whoever displays them
pub type TileCache = LruCache<TileKey, Arc<Raster>>;

/// Detailed-tier settings shared by every tile of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailStyle {
    /// Core raster height
    pub height: usize,
    /// Draw the check-bit strip
    pub with_ecc: bool,
    /// Periphery strip thickness, 0 for none
    pub periphery: usize,
}

impl Default for DetailStyle {
    fn default() -> Self {
        let options = DetailOptions::default();
        Self {
            height: options.height,
            with_ecc: options.with_ecc,
            periphery: options.periphery,
        }
    }
}

impl DetailStyle {
    /// Full options for one render
    pub fn options(self, bit_order: BitOrder, orientation: Orientation) -> DetailOptions {
        DetailOptions {
            height: self.height,
            bit_order,
            orientation,
            with_ecc: self.with_ecc,
            periphery: self.periphery,
        }
    }
}

/// Render one sector at `level`
pub fn render_tile(
    sector: &[u8],
    bit_order: BitOrder,
    level: DetailLevel,
    orientation: Orientation,
    style: &DetailStyle,
    config: &RenderConfig,
) -> Result<Raster> {
    if level == DetailLevel::Coarse {
        return render_coarse(sector, orientation, config);
    }
    let matrix = BitMatrix::unpack(sector, bit_order)?;
    render_tile_bits(sector, &matrix, level, orientation, style, config)
}

/// [`render_tile`] reusing an unpacked copy of `sector`
pub fn render_tile_bits(
    sector: &[u8],
    matrix: &BitMatrix,
    level: DetailLevel,
    orientation: Orientation,
    style: &DetailStyle,
    config: &RenderConfig,
) -> Result<Raster> {
    match (level, level.size(orientation)) {
        (DetailLevel::Coarse, _) => render_coarse(sector, orientation, config),
        (_, Some((w, h))) => render_thumbnail_bits(matrix, w, h, orientation, config),
        (_, None) => {
            let options = style.options(matrix.order(), orientation);
            render_detailed_bits(sector, matrix, &options, config)
        }
    }
}

fn render_coarse(sector: &[u8], orientation: Orientation, config: &RenderConfig) -> Result<Raster> {
    let (w, h) = DetailLevel::Coarse
        .size(orientation)
        .ok_or(Error::InvalidDetailLevel)?;
    render_thumbnail_fast(sector, w, h, orientation, config)
}
