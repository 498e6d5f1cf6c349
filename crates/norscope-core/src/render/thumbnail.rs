//! Thumbnail and detailed sector rasters

use super::signal::check_sector_len;
use super::{
    fast_bitline_zero_ratios, fast_page_zero_ratios, resample, smooth, BitMatrix, BitOrder,
    Orientation, Raster, RenderConfig,
};
use crate::addressing::PAGE_SIZE;
use crate::ecc::{ecc_matrix_for_sector, ECC_BITS};
use crate::error::{Error, Result};
use crate::pattern::ERASED;

/// Core raster width of the detailed view, pages along x
pub const DETAIL_WIDTH_HORIZONTAL: usize = 256;
/// Core raster width of the detailed view, pages along y
pub const DETAIL_WIDTH_VERTICAL: usize = 96;
/// Pixels per check bit across the vertical check-bit strip
const ECC_BIT_WIDTH: usize = 2;
/// Tick spacing on periphery strips
const PERIPHERY_TICK: usize = 16;

fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Shared tail of both thumbnail variants: smooth, resample, blend, color
fn compose(
    page_signal: &[f32],
    bitline_signal: &[f32],
    width: usize,
    height: usize,
    orientation: Orientation,
    config: &RenderConfig,
) -> Raster {
    let pages = smooth(page_signal, &config.smoothing);
    let bitlines = smooth(bitline_signal, &config.smoothing);
    let profile = config.profile(orientation);
    let palette = &config.palette;

    let (xs, ys) = match orientation {
        Orientation::Horizontal => (resample(&pages, width), resample(&bitlines, height)),
        Orientation::Vertical => (resample(&bitlines, width), resample(&pages, height)),
    };

    let mut raster = Raster::new(width, height, palette.erased);
    for (y, &sy) in ys.iter().enumerate() {
        for (x, &sx) in xs.iter().enumerate() {
            let (t, factor) = match orientation {
                Orientation::Horizontal => (
                    profile.blend.intensity(sx, sy),
                    profile.stripes.factor(x, width),
                ),
                Orientation::Vertical => (
                    profile.blend.intensity(sy, sx),
                    profile.stripes.factor(y, height),
                ),
            };
            let color = palette.erased.mix(palette.programmed, t).scale(factor);
            raster.set(x, y, color);
        }
    }
    raster
}

/// Render a `width x height` thumbnail of one 64 KiB sector
pub fn render_thumbnail(
    sector: &[u8],
    width: usize,
    height: usize,
    bit_order: BitOrder,
    orientation: Orientation,
    config: &RenderConfig,
) -> Result<Raster> {
    check_dimensions(width, height)?;
    let matrix = BitMatrix::unpack(sector, bit_order)?;
    render_thumbnail_bits(&matrix, width, height, orientation, config)
}

/// [`render_thumbnail`] from an already unpacked sector
pub fn render_thumbnail_bits(
    matrix: &BitMatrix,
    width: usize,
    height: usize,
    orientation: Orientation,
    config: &RenderConfig,
) -> Result<Raster> {
    check_dimensions(width, height)?;
    Ok(compose(
        &matrix.page_zero_ratios(),
        &matrix.bitline_zero_ratios(),
        width,
        height,
        orientation,
        config,
    ))
}

/// Coarse thumbnail from byte population counts
///
/// The page signal is exact. The bitline signal is resolved per byte
/// column only, so bit order has no effect here.
pub fn render_thumbnail_fast(
    sector: &[u8],
    width: usize,
    height: usize,
    orientation: Orientation,
    config: &RenderConfig,
) -> Result<Raster> {
    check_dimensions(width, height)?;
    Ok(compose(
        &fast_page_zero_ratios(sector)?,
        &fast_bitline_zero_ratios(sector)?,
        width,
        height,
        orientation,
        config,
    ))
}

/// Options of [`render_detailed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailOptions {
    /// Raster height in pixels, periphery excluded
    pub height: usize,
    /// Bit unpacking order
    pub bit_order: BitOrder,
    /// Axis convention
    pub orientation: Orientation,
    /// Prepend the check-bit strip
    pub with_ecc: bool,
    /// Thickness of the periphery strips, 0 for none
    pub periphery: usize,
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            height: 180,
            bit_order: BitOrder::Msb,
            orientation: Orientation::Horizontal,
            with_ecc: true,
            periphery: 0,
        }
    }
}

/// Check-bit strip. Erased pages use the erased color; otherwise a set
/// bit uses the programmed color and a clear bit the unset color.
fn ecc_strip(
    sector: &[u8],
    height: usize,
    orientation: Orientation,
    config: &RenderConfig,
) -> Result<Raster> {
    let matrix = ecc_matrix_for_sector(sector)?;
    let erased: Vec<bool> = sector
        .chunks_exact(PAGE_SIZE as usize)
        .map(|page| page.iter().all(|&b| b == ERASED))
        .collect();
    let palette = &config.palette;
    let color = |row: usize, page: usize| {
        if erased[page] {
            palette.erased
        } else if matrix.get(row, page) == 1 {
            palette.programmed
        } else {
            palette.unset
        }
    };

    let pages = matrix.pages();
    let raster = match orientation {
        Orientation::Horizontal => {
            let mut strip = Raster::new(pages, height, palette.unset);
            for y in 0..height {
                let row = y * ECC_BITS / height;
                for page in 0..pages {
                    strip.set(page, y, color(row, page));
                }
            }
            strip
        }
        Orientation::Vertical => {
            let width = ECC_BITS * ECC_BIT_WIDTH;
            let mut strip = Raster::new(width, height, palette.unset);
            for y in 0..height {
                let page = y * pages / height;
                for x in 0..width {
                    strip.set(x, y, color(x / ECC_BIT_WIDTH, page));
                }
            }
            strip
        }
    };
    Ok(raster)
}

/// Decorative periphery strip, `len` along its long axis
fn periphery_strip(len: usize, thickness: usize, along_x: bool, config: &RenderConfig) -> Raster {
    let palette = &config.palette;
    let tick = palette.unset.mix(palette.erased, 0.5);
    let (width, height) = if along_x {
        (len, thickness)
    } else {
        (thickness, len)
    };
    let mut strip = Raster::new(width, height, palette.unset);
    for pos in (0..len).step_by(PERIPHERY_TICK) {
        for across in 0..thickness {
            if along_x {
                strip.set(pos, across, tick);
            } else {
                strip.set(across, pos, tick);
            }
        }
    }
    strip
}

/// Render the detailed view: optional check-bit strip left of the core
/// raster, optional periphery strips on the outer edges
pub fn render_detailed(
    sector: &[u8],
    options: &DetailOptions,
    config: &RenderConfig,
) -> Result<Raster> {
    let matrix = BitMatrix::unpack(sector, options.bit_order)?;
    render_detailed_bits(sector, &matrix, options, config)
}

/// [`render_detailed`] reusing an unpacked copy of `sector`
///
/// `matrix` must come from the same bytes; its bit order takes the place
/// of `options.bit_order`.
pub fn render_detailed_bits(
    sector: &[u8],
    matrix: &BitMatrix,
    options: &DetailOptions,
    config: &RenderConfig,
) -> Result<Raster> {
    check_sector_len(sector)?;
    let width = match options.orientation {
        Orientation::Horizontal => DETAIL_WIDTH_HORIZONTAL,
        Orientation::Vertical => DETAIL_WIDTH_VERTICAL,
    };
    let core = render_thumbnail_bits(matrix, width, options.height, options.orientation, config)?;

    let body = if options.with_ecc {
        let strip = ecc_strip(sector, options.height, options.orientation, config)?;
        Raster::hconcat(&[&strip, &core])?
    } else {
        core
    };

    if options.periphery == 0 {
        return Ok(body);
    }
    match options.orientation {
        Orientation::Horizontal => {
            let edge = periphery_strip(body.width(), options.periphery, true, config);
            Raster::vconcat(&[&edge, &body, &edge])
        }
        Orientation::Vertical => {
            let edge = periphery_strip(body.height(), options.periphery, false, config);
            Raster::hconcat(&[&edge, &body, &edge])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::SECTOR_SIZE;
    use crate::render::{content_hash, RenderPreset, Rgb};

    fn sector_with(fill: u8) -> Vec<u8> {
        vec![fill; SECTOR_SIZE as usize]
    }

    fn mean_color(r: &Raster) -> Rgb {
        let n = (r.width() * r.height()) as u64;
        let mut sum = [0u64; 3];
        for px in r.pixels().chunks_exact(3) {
            for (s, &c) in sum.iter_mut().zip(px) {
                *s += c as u64;
            }
        }
        Rgb::new((sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8)
    }

    #[test]
    fn test_thumbnail_dimensions() {
        let cfg = RenderConfig::default();
        let r = render_thumbnail(&sector_with(0xFF), 48, 32, BitOrder::Msb, Orientation::Horizontal, &cfg)
            .unwrap();
        assert_eq!((r.width(), r.height()), (48, 32));
        assert_eq!(r.pixels().len(), 48 * 32 * 3);

        let r = render_thumbnail(&sector_with(0xFF), 1, 1, BitOrder::Msb, Orientation::Vertical, &cfg)
            .unwrap();
        assert_eq!((r.width(), r.height()), (1, 1));
    }

    #[test]
    fn test_thumbnail_rejects_bad_input() {
        let cfg = RenderConfig::default();
        assert_eq!(
            render_thumbnail(&sector_with(0xFF), 0, 4, BitOrder::Msb, Orientation::Horizontal, &cfg),
            Err(Error::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
        assert!(render_thumbnail(&[0u8; 10], 4, 4, BitOrder::Msb, Orientation::Horizontal, &cfg)
            .is_err());
    }

    #[test]
    fn test_thumbnail_deterministic() {
        let cfg = RenderConfig::default();
        let mut sector = sector_with(0xFF);
        for (i, b) in sector.iter_mut().enumerate().take(0x4000) {
            *b = (i * 7) as u8;
        }
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let a = render_thumbnail(&sector, 64, 24, BitOrder::Msb, orientation, &cfg).unwrap();
            let b = render_thumbnail(&sector, 64, 24, BitOrder::Msb, orientation, &cfg).unwrap();
            assert_eq!(a, b);
            assert_eq!(content_hash(&a), content_hash(&b));
        }
    }

    #[test]
    fn test_color_ordering() {
        let cfg = RenderConfig::default();
        let p = cfg.palette;
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let erased =
                render_thumbnail(&sector_with(0xFF), 64, 64, BitOrder::Msb, orientation, &cfg).unwrap();
            let programmed =
                render_thumbnail(&sector_with(0x00), 64, 64, BitOrder::Msb, orientation, &cfg).unwrap();
            let e = mean_color(&erased);
            let g = mean_color(&programmed);
            assert!(e.distance_sq(p.erased) < e.distance_sq(p.programmed));
            assert!(g.distance_sq(p.programmed) < g.distance_sq(p.erased));
        }
    }

    #[test]
    fn test_flat_preset_exact_anchors() {
        let cfg = RenderPreset::Flat.config();
        let erased =
            render_thumbnail(&sector_with(0xFF), 8, 8, BitOrder::Msb, Orientation::Horizontal, &cfg)
                .unwrap();
        assert!(erased.pixels().chunks_exact(3).all(|px| px == [35, 170, 70]));
        let programmed =
            render_thumbnail(&sector_with(0x00), 8, 8, BitOrder::Msb, Orientation::Horizontal, &cfg)
                .unwrap();
        assert!(programmed
            .pixels()
            .chunks_exact(3)
            .all(|px| px == [230, 220, 70]));
    }

    #[test]
    fn test_orientation_changes_output() {
        let cfg = RenderConfig::default();
        let mut sector = sector_with(0xFF);
        sector[..0x8000].fill(0x00);
        let h = render_thumbnail(&sector, 32, 32, BitOrder::Msb, Orientation::Horizontal, &cfg).unwrap();
        let v = render_thumbnail(&sector, 32, 32, BitOrder::Msb, Orientation::Vertical, &cfg).unwrap();
        assert_ne!(content_hash(&h), content_hash(&v));
    }

    #[test]
    fn test_bit_order_matters_for_asymmetric_bytes() {
        let cfg = RenderConfig::default();
        let sector = sector_with(0x0F);
        let msb = render_thumbnail(&sector, 16, 64, BitOrder::Msb, Orientation::Horizontal, &cfg).unwrap();
        let lsb = render_thumbnail(&sector, 16, 64, BitOrder::Lsb, Orientation::Horizontal, &cfg).unwrap();
        assert_ne!(msb, lsb);
    }

    #[test]
    fn test_fast_variant() {
        let cfg = RenderConfig::default();
        let erased = render_thumbnail_fast(&sector_with(0xFF), 32, 8, Orientation::Horizontal, &cfg).unwrap();
        let full = render_thumbnail(&sector_with(0xFF), 32, 8, BitOrder::Msb, Orientation::Horizontal, &cfg)
            .unwrap();
        // Uniform bytes give identical signals either way
        assert_eq!(erased, full);

        let r = render_thumbnail_fast(&sector_with(0x0F), 32, 8, Orientation::Vertical, &cfg).unwrap();
        assert_eq!((r.width(), r.height()), (32, 8));
        assert!(render_thumbnail_fast(&sector_with(0), 0, 8, Orientation::Vertical, &cfg).is_err());
    }

    #[test]
    fn test_detailed_dimensions() {
        let cfg = RenderConfig::default();
        let sector = sector_with(0xFF);

        let opts = DetailOptions::default();
        let r = render_detailed(&sector, &opts, &cfg).unwrap();
        assert_eq!((r.width(), r.height()), (256 + 256, 180));

        let opts = DetailOptions {
            with_ecc: false,
            ..DetailOptions::default()
        };
        let r = render_detailed(&sector, &opts, &cfg).unwrap();
        assert_eq!((r.width(), r.height()), (256, 180));

        let opts = DetailOptions {
            orientation: Orientation::Vertical,
            height: 256,
            ..DetailOptions::default()
        };
        let r = render_detailed(&sector, &opts, &cfg).unwrap();
        assert_eq!((r.width(), r.height()), (20 + 96, 256));

        let opts = DetailOptions {
            periphery: 4,
            ..DetailOptions::default()
        };
        let r = render_detailed(&sector, &opts, &cfg).unwrap();
        assert_eq!((r.width(), r.height()), (512, 188));

        let opts = DetailOptions {
            orientation: Orientation::Vertical,
            periphery: 3,
            ..DetailOptions::default()
        };
        let r = render_detailed(&sector, &opts, &cfg).unwrap();
        assert_eq!((r.width(), r.height()), (3 + 20 + 96 + 3, 180));
    }

    #[test]
    fn test_unpacked_variants_match() {
        let cfg = RenderConfig::default();
        let mut sector = sector_with(0xFF);
        sector[0x4000..0x6000].fill(0x3C);
        let matrix = BitMatrix::unpack(&sector, BitOrder::Lsb).unwrap();

        assert_eq!(
            render_thumbnail_bits(&matrix, 64, 16, Orientation::Vertical, &cfg).unwrap(),
            render_thumbnail(&sector, 64, 16, BitOrder::Lsb, Orientation::Vertical, &cfg).unwrap()
        );
        let opts = DetailOptions {
            bit_order: BitOrder::Lsb,
            periphery: 2,
            ..DetailOptions::default()
        };
        assert_eq!(
            render_detailed_bits(&sector, &matrix, &opts, &cfg).unwrap(),
            render_detailed(&sector, &opts, &cfg).unwrap()
        );
    }

    #[test]
    fn test_ecc_strip_colors() {
        let cfg = RenderConfig::default();
        let p = cfg.palette;
        let mut sector = sector_with(0xFF);
        // page 1 all zero: every check bit clear
        sector[0x100..0x200].fill(0x00);
        let r = render_detailed(&sector, &DetailOptions::default(), &cfg).unwrap();
        assert_eq!(r.get(0, 0), Some(p.erased));
        assert_eq!(r.get(1, 0), Some(p.unset));
        assert_eq!(r.get(1, 179), Some(p.unset));
    }

    #[test]
    fn test_periphery_ticks() {
        let cfg = RenderConfig::default();
        let p = cfg.palette;
        let opts = DetailOptions {
            periphery: 2,
            with_ecc: false,
            ..DetailOptions::default()
        };
        let r = render_detailed(&sector_with(0xFF), &opts, &cfg).unwrap();
        let tick = p.unset.mix(p.erased, 0.5);
        assert_eq!(r.get(0, 0), Some(tick));
        assert_eq!(r.get(16, 1), Some(tick));
        assert_eq!(r.get(1, 0), Some(p.unset));
        assert_eq!(r.get(1, r.height() - 1), Some(p.unset));
    }
}
