//! Render command implementations

use super::{load_project, sector_progress, CommandResult, EffectiveRender};
use crate::cli::RenderArgs;
use indicatif::ProgressBar;
use norscope_core::addressing::SECTOR_COUNT;
use norscope_core::render::{
    content_hash, render_detailed, render_thumbnail, BitOrder, DetailLevel, DrainStats,
    RenderScheduler,
};
use norscope_core::session::Session;
use std::fs;
use std::path::{Path, PathBuf};

/// Options of a single-sector render
pub struct RenderRequest {
    /// Sector id
    pub sector: u32,
    /// Detailed view instead of a thumbnail
    pub detailed: bool,
    /// Thumbnail width
    pub width: usize,
    /// Thumbnail or detailed height
    pub height: usize,
    /// Suppress the check-bit strip
    pub no_ecc: bool,
    /// Periphery override
    pub periphery: Option<usize>,
    /// Bit position for the band view
    pub band: Option<usize>,
    /// Pixels per bit in the band view
    pub cell_size: usize,
}

/// Render one sector to a PPM file and print its hash
pub fn run_render(
    path: &Path,
    request: &RenderRequest,
    output: &Path,
    args: &RenderArgs,
) -> CommandResult {
    let project = load_project(path)?;
    let effective = EffectiveRender::resolve(&project.settings, args);

    let raster = if let Some(band) = request.band {
        let mut session = Session::new(project.memory);
        session.set_config(effective.config.clone());
        session.band_tile(request.sector, band, effective.bit_order, request.cell_size)?
    } else if request.detailed {
        let bytes = project.memory.read_sector(request.sector)?;
        let mut options = effective.style.options(effective.bit_order, effective.orientation);
        options.height = request.height;
        options.with_ecc &= !request.no_ecc;
        if let Some(periphery) = request.periphery {
            options.periphery = periphery;
        }
        render_detailed(&bytes, &options, &effective.config)?
    } else {
        let bytes = project.memory.read_sector(request.sector)?;
        render_thumbnail(
            &bytes,
            request.width,
            request.height,
            effective.bit_order,
            effective.orientation,
            &effective.config,
        )?
    };

    raster.write_ppm(output)?;
    println!(
        "Sector {} ({}x{}, {}, {}) -> {}",
        request.sector,
        raster.width(),
        raster.height(),
        effective.bit_order,
        effective.orientation,
        output.display()
    );
    println!("{}", content_hash(&raster));
    Ok(())
}

fn tile_path(dir: &Path, sector: u32) -> PathBuf {
    dir.join(format!("sector_{:03}.ppm", sector))
}

/// Queue one job per sector, returning how many the scheduler took
fn submit_sectors(
    session: &mut Session,
    scheduler: &mut RenderScheduler,
    sectors: impl IntoIterator<Item = u32>,
    bit_order: BitOrder,
    level: DetailLevel,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut accepted = 0;
    for sector in sectors {
        let job = session.render_job(sector, bit_order, level)?;
        if scheduler.submit(job) {
            accepted += 1;
        } else {
            log::debug!("sector {} not queued", sector);
        }
    }
    Ok(accepted)
}

/// Apply results as they arrive until nothing is in flight
fn collect_renders(
    session: &mut Session,
    scheduler: &mut RenderScheduler,
    pb: &ProgressBar,
) -> DrainStats {
    let mut total = DrainStats::default();
    while let Some(stats) = session.wait_render(scheduler) {
        pb.inc((stats.applied + stats.stale + stats.failed) as u64);
        total.applied += stats.applied;
        total.stale += stats.stale;
        total.failed += stats.failed;
    }
    total
}

/// Render every sector through the render workers
pub fn run_thumbnails(
    path: &Path,
    output_dir: &Path,
    level: DetailLevel,
    jobs: usize,
    args: &RenderArgs,
) -> CommandResult {
    let project = load_project(path)?;
    let effective = EffectiveRender::resolve(&project.settings, args);
    fs::create_dir_all(output_dir)?;

    let mut session = Session::new(project.memory);
    session.set_orientation(effective.orientation);
    session.set_config(effective.config);
    session.set_detail_style(effective.style);

    let mut scheduler = RenderScheduler::new(jobs);
    log::info!(
        "Rendering {} sectors at {} detail on {} thread(s)",
        SECTOR_COUNT,
        level,
        scheduler.workers()
    );

    let accepted = submit_sectors(
        &mut session,
        &mut scheduler,
        0..SECTOR_COUNT,
        effective.bit_order,
        level,
    )?;
    let pb = sector_progress(accepted as u64, "rendering");
    let total = collect_renders(&mut session, &mut scheduler, &pb);
    pb.finish_and_clear();

    if total.failed > 0 {
        return Err(format!("{} sector render(s) failed", total.failed).into());
    }
    if total.applied < accepted {
        log::warn!("{} of {} renders were not applied", accepted - total.applied, accepted);
    }

    let mut written = 0;
    for sector in 0..SECTOR_COUNT {
        let Some(tile) = session.cached_tile(sector, effective.bit_order, level)? else {
            log::warn!("no tile for sector {}", sector);
            continue;
        };
        tile.write_ppm(tile_path(output_dir, sector))?;
        written += 1;
    }

    println!("Wrote {} tiles to {}", written, output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path() {
        assert_eq!(
            tile_path(Path::new("out"), 7),
            Path::new("out").join("sector_007.ppm")
        );
    }

    #[test]
    fn test_duplicate_sectors_rendered_once() {
        let mut session = Session::default();
        let mut scheduler = RenderScheduler::new(2);

        let accepted = submit_sectors(
            &mut session,
            &mut scheduler,
            [3, 3, 5],
            BitOrder::Msb,
            DetailLevel::Coarse,
        )
        .unwrap();
        assert_eq!(accepted, 2);

        let pb = ProgressBar::hidden();
        let total = collect_renders(&mut session, &mut scheduler, &pb);
        assert_eq!(total.applied, 2);
        assert_eq!(pb.position(), 2);
        assert_eq!(scheduler.pending(), 0);
        assert!(session
            .cached_tile(3, BitOrder::Msb, DetailLevel::Coarse)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_collect_with_nothing_submitted() {
        let mut session = Session::default();
        let mut scheduler = RenderScheduler::new(1);
        let total = collect_renders(&mut session, &mut scheduler, &ProgressBar::hidden());
        assert_eq!(total, DrainStats::default());
    }
}
