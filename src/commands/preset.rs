//! Training preset command

use super::{load_project, sector_progress, CommandResult, EffectiveRender};
use crate::cli::RenderArgs;
use norscope_core::preset::{
    apply_preset_sector, report_from_hashes, sector_hash, PresetReport, PRESET_SECTORS,
};
use std::path::Path;

/// Apply the preset (unless `validate_only`) and check the sector pairs
pub fn run_preset(path: &Path, validate_only: bool, args: &RenderArgs) -> CommandResult {
    let mut project = load_project(path)?;
    let effective = EffectiveRender::resolve(&project.settings, args);

    if !validate_only {
        let pb = sector_progress(PRESET_SECTORS as u64, "programming");
        for sector in 0..PRESET_SECTORS {
            apply_preset_sector(&mut project.memory, sector)?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        project.save(path)?;
        println!("Programmed preset into sectors 0..{}", PRESET_SECTORS);
    }

    let pb = sector_progress(PRESET_SECTORS as u64, "hashing");
    let mut hashes = Vec::with_capacity(PRESET_SECTORS as usize);
    for sector in 0..PRESET_SECTORS {
        let hash = sector_hash(&project.memory, sector, effective.bit_order, &effective.config)?;
        hashes.push((sector, hash));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = report_from_hashes(hashes);
    print_report(&report);

    if report.passed() {
        println!("\nPreset validation passed");
        Ok(())
    } else {
        Err("preset validation failed: paired sectors render differently".into())
    }
}

fn print_report(report: &PresetReport) {
    println!("{:>6}  {}", "Sector", "Thumbnail hash");
    println!("{:-<74}", "");
    for (sector, hash) in &report.hashes {
        println!("{:>6}  {}", sector, hash);
    }

    println!("\nPairs:");
    for pair in &report.pairs {
        println!(
            "  {:>2} / {:<2} {}",
            pair.a,
            pair.b,
            if pair.matches() { "match" } else { "MISMATCH" }
        );
    }
}
