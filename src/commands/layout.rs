//! Layout command implementations

use super::{load_project, CommandResult};
use norscope_core::layout::{
    placement, row_sector_ids, row_strip_order, sector_grid_position, visible_placements,
    LayoutConfig, LayoutGrid, GAP_ROW,
};
use norscope_core::memory::MemoryModel;
use std::path::Path;

/// Show where a sector sits on the die
pub fn run_sector(path: &Path, sector: u32) -> CommandResult {
    // Placement follows the project layout when there is one
    let cfg = if path.exists() {
        load_project(path)?.settings.layout
    } else {
        LayoutConfig::default()
    };

    let grid = sector_grid_position(sector)?;
    let cell = placement(sector, &cfg)?;
    println!("Sector {}", sector);
    println!(
        "  Array {}, block {}, local id {}",
        cell.array_idx, cell.block_idx, cell.local_id
    );
    println!("  Block cell: row {}, column {}", cell.row, cell.col);
    println!("  Array grid: row {}, column {}", grid.row, grid.global_col);
    println!("  Die cell:   x {}, y {}", cell.x, cell.y);
    Ok(())
}

/// Show one row of an array in strip reading order
pub fn run_row(array: u32, row: u32) -> CommandResult {
    let ids = row_sector_ids(array, row)?;
    let (left, right) = row_strip_order(array, row)?;

    println!("Array {} row {}", array, row);
    println!("  By column: {}", join_ids(&ids));
    println!("  Strip:     {} | {}", join_ids(&left), join_ids(&right));
    Ok(())
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| format!("{:3}", id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print the die map: `#` programmed, `.` erased, `-` gap row, blank hidden
pub fn run_map(path: &Path) -> CommandResult {
    let project = load_project(path)?;
    let cfg = &project.settings.layout;
    for line in die_map(&project.memory, cfg) {
        println!("{}", line);
    }
    Ok(())
}

fn die_map(memory: &MemoryModel, cfg: &LayoutConfig) -> Vec<String> {
    let placements = visible_placements(cfg);
    let width = placements.iter().map(|p| p.x + 1).max().unwrap_or(0) as usize;
    let height = placements.iter().map(|p| p.y + 1).max().unwrap_or(0) as usize;

    let mut rows = vec![vec![' '; width]; height];
    for p in &placements {
        let erased = memory
            .sector_state(p.sector_id)
            .map(|s| s.erased)
            .unwrap_or(true);
        rows[p.y as usize][p.x as usize] = if erased { '.' } else { '#' };
    }
    // Mark the gap row of each array
    for (y, row) in rows.iter_mut().enumerate() {
        if y as u32 % (cfg.block_height + 1) == GAP_ROW {
            row.iter_mut().for_each(|c| *c = '-');
        }
    }
    rows.into_iter().map(|r| r.into_iter().collect()).collect()
}

/// Export the folded block grid as RON
pub fn run_export(output: &Path) -> CommandResult {
    let grid = LayoutGrid::folded64();
    grid.to_ron_file(output)?;
    println!(
        "Saved {}x{} folded grid to {}",
        grid.rows,
        grid.cols,
        output.display()
    );
    Ok(())
}
