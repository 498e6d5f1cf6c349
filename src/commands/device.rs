//! Device commands: project creation, inspection and mutation

use super::{format_size, load_project, CommandResult};
use norscope_core::addressing::{self, SECTOR_COUNT, SECTOR_SIZE};
use norscope_core::ecc::{ecc_matrix_for_sector, EccVector, ECC_BITS};
use norscope_core::pattern::PatternSegment;
use norscope_core::project::Project;
use norscope_core::session::Session;
use std::path::Path;

const DUMP_WIDTH: usize = 16;

/// Create an erased project
pub fn run_init(path: &Path, force: bool) -> CommandResult {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    Project::new().save(path)?;
    println!(
        "Created {} ({} erased device)",
        path.display(),
        format_size(addressing::CAPACITY)
    );
    Ok(())
}

/// Print the decomposition of one address
pub fn run_info(addr: u32) -> CommandResult {
    let info = addressing::locate(addr)?;
    println!("Address:        {:#010X}", info.address);
    println!("Sector:         {} (offset {:#06X})", info.sector, info.offset_in_sector);
    println!("32K sub-sector: {}", info.sub32);
    println!("4K sub-sector:  {}", info.sub4);
    println!("Page:           {} ({} in sector)", info.page, info.page_in_sector);
    println!(
        "Grid:           array {}, row {}, column {}",
        info.grid.array_idx, info.grid.row, info.grid.global_col
    );
    Ok(())
}

/// Hex dump a range
pub fn run_read(path: &Path, start: u32, size: usize) -> CommandResult {
    let project = load_project(path)?;
    let data = project.memory.read(start, size)?;
    for (i, line) in data.chunks(DUMP_WIDTH).enumerate() {
        println!("{}", dump_line(start as usize + i * DUMP_WIDTH, line));
    }
    Ok(())
}

fn dump_line(addr: usize, bytes: &[u8]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    let ascii: String = bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect();
    format!(
        "{:08X}  {:<width$}  |{}|",
        addr,
        hex.join(" "),
        ascii,
        width = DUMP_WIDTH * 3 - 1
    )
}

/// Program a range with a pattern
pub fn run_program(
    path: &Path,
    start: u32,
    size: usize,
    segments: &[PatternSegment],
    enforce_nor: bool,
) -> CommandResult {
    let mut project = load_project(path)?;
    for segment in segments {
        log::debug!("segment {}", segment);
    }
    project.memory.program(start, size, segments, enforce_nor)?;
    project.save(path)?;
    println!(
        "Programmed {:#010X}..{:#010X} ({}){}",
        start,
        start as usize + size,
        format_size(size),
        if enforce_nor { "" } else { " without NOR rule" }
    );
    Ok(())
}

/// Erase a range or a whole sector
pub fn run_erase(
    path: &Path,
    start: Option<u32>,
    size: Option<usize>,
    sector: Option<u32>,
) -> CommandResult {
    let (start, size) = match (start, size, sector) {
        (_, _, Some(sector)) => (addressing::sector_start(sector)?, SECTOR_SIZE as usize),
        (Some(start), Some(size), None) => (start, size),
        _ => return Err("specify --start and --size, or --sector".into()),
    };

    let mut project = load_project(path)?;
    project.memory.erase(start, size)?;
    project.save(path)?;
    println!(
        "Erased {:#010X}..{:#010X} ({})",
        start,
        start as usize + size,
        format_size(size)
    );
    Ok(())
}

fn format_ecc(vector: &EccVector) -> String {
    vector.iter().map(|b| char::from(b'0' + b)).collect()
}

/// Print the check bits of a sector or a single page
pub fn run_ecc(path: &Path, sector: u32, page: Option<u32>) -> CommandResult {
    let project = load_project(path)?;
    let bytes = project.memory.read_sector(sector)?;
    let matrix = ecc_matrix_for_sector(&bytes)?;

    match page {
        Some(page) => {
            let (first, last) = addressing::dataset_address(sector, page)?;
            println!(
                "Sector {} page {} ({:#010X}..={:#010X}): {}",
                sector,
                page,
                first,
                last,
                format_ecc(matrix.column(page as usize))
            );
        }
        None => {
            println!("Sector {}: {} check bits per page", sector, ECC_BITS);
            for p in 0..matrix.pages() {
                println!("  page {:3}: {}", p, format_ecc(matrix.column(p)));
            }
        }
    }
    Ok(())
}

/// List programmed sectors
pub fn run_status(path: &Path) -> CommandResult {
    let mut session = Session::new(load_project(path)?.memory);

    println!("{:>6} {:>12} {:>10} {:>8}", "Sector", "Start", "Programmed", "Entropy");
    println!("{:-<39}", "");

    let mut programmed = 0;
    for sector in 0..SECTOR_COUNT {
        let state = session.sector_state(sector)?;
        if state.erased {
            continue;
        }
        programmed += 1;
        println!(
            "{:>6} {:#012X} {:>9.1}% {:>8.3}",
            sector,
            addressing::sector_start(sector)?,
            state.programmed_ratio * 100.0,
            state.entropy
        );
    }

    println!(
        "\n{} of {} sectors programmed",
        programmed, SECTOR_COUNT
    );
    Ok(())
}
