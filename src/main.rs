//! norscope - NOR flash simulator and raster inspection tool
//!
//! Every command works on a project: a TOML sidecar with visualization
//! settings next to a raw 32 MiB dump of the simulated device. Commands
//! that change the device load the project, mutate it and save it back.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, LayoutCommands};

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let project = cli.project;
    let result = match cli.command {
        Commands::Init { force } => commands::device::run_init(&project, force),
        Commands::Info { addr } => commands::device::run_info(addr),
        Commands::Layout(cmd) => match cmd {
            LayoutCommands::Sector { sector } => commands::layout::run_sector(&project, sector),
            LayoutCommands::Row { array, row } => commands::layout::run_row(array, row),
            LayoutCommands::Map => commands::layout::run_map(&project),
            LayoutCommands::Export { output } => commands::layout::run_export(&output),
        },
        Commands::Read { start, size } => commands::device::run_read(&project, start, size),
        Commands::Program {
            start,
            size,
            segments,
            no_nor,
        } => commands::device::run_program(&project, start, size, &segments, !no_nor),
        Commands::Erase {
            start,
            size,
            sector,
        } => commands::device::run_erase(&project, start, size, sector),
        Commands::Ecc { sector, page } => commands::device::run_ecc(&project, sector, page),
        Commands::Render {
            sector,
            output,
            detailed,
            width,
            height,
            no_ecc,
            periphery,
            band,
            cell_size,
            render,
        } => {
            let request = commands::render::RenderRequest {
                sector,
                detailed,
                width,
                height,
                no_ecc,
                periphery,
                band,
                cell_size,
            };
            commands::render::run_render(&project, &request, &output, &render)
        }
        Commands::Thumbnails {
            output_dir,
            level,
            jobs,
            render,
        } => commands::render::run_thumbnails(&project, &output_dir, level, jobs, &render),
        Commands::Status => commands::device::run_status(&project),
        Commands::Preset {
            validate_only,
            render,
        } => commands::preset::run_preset(&project, validate_only, &render),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
