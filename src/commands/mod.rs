//! CLI command implementations
//!
//! Commands load the project named by `--project`, work on its
//! [`MemoryModel`](norscope_core::memory::MemoryModel) and, when they
//! changed the device, save it back before returning.

pub mod device;
pub mod layout;
pub mod preset;
pub mod render;

use crate::cli::RenderArgs;
use indicatif::{ProgressBar, ProgressStyle};
use norscope_core::project::{Project, ProjectSettings};
use norscope_core::render::{BitOrder, DetailStyle, Orientation, RenderConfig};
use std::path::Path;

/// Result type shared by all commands
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Load a project, with a hint when it does not exist yet
fn load_project(path: &Path) -> Result<Project, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!(
            "project {} not found (create it with `norscope init`)",
            path.display()
        )
        .into());
    }
    let project = Project::load(path)?;
    log::debug!("project settings: {:?}", project.settings);
    Ok(project)
}

/// Render settings of one invocation: project values with CLI overrides
struct EffectiveRender {
    bit_order: BitOrder,
    orientation: Orientation,
    config: RenderConfig,
    style: DetailStyle,
}

impl EffectiveRender {
    fn resolve(settings: &ProjectSettings, args: &RenderArgs) -> Self {
        // An explicit preset wins over a custom config stored in the project
        let config = match args.render_preset {
            Some(preset) => preset.config(),
            None => settings.render_config(),
        };
        Self {
            bit_order: args.bit_order.unwrap_or(settings.bit_order),
            orientation: args.orientation.unwrap_or(settings.orientation),
            config,
            style: DetailStyle {
                with_ecc: settings.show_ecc,
                periphery: settings.periphery as usize,
                ..DetailStyle::default()
            },
        }
    }
}

/// Progress bar counting sectors
fn sector_progress(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} sectors ({{eta}}) {}",
            phase
        ))
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Format a byte count with binary units
fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
