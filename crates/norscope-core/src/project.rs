//! Project files
//!
//! A project is a raw dump of the whole device plus a small TOML sidecar
//! holding visualization settings:
//!
//! ```toml
//! [project]
//! format_version = 1
//! dump = "lab.bin"
//!
//! [settings]
//! bit_order = "msb"
//! orientation = "horizontal"
//! render_preset = "lab"
//! show_ecc = true
//! periphery = 0
//! ```
//!
//! The dump has no header or framing; it is the device buffer byte for
//! byte and is written next to the sidecar as `<stem>.bin`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::LayoutConfig;
use crate::memory::MemoryModel;
use crate::render::{BitOrder, Orientation, RenderConfig, RenderPreset};

/// Sidecar format understood by this version
pub const FORMAT_VERSION: u32 = 1;

/// Errors from saving or loading a project
#[derive(Error, Debug)]
pub enum ProjectError {
    /// I/O error on the sidecar or dump
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar is not valid TOML for this format
    #[error("invalid sidecar: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be encoded
    #[error("cannot encode sidecar: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Dump does not fit the device
    #[error("invalid dump: {0}")]
    Device(#[from] crate::error::Error),

    /// Sidecar format version is not the one this build writes
    #[error("unsupported project format version {0}")]
    UnsupportedVersion(u32),

    /// Sidecar path has no file name to derive the dump name from
    #[error("invalid project path: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Visualization settings stored in the sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Bit unpacking order
    pub bit_order: BitOrder,
    /// Axis convention
    pub orientation: Orientation,
    /// Named render constants
    pub render_preset: RenderPreset,
    /// Draw the check-bit strip in detailed views
    pub show_ecc: bool,
    /// Periphery strip thickness in detailed views
    pub periphery: u32,
    /// Custom constants, overriding `render_preset`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderConfig>,
    /// Die layout
    pub layout: LayoutConfig,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            bit_order: BitOrder::Msb,
            orientation: Orientation::Horizontal,
            render_preset: RenderPreset::Lab,
            show_ecc: true,
            periphery: 0,
            render: None,
            layout: LayoutConfig::default(),
        }
    }
}

impl ProjectSettings {
    /// Effective render configuration
    pub fn render_config(&self) -> RenderConfig {
        self.render
            .clone()
            .unwrap_or_else(|| self.render_preset.config())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectMeta {
    format_version: u32,
    dump: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SidecarFile {
    project: ProjectMeta,
    #[serde(default)]
    settings: ProjectSettings,
}

/// Device contents plus settings
#[derive(Clone, Default)]
pub struct Project {
    /// The device
    pub memory: MemoryModel,
    /// Visualization settings
    pub settings: ProjectSettings,
}

/// Dump path belonging to a sidecar path
///
/// A sidecar that would share its path with the dump (`lab.bin`) is
/// rejected.
pub fn dump_path(sidecar: &Path) -> Result<PathBuf, ProjectError> {
    if sidecar.file_stem().is_none() {
        return Err(ProjectError::InvalidPath(sidecar.to_path_buf()));
    }
    let dump = sidecar.with_extension("bin");
    if dump == sidecar {
        return Err(ProjectError::InvalidPath(sidecar.to_path_buf()));
    }
    Ok(dump)
}

impl Project {
    /// Fresh erased device with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the dump and the sidecar
    pub fn save(&self, sidecar: impl AsRef<Path>) -> Result<(), ProjectError> {
        let sidecar = sidecar.as_ref();
        let dump = dump_path(sidecar)?;
        let dump_name = dump
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ProjectError::InvalidPath(sidecar.to_path_buf()))?
            .to_string();

        let file = SidecarFile {
            project: ProjectMeta {
                format_version: FORMAT_VERSION,
                dump: dump_name,
            },
            settings: self.settings.clone(),
        };
        let content = toml::to_string_pretty(&file)?;

        fs::write(&dump, self.memory.as_bytes())?;
        fs::write(sidecar, content)?;
        log::debug!("saved project {} ({})", sidecar.display(), dump.display());
        Ok(())
    }

    /// Read the sidecar and the dump it names
    pub fn load(sidecar: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let sidecar = sidecar.as_ref();
        let content = fs::read_to_string(sidecar)?;
        let file: SidecarFile = toml::from_str(&content)?;
        if file.project.format_version != FORMAT_VERSION {
            return Err(ProjectError::UnsupportedVersion(file.project.format_version));
        }

        let dump = match sidecar.parent() {
            Some(dir) => dir.join(&file.project.dump),
            None => PathBuf::from(&file.project.dump),
        };
        if dump == sidecar {
            return Err(ProjectError::InvalidPath(dump));
        }
        let image = fs::read(&dump)?;
        let memory = MemoryModel::from_image(&image)?;
        log::debug!("loaded project {} ({})", sidecar.display(), dump.display());
        Ok(Self {
            memory,
            settings: file.settings,
        })
    }
}
