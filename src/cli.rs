//! CLI argument parsing

use clap::{Parser, Subcommand};
use norscope_core::pattern::PatternSegment;
use norscope_core::render::{BitOrder, DetailLevel, Orientation, RenderPreset};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal byte count
fn parse_hex_usize(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<usize>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "norscope")]
#[command(author, version, about = "NOR flash simulator and raster inspection tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project sidecar file; the raw dump lives next to it as <stem>.bin
    #[arg(short, long, global = true, default_value = "norscope.toml")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Render overrides shared across commands; unset values come from the project
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Bit order inside a byte (msb, lsb)
    #[arg(long)]
    pub bit_order: Option<BitOrder>,

    /// Which signal runs along x (horizontal, vertical)
    #[arg(long)]
    pub orientation: Option<Orientation>,

    /// Named render constants (lab, flat)
    #[arg(long)]
    pub render_preset: Option<RenderPreset>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a project with a fully erased device
    Init {
        /// Overwrite an existing project
        #[arg(long)]
        force: bool,
    },

    /// Decompose an address into sector, sub-sectors, page and die position
    Info {
        /// Address (hex, e.g., 0x123456)
        #[arg(long, value_parser = parse_hex_u32)]
        addr: u32,
    },

    /// Die layout operations
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// Hex dump a range of the device
    Read {
        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        start: u32,

        /// Number of bytes (hex or decimal)
        #[arg(long, value_parser = parse_hex_usize, default_value = "256")]
        size: usize,
    },

    /// Program a range with a segment pattern
    Program {
        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        start: u32,

        /// Number of bytes (hex or decimal)
        #[arg(long, value_parser = parse_hex_usize)]
        size: usize,

        /// Pattern segment as kind:size:value, e.g. text:0x100:Data or
        /// hex:16:CC AA or fill:0x1000:0x55 (repeatable, applied in order)
        #[arg(short, long = "segment", required = true)]
        segments: Vec<PatternSegment>,

        /// Overwrite instead of ANDing into the old contents
        #[arg(long)]
        no_nor: bool,
    },

    /// Erase a range or a whole sector back to 0xFF
    Erase {
        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, requires = "size", conflicts_with = "sector")]
        start: Option<u32>,

        /// Number of bytes (hex or decimal)
        #[arg(long, value_parser = parse_hex_usize, requires = "start")]
        size: Option<usize>,

        /// Sector id (0..511)
        #[arg(long, value_parser = parse_hex_u32)]
        sector: Option<u32>,
    },

    /// Show check bits of a sector or one of its pages
    Ecc {
        /// Sector id (0..511)
        #[arg(long, value_parser = parse_hex_u32)]
        sector: u32,

        /// Page within the sector (0..255); all pages if omitted
        #[arg(long, value_parser = parse_hex_u32)]
        page: Option<u32>,
    },

    /// Render one sector to a PPM image and print its content hash
    Render {
        /// Sector id (0..511)
        #[arg(long, value_parser = parse_hex_u32)]
        sector: u32,

        /// Output file (binary PPM)
        #[arg(short, long)]
        output: PathBuf,

        /// Detailed view with check-bit strip instead of a thumbnail
        #[arg(long)]
        detailed: bool,

        /// Thumbnail width in pixels
        #[arg(long, default_value = "128")]
        width: usize,

        /// Thumbnail height, or detailed view height
        #[arg(long, default_value = "32")]
        height: usize,

        /// Leave out the check-bit strip of the detailed view
        #[arg(long)]
        no_ecc: bool,

        /// Periphery strip thickness of the detailed view
        #[arg(long)]
        periphery: Option<usize>,

        /// Bit-exact view of one bit position (0..255) of every 32-byte word
        #[arg(long, conflicts_with = "detailed")]
        band: Option<usize>,

        /// Pixels per bit in the band view
        #[arg(long, default_value = "3")]
        cell_size: usize,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render every sector into a directory of PPM tiles
    Thumbnails {
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Tile resolution (coarse, thumbnail, detailed)
        #[arg(long, default_value = "thumbnail")]
        level: DetailLevel,

        /// Render threads
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// List programmed sectors
    Status,

    /// Apply and validate the training preset on sectors 0..15
    Preset {
        /// Only compare the pair hashes, do not reprogram
        #[arg(long)]
        validate_only: bool,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// Layout-related subcommands
#[derive(Subcommand)]
pub enum LayoutCommands {
    /// Show where a sector sits on the die
    Sector {
        /// Sector id (0..511)
        #[arg(long, value_parser = parse_hex_u32)]
        sector: u32,
    },

    /// Show the sectors of one die row in strip reading order
    Row {
        /// Array index (0 or 1)
        #[arg(long)]
        array: u32,

        /// Row within the block (0..16, 8 is the gap row)
        #[arg(long)]
        row: u32,
    },

    /// Print the die map of visible sectors under the project layout
    Map,

    /// Export the folded block grid (RON format)
    Export {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}
