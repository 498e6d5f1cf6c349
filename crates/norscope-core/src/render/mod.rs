//! Sector rendering
//!
//! Turns the raw bytes of one sector into an RGB [`Raster`]:
//!
//! 1. unpack the 64 KiB into a 256 page x 2048 bitline [`BitMatrix`]
//! 2. derive a per-page and a per-bitline zero ratio
//! 3. smooth and resample both signals to the output size
//! 4. blend them into one intensity per pixel
//! 5. interpolate between the erased and programmed colors and apply
//!    separator stripes along the page axis
//!
//! [`Orientation`] decides which signal runs along which axis. The band
//! view in [`render_band_tile`] skips the signal steps and draws one bit
//! position of every word as-is.
//!
//! Every step is deterministic, so identical input always yields a
//! byte-identical raster and the same [`content_hash`].

mod band;
mod config;
mod jobs;
mod raster;
mod signal;
mod thumbnail;
mod tile;

pub use band::*;
pub use config::*;
pub use jobs::*;
pub use raster::*;
pub use signal::*;
pub use thumbnail::*;
pub use tile::*;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Bit unpacking order within a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitOrder {
    /// Most significant bit first
    #[default]
    Msb,
    /// Least significant bit first
    Lsb,
}

impl BitOrder {
    /// Value of bit `index` (0..8) of `byte` in this order
    #[inline]
    pub fn bit(self, byte: u8, index: usize) -> u8 {
        match self {
            BitOrder::Msb => (byte >> (7 - index)) & 1,
            BitOrder::Lsb => (byte >> index) & 1,
        }
    }
}

impl FromStr for BitOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "msb" | "big" => Ok(BitOrder::Msb),
            "lsb" | "little" => Ok(BitOrder::Lsb),
            _ => Err(Error::InvalidBitOrder),
        }
    }
}

impl fmt::Display for BitOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitOrder::Msb => write!(f, "msb"),
            BitOrder::Lsb => write!(f, "lsb"),
        }
    }
}

/// Which signal maps to which image axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Pages run along x, bitlines along y
    #[default]
    Horizontal,
    /// Bitlines run along x, pages along y (tall sectors)
    Vertical,
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Orientation::Horizontal),
            "vertical" | "v" => Ok(Orientation::Vertical),
            _ => Err(Error::InvalidOrientation),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

/// Lowercase hex SHA-256 of the raw pixel bytes
pub fn content_hash(raster: &Raster) -> String {
    use core::fmt::Write;

    let digest = Sha256::digest(raster.pixels());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
