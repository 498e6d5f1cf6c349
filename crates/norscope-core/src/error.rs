//! Error types for norscope-core
//!
//! Every fallible core operation reports one of two kinds of failure:
//!
//! - **range errors** - an address, size, or unit id falls outside the
//!   device geometry
//! - **input errors** - a pattern segment, selector, or raster request is
//!   malformed
//!
//! Both kinds are raised before any byte of device state is touched.

use core::fmt;

/// Core error type, Copy so it can be carried around freely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Range errors
    /// Address is beyond the device capacity
    AddressOutOfRange {
        /// The rejected address
        addr: u64,
    },
    /// A start/size pair does not fit inside the device
    RegionOutOfRange {
        /// Start address of the request
        start: u64,
        /// Size of the request in bytes
        size: u64,
    },
    /// Sector id is not in 0..512
    InvalidSector {
        /// The rejected sector id
        sector: u32,
    },
    /// Page index within a sector is not in 0..256
    InvalidPage {
        /// The rejected page index
        page: u32,
    },
    /// Local id within a folded block is not in 0..64
    InvalidLocalId {
        /// The rejected local id
        local_id: u32,
    },
    /// Folded grid cell is out of range or sits on the gap row
    InvalidCell {
        /// Row of the rejected cell
        row: u32,
        /// Column of the rejected cell
        col: u32,
    },
    /// Array index is not 0 or 1
    InvalidArray {
        /// The rejected array index
        array: u32,
    },
    /// Band index within a 256-bit word is not in 0..256
    InvalidBand {
        /// The rejected band index
        band: usize,
    },
    /// Buffer does not have the length the operation requires
    InvalidLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    // Input errors
    /// Pattern segment kind is not text, hex or fill
    UnknownSegmentKind,
    /// Fill value does not parse or is outside 0..255
    InvalidFillValue,
    /// Hex pattern token is not a single byte
    InvalidHexToken {
        /// Zero-based index of the offending token
        index: usize,
    },
    /// Segment specification string is malformed
    InvalidSegmentSpec,
    /// Bit order selector is not msb or lsb
    InvalidBitOrder,
    /// Orientation selector is not horizontal or vertical
    InvalidOrientation,
    /// Detail level selector is not recognized
    InvalidDetailLevel,
    /// Render preset name is not recognized
    InvalidRenderPreset,
    /// Raster dimensions are zero or do not line up
    InvalidDimensions {
        /// Requested width in pixels
        width: usize,
        /// Requested height in pixels
        height: usize,
    },
}

impl Error {
    /// Whether this error reports an address, size or unit outside the device
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            Self::AddressOutOfRange { .. }
                | Self::RegionOutOfRange { .. }
                | Self::InvalidSector { .. }
                | Self::InvalidPage { .. }
                | Self::InvalidLocalId { .. }
                | Self::InvalidCell { .. }
                | Self::InvalidArray { .. }
                | Self::InvalidBand { .. }
                | Self::InvalidLength { .. }
        )
    }

    /// Whether this error reports malformed caller input
    pub fn is_input_error(&self) -> bool {
        !self.is_range_error()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange { addr } => {
                write!(f, "address out of range: 0x{:X}", addr)
            }
            Self::RegionOutOfRange { start, size } => {
                write!(
                    f,
                    "region out of range: start 0x{:X}, size 0x{:X}",
                    start, size
                )
            }
            Self::InvalidSector { sector } => write!(f, "invalid sector: {}", sector),
            Self::InvalidPage { page } => write!(f, "invalid page index: {}", page),
            Self::InvalidLocalId { local_id } => {
                write!(f, "local_id must be 0..63, got {}", local_id)
            }
            Self::InvalidCell { row, col } => {
                write!(f, "invalid folded cell: row {}, col {}", row, col)
            }
            Self::InvalidArray { array } => write!(f, "invalid array index: {}", array),
            Self::InvalidBand { band } => write!(f, "band must be 0..255, got {}", band),
            Self::InvalidLength { expected, actual } => {
                write!(f, "expected {} bytes, got {}", expected, actual)
            }
            Self::UnknownSegmentKind => write!(f, "unknown segment kind"),
            Self::InvalidFillValue => write!(f, "fill value must be 0..255"),
            Self::InvalidHexToken { index } => {
                write!(f, "invalid hex byte at token {}", index)
            }
            Self::InvalidSegmentSpec => {
                write!(f, "segment must look like kind:size:value")
            }
            Self::InvalidBitOrder => write!(f, "bit order must be msb|lsb"),
            Self::InvalidOrientation => write!(f, "orientation must be horizontal|vertical"),
            Self::InvalidDetailLevel => write!(f, "detail level must be coarse|thumbnail|detailed"),
            Self::InvalidRenderPreset => write!(f, "render preset must be lab|flat"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid raster size {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::AddressOutOfRange { addr: 0x0200_0000 }.is_range_error());
        assert!(Error::InvalidCell { row: 8, col: 0 }.is_range_error());
        assert!(Error::InvalidBand { band: 256 }.is_range_error());
        assert!(Error::InvalidFillValue.is_input_error());
        assert!(Error::InvalidHexToken { index: 2 }.is_input_error());
        assert!(!Error::InvalidBitOrder.is_range_error());
    }

    #[test]
    fn test_fill_message() {
        assert_eq!(
            format!("{}", Error::InvalidFillValue),
            "fill value must be 0..255"
        );
    }
}
