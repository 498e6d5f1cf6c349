//! Address and unit mapping for the simulated 32 MiB NOR device
//!
//! The device is split into four nested power-of-two units:
//!
//! | Unit        | Size    | Shift | Count  |
//! |-------------|---------|-------|--------|
//! | Sector      | 64 KiB  | 16    | 512    |
//! | SubSector32 | 32 KiB  | 15    | 1024   |
//! | SubSector4  | 4 KiB   | 12    | 8192   |
//! | Page        | 256 B   | 8     | 131072 |
//!
//! All functions here are pure and reject addresses outside the device.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::{self, SectorGridPosition};

/// Device capacity in bytes (32 MiB)
pub const CAPACITY: usize = 33_554_432;
/// Highest valid byte address
pub const MAX_ADDRESS: u32 = 0x01FF_FFFF;

/// 64 KiB erase sector
pub const SECTOR_SIZE: u32 = 0x1_0000;
/// 32 KiB sub-sector
pub const SUB32_SIZE: u32 = 0x8000;
/// 4 KiB sub-sector
pub const SUB4_SIZE: u32 = 0x1000;
/// 256 byte program page, also the check-bit dataset size
pub const PAGE_SIZE: u32 = 0x100;

/// Number of 64 KiB sectors
pub const SECTOR_COUNT: u32 = (CAPACITY as u32) / SECTOR_SIZE;
/// Number of 32 KiB sub-sectors
pub const SUB32_COUNT: u32 = (CAPACITY as u32) / SUB32_SIZE;
/// Number of 4 KiB sub-sectors
pub const SUB4_COUNT: u32 = (CAPACITY as u32) / SUB4_SIZE;
/// Number of pages
pub const PAGE_COUNT: u32 = (CAPACITY as u32) / PAGE_SIZE;
/// Pages (datasets) per sector
pub const PAGES_PER_SECTOR: u32 = SECTOR_SIZE / PAGE_SIZE;

/// An addressable unit of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// 64 KiB sector
    Sector,
    /// 32 KiB sub-sector
    Sub32,
    /// 4 KiB sub-sector
    Sub4,
    /// 256 byte page
    Page,
}

impl Unit {
    /// Size of the unit in bytes
    pub const fn size(&self) -> u32 {
        1 << self.shift()
    }

    /// Shift that turns an address into this unit's id
    pub const fn shift(&self) -> u32 {
        match self {
            Self::Sector => 16,
            Self::Sub32 => 15,
            Self::Sub4 => 12,
            Self::Page => 8,
        }
    }

    /// Number of units of this kind in the device
    pub const fn count(&self) -> u32 {
        (CAPACITY as u32) >> self.shift()
    }
}

/// A unit-aligned address range, derived on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Id of the unit (sector id, page id, ...)
    pub unit_id: u32,
    /// Start address (inclusive)
    pub start: u32,
    /// End address (inclusive)
    pub end: u32,
    /// Size in bytes
    pub size: u32,
}

impl Region {
    /// Check if an address is within this region
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr <= self.end
    }
}

/// Reject addresses outside the device
pub fn validate_address(addr: u32) -> Result<()> {
    if addr > MAX_ADDRESS {
        return Err(Error::AddressOutOfRange { addr: addr as u64 });
    }
    Ok(())
}

/// Region of the given unit containing `addr`
pub fn unit_region(unit: Unit, addr: u32) -> Result<Region> {
    validate_address(addr)?;
    let unit_id = addr >> unit.shift();
    let start = unit_id << unit.shift();
    Ok(Region {
        unit_id,
        start,
        end: start + (unit.size() - 1),
        size: unit.size(),
    })
}

/// 64 KiB sector containing `addr`
pub fn sector_region(addr: u32) -> Result<Region> {
    unit_region(Unit::Sector, addr)
}

/// 32 KiB sub-sector containing `addr`
pub fn sub32_region(addr: u32) -> Result<Region> {
    unit_region(Unit::Sub32, addr)
}

/// 4 KiB sub-sector containing `addr`
pub fn sub4_region(addr: u32) -> Result<Region> {
    unit_region(Unit::Sub4, addr)
}

/// 256 byte page containing `addr`
pub fn page_region(addr: u32) -> Result<Region> {
    unit_region(Unit::Page, addr)
}

/// Reject sector ids outside 0..512
pub fn validate_sector(sector_id: u32) -> Result<()> {
    if sector_id >= SECTOR_COUNT {
        return Err(Error::InvalidSector { sector: sector_id });
    }
    Ok(())
}

/// First address of a sector
pub fn sector_start(sector_id: u32) -> Result<u32> {
    validate_sector(sector_id)?;
    Ok(sector_id * SECTOR_SIZE)
}

/// Inclusive address range of one 256 byte dataset inside a sector
pub fn dataset_address(sector_id: u32, page_in_sector: u32) -> Result<(u32, u32)> {
    validate_sector(sector_id)?;
    if page_in_sector >= PAGES_PER_SECTOR {
        return Err(Error::InvalidPage {
            page: page_in_sector,
        });
    }
    let start = sector_id * SECTOR_SIZE + page_in_sector * PAGE_SIZE;
    Ok((start, start + (PAGE_SIZE - 1)))
}

/// Everything the device knows about one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// The address itself
    pub address: u32,
    /// Containing sector id
    pub sector: u32,
    /// Containing 32 KiB sub-sector id
    pub sub32: u32,
    /// Containing 4 KiB sub-sector id
    pub sub4: u32,
    /// Containing page id
    pub page: u32,
    /// Byte offset from the start of the sector
    pub offset_in_sector: u32,
    /// Page index within the sector
    pub page_in_sector: u32,
    /// Physical grid placement of the sector
    pub grid: SectorGridPosition,
}

/// Decompose an address into its units and grid placement
pub fn locate(addr: u32) -> Result<AddressInfo> {
    let sector = sector_region(addr)?;
    let offset_in_sector = addr - sector.start;
    Ok(AddressInfo {
        address: addr,
        sector: sector.unit_id,
        sub32: addr >> Unit::Sub32.shift(),
        sub4: addr >> Unit::Sub4.shift(),
        page: addr >> Unit::Page.shift(),
        offset_in_sector,
        page_in_sector: offset_in_sector / PAGE_SIZE,
        grid: layout::sector_grid_position(sector.unit_id)?,
    })
}
