//! Identified device description

use core::fmt;

use super::geometry::{manufacturer_name, BusWidth, FlashGeometry};

/// Device type as far as the controller is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashType {
    /// 8-bit NAND
    Nand8,
    /// 16-bit NAND
    Nand16,
}

impl From<BusWidth> for FlashType {
    fn from(width: BusWidth) -> Self {
        match width {
            BusWidth::X8 => Self::Nand8,
            BusWidth::X16 => Self::Nand16,
        }
    }
}

impl fmt::Display for FlashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nand8 => write!(f, "8-bit NAND"),
            Self::Nand16 => write!(f, "16-bit NAND"),
        }
    }
}

/// Information about the probed device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashInfo {
    /// Raw 32-bit ID as latched by the controller
    pub id: u32,
    /// Maker code (ID byte 0)
    pub vendor: u8,
    /// Device code (ID byte 1)
    pub device: u8,
    /// Device type
    pub flash_type: FlashType,
    /// Page size in bytes
    pub page_size: u32,
    /// Erase block size in bytes
    pub block_size: u32,
    /// Spare bytes per page
    pub spare_size: u32,
    /// Number of erase blocks
    pub num_blocks: u32,
    /// Whether the ID matched a table row (false means fallback geometry)
    pub recognized: bool,
}

impl FlashInfo {
    /// Build the description for `id` identified as `geometry`
    pub fn new(id: u32, geometry: &FlashGeometry, recognized: bool) -> Self {
        Self {
            id,
            vendor: (id & 0xFF) as u8,
            device: ((id >> 8) & 0xFF) as u8,
            flash_type: geometry.bus_width.into(),
            page_size: geometry.page_size,
            block_size: geometry.block_size,
            spare_size: geometry.spare_size,
            num_blocks: geometry.num_blocks(),
            recognized,
        }
    }

    /// Manufacturer name derived from the maker code
    pub fn manufacturer(&self) -> &'static str {
        manufacturer_name(self.vendor)
    }

    /// Total capacity in bytes
    pub fn total_size(&self) -> u64 {
        self.num_blocks as u64 * self.block_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nand::geometry::lookup;

    #[test]
    fn test_info_from_id() {
        let info = FlashInfo::new(0x1500_aaec, lookup(0x1500_aaec).unwrap(), true);
        assert_eq!(info.vendor, 0xEC);
        assert_eq!(info.device, 0xAA);
        assert_eq!(info.flash_type, FlashType::Nand8);
        assert_eq!(info.manufacturer(), "Samsung");
        assert_eq!(info.total_size(), 256 << 20);
    }
}
