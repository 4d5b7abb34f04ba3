//! Supported device table

/// Data bus width of the NAND device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    /// 8-bit bus
    X8,
    /// 16-bit bus
    X16,
}

impl BusWidth {
    /// Bus width in bits
    pub fn bits(self) -> u32 {
        match self {
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }

    /// Whether this is a 16-bit bus
    pub fn is_wide(self) -> bool {
        self == Self::X16
    }
}

/// Pages in every erase block of the supported parts
pub const PAGES_PER_BLOCK: u32 = 64;

/// One row of the device table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    /// ID pattern
    pub id: u32,
    /// Bits of the ID that must match the pattern
    pub mask: u32,
    /// Total capacity in bytes
    pub density: u32,
    /// Bus width
    pub bus_width: BusWidth,
    /// Page size in bytes
    pub page_size: u32,
    /// Erase block size in bytes
    pub block_size: u32,
    /// Spare (OOB) bytes per page
    pub spare_size: u32,
}

impl FlashGeometry {
    const fn new(
        id: u32,
        mask: u32,
        density_mib: u32,
        bus_width: BusWidth,
        page_size: u32,
        spare_size: u32,
    ) -> Self {
        Self {
            id,
            mask,
            density: density_mib << 20,
            bus_width,
            page_size,
            block_size: page_size * PAGES_PER_BLOCK,
            spare_size,
        }
    }

    /// Whether a raw 32-bit ID selects this row
    pub fn matches(&self, id: u32) -> bool {
        (id & self.mask) == (self.id & self.mask)
    }

    /// Number of erase blocks
    pub fn num_blocks(&self) -> u32 {
        self.density / self.block_size
    }

    /// Number of pages
    pub fn num_pages(&self) -> u32 {
        self.num_blocks() * PAGES_PER_BLOCK
    }
}

use BusWidth::{X16, X8};

/// Geometry assumed when the ID matches no table row
pub const FALLBACK_GEOMETRY: FlashGeometry =
    FlashGeometry::new(0, 0xFFFF_FFFF, 256, X8, 2048, 64);

/// Known parts, searched in order; the first matching row wins
pub const SUPPORTED_FLASH: &[FlashGeometry] = &[
    // Samsung
    FlashGeometry::new(0x1500_aaec, 0xFF00_FFFF, 256, X8, 2048, 64),
    FlashGeometry::new(0x5500_baec, 0xFF00_FFFF, 256, X16, 2048, 64),
    FlashGeometry::new(0x5500_bcec, 0xFF00_FFFF, 512, X16, 2048, 64),
    // Toshiba
    FlashGeometry::new(0x1500_aa98, 0xFFFF_FFFF, 256, X8, 2048, 64),
    FlashGeometry::new(0x5500_ba98, 0xFFFF_FFFF, 256, X16, 2048, 64),
    // Micron
    FlashGeometry::new(0xd580_b12c, 0xFFFF_FFFF, 256, X16, 2048, 64),
    FlashGeometry::new(0x5590_bc2c, 0xFFFF_FFFF, 512, X16, 2048, 64),
    FlashGeometry::new(0x1580_aa2c, 0xFFFF_FFFF, 256, X8, 2048, 64),
    FlashGeometry::new(0x1590_aa2c, 0xFFFF_FFFF, 256, X8, 2048, 64),
    FlashGeometry::new(0x1590_ac2c, 0xFFFF_FFFF, 512, X8, 2048, 64),
    // Hynix
    FlashGeometry::new(0x5580_baad, 0xFFFF_FFFF, 256, X16, 2048, 64),
    FlashGeometry::new(0x5510_baad, 0xFFFF_FFFF, 256, X16, 2048, 64),
    // Samsung 4 KiB page
    FlashGeometry::new(0x6600_bcec, 0xFF00_FFFF, 512, X16, 4096, 128),
    // Generic rows keyed on maker and device code only
    FlashGeometry::new(0x0000_aaec, 0x0000_FFFF, 256, X16, 2048, 64),
    FlashGeometry::new(0x0000_acec, 0x0000_FFFF, 512, X16, 2048, 64),
    FlashGeometry::new(0x0000_bcec, 0x0000_FFFF, 512, X16, 2048, 64),
    FlashGeometry::new(0x6601_b3ec, 0xFFFF_FFFF, 1024, X16, 4096, 128),
    FlashGeometry::new(0x0000_b3ec, 0x0000_FFFF, 1024, X16, 2048, 64),
    FlashGeometry::new(0x0000_ba2c, 0x0000_FFFF, 256, X16, 2048, 64),
    FlashGeometry::new(0x0000_bc2c, 0x0000_FFFF, 512, X16, 2048, 64),
    FlashGeometry::new(0x0000_b32c, 0x0000_FFFF, 1024, X16, 2048, 64),
    FlashGeometry::new(0x0000_baad, 0x0000_FFFF, 256, X16, 2048, 64),
    FlashGeometry::new(0x0000_bcad, 0x0000_FFFF, 512, X16, 2048, 64),
    FlashGeometry::new(0x0000_b3ad, 0x0000_FFFF, 1024, X16, 2048, 64),
];

/// Find the first table row matching `id`
pub fn lookup(id: u32) -> Option<&'static FlashGeometry> {
    SUPPORTED_FLASH.iter().find(|g| g.matches(id))
}

/// Name of the manufacturer for a maker code
pub fn manufacturer_name(maker: u8) -> &'static str {
    match maker {
        0xEC => "Samsung",
        0x98 => "Toshiba",
        0x2C => "Micron",
        0xAD => "Hynix",
        _ => "Unknown",
    }
}
