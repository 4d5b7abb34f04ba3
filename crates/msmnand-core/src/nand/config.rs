//! Controller configuration words and codeword layout

use super::geometry::FlashGeometry;
use super::regs;
use crate::error::{Error, Result};

/// Raw codeword size on the device (user data, spare and ECC parity)
pub const RAW_CODEWORD_SIZE: u32 = 528;
/// Main-area bytes in each codeword
pub const CODEWORD_DATA: u32 = 512;
/// User spare bytes the controller passes through with each codeword
pub const CODEWORD_SPARE: u32 = 4;
/// Upper bound on codewords per page (CFG0 field is three bits)
pub const MAX_CODEWORDS: u32 = 8;

/// How a page is split into codewords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Page size in bytes
    pub page_size: u32,
    /// Codewords per page
    pub codewords: u32,
    /// 16-bit bus
    pub wide: bool,
}

impl PageLayout {
    /// Layout for `geometry`
    pub fn new(geometry: &FlashGeometry) -> Result<Self> {
        let page_size = geometry.page_size;
        if page_size == 0 || page_size % CODEWORD_DATA != 0 {
            return Err(Error::UnsupportedGeometry);
        }
        let codewords = page_size / CODEWORD_DATA;
        if codewords > MAX_CODEWORDS {
            return Err(Error::UnsupportedGeometry);
        }
        Ok(Self {
            page_size,
            codewords,
            wide: geometry.bus_width.is_wide(),
        })
    }

    /// User-visible spare bytes per page
    pub fn oob_avail(&self) -> u32 {
        self.codewords * CODEWORD_SPARE
    }

    /// Column of the last codeword, where a raw read finds the bad-block
    /// marker
    pub fn marker_column(&self) -> u32 {
        RAW_CODEWORD_SIZE * (self.codewords - 1)
    }

    /// Byte offset of the bad-block marker inside the raw codeword that
    /// starts at [`marker_column`](Self::marker_column)
    pub fn marker_offset(&self) -> u32 {
        self.page_size - self.marker_column()
    }

    /// Column as it goes into ADDR0 (the bus addresses 16-bit words on
    /// wide parts)
    pub fn marker_bus_column(&self) -> u32 {
        if self.wide {
            self.marker_column() >> 1
        } else {
            self.marker_column()
        }
    }
}

/// DEV0_CFG0 / DEV0_CFG1 pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashConfig {
    /// Configuration word 0
    pub cfg0: u32,
    /// Configuration word 1
    pub cfg1: u32,
}

/// CFG1 base the controller comes up with
const CFG1_BASE: u32 = 0x0004_745C;

impl FlashConfig {
    /// Derive the ECC configuration for `layout`
    pub fn derive(layout: &PageLayout) -> Self {
        let cfg0 = ((layout.codewords - 1) << regs::CFG0_CW_SHIFT)
            | (512 << 9) // user data bytes per codeword
            | (10 << 19) // parity bytes
            | (4 << 23) // spare bytes
            | (5 << 27) // address cycles
            | (1 << 30) // no status read before data
            | (1 << 31); // send read command

        let mut cfg1 = CFG1_BASE | ((layout.marker_offset() + 1) << 6);
        if layout.wide {
            cfg1 |= regs::CFG1_WIDE_FLASH;
        }
        cfg1 &= !regs::CFG1_ECC_DISABLE;

        Self { cfg0, cfg1 }
    }

    /// Return `cfg0` with its codewords-per-page field set to `n`
    pub fn cfg0_with_codewords(cfg0: u32, n: u32) -> u32 {
        (cfg0 & !regs::CFG0_CW_MASK) | ((n - 1) << regs::CFG0_CW_SHIFT)
    }

    /// Pair for one-codeword ECC operations (erase)
    pub fn single_codeword(&self) -> Self {
        Self {
            cfg0: Self::cfg0_with_codewords(self.cfg0, 1),
            cfg1: self.cfg1,
        }
    }

    /// Pair for raw (ECC disabled) access of `codewords` codewords
    pub fn raw(&self, codewords: u32) -> Self {
        Self {
            cfg0: Self::cfg0_with_codewords(regs::CFG0_RAW, codewords),
            cfg1: regs::CFG1_RAW | (self.cfg1 & regs::CFG1_WIDE_FLASH),
        }
    }

    /// Whether the 16-bit bus flag is set
    pub fn is_wide(&self) -> bool {
        self.cfg1 & regs::CFG1_WIDE_FLASH != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nand::geometry::{lookup, BusWidth, FALLBACK_GEOMETRY};

    #[test]
    fn test_derive_2k_8bit() {
        let layout = PageLayout::new(&FALLBACK_GEOMETRY).unwrap();
        assert_eq!(layout.codewords, 4);
        let cfg = FlashConfig::derive(&layout);
        assert_eq!(cfg.cfg0, 0xEA54_00C0);
        assert_eq!(cfg.cfg1 & regs::CFG1_ECC_DISABLE, 0);
        assert!(!cfg.is_wide());
        assert_eq!(cfg.cfg1, 0x0004_745C);
    }

    #[test]
    fn test_derive_2k_wide() {
        let layout = PageLayout::new(lookup(0x5500_baec).unwrap()).unwrap();
        let cfg = FlashConfig::derive(&layout);
        assert!(cfg.is_wide());
        assert_eq!(cfg.cfg1 & regs::CFG1_ECC_DISABLE, 0);
        assert_eq!(cfg.cfg1, 0x0004_745E);
    }

    #[test]
    fn test_derive_4k() {
        let layout = PageLayout::new(lookup(0x6600_bcec).unwrap()).unwrap();
        assert_eq!(layout.codewords, 8);
        let cfg = FlashConfig::derive(&layout);
        assert_eq!((cfg.cfg0 & regs::CFG0_CW_MASK) >> regs::CFG0_CW_SHIFT, 7);
        assert_eq!(layout.oob_avail(), 32);
    }

    #[test]
    fn test_marker_location() {
        let layout = PageLayout::new(&FALLBACK_GEOMETRY).unwrap();
        assert_eq!(layout.marker_column(), 1584);
        assert_eq!(layout.marker_offset(), 464);
        assert_eq!(layout.marker_bus_column(), 1584);

        let wide = PageLayout {
            wide: true,
            ..layout
        };
        assert_eq!(wide.marker_bus_column(), 792);
    }

    #[test]
    fn test_unsupported_page_size() {
        let mut g = FALLBACK_GEOMETRY;
        g.page_size = 2000;
        assert_eq!(PageLayout::new(&g), Err(Error::UnsupportedGeometry));
        g.page_size = 8192;
        assert_eq!(PageLayout::new(&g), Err(Error::UnsupportedGeometry));
        g.page_size = 512;
        g.bus_width = BusWidth::X16;
        assert_eq!(PageLayout::new(&g).unwrap().codewords, 1);
    }

    #[test]
    fn test_raw_and_single_codeword() {
        let layout = PageLayout::new(&FALLBACK_GEOMETRY).unwrap();
        let cfg = FlashConfig::derive(&layout);
        let raw = cfg.raw(1);
        assert_eq!(raw.cfg0, regs::CFG0_RAW & !regs::CFG0_CW_MASK);
        assert_eq!(raw.cfg1, regs::CFG1_RAW);
        assert_eq!(cfg.raw(4).cfg0, regs::CFG0_RAW);
        assert_eq!(cfg.single_codeword().cfg0, 0xEA54_0000);
    }
}
