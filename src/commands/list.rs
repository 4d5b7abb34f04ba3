//! List commands implementation

use msmnand_core::nand::geometry::{self, SUPPORTED_FLASH};

use super::format_size;
use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    print!("{}", programmers::programmer_help());
}

/// List all NAND devices in the device table
pub fn list_devices() {
    println!("Supported NAND devices:");
    println!();
    println!(
        "{:<12} {:<10} {:<10} {:>8} {:>6} {:>10} {:>6}",
        "Vendor", "ID", "Mask", "Width", "Page", "Size", "Spare"
    );
    println!("{}", "-".repeat(68));

    for g in SUPPORTED_FLASH {
        println!(
            "{:<12} 0x{:08x} 0x{:08x} {:>8} {:>6} {:>10} {:>6}",
            geometry::manufacturer_name(g.id as u8),
            g.id,
            g.mask,
            if g.bus_width.is_wide() { "16-bit" } else { "8-bit" },
            g.page_size,
            format_size(g.density as u64),
            g.spare_size
        );
    }
}
