//! Probe and info commands

use msmnand_core::nand::PAGES_PER_BLOCK;

use super::{format_size, open_driver, CmdResult};
use crate::cli::DriverArgs;

/// Identify the device and print a one-line summary
pub fn run_probe(programmer: &str, args: &DriverArgs) -> CmdResult {
    let driver = open_driver(programmer, args, false)?;
    let info = driver.info()?;
    println!(
        "Found {} {} NAND (ID 0x{:08x}), {}",
        info.manufacturer(),
        info.flash_type,
        info.id,
        format_size(info.total_size())
    );
    if !info.recognized {
        println!("Device not in the device table, using default geometry");
    }
    Ok(())
}

/// Print device geometry and the controller configuration in use
pub fn run_info(programmer: &str, args: &DriverArgs) -> CmdResult {
    let mut driver = open_driver(programmer, args, false)?;
    let info = *driver.info()?;
    let layout = driver.flash().layout()?;
    let config = driver.flash().config().ok_or("device not probed")?;

    println!("NAND device:");
    println!("  ID:           0x{:08x}", info.id);
    println!("  Manufacturer: {} (0x{:02x})", info.manufacturer(), info.vendor);
    println!("  Device:       0x{:02x}", info.device);
    println!("  Type:         {}", info.flash_type);
    println!("  Known:        {}", if info.recognized { "yes" } else { "no" });
    println!("  Page size:    {} bytes", info.page_size);
    println!("  Spare size:   {} bytes", info.spare_size);
    println!(
        "  Block size:   {} ({} pages)",
        format_size(info.block_size as u64),
        PAGES_PER_BLOCK
    );
    println!("  Blocks:       {}", info.num_blocks);
    println!("  Total size:   {}", format_size(info.total_size()));
    println!();
    println!("Controller:");
    println!("  Codewords:    {}", layout.codewords);
    println!("  OOB per page: {} bytes", layout.oob_avail());
    println!("  CFG0:         0x{:08x}", config.cfg0);
    println!("  CFG1:         0x{:08x}", config.cfg1);
    Ok(())
}
