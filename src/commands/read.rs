//! Read command implementation

use std::fs;
use std::path::Path;

use msmnand_core::nand::PAGES_PER_BLOCK;
use msmnand_core::partition::PartitionEntry;

use super::progress::BarProgress;
use super::{CmdResult, Driver};

/// Read `size` bytes (or every good page) of `ptn` into `output`
pub fn run_read(
    driver: &mut Driver,
    ptn: &PartitionEntry,
    offset: u32,
    size: Option<u32>,
    extra: u32,
    output: &Path,
) -> CmdResult {
    let layout = driver.flash().layout()?;
    let unit = (layout.page_size + extra) as usize;
    let skip = (offset / layout.page_size) as usize;

    let total = match size {
        Some(size) => size as usize,
        None => {
            let good = good_blocks(driver, ptn)?;
            let pages = good as usize * PAGES_PER_BLOCK as usize;
            pages.saturating_sub(skip) * unit
        }
    };
    println!(
        "Reading {} bytes from {} (blocks {}..{}, {} spare bytes per page)",
        total,
        ptn.name,
        ptn.start,
        ptn.end_block(),
        extra
    );

    let mut data = vec![0u8; total];
    let mut progress = BarProgress::new();
    let stats = driver.read_with_progress(ptn, extra, offset, &mut data, &mut progress)?;

    fs::write(output, &data)?;
    println!(
        "Wrote {} bytes to {:?} ({} pages, {} skipped)",
        data.len(),
        output,
        stats.pages_read,
        stats.errors
    );
    Ok(())
}

/// Count blocks of `ptn` without a bad-block marker
fn good_blocks(driver: &mut Driver, ptn: &PartitionEntry) -> CmdResult<u32> {
    let mut good = 0;
    for block in ptn.start..ptn.end_block() {
        match driver.is_block_bad(block * PAGES_PER_BLOCK) {
            Ok(false) => good += 1,
            Ok(true) => log::debug!("block {} is bad", block),
            Err(e) if e.is_page_level() => log::debug!("block {}: {}", block, e),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(good)
}
