//! Erase command implementation

use msmnand_core::partition::PartitionEntry;

use super::progress::BarProgress;
use super::{CmdResult, Driver};

/// Erase every good block of `ptn`
pub fn run_erase(driver: &mut Driver, ptn: &PartitionEntry) -> CmdResult {
    println!(
        "Erasing {} (blocks {}..{})",
        ptn.name,
        ptn.start,
        ptn.end_block()
    );
    let mut progress = BarProgress::new();
    let stats = driver.erase_with_progress(ptn, &mut progress)?;
    println!(
        "Erased {} blocks, skipped {}",
        stats.blocks_erased, stats.blocks_skipped
    );
    if !progress.bad_blocks().is_empty() {
        println!("Skipped blocks: {:?}", progress.bad_blocks());
    }
    Ok(())
}
