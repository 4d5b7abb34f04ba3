//! Partition table file command

use std::path::Path;

use msmnand_core::nand::PAGES_PER_BLOCK;
use msmnand_core::partition::{PartitionEntry, PartitionTable};

use super::CmdResult;

/// Page count of `p`, refusing lengths that do not fit a page number
fn partition_pages(p: &PartitionEntry) -> CmdResult<u32> {
    p.length
        .checked_mul(PAGES_PER_BLOCK)
        .ok_or_else(|| format!("partition '{}' is too long ({} blocks)", p.name, p.length).into())
}

/// Print a partition table file, optionally checking it against a device
pub fn run_partitions(file: &Path, blocks: Option<u32>) -> CmdResult {
    let mut table = PartitionTable::from_toml_file(file)?;
    table.sort_by_start();
    if let Some(blocks) = blocks {
        table.validate(blocks)?;
    }

    println!("Partitions in {:?}:", file);
    println!();
    println!(
        "{:<16} {:>8} {:>8} {:>10} {:<6}",
        "Name", "Start", "Blocks", "Pages", "Type"
    );
    println!("{}", "-".repeat(52));
    for p in &table {
        let pages = partition_pages(p)?;
        println!(
            "{:<16} {:>8} {:>8} {:>10} {:<6}",
            p.name,
            p.start,
            p.length,
            pages,
            p.kind.to_string()
        );
    }
    if blocks.is_some() {
        println!();
        println!("Table fits the device");
    }
    Ok(())
}
