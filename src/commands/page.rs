//! Page dump and bad-block scan

use msmnand_core::nand::PAGES_PER_BLOCK;
use msmnand_core::partition::PartitionEntry;

use super::{CmdResult, Driver};

/// Read one physical page and hex dump its data and spare
pub fn run_read_page(driver: &mut Driver, page: u32, spare_len: u32) -> CmdResult {
    let layout = driver.flash().layout()?;
    let mut data = vec![0u8; layout.page_size as usize];
    let mut spare = vec![0u8; spare_len as usize];
    driver.read_page(page, &mut data, &mut spare)?;

    println!("Page {} (block {}):", page, page / PAGES_PER_BLOCK);
    print!("{}", hexdump(&data, 0));
    if !spare.is_empty() {
        println!("Spare:");
        print!("{}", hexdump(&spare, 0));
    }
    Ok(())
}

/// Report the bad blocks of `ptn`
pub fn run_scan(driver: &mut Driver, ptn: &PartitionEntry) -> CmdResult {
    println!("Scanning blocks {}..{}", ptn.start, ptn.end_block());
    let mut bad = Vec::new();
    let mut unreadable = Vec::new();
    for block in ptn.start..ptn.end_block() {
        match driver.is_block_bad(block * PAGES_PER_BLOCK) {
            Ok(false) => {}
            Ok(true) => bad.push(block),
            Err(e) if e.is_page_level() => {
                log::warn!("block {}: {}", block, e);
                unreadable.push(block);
            }
            Err(e) => return Err(e.into()),
        }
    }
    println!("{} bad blocks: {:?}", bad.len(), bad);
    if !unreadable.is_empty() {
        println!("{} unreadable blocks: {:?}", unreadable.len(), unreadable);
    }
    Ok(())
}

/// Classic 16-bytes-per-line hex dump
fn hexdump(bytes: &[u8], base: usize) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(16).enumerate() {
        out.push_str(&format!("{:08x}: ", base + i * 16));
        for b in line {
            out.push_str(&format!("{:02x} ", b));
        }
        for _ in line.len()..16 {
            out.push_str("   ");
        }
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexdump() {
        let dump = hexdump(b"ANDROID!\x00\x01", 0x20);
        assert_eq!(
            dump,
            "00000020: 41 4e 44 52 4f 49 44 21 00 01                   ANDROID!..\n"
        );
    }
}
