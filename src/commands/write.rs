//! Write command implementation

use std::fs;
use std::path::Path;

use msmnand_core::partition::PartitionEntry;

use super::progress::BarProgress;
use super::{CmdResult, Driver};

/// Write the image in `input` to `ptn`
///
/// The image is a sequence of pages each followed by `extra` spare bytes.
/// With `pad` a short final unit is filled up with 0xFF.
pub fn run_write(
    driver: &mut Driver,
    ptn: &PartitionEntry,
    extra: u32,
    pad: bool,
    input: &Path,
) -> CmdResult {
    let layout = driver.flash().layout()?;
    let unit = (layout.page_size + extra) as usize;

    let mut image = fs::read(input)?;
    println!("Read {} bytes from {:?}", image.len(), input);
    if pad && image.len() % unit != 0 {
        let padded = image.len().next_multiple_of(unit);
        log::debug!("padding image from {} to {} bytes", image.len(), padded);
        image.resize(padded, 0xFF);
    }

    let mut progress = BarProgress::new();
    let stats = driver.write_with_progress(ptn, extra, &image, &mut progress)?;

    println!(
        "Wrote {} pages to {} ({} blocks erased, {} skipped, {} marked bad)",
        stats.pages_written,
        ptn.name,
        stats.blocks_erased,
        stats.blocks_skipped,
        stats.blocks_marked_bad
    );
    Ok(())
}
