//! Bad-block aware partition I/O
//!
//! Pages are addressed logically from the start of a partition. Bad blocks
//! and pages that fail are skipped, so the data for logical page `n` lands
//! on the `n`th usable page rather than at a fixed physical location.

use alloc::vec;

use log::{debug, error, info, warn};

use super::progress::{EraseStats, Progress, ReadStats, WriteStats};
use super::types::{PartitionEntry, PartitionType};
use crate::error::{Error, Result};
use crate::nand::{PageDevice, PAGES_PER_BLOCK};

/// Erase every good block of `ptn`
///
/// Blocks that are bad or fail to erase are logged and skipped. Transport
/// failures abort.
pub fn erase_partition<D: PageDevice + ?Sized, P: Progress>(
    dev: &mut D,
    ptn: &PartitionEntry,
    progress: &mut P,
) -> Result<EraseStats> {
    dev.layout()?;
    ptn.check_bounds(dev.num_blocks()?)?;
    info!(
        "flash erase: {} (blocks {}..{})",
        ptn.name,
        ptn.start,
        ptn.end_block()
    );

    let mut stats = EraseStats::default();
    progress.erasing(ptn.length as usize);
    for (done, block) in (ptn.start..ptn.end_block()).enumerate() {
        match dev.erase_block(block * PAGES_PER_BLOCK) {
            Ok(()) => stats.blocks_erased += 1,
            Err(e) if e.is_page_level() => {
                debug!("cannot erase @ {} (bad block?): {}", block, e);
                stats.blocks_skipped += 1;
                progress.bad_block(block);
            }
            Err(e) => return Err(e),
        }
        progress.erase_progress(done + 1);
    }
    progress.complete();
    Ok(stats)
}

/// Whether a block should be skipped; page-level check failures count as bad
fn block_unusable<D: PageDevice + ?Sized>(dev: &mut D, block: u32) -> Result<bool> {
    match dev.is_block_bad(block * PAGES_PER_BLOCK) {
        Ok(bad) => Ok(bad),
        Err(e) if e.is_page_level() => {
            debug!("bad block check failed for block {}: {}", block, e);
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Read `out.len()` bytes from `ptn` starting `offset` bytes in
///
/// Each page contributes its data followed by `extra_per_page` bytes of
/// spare. `offset` is a logical byte offset (a multiple of the page size);
/// bad blocks between the partition start and the offset are skipped
/// first. Fails with [`Error::CapacityExceeded`] when the partition runs out
/// of good pages.
pub fn read_partition<D: PageDevice + ?Sized, P: Progress>(
    dev: &mut D,
    ptn: &PartitionEntry,
    extra_per_page: u32,
    offset: u32,
    out: &mut [u8],
    progress: &mut P,
) -> Result<ReadStats> {
    let layout = dev.layout()?;
    ptn.check_bounds(dev.num_blocks()?)?;
    let page_size = layout.page_size;
    if extra_per_page > layout.oob_avail() {
        return Err(Error::InvalidLength);
    }
    if offset % page_size != 0 {
        return Err(Error::InvalidAlignment);
    }

    info!("flash read: {} {:x} {:x}", ptn.name, offset, out.len());
    if ptn.kind != PartitionType::Apps {
        warn!("reading from {} partition {}", ptn.kind, ptn.name);
    }

    let unit = (page_size + extra_per_page) as usize;
    let mut count = out.len().div_ceil(unit);
    let mut page = ptn.first_page() + offset / page_size;
    let end_page = ptn.end_page();
    let mut stats = ReadStats::default();

    // Logical offset -> physical page: every bad block before the target
    // block pushes it one block further out.
    let target_block = page / PAGES_PER_BLOCK;
    let mut block = ptn.start;
    let mut pending = target_block.saturating_sub(ptn.start);
    while pending > 0 && block < ptn.end_block() {
        if block_unusable(dev, block)? {
            page += PAGES_PER_BLOCK;
        } else {
            pending -= 1;
        }
        block += 1;
    }

    let mut data = vec![0u8; page_size as usize];
    let mut spare = vec![0u8; extra_per_page as usize];
    let mut pos = 0usize;

    progress.reading(out.len());
    while pending == 0 && count > 0 && page < end_page {
        match dev.read_page(page, &mut data, &mut spare) {
            Ok(()) => {}
            Err(e) if e.is_bad_block() => {
                progress.bad_block(page / PAGES_PER_BLOCK);
                page += PAGES_PER_BLOCK;
                stats.errors += 1;
                continue;
            }
            Err(e) if e.is_page_level() => {
                debug!("skipping page {}: {}", page, e);
                page += 1;
                stats.errors += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
        page += 1;

        for chunk in [&data[..], &spare[..]] {
            let n = chunk.len().min(out.len() - pos);
            out[pos..pos + n].copy_from_slice(&chunk[..n]);
            pos += n;
        }
        count -= 1;
        stats.pages_read += 1;
        progress.read_progress(pos);
    }

    if count == 0 {
        info!("flash read: success ({} errors)", stats.errors);
        progress.complete();
        Ok(stats)
    } else {
        // Could not find enough valid pages before the end of the partition
        error!("flash read: failed ({} errors)", stats.errors);
        Err(Error::CapacityExceeded)
    }
}

/// Write `image` to `ptn` and erase the rest of the partition
///
/// The image is a sequence of units of one page plus `extra_per_page` spare
/// bytes. Blocks are erased just before their first page is programmed.
/// A block whose erase fails is skipped; a block where a program fails is
/// erased, marked bad, and its pages are rewritten into the next block.
pub fn write_partition<D: PageDevice + ?Sized, P: Progress>(
    dev: &mut D,
    ptn: &PartitionEntry,
    extra_per_page: u32,
    image: &[u8],
    progress: &mut P,
) -> Result<WriteStats> {
    if ptn.kind == PartitionType::Modem {
        error!("flash write: modem partition not supported");
        return Err(Error::UnsupportedPartition);
    }
    let layout = dev.layout()?;
    ptn.check_bounds(dev.num_blocks()?)?;
    let page_size = layout.page_size as usize;
    if extra_per_page > layout.oob_avail() {
        return Err(Error::InvalidLength);
    }

    info!("flash write: {} {:x}", ptn.name, image.len());

    let unit = page_size + extra_per_page as usize;
    let mut page = ptn.first_page();
    let end_page = ptn.end_page();
    let mut pos = 0usize;
    let mut stats = WriteStats::default();

    progress.writing(image.len());
    while pos < image.len() {
        let remaining = image.len() - pos;
        if remaining < unit {
            error!("flash write: image undersized ({} < {})", remaining, unit);
            return Err(Error::InvalidLength);
        }
        if page >= end_page {
            error!("flash write: out of space");
            return Err(Error::CapacityExceeded);
        }

        if page % PAGES_PER_BLOCK == 0 {
            match dev.erase_block(page) {
                Ok(()) => stats.blocks_erased += 1,
                Err(e) if e.is_page_level() => {
                    debug!("flash write: bad block @ {}", page / PAGES_PER_BLOCK);
                    stats.blocks_skipped += 1;
                    progress.bad_block(page / PAGES_PER_BLOCK);
                    page += PAGES_PER_BLOCK;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        let (data, spare) = image[pos..pos + unit].split_at(page_size);
        match dev.write_page(page, data, spare) {
            Ok(()) => {
                page += 1;
                pos += unit;
                stats.pages_written += 1;
                progress.write_progress(pos);
            }
            Err(e) if e.is_page_level() => {
                let into_block = page % PAGES_PER_BLOCK;
                info!("flash write: write failure @ page {} (src {}): {}", page, pos, e);
                pos -= into_block as usize * unit;
                stats.pages_written -= into_block;
                page -= into_block;

                match dev.erase_block(page) {
                    Ok(()) => {}
                    Err(e) if e.is_page_level() => {
                        debug!("flash write: erase failure @ page {}: {}", page, e)
                    }
                    Err(e) => return Err(e),
                }
                match dev.mark_bad_block(page) {
                    Ok(()) => {}
                    Err(e) if e.is_page_level() => {
                        warn!("flash write: could not mark block {} bad: {}", page / PAGES_PER_BLOCK, e)
                    }
                    Err(e) => return Err(e),
                }
                stats.blocks_marked_bad += 1;
                progress.bad_block(page / PAGES_PER_BLOCK);

                debug!("flash write: restart write @ page {} (src {})", page, pos);
                page += PAGES_PER_BLOCK;
                progress.write_progress(pos);
            }
            Err(e) => return Err(e),
        }
    }

    // Erase any remaining blocks in the partition
    page = page.next_multiple_of(PAGES_PER_BLOCK);
    while page < end_page {
        match dev.erase_block(page) {
            Ok(()) => stats.blocks_erased += 1,
            Err(e) if e.is_page_level() => {
                debug!("flash write: bad block @ {}", page / PAGES_PER_BLOCK);
                stats.blocks_skipped += 1;
            }
            Err(e) => return Err(e),
        }
        page += PAGES_PER_BLOCK;
    }

    info!("flash write: success");
    progress.complete();
    Ok(stats)
}
