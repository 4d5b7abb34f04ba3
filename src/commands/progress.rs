//! Progress bars for partition operations

use indicatif::{ProgressBar, ProgressStyle};
use msmnand_core::partition::Progress;

const BYTES_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";
const BLOCKS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks {msg}";

/// [`Progress`] implementation drawing an indicatif bar
pub struct BarProgress {
    bar: ProgressBar,
    bad_blocks: Vec<u32>,
}

impl BarProgress {
    /// Create a hidden bar; each operation resets its length and style
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            bad_blocks: Vec::new(),
        }
    }

    /// Blocks reported as skipped
    pub fn bad_blocks(&self) -> &[u32] {
        &self.bad_blocks
    }

    fn start(&mut self, total: u64, template: &str, phase: &'static str) {
        let bar = ProgressBar::new(total);
        match ProgressStyle::default_bar().template(template) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("progress template: {}", e),
        }
        bar.set_message(phase);
        self.bar = bar;
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn reading(&mut self, total_bytes: usize) {
        self.start(total_bytes as u64, BYTES_TEMPLATE, "Reading");
    }

    fn read_progress(&mut self, bytes_read: usize) {
        self.bar.set_position(bytes_read as u64);
    }

    fn erasing(&mut self, blocks_to_erase: usize) {
        self.start(blocks_to_erase as u64, BLOCKS_TEMPLATE, "Erasing");
    }

    fn erase_progress(&mut self, blocks_done: usize) {
        self.bar.set_position(blocks_done as u64);
    }

    fn writing(&mut self, bytes_to_write: usize) {
        self.start(bytes_to_write as u64, BYTES_TEMPLATE, "Writing");
    }

    fn write_progress(&mut self, bytes_written: usize) {
        self.bar.set_position(bytes_written as u64);
    }

    fn bad_block(&mut self, block: u32) {
        self.bad_blocks.push(block);
        self.bar.println(format!("skipping bad block {}", block));
    }

    fn complete(&mut self) {
        self.bar.finish_with_message("done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        assert!(ProgressStyle::default_bar().template(BYTES_TEMPLATE).is_ok());
        assert!(ProgressStyle::default_bar().template(BLOCKS_TEMPLATE).is_ok());
    }

    #[test]
    fn test_records_bad_blocks() {
        let mut p = BarProgress::new();
        p.erasing(4);
        p.bad_block(2);
        p.erase_progress(4);
        p.complete();
        assert_eq!(p.bad_blocks(), &[2]);
    }
}
