//! Progress reporting for partition operations

/// Summary of a partition erase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EraseStats {
    /// Blocks erased
    pub blocks_erased: u32,
    /// Blocks skipped because they are bad or failed to erase
    pub blocks_skipped: u32,
}

/// Summary of a partition read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Pages copied out
    pub pages_read: u32,
    /// Pages or blocks skipped on the way
    pub errors: u32,
}

/// Summary of a partition write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Pages programmed
    pub pages_written: u32,
    /// Blocks erased, including the tail of the partition
    pub blocks_erased: u32,
    /// Blocks skipped because they could not be erased
    pub blocks_skipped: u32,
    /// Blocks abandoned and marked bad after a program failure
    pub blocks_marked_bad: u32,
}

/// Progress callbacks for partition operations
///
/// Totals are announced once; the progress callbacks receive the running
/// count.
pub trait Progress {
    /// Called when starting a read
    fn reading(&mut self, total_bytes: usize);

    /// Called after each page is copied out
    fn read_progress(&mut self, bytes_read: usize);

    /// Called when starting an erase
    fn erasing(&mut self, blocks_to_erase: usize);

    /// Called after each block is visited
    fn erase_progress(&mut self, blocks_done: usize);

    /// Called when starting a write
    fn writing(&mut self, bytes_to_write: usize);

    /// Called after each page is programmed
    fn write_progress(&mut self, bytes_written: usize);

    /// Called when a block is skipped
    fn bad_block(&mut self, _block: u32) {}

    /// Called when the operation is complete
    fn complete(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
    fn erasing(&mut self, _blocks_to_erase: usize) {}
    fn erase_progress(&mut self, _blocks_done: usize) {}
    fn writing(&mut self, _bytes_to_write: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn complete(&mut self) {}
}
