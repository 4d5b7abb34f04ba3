//! Page-level device trait
//!
//! The partition layer only needs a handful of page and block primitives.
//! [`NandFlash`](super::NandFlash) provides them over the remote channel;
//! anything else that stores pages in 64-page blocks can stand in for it.

use super::config::PageLayout;
use super::controller::{NandFlash, WriteMode};
use crate::error::{Error, Result};
use crate::remote::RemoteMemory;

/// Page and block primitives used by partition I/O
pub trait PageDevice {
    /// Page layout of the probed device
    fn layout(&self) -> Result<PageLayout>;

    /// Number of erase blocks on the probed device
    fn num_blocks(&self) -> Result<u32>;

    /// Whether the block containing `page` is marked bad
    fn is_block_bad(&mut self, page: u32) -> Result<bool>;

    /// Erase the block starting at `page`
    fn erase_block(&mut self, page: u32) -> Result<()>;

    /// Read one page and up to `spare.len()` bytes of user spare
    fn read_page(&mut self, page: u32, data: &mut [u8], spare: &mut [u8]) -> Result<()>;

    /// Program one page with ECC; missing spare bytes are left erased
    fn write_page(&mut self, page: u32, data: &[u8], spare: &[u8]) -> Result<()>;

    /// Permanently mark the block containing `page` bad
    fn mark_bad_block(&mut self, page: u32) -> Result<()>;
}

impl<C: RemoteMemory> PageDevice for NandFlash<C> {
    fn layout(&self) -> Result<PageLayout> {
        NandFlash::layout(self)
    }

    fn num_blocks(&self) -> Result<u32> {
        self.info().map(|info| info.num_blocks).ok_or(Error::NotProbed)
    }

    fn is_block_bad(&mut self, page: u32) -> Result<bool> {
        NandFlash::is_block_bad(self, page)
    }

    fn erase_block(&mut self, page: u32) -> Result<()> {
        NandFlash::erase_block(self, page)
    }

    fn read_page(&mut self, page: u32, data: &mut [u8], spare: &mut [u8]) -> Result<()> {
        NandFlash::read_page(self, page, data, spare)
    }

    fn write_page(&mut self, page: u32, data: &[u8], spare: &[u8]) -> Result<()> {
        NandFlash::write_page(self, page, data, spare, WriteMode::Ecc)
    }

    fn mark_bad_block(&mut self, page: u32) -> Result<()> {
        NandFlash::mark_bad_block(self, page)
    }
}
