//! Driver context
//!
//! [`NandDriver`] owns the remote channel, the scratch arena, the identified
//! geometry and the partition table, and exposes the partition-level
//! operations.

use alloc::vec::Vec;

use log::{debug, info};

use crate::arena::ScratchArena;
use crate::dmov::ExecutorConfig;
use crate::error::{Error, Result};
use crate::nand::{regs, FlashInfo, NandFlash, WriteMode};
use crate::partition::{
    erase_partition, read_partition, write_partition, EraseStats, NoProgress, PartitionEntry,
    PartitionTable, Progress, ReadStats, WriteStats,
};
use crate::remote::{RemoteMemory, TransportPolicy};

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Target address of the scratch RAM mirrored by the arena
    pub scratch_base: u32,
    /// Scratch arena capacity in bytes
    pub scratch_size: u32,
    /// Status polls before a descriptor gate times out
    pub poll_limit: u32,
    /// Reaction to failed remote accesses
    pub policy: TransportPolicy,
    /// Read back and compare every programmed page
    pub verify_writes: bool,
    /// Register writes issued once by [`NandDriver::initialize`]
    pub unlock_writes: Vec<(u32, u32)>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            scratch_base: 0x8000_0000,
            scratch_size: 8192,
            poll_limit: 1000,
            policy: TransportPolicy::Abort,
            verify_writes: false,
            unlock_writes: regs::UNLOCK_WRITES.to_vec(),
        }
    }
}

/// MSM NAND driver over a remote memory channel
pub struct NandDriver<C> {
    flash: NandFlash<C>,
    unlock_writes: Vec<(u32, u32)>,
    initialized: bool,
    ptable: Option<PartitionTable>,
}

impl<C: RemoteMemory> NandDriver<C> {
    /// Create a driver and reserve its scratch buffers
    ///
    /// Nothing is sent to the target until [`initialize`](Self::initialize)
    /// or [`probe`](Self::probe).
    pub fn new(chan: C, config: DriverConfig) -> Result<Self> {
        let arena = ScratchArena::new(config.scratch_base, config.scratch_size as usize)?;
        let exec = ExecutorConfig {
            poll_limit: config.poll_limit,
            policy: config.policy,
            ..ExecutorConfig::default()
        };
        let mut flash = NandFlash::new(chan, arena, exec)?;
        flash.set_verify_writes(config.verify_writes);
        Ok(Self {
            flash,
            unlock_writes: config.unlock_writes,
            initialized: false,
            ptable: None,
        })
    }

    /// Lift the controller protection and log the live controller state
    ///
    /// The unlock writes are issued only the first time.
    pub fn initialize(&mut self) -> Result<()> {
        if !self.initialized {
            self.flash.poke(&self.unlock_writes)?;
            self.initialized = true;
        }
        let cfg0 = self.flash.peek(regs::DEV0_CFG0)?;
        let id = self.flash.peek(regs::READ_ID)?;
        debug!("live state: nand id=0x{:x} dev0_cfg0=0x{:x}", id, cfg0);
        Ok(())
    }

    /// Identify the device and derive its configuration
    pub fn probe(&mut self) -> Result<FlashInfo> {
        if !self.initialized {
            self.initialize()?;
        }
        self.flash.probe()
    }

    /// The probed device
    pub fn info(&self) -> Result<&FlashInfo> {
        self.flash.info().ok_or(Error::NotProbed)
    }

    /// Install the partition table; allowed once
    pub fn set_partition_table(&mut self, table: PartitionTable) -> Result<()> {
        if self.ptable.is_some() {
            return Err(Error::PartitionTableAlreadySet);
        }
        if let Some(info) = self.flash.info() {
            table.validate(info.num_blocks)?;
        }
        info!("partition table: {} partitions", table.len());
        self.ptable = Some(table);
        Ok(())
    }

    /// The installed partition table
    pub fn partition_table(&self) -> Option<&PartitionTable> {
        self.ptable.as_ref()
    }

    /// Look up a partition by name in the installed table
    pub fn find_partition(&self, name: &str) -> Result<&PartitionEntry> {
        self.ptable
            .as_ref()
            .and_then(|t| t.find(name))
            .ok_or(Error::PartitionNotFound)
    }

    /// Erase every good block of `ptn`
    pub fn erase(&mut self, ptn: &PartitionEntry) -> Result<EraseStats> {
        self.erase_with_progress(ptn, &mut NoProgress)
    }

    /// Erase with progress reporting
    pub fn erase_with_progress<P: Progress>(
        &mut self,
        ptn: &PartitionEntry,
        progress: &mut P,
    ) -> Result<EraseStats> {
        erase_partition(&mut self.flash, ptn, progress)
    }

    /// Read `out.len()` bytes at logical `offset` of `ptn`, each page
    /// followed by `extra_per_page` spare bytes
    pub fn read_extended(
        &mut self,
        ptn: &PartitionEntry,
        extra_per_page: u32,
        offset: u32,
        out: &mut [u8],
    ) -> Result<ReadStats> {
        self.read_with_progress(ptn, extra_per_page, offset, out, &mut NoProgress)
    }

    /// Read with progress reporting
    pub fn read_with_progress<P: Progress>(
        &mut self,
        ptn: &PartitionEntry,
        extra_per_page: u32,
        offset: u32,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<ReadStats> {
        read_partition(&mut self.flash, ptn, extra_per_page, offset, out, progress)
    }

    /// Write `image` to `ptn`, skipping bad blocks, and erase the rest
    pub fn write(
        &mut self,
        ptn: &PartitionEntry,
        extra_per_page: u32,
        image: &[u8],
    ) -> Result<WriteStats> {
        self.write_with_progress(ptn, extra_per_page, image, &mut NoProgress)
    }

    /// Write with progress reporting
    pub fn write_with_progress<P: Progress>(
        &mut self,
        ptn: &PartitionEntry,
        extra_per_page: u32,
        image: &[u8],
        progress: &mut P,
    ) -> Result<WriteStats> {
        write_partition(&mut self.flash, ptn, extra_per_page, image, progress)
    }

    /// Read one physical page
    pub fn read_page(&mut self, page: u32, data: &mut [u8], spare: &mut [u8]) -> Result<()> {
        self.flash.read_page(page, data, spare)
    }

    /// Program one physical page
    pub fn write_page(&mut self, page: u32, data: &[u8], spare: &[u8], mode: WriteMode) -> Result<()> {
        self.flash.write_page(page, data, spare, mode)
    }

    /// Erase the block starting at physical `page`
    pub fn erase_block(&mut self, page: u32) -> Result<()> {
        self.flash.erase_block(page)
    }

    /// Check the bad-block marker of the block containing `page`
    pub fn is_block_bad(&mut self, page: u32) -> Result<bool> {
        self.flash.is_block_bad(page)
    }

    /// Mark the block containing `page` bad
    pub fn mark_bad_block(&mut self, page: u32) -> Result<()> {
        self.flash.mark_bad_block(page)
    }

    /// The flash controller
    pub fn flash(&mut self) -> &mut NandFlash<C> {
        &mut self.flash
    }

    /// The remote channel
    pub fn channel(&self) -> &C {
        self.flash.channel()
    }

    /// The remote channel, mutably
    pub fn channel_mut(&mut self) -> &mut C {
        self.flash.channel_mut()
    }

    /// Consume the driver and return the channel
    pub fn into_inner(self) -> C {
        self.flash.into_inner()
    }
}
