//! NAND flash controller operations
//!
//! Each operation fills a block of parameter words in scratch memory, builds
//! the command list that feeds those words to the controller, runs it and
//! decodes the latched statuses.

use alloc::vec;

use log::{debug, info, trace, warn};

use super::config::{FlashConfig, PageLayout, CODEWORD_DATA, CODEWORD_SPARE, RAW_CODEWORD_SIZE};
use super::geometry::{self, FlashGeometry, FALLBACK_GEOMETRY, PAGES_PER_BLOCK};
use super::info::FlashInfo;
use super::regs;
use crate::arena::{ScratchArena, ScratchBuf};
use crate::dmov::{CommandList, CommandListBuilder, Descriptor, Executor, ExecutorConfig};
use crate::error::{Error, Result};
use crate::remote::RemoteMemory;

/// Word slots in the parameter block
///
/// CMD..CHIPSEL and CFG0..CFG1 must stay adjacent: they are fed to the
/// controller as one burst and one stream respectively.
mod slot {
    pub const CMD: usize = 0;
    pub const ADDR0: usize = 1;
    pub const ADDR1: usize = 2;
    pub const CHIPSEL: usize = 3;
    pub const CFG0: usize = 4;
    pub const CFG1: usize = 5;
    pub const EXEC: usize = 6;
    pub const ECC_CFG: usize = 7;
    pub const ECC_CFG_SAVE: usize = 8;
    pub const CLR_FLASH_STATUS: usize = 9;
    pub const CLR_READ_STATUS: usize = 10;
    pub const ZERO: usize = 11;
    pub const BURST_CFG: usize = 12;
    pub const BURST_CFG_SAVE: usize = 13;
    pub const READ_ID: usize = 14;
    pub const LIVE_CFG0: usize = 15;
    pub const LIVE_CFG1: usize = 16;
    pub const MARKER: usize = 17;
    /// Flash status / buffer status pairs, one per codeword
    pub const RESULT: usize = 18;
    pub const END: usize = RESULT + 2 * super::super::config::MAX_CODEWORDS as usize;
}

/// Size of the page data staging buffer (largest page plus its spare)
const DATA_BUF_SIZE: usize = 4096 + 128;
/// Size of the spare staging buffer
const SPARE_BUF_SIZE: usize = 128;
/// Size of the parameter block
const PARAM_BUF_SIZE: usize = 1024;

/// How a page program treats the controller's ECC engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// ECC enabled: `data` is one page, `spare` up to the available OOB
    Ecc,
    /// ECC disabled: `data` is one raw codeword image, written to every
    /// codeword of the page
    Raw,
}

#[derive(Debug, Clone, Copy)]
struct Buffers {
    params: ScratchBuf,
    data: ScratchBuf,
    spare: ScratchBuf,
}

#[derive(Debug, Clone, Copy)]
struct Device {
    info: FlashInfo,
    geometry: FlashGeometry,
    layout: PageLayout,
    config: FlashConfig,
}

/// NAND controller driven over a remote memory channel
pub struct NandFlash<C> {
    chan: C,
    arena: ScratchArena,
    executor: Executor,
    bufs: Buffers,
    verify_writes: bool,
    device: Option<Device>,
}

impl<C: RemoteMemory> NandFlash<C> {
    /// Carve the command list, parameter and page buffers out of `arena`
    pub fn new(chan: C, mut arena: ScratchArena, exec: ExecutorConfig) -> Result<Self> {
        let executor = Executor::new(&mut arena, exec)?;
        let bufs = Buffers {
            params: arena.allocate(32, PARAM_BUF_SIZE)?,
            data: arena.allocate(32, DATA_BUF_SIZE)?,
            spare: arena.allocate(32, SPARE_BUF_SIZE)?,
        };
        debug!(
            "scratch arena at 0x{:08X}: {} of {} bytes reserved",
            arena.remote_base(),
            arena.used(),
            arena.capacity()
        );
        Ok(Self {
            chan,
            arena,
            executor,
            bufs,
            verify_writes: false,
            device: None,
        })
    }

    /// Read back every programmed page and compare
    pub fn set_verify_writes(&mut self, enable: bool) {
        self.verify_writes = enable;
    }

    /// Identified device, if probed
    pub fn info(&self) -> Option<&FlashInfo> {
        self.device.as_ref().map(|d| &d.info)
    }

    /// Geometry in use, if probed
    pub fn geometry(&self) -> Option<&FlashGeometry> {
        self.device.as_ref().map(|d| &d.geometry)
    }

    /// Configuration in use, if probed
    pub fn config(&self) -> Option<FlashConfig> {
        self.device.as_ref().map(|d| d.config)
    }

    /// Page layout in use
    pub fn layout(&self) -> Result<PageLayout> {
        self.device().map(|d| d.layout)
    }

    /// The remote channel
    pub fn channel(&self) -> &C {
        &self.chan
    }

    /// The remote channel, mutably
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.chan
    }

    /// Consume the controller and return the channel
    pub fn into_inner(self) -> C {
        self.chan
    }

    /// Issue single register writes directly, outside any command list
    pub fn poke(&mut self, writes: &[(u32, u32)]) -> Result<()> {
        for &(addr, value) in writes {
            debug!("poke 0x{:08X} = 0x{:08X}", addr, value);
            self.chan.write_word(addr, value)?;
        }
        Ok(())
    }

    /// Read one register directly
    pub fn peek(&mut self, addr: u32) -> Result<u32> {
        self.chan.read_word(addr)
    }

    fn device(&self) -> Result<&Device> {
        self.device.as_ref().ok_or(Error::NotProbed)
    }

    fn set(&mut self, slot: usize, value: u32) -> Result<()> {
        self.arena.set_word(self.bufs.params, slot, value)
    }

    fn get(&self, slot: usize) -> Result<u32> {
        self.arena.word(self.bufs.params, slot)
    }

    fn param(&self, slot: usize) -> Result<u32> {
        self.arena.translate_at(self.bufs.params, slot * 4)
    }

    fn clear_params(&mut self) {
        let len = slot::END * 4;
        self.arena.bytes_mut(self.bufs.params)[..len].fill(0);
    }

    /// Load the command, both address words and the chip select
    fn set_command(&mut self, cmd: u32, addr0: u32, addr1: u32) -> Result<()> {
        self.set(slot::CMD, cmd)?;
        self.set(slot::ADDR0, addr0)?;
        self.set(slot::ADDR1, addr1)?;
        self.set(slot::CHIPSEL, regs::CHIP_SELECT_DEV0)?;
        self.set(slot::EXEC, regs::EXEC_GO)
    }

    fn set_config(&mut self, cfg: FlashConfig) -> Result<()> {
        self.set(slot::CFG0, cfg.cfg0)?;
        self.set(slot::CFG1, cfg.cfg1)
    }

    fn run(&mut self, list: &CommandList) -> Result<()> {
        self.executor.execute(&mut self.chan, &mut self.arena, list)
    }

    fn check_page(&self, page: u32) -> Result<&Device> {
        let dev = self.device()?;
        if page >= dev.geometry.num_pages() {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(dev)
    }

    /// Fetch the device ID and look it up in the device table
    ///
    /// Unknown IDs fall back to an 8-bit, 2 KiB page geometry.
    pub fn identify(&mut self) -> Result<(FlashInfo, FlashGeometry)> {
        self.clear_params();
        self.set_command(regs::CMD_FETCH_ID, 0, 0)?;
        self.set(slot::CFG0, regs::CFG0_FETCH_ID)?;
        self.set(slot::BURST_CFG, 0)?;

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(self.param(slot::CFG0)?, regs::DEV0_CFG0, 4).begin())?;
        b.push(Descriptor::burst(
            regs::SFLASHC_BURST_CFG,
            self.param(slot::BURST_CFG_SAVE)?,
            4,
        ))?;
        b.push(Descriptor::burst(
            self.param(slot::BURST_CFG)?,
            regs::SFLASHC_BURST_CFG,
            4,
        ))?;
        b.push(Descriptor::burst(
            self.param(slot::CHIPSEL)?,
            regs::FLASH_CHIP_SELECT,
            4,
        ))?;
        b.push(Descriptor::burst(self.param(slot::CMD)?, regs::FLASH_CMD, 4).wait_cmd())?;
        b.push(Descriptor::burst(self.param(slot::EXEC)?, regs::EXEC_CMD, 4))?;
        b.push(Descriptor::latch(regs::FLASH_STATUS, self.param(slot::RESULT)?, 4))?;
        b.push(Descriptor::burst(regs::READ_ID, self.param(slot::READ_ID)?, 4))?;
        b.push(Descriptor::burst(
            self.param(slot::BURST_CFG_SAVE)?,
            regs::SFLASHC_BURST_CFG,
            4,
        ))?;
        self.run(&b.finish()?)?;

        let status = self.get(slot::RESULT)?;
        let id = self.get(slot::READ_ID)?;
        trace!("fetch id: status 0x{:08X}", status);

        let (geometry, recognized) = match geometry::lookup(id) {
            Some(g) => (*g, true),
            None => {
                warn!("Device 0x{:08x} not supported. Assuming 8 bit NAND device", id);
                (FALLBACK_GEOMETRY, false)
            }
        };
        let info = FlashInfo::new(id, &geometry, recognized);
        info!(
            "nand id: 0x{:x} maker=0x{:02x} device=0x{:02x}",
            info.id, info.vendor, info.device
        );
        debug!(
            "page_size={} spare_size={} block_size={} num_blocks={}",
            info.page_size, info.spare_size, info.block_size, info.num_blocks
        );
        Ok((info, geometry))
    }

    /// Read the configuration words the controller currently holds
    pub fn read_live_config(&mut self) -> Result<FlashConfig> {
        self.clear_params();
        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(regs::DEV0_CFG0, self.param(slot::LIVE_CFG0)?, 4).begin())?;
        b.push(Descriptor::burst(regs::DEV0_CFG1, self.param(slot::LIVE_CFG1)?, 4))?;
        self.run(&b.finish()?)?;
        Ok(FlashConfig {
            cfg0: self.get(slot::LIVE_CFG0)?,
            cfg1: self.get(slot::LIVE_CFG1)?,
        })
    }

    /// Identify the device and derive the configuration used for page I/O
    pub fn probe(&mut self) -> Result<FlashInfo> {
        let (info, geometry) = self.identify()?;

        let live = self.read_live_config()?;
        if live.cfg0 == 0 || live.cfg1 == 0 {
            warn!("could not read CFG0/CFG1 state");
        } else {
            debug!("nandcfg: {:x} {:x} (initial)", live.cfg0, live.cfg1);
        }

        let layout = PageLayout::new(&geometry)?;
        let config = FlashConfig::derive(&layout);
        info!("nandcfg: {:x} {:x} (used)", config.cfg0, config.cfg1);

        self.device = Some(Device {
            info,
            geometry,
            layout,
            config,
        });
        Ok(info)
    }

    /// Check the factory bad-block marker of the block containing `page`
    pub fn is_block_bad(&mut self, page: u32) -> Result<bool> {
        let dev = *self.check_page(page)?;
        let page = page - page % PAGES_PER_BLOCK;
        let layout = dev.layout;

        self.clear_params();
        self.set_command(
            regs::CMD_PAGE_READ,
            (page << 16) | layout.marker_bus_column(),
            (page >> 16) & 0xFF,
        )?;
        self.set_config(dev.config.raw(1))?;

        let marker_src = regs::FLASH_BUFFER + layout.marker_offset();
        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(self.param(slot::CMD)?, regs::FLASH_CMD, 16)
            .begin()
            .wait_cmd())?;
        b.push(Descriptor::stream(self.param(slot::CFG0)?, regs::DEV0_CFG0, 8))?;
        b.push(Descriptor::burst(self.param(slot::EXEC)?, regs::EXEC_CMD, 4))?;
        b.push(Descriptor::latch(regs::FLASH_STATUS, self.param(slot::RESULT)?, 8))?;
        b.push(Descriptor::stream(marker_src, self.param(slot::MARKER)?, 4))?;
        self.run(&b.finish()?)?;

        let status = self.get(slot::RESULT)?;
        Error::check_status(page, status)?;

        let marker = self.get(slot::MARKER)?.to_le_bytes();
        let bad = if layout.wide {
            marker[0] != 0xFF || marker[1] != 0xFF
        } else {
            marker[0] != 0xFF
        };
        if bad {
            debug!("block {} is marked bad ({:02x?})", page / PAGES_PER_BLOCK, &marker[..2]);
        }
        Ok(bad)
    }

    /// Erase the block starting at `page`
    ///
    /// `page` must be the first page of a block. Blocks with a bad-block
    /// marker are never erased.
    pub fn erase_block(&mut self, page: u32) -> Result<()> {
        let dev = *self.check_page(page)?;
        if page % PAGES_PER_BLOCK != 0 {
            return Err(Error::InvalidAlignment);
        }
        if self.is_block_bad(page)? {
            return Err(Error::BadBlock {
                block: page / PAGES_PER_BLOCK,
            });
        }

        self.clear_params();
        self.set_command(regs::CMD_BLOCK_ERASE, page, 0)?;
        self.set_config(dev.config.single_codeword())?;
        self.set(slot::RESULT, 0xEEEE_EEEE)?;

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(self.param(slot::CMD)?, regs::FLASH_CMD, 16)
            .begin()
            .wait_cmd())?;
        b.push(Descriptor::stream(self.param(slot::CFG0)?, regs::DEV0_CFG0, 8))?;
        b.push(Descriptor::burst(self.param(slot::EXEC)?, regs::EXEC_CMD, 4))?;
        b.push(Descriptor::latch(regs::FLASH_STATUS, self.param(slot::RESULT)?, 4))?;
        b.push(Descriptor::burst(self.param(slot::ZERO)?, regs::FLASH_STATUS, 4))?;
        b.push(Descriptor::burst(self.param(slot::ZERO)?, regs::READ_STATUS, 4))?;
        self.run(&b.finish()?)?;

        let status = self.get(slot::RESULT)?;
        trace!("erase block {}: status 0x{:08X}", page / PAGES_PER_BLOCK, status);
        if status & (regs::STATUS_OP_ERROR | regs::STATUS_MPU_ERROR) != 0
            || status & regs::STATUS_SUCCESS == 0
        {
            return Err(Error::EraseFailed { page, status });
        }
        Ok(())
    }

    /// Read one page with ECC
    ///
    /// `data` must be exactly one page. Up to the available OOB bytes of
    /// user spare are copied into `spare` (its length selects how many).
    pub fn read_page(&mut self, page: u32, data: &mut [u8], spare: &mut [u8]) -> Result<()> {
        let dev = *self.check_page(page)?;
        let layout = dev.layout;
        if data.len() != layout.page_size as usize || spare.len() > layout.oob_avail() as usize {
            return Err(Error::InvalidLength);
        }
        if self.is_block_bad(page)? {
            return Err(Error::BadBlock {
                block: page / PAGES_PER_BLOCK,
            });
        }

        self.clear_params();
        self.set_command(regs::CMD_PAGE_READ_ALL, page << 16, (page >> 16) & 0xFF)?;
        self.set_config(FlashConfig {
            cfg0: FlashConfig::cfg0_with_codewords(dev.config.cfg0, layout.codewords),
            cfg1: dev.config.cfg1,
        })?;
        self.set(slot::ECC_CFG, regs::ECC_BUF_CFG)?;

        let data_addr = self.arena.translate(self.bufs.data)?;
        let spare_addr = self.arena.translate(self.bufs.spare)?;

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(regs::EBI2_ECC_BUF_CFG, self.param(slot::ECC_CFG_SAVE)?, 4).begin())?;
        for n in 0..layout.codewords {
            let cmd_len = if n == 0 { 16 } else { 4 };
            b.push(Descriptor::burst(self.param(slot::CMD)?, regs::FLASH_CMD, cmd_len).wait_cmd())?;
            if n == 0 {
                b.push(Descriptor::stream(self.param(slot::CFG0)?, regs::DEV0_CFG0, 8))?;
                b.push(Descriptor::burst(self.param(slot::ECC_CFG)?, regs::EBI2_ECC_BUF_CFG, 4))?;
            }
            b.push(Descriptor::burst(self.param(slot::EXEC)?, regs::EXEC_CMD, 4))?;
            b.push(Descriptor::latch(
                regs::FLASH_STATUS,
                self.param(slot::RESULT + 2 * n as usize)?,
                8,
            ))?;
            b.push(Descriptor::stream(
                regs::FLASH_BUFFER,
                data_addr + n * CODEWORD_DATA,
                CODEWORD_DATA,
            ))?;
            b.push(Descriptor::stream(
                regs::FLASH_BUFFER + CODEWORD_DATA,
                spare_addr + n * CODEWORD_SPARE,
                CODEWORD_SPARE,
            ))?;
        }
        b.push(Descriptor::burst(self.param(slot::ECC_CFG_SAVE)?, regs::EBI2_ECC_BUF_CFG, 4))?;
        self.run(&b.finish()?)?;

        for n in 0..layout.codewords as usize {
            let status = self.get(slot::RESULT + 2 * n)?;
            trace!(
                "read page {} cw {}: status 0x{:08X} buffer 0x{:08X}",
                page,
                n,
                status,
                self.get(slot::RESULT + 2 * n + 1)?
            );
            Error::check_status(page, status)?;
        }

        data.copy_from_slice(&self.arena.bytes(self.bufs.data)[..data.len()]);
        let len = spare.len();
        spare.copy_from_slice(&self.arena.bytes(self.bufs.spare)[..len]);
        Ok(())
    }

    /// Program one page
    ///
    /// In [`WriteMode::Ecc`] `data` is one page and `spare` at most the
    /// available OOB bytes (the rest is padded with 0xFF). In
    /// [`WriteMode::Raw`] `data` is one raw codeword image and `spare` must
    /// be empty.
    pub fn write_page(&mut self, page: u32, data: &[u8], spare: &[u8], mode: WriteMode) -> Result<()> {
        let dev = *self.check_page(page)?;
        let layout = dev.layout;
        match mode {
            WriteMode::Ecc => {
                if data.len() != layout.page_size as usize
                    || spare.len() > layout.oob_avail() as usize
                {
                    return Err(Error::InvalidLength);
                }
            }
            WriteMode::Raw => {
                if data.len() != RAW_CODEWORD_SIZE as usize || !spare.is_empty() {
                    return Err(Error::InvalidLength);
                }
            }
        }

        self.arena.bytes_mut(self.bufs.data)[..data.len()].copy_from_slice(data);
        let spare_buf = self.arena.bytes_mut(self.bufs.spare);
        spare_buf.fill(0xFF);
        spare_buf[..spare.len()].copy_from_slice(spare);

        self.clear_params();
        self.set_command(regs::CMD_PRG_PAGE_ALL, page << 16, (page >> 16) & 0xFF)?;
        self.set(slot::CLR_FLASH_STATUS, regs::CLEAR_FLASH_STATUS)?;
        self.set(slot::CLR_READ_STATUS, regs::CLEAR_READ_STATUS)?;
        self.set(slot::ECC_CFG, regs::ECC_BUF_CFG)?;
        self.set_config(match mode {
            WriteMode::Ecc => dev.config,
            WriteMode::Raw => dev.config.raw(layout.codewords),
        })?;

        let data_addr = self.arena.translate(self.bufs.data)?;
        let spare_addr = self.arena.translate(self.bufs.spare)?;

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(regs::EBI2_ECC_BUF_CFG, self.param(slot::ECC_CFG_SAVE)?, 4).begin())?;
        for n in 0..layout.codewords {
            let cmd_len = if n == 0 { 16 } else { 4 };
            b.push(Descriptor::burst(self.param(slot::CMD)?, regs::FLASH_CMD, cmd_len).wait_cmd())?;
            if n == 0 {
                b.push(Descriptor::stream(self.param(slot::CFG0)?, regs::DEV0_CFG0, 8))?;
                b.push(Descriptor::burst(self.param(slot::ECC_CFG)?, regs::EBI2_ECC_BUF_CFG, 4))?;
            }
            match mode {
                WriteMode::Ecc => {
                    b.push(Descriptor::stream(
                        data_addr + n * CODEWORD_DATA,
                        regs::FLASH_BUFFER,
                        CODEWORD_DATA,
                    ))?;
                    b.push(Descriptor::stream(
                        spare_addr + n * CODEWORD_SPARE,
                        regs::FLASH_BUFFER + CODEWORD_DATA,
                        CODEWORD_SPARE,
                    ))?;
                }
                WriteMode::Raw => {
                    b.push(Descriptor::stream(data_addr, regs::FLASH_BUFFER, RAW_CODEWORD_SIZE))?;
                }
            }
            b.push(Descriptor::burst(self.param(slot::EXEC)?, regs::EXEC_CMD, 4))?;
            b.push(Descriptor::latch(
                regs::FLASH_STATUS,
                self.param(slot::RESULT + 2 * n as usize)?,
                8,
            ))?;
            b.push(Descriptor::burst(self.param(slot::CLR_FLASH_STATUS)?, regs::FLASH_STATUS, 4))?;
            b.push(Descriptor::burst(self.param(slot::CLR_READ_STATUS)?, regs::READ_STATUS, 4))?;
        }
        b.push(Descriptor::burst(self.param(slot::ECC_CFG_SAVE)?, regs::EBI2_ECC_BUF_CFG, 4))?;
        self.run(&b.finish()?)?;

        for n in 0..layout.codewords as usize {
            let status = self.get(slot::RESULT + 2 * n)?;
            trace!("write page {} cw {}: status 0x{:08X}", page, n, status);
            Error::check_status(page, status)?;
            if status & regs::STATUS_SUCCESS == 0 {
                return Err(Error::ProgramFailed { page, status });
            }
        }

        if self.verify_writes && mode == WriteMode::Ecc {
            self.verify_page(page, data, spare)?;
        }
        Ok(())
    }

    fn verify_page(&mut self, page: u32, data: &[u8], spare: &[u8]) -> Result<()> {
        let mut readback = vec![0u8; data.len()];
        let mut spare_back = vec![0u8; spare.len()];
        self.read_page(page, &mut readback, &mut spare_back)?;
        if readback != data || spare_back != spare {
            warn!("verify failed on page {}", page);
            return Err(Error::VerifyFailed { page });
        }
        Ok(())
    }

    /// Mark the block containing `page` bad by zeroing its first page raw
    pub fn mark_bad_block(&mut self, page: u32) -> Result<()> {
        let page = page - page % PAGES_PER_BLOCK;
        info!("marking block {} bad", page / PAGES_PER_BLOCK);
        let zeros = [0u8; RAW_CODEWORD_SIZE as usize];
        self.write_page(page, &zeros, &[], WriteMode::Raw)
    }
}
