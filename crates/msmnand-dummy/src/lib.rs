//! msmnand-dummy - In-memory MSM NAND controller emulator
//!
//! This crate provides a [`RemoteMemory`] implementation that emulates the
//! NAND controller register block, its codeword buffer, the NAND array
//! behind it and a region of scratch RAM. It's useful for testing the
//! driver without a target.
//!
//! The array stores every page raw: `codewords * 528` bytes per page. With
//! ECC enabled each codeword carries 516 user bytes; the user byte that
//! would land on the bad-block marker of the last codeword is kept at the
//! end of that codeword instead, so ordinary page programs never clobber
//! the marker. Pages are allocated on first program and read as erased
//! until then.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use log::{debug, trace};
use msmnand_core::error::{Error, Result};
use msmnand_core::nand::config::{CODEWORD_DATA, CODEWORD_SPARE, RAW_CODEWORD_SIZE};
use msmnand_core::nand::{geometry, regs, PAGES_PER_BLOCK};
use msmnand_core::remote::RemoteMemory;

#[cfg(test)]
mod e2e;

/// Status the controller reports after a completed operation
pub const STATUS_DONE: u32 = regs::STATUS_SUCCESS | 0x20;
/// Channel status reported for accesses to unmapped addresses
pub const BUS_FAULT: u32 = 0x2;
/// Channel status reported for injected transport faults
pub const INJECTED_FAULT: u32 = 0x1;

/// User bytes per codeword with ECC enabled
const CODEWORD_USER: u32 = CODEWORD_DATA + CODEWORD_SPARE;

/// Configuration for the dummy NAND
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Value the controller latches for fetch-ID
    pub id: u32,
    /// Page size in bytes (a multiple of 512)
    pub page_size: u32,
    /// 16-bit bus
    pub wide: bool,
    /// Number of erase blocks in the array
    pub blocks: u32,
    /// Scratch RAM base address
    pub scratch_base: u32,
    /// Scratch RAM size in bytes
    pub scratch_size: u32,
}

impl DummyConfig {
    /// Configuration for a whole part as the device table describes it
    ///
    /// Unknown IDs get the fallback geometry.
    pub fn for_id(id: u32) -> Self {
        let g = geometry::lookup(id).unwrap_or(&geometry::FALLBACK_GEOMETRY);
        Self {
            id,
            page_size: g.page_size,
            wide: g.bus_width.is_wide(),
            blocks: g.num_blocks(),
            ..Self::default()
        }
    }
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            id: 0x1500_aaec, // Samsung 256 MiB, 8-bit
            page_size: 2048,
            wide: false,
            blocks: 2048,
            scratch_base: 0x8000_0000,
            scratch_size: 0x4000,
        }
    }
}

/// Counters of channel calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// `read_word` calls
    pub word_reads: usize,
    /// `write_word` calls
    pub word_writes: usize,
    /// `read_block` calls
    pub block_reads: usize,
    /// `write_block` calls
    pub block_writes: usize,
}

/// Operation in progress on the array
#[derive(Debug, Clone, Copy)]
struct Operation {
    cmd: u32,
    page: u32,
    column: u32,
    codeword: u32,
}

/// Controller-visible register state
#[derive(Debug, Default)]
struct Registers {
    fifo: Vec<u32>,
    addr0: u32,
    addr1: u32,
    chip_select: u32,
    flash_status: u32,
    buffer_status: u32,
    cfg0: u32,
    cfg1: u32,
    read_id: u32,
    read_status: u32,
    burst_cfg: u32,
    ecc_buf_cfg: u32,
}

/// Dummy NAND controller with its array and scratch RAM
pub struct DummyNand {
    config: DummyConfig,
    codewords: u32,
    pages: BTreeMap<u32, Vec<u8>>,
    erased: Vec<u8>,
    buffer: Vec<u8>,
    scratch: Vec<u8>,
    regs: Registers,
    op: Option<Operation>,
    misc: BTreeMap<u32, u32>,
    stats: TransportStats,
    program_failures: BTreeSet<u32>,
    erase_failures: BTreeSet<u32>,
    protected_blocks: BTreeSet<u32>,
    faulty_addresses: BTreeSet<u32>,
    stalled: bool,
    programs: usize,
    erases: Vec<u32>,
}

impl DummyNand {
    /// Create a new dummy NAND with every block erased
    pub fn new(config: DummyConfig) -> Self {
        let codewords = (config.page_size / CODEWORD_DATA).max(1);
        let raw_page = (codewords * RAW_CODEWORD_SIZE) as usize;
        let mut misc = BTreeMap::new();
        for &(addr, _) in regs::UNLOCK_WRITES {
            misc.insert(addr, 1);
        }
        Self {
            codewords,
            pages: BTreeMap::new(),
            erased: vec![0xFF; raw_page],
            buffer: vec![0; regs::FLASH_BUFFER_SIZE as usize],
            scratch: vec![0; config.scratch_size as usize],
            regs: Registers {
                // Boot ROM configuration the driver logs as "initial"
                cfg0: 0xE8D4_08C0,
                cfg1: 0x0004_745C,
                ..Registers::default()
            },
            op: None,
            misc,
            stats: TransportStats::default(),
            program_failures: BTreeSet::new(),
            erase_failures: BTreeSet::new(),
            protected_blocks: BTreeSet::new(),
            faulty_addresses: BTreeSet::new(),
            stalled: false,
            programs: 0,
            erases: Vec::new(),
            config,
        }
    }

    /// Create a new dummy NAND with default configuration (Samsung 8-bit)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Channel call counters
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Reset the channel call counters
    pub fn reset_stats(&mut self) {
        self.stats = TransportStats::default();
    }

    /// Number of codeword programs performed
    pub fn programs(&self) -> usize {
        self.programs
    }

    /// Blocks erased, in order
    pub fn erases(&self) -> &[u32] {
        &self.erases
    }

    /// Current value of an unlock or other miscellaneous register
    pub fn misc_register(&self, addr: u32) -> Option<u32> {
        self.misc.get(&addr).copied()
    }

    /// Set the factory bad-block marker of `block`
    ///
    /// The marker is the first spare byte (word, on a 16-bit bus) of the
    /// block's first page in its native layout.
    pub fn mark_factory_bad(&mut self, block: u32) {
        let at = self.config.page_size as usize;
        let wide = self.config.wide;
        let raw = self.page_mut(block * PAGES_PER_BLOCK);
        raw[at] = 0;
        if wide {
            raw[at + 1] = 0;
        }
    }

    /// Make every program of `page` fail with an operation error
    pub fn fail_program(&mut self, page: u32) {
        self.program_failures.insert(page);
    }

    /// Make every erase of `block` fail with an operation error
    pub fn fail_erase(&mut self, block: u32) {
        self.erase_failures.insert(block);
    }

    /// Reject program/erase of `block` with an MPU violation
    pub fn protect_block(&mut self, block: u32) {
        self.protected_blocks.insert(block);
    }

    /// Fail every channel access touching `addr`
    pub fn fail_address(&mut self, addr: u32) {
        self.faulty_addresses.insert(addr);
    }

    /// Stop failing channel accesses
    pub fn clear_faults(&mut self) {
        self.faulty_addresses.clear();
    }

    /// Keep FLASH_STATUS reporting busy
    pub fn stall_status(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Raw bytes of `page` (all codewords, including spare and parity)
    pub fn raw_page(&self, page: u32) -> &[u8] {
        self.pages.get(&page).map_or(&self.erased[..], |p| &p[..])
    }

    /// Main-area data of `page` as an ECC read would return it
    pub fn page_data(&self, page: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.config.page_size as usize);
        for cw in 0..self.codewords {
            let user = self.codeword_user(page, cw);
            out.extend_from_slice(&user[..CODEWORD_DATA as usize]);
        }
        out
    }

    /// User spare bytes of `page`
    pub fn page_spare(&self, page: u32) -> Vec<u8> {
        let mut out = Vec::new();
        for cw in 0..self.codewords {
            let user = self.codeword_user(page, cw);
            out.extend_from_slice(&user[CODEWORD_DATA as usize..]);
        }
        out
    }

    /// Whether every raw byte of `page` is 0xFF
    pub fn is_erased(&self, page: u32) -> bool {
        self.raw_page(page).iter().all(|&b| b == 0xFF)
    }

    /// Scratch RAM contents
    pub fn scratch(&self) -> &[u8] {
        &self.scratch
    }

    fn page_mut(&mut self, page: u32) -> &mut Vec<u8> {
        let erased = &self.erased;
        self.pages.entry(page).or_insert_with(|| erased.clone())
    }

    fn num_pages(&self) -> u32 {
        self.config.blocks * PAGES_PER_BLOCK
    }

    fn marker_column(&self) -> u32 {
        RAW_CODEWORD_SIZE * (self.codewords - 1)
    }

    /// Raw byte index within the page of user byte `i` of codeword `cw`
    fn user_to_raw(&self, cw: u32, i: u32) -> usize {
        let base = cw * RAW_CODEWORD_SIZE;
        if cw == self.codewords - 1 {
            let marker = self.config.page_size - self.marker_column();
            if i == marker {
                return (base + RAW_CODEWORD_SIZE - 1) as usize;
            }
            if self.config.wide && i == marker + 1 {
                return (base + RAW_CODEWORD_SIZE - 2) as usize;
            }
        }
        (base + i) as usize
    }

    fn codeword_user(&self, page: u32, cw: u32) -> Vec<u8> {
        let raw = self.raw_page(page);
        (0..CODEWORD_USER)
            .map(|i| raw[self.user_to_raw(cw, i)])
            .collect()
    }

    fn ecc_enabled(&self) -> bool {
        self.regs.cfg1 & regs::CFG1_ECC_DISABLE == 0
    }

    fn cfg_codewords(&self) -> u32 {
        ((self.regs.cfg0 & regs::CFG0_CW_MASK) >> regs::CFG0_CW_SHIFT) + 1
    }

    fn check_fault(&self, addr: u32, words: usize) -> Result<()> {
        let end = addr.wrapping_add(4 * words as u32);
        if let Some(&bad) = self.faulty_addresses.range(addr..end.max(addr + 1)).next() {
            debug!("dummy: injected fault at 0x{:08X}", bad);
            return Err(Error::Transport {
                addr: bad,
                status: INJECTED_FAULT,
            });
        }
        Ok(())
    }

    fn scratch_index(&self, addr: u32) -> Option<usize> {
        let off = addr.checked_sub(self.config.scratch_base)? as usize;
        (off + 4 <= self.scratch.len()).then_some(off)
    }

    fn buffer_index(&self, addr: u32) -> Option<usize> {
        let off = addr.checked_sub(regs::FLASH_BUFFER)?;
        (off + 4 <= regs::FLASH_BUFFER_SIZE).then_some(off as usize)
    }

    fn load(&mut self, addr: u32) -> Result<u32> {
        if addr % 4 != 0 {
            return Err(Error::Transport {
                addr,
                status: BUS_FAULT,
            });
        }
        if let Some(i) = self.scratch_index(addr) {
            return Ok(le_word(&self.scratch[i..i + 4]));
        }
        if let Some(i) = self.buffer_index(addr) {
            return Ok(le_word(&self.buffer[i..i + 4]));
        }
        let value = match addr {
            regs::FLASH_CMD => self.regs.fifo.first().copied().unwrap_or(0),
            regs::FLASH_ADDR0 => self.regs.addr0,
            regs::FLASH_ADDR1 => self.regs.addr1,
            regs::FLASH_CHIP_SELECT => self.regs.chip_select,
            regs::EXEC_CMD => 0,
            regs::FLASH_STATUS => {
                if self.stalled {
                    self.regs.flash_status | 0x1
                } else {
                    self.regs.flash_status
                }
            }
            regs::BUFFER_STATUS => self.regs.buffer_status,
            regs::DEV0_CFG0 => self.regs.cfg0,
            regs::DEV0_CFG1 => self.regs.cfg1,
            regs::READ_ID => self.regs.read_id,
            regs::READ_STATUS => self.regs.read_status,
            regs::SFLASHC_BURST_CFG => self.regs.burst_cfg,
            regs::EBI2_ECC_BUF_CFG => self.regs.ecc_buf_cfg,
            _ => match self.misc.get(&addr) {
                Some(&v) => v,
                None => {
                    return Err(Error::Transport {
                        addr,
                        status: BUS_FAULT,
                    })
                }
            },
        };
        Ok(value)
    }

    fn store(&mut self, addr: u32, value: u32) -> Result<()> {
        if addr % 4 != 0 {
            return Err(Error::Transport {
                addr,
                status: BUS_FAULT,
            });
        }
        if let Some(i) = self.scratch_index(addr) {
            self.scratch[i..i + 4].copy_from_slice(&value.to_le_bytes());
            return Ok(());
        }
        if let Some(i) = self.buffer_index(addr) {
            self.buffer[i..i + 4].copy_from_slice(&value.to_le_bytes());
            return Ok(());
        }
        match addr {
            regs::FLASH_CMD => self.regs.fifo.push(value),
            regs::FLASH_ADDR0 => self.regs.addr0 = value,
            regs::FLASH_ADDR1 => self.regs.addr1 = value,
            regs::FLASH_CHIP_SELECT => self.regs.chip_select = value,
            regs::EXEC_CMD => {
                if value & regs::EXEC_GO != 0 {
                    self.exec();
                }
            }
            regs::FLASH_STATUS => self.regs.flash_status = value,
            regs::BUFFER_STATUS => self.regs.buffer_status = value,
            regs::DEV0_CFG0 => self.regs.cfg0 = value,
            regs::DEV0_CFG1 => self.regs.cfg1 = value,
            regs::READ_ID => {}
            regs::READ_STATUS => self.regs.read_status = value,
            regs::SFLASHC_BURST_CFG => self.regs.burst_cfg = value,
            regs::EBI2_ECC_BUF_CFG => self.regs.ecc_buf_cfg = value,
            _ => {
                if !self.misc.contains_key(&addr) {
                    return Err(Error::Transport {
                        addr,
                        status: BUS_FAULT,
                    });
                }
                self.misc.insert(addr, value);
            }
        }
        Ok(())
    }

    /// Start the command queued in the FIFO
    ///
    /// A FIFO holding address words starts a new operation; a lone command
    /// word continues a multi-codeword operation with its next codeword.
    fn exec(&mut self) {
        let fifo = core::mem::take(&mut self.regs.fifo);
        if let Some(&a0) = fifo.get(1) {
            self.regs.addr0 = a0;
        }
        if let Some(&a1) = fifo.get(2) {
            self.regs.addr1 = a1;
        }
        if let Some(&cs) = fifo.get(3) {
            self.regs.chip_select = cs;
        }

        let cmd = fifo
            .first()
            .copied()
            .or(self.op.map(|op| op.cmd))
            .unwrap_or(0);
        let continuing = fifo.len() <= 1
            && matches!(self.op, Some(op) if op.cmd == cmd)
            && matches!(cmd, regs::CMD_PAGE_READ_ALL | regs::CMD_PRG_PAGE_ALL);

        let op = if continuing {
            let mut op = self.op.unwrap_or(Operation {
                cmd,
                page: 0,
                column: 0,
                codeword: 0,
            });
            op.codeword += 1;
            op
        } else {
            let wide = self.regs.cfg1 & regs::CFG1_WIDE_FLASH != 0;
            let column = self.regs.addr0 & 0xFFFF;
            Operation {
                cmd,
                page: (self.regs.addr0 >> 16) | ((self.regs.addr1 & 0xFF) << 16),
                column: if wide { column << 1 } else { column },
                codeword: 0,
            }
        };
        trace!(
            "dummy: exec cmd 0x{:02X} page {} column {} cw {}",
            op.cmd,
            op.page,
            op.column,
            op.codeword
        );
        self.op = Some(op);

        self.regs.flash_status = match op.cmd {
            regs::CMD_FETCH_ID => {
                self.regs.read_id = self.config.id;
                STATUS_DONE
            }
            regs::CMD_PAGE_READ => self.read_codeword(op.page, op.column / RAW_CODEWORD_SIZE, op.column),
            regs::CMD_PAGE_READ_ALL if op.codeword >= self.cfg_codewords() => regs::STATUS_OP_ERROR,
            regs::CMD_PAGE_READ_ALL => {
                let cw = op.codeword;
                self.read_codeword(op.page, cw, cw * RAW_CODEWORD_SIZE)
            }
            regs::CMD_PRG_PAGE_ALL => self.program_codeword(op.page, op.codeword),
            // Erase takes the row address in ADDR0 directly
            regs::CMD_BLOCK_ERASE => self.erase(self.regs.addr0),
            _ => regs::STATUS_OP_ERROR,
        };
    }

    fn read_codeword(&mut self, page: u32, cw: u32, column: u32) -> u32 {
        if page >= self.num_pages() || cw >= self.codewords {
            return regs::STATUS_OP_ERROR;
        }
        if self.ecc_enabled() {
            let user = self.codeword_user(page, cw);
            self.buffer[..user.len()].copy_from_slice(&user);
        } else {
            let raw = self.raw_page(page);
            let start = (column as usize).min(raw.len());
            let end = (start + RAW_CODEWORD_SIZE as usize).min(raw.len());
            let mut chunk = vec![0xFF; RAW_CODEWORD_SIZE as usize];
            chunk[..end - start].copy_from_slice(&raw[start..end]);
            self.buffer[..chunk.len()].copy_from_slice(&chunk);
        }
        self.regs.buffer_status = 0;
        STATUS_DONE
    }

    fn program_codeword(&mut self, page: u32, cw: u32) -> u32 {
        if page >= self.num_pages() || cw >= self.codewords {
            return regs::STATUS_OP_ERROR;
        }
        let block = page / PAGES_PER_BLOCK;
        if self.protected_blocks.contains(&block) {
            return regs::STATUS_MPU_ERROR;
        }
        if self.program_failures.contains(&page) {
            debug!("dummy: injected program failure on page {}", page);
            return regs::STATUS_OP_ERROR;
        }
        // Raw byte index for each buffer byte
        let targets: Vec<usize> = if self.ecc_enabled() {
            (0..CODEWORD_USER).map(|i| self.user_to_raw(cw, i)).collect()
        } else {
            let start = (cw * RAW_CODEWORD_SIZE) as usize;
            (start..start + RAW_CODEWORD_SIZE as usize).collect()
        };
        let data = self.buffer[..targets.len()].to_vec();
        let raw = self.page_mut(page);
        for (&at, &byte) in targets.iter().zip(&data) {
            raw[at] &= byte;
        }
        self.programs += 1;
        STATUS_DONE
    }

    fn erase(&mut self, page: u32) -> u32 {
        if page >= self.num_pages() {
            return regs::STATUS_OP_ERROR;
        }
        let block = page / PAGES_PER_BLOCK;
        if self.protected_blocks.contains(&block) {
            return regs::STATUS_MPU_ERROR;
        }
        if self.erase_failures.contains(&block) {
            debug!("dummy: injected erase failure on block {}", block);
            return regs::STATUS_OP_ERROR;
        }
        let first = block * PAGES_PER_BLOCK;
        let written: Vec<u32> = self
            .pages
            .range(first..first + PAGES_PER_BLOCK)
            .map(|(&page, _)| page)
            .collect();
        for page in written {
            self.pages.remove(&page);
        }
        self.erases.push(block);
        STATUS_DONE
    }
}

fn le_word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl RemoteMemory for DummyNand {
    fn read_word(&mut self, addr: u32) -> Result<u32> {
        self.stats.word_reads += 1;
        self.check_fault(addr, 1)?;
        self.load(addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
        self.stats.word_writes += 1;
        self.check_fault(addr, 1)?;
        self.store(addr, value)
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<()> {
        self.stats.block_reads += 1;
        self.check_fault(addr, buf.len())?;
        for (i, word) in buf.iter_mut().enumerate() {
            *word = self.load(addr + 4 * i as u32)?;
        }
        Ok(())
    }

    fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()> {
        self.stats.block_writes += 1;
        self.check_fault(addr, buf.len())?;
        for (i, &word) in buf.iter().enumerate() {
            self.store(addr + 4 * i as u32, word)?;
        }
        Ok(())
    }
}
