//! Descriptors and command lists

use bitflags::bitflags;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Maximum descriptors in one list (the 1 KiB list region holds 64 records)
pub const MAX_DESCRIPTORS: usize = 64;

/// Hardware command word: last command in the list
const DMOV_CMD_LC: u32 = 1 << 31;
/// Hardware command word: unblock the other channel when done
const DMOV_CMD_OCU: u32 = 1 << 21;
/// Hardware command word: block until the other channel unblocks us
const DMOV_CMD_OCB: u32 = 1 << 20;
/// CRCI the NAND controller raises when its data buffer is ready
const CRCI_NAND_DATA: u32 = 4;
/// CRCI the NAND controller raises when it can accept a command
const CRCI_NAND_CMD: u32 = 5;

const fn src_crci(n: u32) -> u32 {
    (n & 15) << 3
}

const fn dst_crci(n: u32) -> u32 {
    (n & 15) << 7
}

bitflags! {
    /// Descriptor control flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DescFlags: u32 {
        /// First descriptor of the chain
        const BEGIN     = 1 << 0;
        /// Last descriptor; interpretation stops after it
        const TERMINATE = 1 << 1;
        /// Wait until the controller can accept a command
        const WAIT_CMD  = 1 << 2;
        /// Wait until the controller's data/status is ready
        const WAIT_DATA = 1 << 3;
    }
}

/// How a descriptor's words are moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Read one word from the source once and store it to every destination
    /// word (status latches)
    Replicate,
    /// Copy a contiguous run: both addresses increment (buffers, the
    /// CFG0/CFG1 pair)
    Stream,
    /// Source increments, destination stays fixed (feeding a register port
    /// such as the command FIFO)
    Burst,
}

/// One copy descriptor
///
/// Descriptors are immutable once built; the builder methods consume and
/// return the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    src: u32,
    dst: u32,
    len: u32,
    flags: DescFlags,
    mode: TransferMode,
}

impl Descriptor {
    const fn new(src: u32, dst: u32, len: u32, mode: TransferMode, flags: DescFlags) -> Self {
        Self {
            src,
            dst,
            len,
            flags,
            mode,
        }
    }

    /// Fixed-destination copy of `len` bytes
    pub const fn burst(src: u32, dst: u32, len: u32) -> Self {
        Self::new(src, dst, len, TransferMode::Burst, DescFlags::empty())
    }

    /// Incrementing copy of `len` bytes
    pub const fn stream(src: u32, dst: u32, len: u32) -> Self {
        Self::new(src, dst, len, TransferMode::Stream, DescFlags::empty())
    }

    /// Latch a status register into `len` bytes at `dst` once the
    /// controller reports idle
    pub const fn latch(src: u32, dst: u32, len: u32) -> Self {
        Self::new(src, dst, len, TransferMode::Replicate, DescFlags::WAIT_DATA)
    }

    /// Mark as the first descriptor of the chain
    pub const fn begin(mut self) -> Self {
        self.flags = self.flags.union(DescFlags::BEGIN);
        self
    }

    /// Gate on the controller accepting a command
    pub const fn wait_cmd(mut self) -> Self {
        self.flags = self.flags.union(DescFlags::WAIT_CMD);
        self
    }

    /// Source address
    pub fn src(&self) -> u32 {
        self.src
    }

    /// Destination address
    pub fn dst(&self) -> u32 {
        self.dst
    }

    /// Length in bytes
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the descriptor moves nothing
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of 32-bit words moved
    pub fn words(&self) -> usize {
        (self.len / 4) as usize
    }

    /// Control flags
    pub fn flags(&self) -> DescFlags {
        self.flags
    }

    /// Transfer mode
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Whether this descriptor ends the list
    pub fn is_terminate(&self) -> bool {
        self.flags.contains(DescFlags::TERMINATE)
    }

    fn validate(&self) -> Result<()> {
        if self.len == 0 || self.len % 4 != 0 {
            return Err(Error::InvalidCommandList);
        }
        if self.flags.contains(DescFlags::TERMINATE) {
            return Err(Error::InvalidCommandList);
        }
        Ok(())
    }

    /// Hardware record for the data mover
    pub fn encode(&self) -> DmovRecord {
        let mut cmd = 0;
        if self.flags.contains(DescFlags::BEGIN) {
            cmd |= DMOV_CMD_OCB;
        }
        if self.flags.contains(DescFlags::TERMINATE) {
            cmd |= DMOV_CMD_LC | DMOV_CMD_OCU;
        }
        if self.flags.contains(DescFlags::WAIT_CMD) {
            cmd |= dst_crci(CRCI_NAND_CMD);
        }
        if self.flags.contains(DescFlags::WAIT_DATA) {
            cmd |= src_crci(CRCI_NAND_DATA);
        }
        DmovRecord {
            cmd: U32::new(cmd),
            src: U32::new(self.src),
            dst: U32::new(self.dst),
            len: U32::new(self.len),
        }
    }
}

/// Data mover single-mode record as laid out in target memory
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DmovRecord {
    /// Command word (flags and CRCI gates)
    pub cmd: U32,
    /// Source address
    pub src: U32,
    /// Destination address
    pub dst: U32,
    /// Length in bytes
    pub len: U32,
}

impl DmovRecord {
    /// Size of one record in bytes
    pub const SIZE: usize = 16;

    /// Pointer word designating a list at `addr` (which must be 8-byte
    /// aligned)
    pub const fn list_pointer(addr: u32) -> u32 {
        (addr >> 3) | DMOV_CMD_LC
    }
}

/// Builder for a [`CommandList`]
#[derive(Debug, Default)]
pub struct CommandListBuilder {
    descs: heapless::Vec<Descriptor, MAX_DESCRIPTORS>,
}

impl CommandListBuilder {
    /// Start an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor
    pub fn push(&mut self, desc: Descriptor) -> Result<&mut Self> {
        desc.validate()?;
        self.descs.push(desc).map_err(|_| Error::CommandListFull)?;
        Ok(self)
    }

    /// Seal the list, marking its last descriptor as the terminator
    pub fn finish(mut self) -> Result<CommandList> {
        let last = self.descs.last_mut().ok_or(Error::InvalidCommandList)?;
        last.flags.insert(DescFlags::TERMINATE);
        Ok(CommandList { descs: self.descs })
    }
}

/// A sealed, terminated command list
#[derive(Debug, Clone)]
pub struct CommandList {
    descs: heapless::Vec<Descriptor, MAX_DESCRIPTORS>,
}

impl CommandList {
    /// Descriptors in execution order
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descs
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// Always false; a sealed list holds at least its terminator
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }
}
