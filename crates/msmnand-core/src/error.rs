//! Error types for msmnand-core
//!
//! This module provides a no_std compatible error type shared by the
//! executor, the flash controller and the partition layer.

use core::fmt;

use crate::nand::regs;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// A remote memory access reported a non-zero status
    Transport {
        /// Target address of the failed access
        addr: u32,
        /// Status word returned by the channel
        status: u32,
    },
    /// A status register never reported idle within the poll budget
    Timeout {
        /// Register that was being polled
        addr: u32,
    },

    // Flash status errors
    /// The block is marked bad
    BadBlock {
        /// Block number
        block: u32,
    },
    /// The controller flagged an operation error on a page
    OperationFailed {
        /// Page the operation targeted
        page: u32,
        /// Latched flash status
        status: u32,
    },
    /// The controller's memory protection unit rejected the access
    ProtectionViolation {
        /// Page the operation targeted
        page: u32,
        /// Latched flash status
        status: u32,
    },
    /// Block erase did not report success
    EraseFailed {
        /// First page of the block
        page: u32,
        /// Latched flash status
        status: u32,
    },
    /// Page program did not report success
    ProgramFailed {
        /// Page being programmed
        page: u32,
        /// Latched flash status
        status: u32,
    },
    /// Read-back after program did not match the written data
    VerifyFailed {
        /// Page that mismatched
        page: u32,
    },

    // Argument errors
    /// Page or offset is not aligned as the operation requires
    InvalidAlignment,
    /// Buffer or spare length is not valid for the device
    InvalidLength,
    /// Address or offset lies outside the addressed object
    AddressOutOfBounds,

    // Resource errors
    /// Not enough good blocks in the partition to hold the request
    CapacityExceeded,
    /// Scratch arena has no room for the requested allocation
    ArenaOverflow,
    /// Command list has more descriptors than the list region holds
    CommandListFull,
    /// Command list is empty or a descriptor is malformed
    InvalidCommandList,

    // Device errors
    /// Geometry cannot be expressed in controller configuration words
    UnsupportedGeometry,
    /// Operation needs a probed device
    NotProbed,
    /// Driver configuration is invalid
    InvalidConfig,

    // Partition errors
    /// Operation is not permitted on this partition type
    UnsupportedPartition,
    /// No partition with the requested name
    PartitionNotFound,
    /// The partition table was already installed
    PartitionTableAlreadySet,
    /// Partition table validation failed (overlaps, duplicate names, ...)
    PartitionTableInvalid,
}

impl Error {
    /// Classify a latched flash status word for a page-level operation
    ///
    /// Returns `Ok(())` when neither the operation error nor the MPU error
    /// bit is set.
    pub fn check_status(page: u32, status: u32) -> Result<()> {
        if status & regs::STATUS_MPU_ERROR != 0 {
            Err(Self::ProtectionViolation { page, status })
        } else if status & regs::STATUS_OP_ERROR != 0 {
            Err(Self::OperationFailed { page, status })
        } else {
            Ok(())
        }
    }

    /// Whether this error reports a bad block
    pub fn is_bad_block(&self) -> bool {
        matches!(self, Self::BadBlock { .. })
    }

    /// Whether this error is confined to a single page or block
    ///
    /// Partition I/O skips past these; anything else (transport failures,
    /// timeouts, argument errors) aborts the whole operation.
    pub fn is_page_level(&self) -> bool {
        matches!(
            self,
            Self::BadBlock { .. }
                | Self::OperationFailed { .. }
                | Self::ProtectionViolation { .. }
                | Self::EraseFailed { .. }
                | Self::ProgramFailed { .. }
                | Self::VerifyFailed { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { addr, status } => write!(
                f,
                "remote access to 0x{:08X} failed with status 0x{:08X}",
                addr, status
            ),
            Self::Timeout { addr } => {
                write!(f, "timed out waiting for register 0x{:08X}", addr)
            }
            Self::BadBlock { block } => write!(f, "block {} is bad", block),
            Self::OperationFailed { page, status } => write!(
                f,
                "operation error on page {} (status 0x{:08X})",
                page, status
            ),
            Self::ProtectionViolation { page, status } => write!(
                f,
                "MPU protection violation on page {} (status 0x{:08X})",
                page, status
            ),
            Self::EraseFailed { page, status } => write!(
                f,
                "erase failed at page {} (status 0x{:08X})",
                page, status
            ),
            Self::ProgramFailed { page, status } => write!(
                f,
                "program failed at page {} (status 0x{:08X})",
                page, status
            ),
            Self::VerifyFailed { page } => write!(f, "verify failed on page {}", page),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::InvalidLength => write!(f, "invalid length"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::CapacityExceeded => write!(f, "not enough good blocks in partition"),
            Self::ArenaOverflow => write!(f, "scratch arena exhausted"),
            Self::CommandListFull => write!(f, "command list is full"),
            Self::InvalidCommandList => write!(f, "invalid command list"),
            Self::UnsupportedGeometry => write!(f, "unsupported flash geometry"),
            Self::NotProbed => write!(f, "flash device has not been probed"),
            Self::InvalidConfig => write!(f, "invalid driver configuration"),
            Self::UnsupportedPartition => write!(f, "operation not supported on this partition"),
            Self::PartitionNotFound => write!(f, "partition not found"),
            Self::PartitionTableAlreadySet => write!(f, "partition table already set"),
            Self::PartitionTableInvalid => write!(f, "partition table validation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
