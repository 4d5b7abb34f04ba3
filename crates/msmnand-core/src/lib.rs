//! msmnand-core - Core library for MSM NAND flash programming
//!
//! This crate drives the NAND controller of Qualcomm MSM application
//! processors from a host that can only peek and poke the target's address
//! space (a debug probe, a boot ROM download mode, ...). Every NAND operation
//! is expressed as a command list for the controller's DMA engine; the
//! executor interprets that list one descriptor at a time over the remote
//! channel.
//!
//! The layers, leaves first:
//!
//! - [`remote`] - the remote memory channel trait consumed by everything else
//! - [`arena`] - bump-allocated scratch memory mirrored to the target
//! - [`dmov`] - descriptors, command lists and the executor
//! - [`nand`] - register map, geometry table, configuration and the flash
//!   controller operations
//! - [`partition`] - partition tables and bad-block aware partition I/O
//! - [`driver`] - the driver context tying the above together
//!
//! # Features
//!
//! - `std` - Enable standard library support (error trait impls, TOML
//!   partition tables)
//!
//! # Example
//!
//! ```ignore
//! use msmnand_core::driver::{DriverConfig, NandDriver};
//!
//! fn dump_info<C: msmnand_core::remote::RemoteMemory>(chan: C) -> msmnand_core::Result<()> {
//!     let mut driver = NandDriver::new(chan, DriverConfig::default())?;
//!     let info = driver.probe()?;
//!     println!("NAND id {:#010x}, {} blocks", info.id, info.num_blocks);
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod arena;
pub mod dmov;
pub mod driver;
pub mod error;
pub mod nand;
pub mod partition;
pub mod remote;

pub use error::{Error, Result};
