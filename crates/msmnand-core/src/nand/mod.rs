//! MSM NAND controller
//!
//! Register map, the supported device table, configuration derivation and
//! the per-operation command list builders.

pub mod config;
mod controller;
mod device;
pub mod geometry;
pub mod info;
pub mod regs;

pub use config::{FlashConfig, PageLayout};
pub use controller::{NandFlash, WriteMode};
pub use device::PageDevice;
pub use geometry::{BusWidth, FlashGeometry, PAGES_PER_BLOCK};
pub use info::{FlashInfo, FlashType};
