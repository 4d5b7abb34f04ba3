//! Data mover (DMOV) command lists
//!
//! The NAND controller is normally fed by the MSM data mover, a DMA engine
//! that walks a list of copy descriptors. No DMA engine is available to a
//! remote host, so [`Executor`] interprets the same lists in software, one
//! descriptor at a time, over a [`RemoteMemory`](crate::remote::RemoteMemory)
//! channel.

mod descriptor;
mod executor;

pub use descriptor::{
    CommandList, CommandListBuilder, DescFlags, Descriptor, DmovRecord, TransferMode,
    MAX_DESCRIPTORS,
};
pub use executor::{Executor, ExecutorConfig};
