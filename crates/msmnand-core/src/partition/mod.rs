//! Partitions and partition I/O
//!
//! A partition is a named run of erase blocks. Partition tables can be
//! built in code or loaded from TOML files (with the `std` feature):
//!
//! ```ignore
//! let table = PartitionTable::from_toml_file("partitions.toml")?;
//! let boot = table.find("boot").ok_or(Error::PartitionNotFound)?;
//! ```

mod io;
mod progress;
mod types;

#[cfg(feature = "std")]
mod toml;

pub use io::{erase_partition, read_partition, write_partition};
pub use progress::{EraseStats, NoProgress, Progress, ReadStats, WriteStats};
pub use types::*;

#[cfg(feature = "std")]
pub use self::toml::parse_number;
