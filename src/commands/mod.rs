//! CLI command implementations
//!
//! Every device command opens a programmer, wraps it in a [`NandDriver`]
//! and probes the device before doing anything else.

mod erase;
mod info;
mod list;
mod page;
mod partitions;
mod progress;
mod read;
mod write;

pub use erase::run_erase;
pub use info::{run_info, run_probe};
pub use list::{list_devices, list_programmers};
pub use page::{run_read_page, run_scan};
pub use partitions::run_partitions;
pub use read::run_read;
pub use write::run_write;

use msmnand_core::driver::{DriverConfig, NandDriver};
use msmnand_core::partition::{PartitionEntry, PartitionTable, PartitionType};
use msmnand_core::remote::{RemoteMemory, TransportPolicy};

use crate::cli::{DriverArgs, PartitionArgs, PartitionKind};
use crate::programmers;

/// Result of a command
pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Driver over whichever channel the programmer string selected
pub type Driver = NandDriver<Box<dyn RemoteMemory>>;

/// Open `programmer` and probe the NAND behind it
pub fn open_driver(programmer: &str, args: &DriverArgs, verify: bool) -> CmdResult<Driver> {
    let chan = programmers::open_channel(programmer)?;
    let config = DriverConfig {
        scratch_base: args.scratch_base,
        scratch_size: args.scratch_size,
        poll_limit: args.poll_limit,
        policy: if args.keep_going {
            TransportPolicy::LogAndContinue
        } else {
            TransportPolicy::Abort
        },
        verify_writes: verify,
        ..DriverConfig::default()
    };
    let mut driver = NandDriver::new(chan, config)?;
    driver.probe()?;
    Ok(driver)
}

/// Pick the partition a command operates on
///
/// With `whole_device` set and no selection given, the whole device is
/// used.
pub fn resolve_partition(
    driver: &mut Driver,
    args: &PartitionArgs,
    whole_device: bool,
) -> CmdResult<PartitionEntry> {
    let num_blocks = driver.info()?.num_blocks;

    if let Some(path) = &args.partitions {
        let table = PartitionTable::from_toml_file(path)?;
        driver.set_partition_table(table)?;
        let name = args
            .name
            .as_deref()
            .ok_or("--name is required with --partitions")?;
        return Ok(driver.find_partition(name)?.clone());
    }
    if args.name.is_some() {
        return Err("--name requires --partitions".into());
    }

    let kind = match args.kind {
        PartitionKind::Apps => PartitionType::Apps,
        PartitionKind::Modem => PartitionType::Modem,
    };
    let entry = match (args.start, args.length) {
        (Some(start), Some(length)) => PartitionEntry::new("adhoc", start, length, kind),
        (Some(start), None) => {
            PartitionEntry::new("adhoc", start, num_blocks.saturating_sub(start), kind)
        }
        (None, None) if whole_device => PartitionEntry::new("device", 0, num_blocks, kind),
        _ => return Err("select a partition with --partitions/--name or --start/--length".into()),
    };

    let mut table = PartitionTable::new();
    table.add(entry.clone());
    table.validate(num_blocks)?;
    Ok(entry)
}

/// Format a size in the largest whole binary unit
fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{} GiB", bytes / (1024 * 1024 * 1024))
    } else if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
