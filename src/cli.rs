//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "msmnand")]
#[command(author, version, about = "MSM NAND flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Partition selection shared across commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PartitionArgs {
    /// Partition table file (TOML format)
    #[arg(long)]
    pub partitions: Option<PathBuf>,

    /// Partition name (requires --partitions)
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// First block of an ad-hoc partition (hex or decimal)
    #[arg(long, value_parser = parse_hex_u32, conflicts_with = "name")]
    pub start: Option<u32>,

    /// Number of blocks of an ad-hoc partition (hex or decimal)
    #[arg(long, value_parser = parse_hex_u32, conflicts_with = "name")]
    pub length: Option<u32>,

    /// Type of an ad-hoc partition
    #[arg(long = "type", value_enum, default_value_t = PartitionKind::Apps)]
    pub kind: PartitionKind,
}

/// Partition type as given on the command line
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionKind {
    /// Applications processor partition
    #[default]
    Apps,
    /// Modem partition
    Modem,
}

/// Driver tuning shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DriverArgs {
    /// Status polls before a command list gives up
    #[arg(long, default_value_t = 1000)]
    pub poll_limit: u32,

    /// Keep interpreting command lists after a failed remote access
    #[arg(long)]
    pub keep_going: bool,

    /// Target address of the scratch RAM (hex or decimal)
    #[arg(long, value_parser = parse_hex_u32, default_value = "0x80000000")]
    pub scratch_base: u32,

    /// Scratch RAM size in bytes (hex or decimal)
    #[arg(long, value_parser = parse_hex_u32, default_value = "8192")]
    pub scratch_size: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe for the NAND device
    Probe {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Show device and controller information
    Info {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Read a partition to a file
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Logical byte offset into the partition (a multiple of the page size)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Number of bytes to read (defaults to the whole partition)
        #[arg(long, value_parser = parse_hex_u32)]
        size: Option<u32>,

        /// Spare bytes to append after each page
        #[arg(long, default_value_t = 0)]
        extra: u32,

        #[command(flatten)]
        partition: PartitionArgs,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Write a file to a partition
    Write {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Spare bytes following each page in the image
        #[arg(long, default_value_t = 0)]
        extra: u32,

        /// Pad a short final page with 0xFF
        #[arg(long)]
        pad: bool,

        /// Read back and compare every programmed page
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        partition: PartitionArgs,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Erase a partition
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(flatten)]
        partition: PartitionArgs,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Dump one physical page
    ReadPage {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Page number (hex or decimal)
        #[arg(value_parser = parse_hex_u32)]
        page: u32,

        /// Spare bytes to dump after the page data
        #[arg(long, default_value_t = 0)]
        spare: u32,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Scan a block range for bad blocks
    Scan {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(flatten)]
        partition: PartitionArgs,

        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Show a partition table file
    Partitions {
        /// Partition table file (TOML format)
        #[arg(short, long)]
        file: PathBuf,

        /// Check against a device of this many blocks
        #[arg(long)]
        blocks: Option<u32>,
    },

    /// List supported programmers
    ListProgrammers,

    /// List supported NAND devices
    ListDevices,
}
