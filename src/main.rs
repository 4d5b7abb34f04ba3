//! msmnand - MSM NAND flash programmer
//!
//! Reads, writes and erases the NAND behind a Qualcomm MSM controller from
//! a host that can only peek and poke the target's memory.
//!
//! # Architecture
//!
//! A programmer provides the remote memory channel; `msmnand-core` turns
//! every NAND operation into a DMA command list and interprets it over that
//! channel. Partitions come from a TOML table or from `--start/--length`.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::Probe { programmer, driver } => commands::run_probe(&programmer, &driver),
        Commands::Info { programmer, driver } => commands::run_info(&programmer, &driver),
        Commands::Read {
            programmer,
            output,
            offset,
            size,
            extra,
            partition,
            driver,
        } => {
            let mut drv = commands::open_driver(&programmer, &driver, false)?;
            let ptn = commands::resolve_partition(&mut drv, &partition, false)?;
            commands::run_read(&mut drv, &ptn, offset, size, extra, &output)
        }
        Commands::Write {
            programmer,
            input,
            extra,
            pad,
            verify,
            partition,
            driver,
        } => {
            let mut drv = commands::open_driver(&programmer, &driver, verify)?;
            let ptn = commands::resolve_partition(&mut drv, &partition, false)?;
            commands::run_write(&mut drv, &ptn, extra, pad, &input)
        }
        Commands::Erase {
            programmer,
            partition,
            driver,
        } => {
            let mut drv = commands::open_driver(&programmer, &driver, false)?;
            let ptn = commands::resolve_partition(&mut drv, &partition, false)?;
            commands::run_erase(&mut drv, &ptn)
        }
        Commands::ReadPage {
            programmer,
            page,
            spare,
            driver,
        } => {
            let mut drv = commands::open_driver(&programmer, &driver, false)?;
            commands::run_read_page(&mut drv, page, spare)
        }
        Commands::Scan {
            programmer,
            partition,
            driver,
        } => {
            let mut drv = commands::open_driver(&programmer, &driver, false)?;
            let ptn = commands::resolve_partition(&mut drv, &partition, true)?;
            commands::run_scan(&mut drv, &ptn)
        }
        Commands::Partitions { file, blocks } => commands::run_partitions(&file, blocks),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
