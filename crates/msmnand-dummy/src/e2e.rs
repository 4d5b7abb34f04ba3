//! Driver tests against the emulated controller

use alloc::vec;
use alloc::vec::Vec;

use msmnand_core::driver::{DriverConfig, NandDriver};
use msmnand_core::error::Error;
use msmnand_core::nand::{regs, FlashType, WriteMode};
use msmnand_core::partition::{PartitionEntry, PartitionTable, PartitionType};
use msmnand_core::remote::{RemoteMemory, TransportPolicy};

use super::*;

const PAGE: usize = 2048;
const OOB: usize = 16;

fn driver(nand: DummyNand) -> NandDriver<DummyNand> {
    NandDriver::new(nand, DriverConfig::default()).unwrap()
}

fn probed(nand: DummyNand) -> NandDriver<DummyNand> {
    let mut drv = driver(nand);
    drv.probe().unwrap();
    drv
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
}

fn boot() -> PartitionEntry {
    PartitionEntry::new("boot", 1, 4, PartitionType::Apps)
}

#[test]
fn test_probe_samsung_2k() {
    let mut drv = driver(DummyNand::new_default());
    let info = drv.probe().unwrap();
    assert_eq!(info.id, 0x1500_aaec);
    assert_eq!(info.vendor, 0xEC);
    assert_eq!(info.flash_type, FlashType::Nand8);
    assert_eq!(info.page_size, 2048);
    assert_eq!(info.block_size, 128 * 1024);
    assert_eq!(info.spare_size, 64);
    assert_eq!(info.num_blocks, 2048);
    assert!(info.recognized);

    let cfg = drv.flash().config().unwrap();
    assert_eq!(cfg.cfg1, 0x0004_745C);
    assert_eq!(drv.flash().layout().unwrap().oob_avail(), 16);
}

#[test]
fn test_probe_unknown_id_falls_back() {
    let nand = DummyNand::new(DummyConfig {
        id: 0x1234_5678,
        ..DummyConfig::default()
    });
    let mut drv = driver(nand);
    let info = drv.probe().unwrap();
    assert!(!info.recognized);
    assert_eq!(info.flash_type, FlashType::Nand8);
    assert_eq!(info.page_size, 2048);
}

#[test]
fn test_unlock_writes_issued_once() {
    let mut drv = probed(DummyNand::new_default());
    for &(addr, value) in regs::UNLOCK_WRITES {
        assert_eq!(drv.channel().misc_register(addr), Some(value));
    }

    drv.channel_mut().write_word(0xA0B0_0000, 0x55).unwrap();
    drv.initialize().unwrap();
    drv.probe().unwrap();
    assert_eq!(drv.channel().misc_register(0xA0B0_0000), Some(0x55));
}

#[test]
fn test_operations_need_probe() {
    let mut drv = driver(DummyNand::new_default());
    let mut data = vec![0u8; PAGE];
    assert_eq!(drv.info().unwrap_err(), Error::NotProbed);
    assert_eq!(
        drv.read_page(0, &mut data, &mut []).unwrap_err(),
        Error::NotProbed
    );
    assert_eq!(drv.erase(&boot()).unwrap_err(), Error::NotProbed);
}

#[test]
fn test_factory_bad_block() {
    let mut nand = DummyNand::new_default();
    nand.mark_factory_bad(3);
    let mut drv = probed(nand);

    assert!(!drv.is_block_bad(0).unwrap());
    assert!(drv.is_block_bad(3 * 64).unwrap());
    assert!(drv.is_block_bad(3 * 64 + 5).unwrap());
    assert_eq!(
        drv.erase_block(3 * 64).unwrap_err(),
        Error::BadBlock { block: 3 }
    );
    // Bad blocks are never erased
    assert!(drv.channel().erases().is_empty());
}

#[test]
fn test_erase_block_alignment() {
    let mut drv = probed(DummyNand::new_default());
    assert_eq!(drv.erase_block(1).unwrap_err(), Error::InvalidAlignment);
    assert_eq!(drv.erase_block(63).unwrap_err(), Error::InvalidAlignment);
    drv.erase_block(64).unwrap();
    assert_eq!(drv.channel().erases(), &[1]);
}

#[test]
fn test_page_out_of_range() {
    let mut drv = probed(DummyNand::new_default());
    let mut data = vec![0u8; PAGE];
    assert_eq!(
        drv.read_page(2048 * 64, &mut data, &mut []).unwrap_err(),
        Error::AddressOutOfBounds
    );
}

#[test]
fn test_ecc_page_round_trip() {
    let mut drv = probed(DummyNand::new_default());
    let data = pattern(PAGE, 3);
    let spare = pattern(OOB, 0x40);
    drv.write_page(65, &data, &spare, WriteMode::Ecc).unwrap();

    let mut back = vec![0u8; PAGE];
    let mut spare_back = vec![0u8; OOB];
    drv.read_page(65, &mut back, &mut spare_back).unwrap();
    assert_eq!(back, data);
    assert_eq!(spare_back, spare);

    assert_eq!(drv.channel().page_data(65), data);
    assert_eq!(drv.channel().page_spare(65), spare);
    assert_eq!(drv.channel().programs(), 4);
}

#[test]
fn test_short_spare_is_padded() {
    let mut drv = probed(DummyNand::new_default());
    let data = pattern(PAGE, 9);
    drv.write_page(70, &data, &[1, 2], WriteMode::Ecc).unwrap();
    let spare = drv.channel().page_spare(70);
    assert_eq!(&spare[..2], &[1, 2]);
    assert!(spare[2..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_page_length_checks() {
    let mut drv = probed(DummyNand::new_default());
    let mut short = vec![0u8; PAGE - 1];
    assert_eq!(
        drv.read_page(0, &mut short, &mut []).unwrap_err(),
        Error::InvalidLength
    );
    let data = vec![0u8; PAGE];
    assert_eq!(
        drv.write_page(0, &data, &[0u8; OOB + 1], WriteMode::Ecc)
            .unwrap_err(),
        Error::InvalidLength
    );
    assert_eq!(
        drv.write_page(0, &data, &[], WriteMode::Raw).unwrap_err(),
        Error::InvalidLength
    );
}

#[test]
fn test_zero_page_keeps_marker() {
    let mut drv = probed(DummyNand::new_default());
    let zeros = vec![0u8; PAGE];
    drv.write_page(64, &zeros, &[0u8; OOB], WriteMode::Ecc).unwrap();
    assert!(!drv.is_block_bad(64).unwrap());

    let mut back = vec![0xAAu8; PAGE];
    drv.read_page(64, &mut back, &mut []).unwrap();
    assert_eq!(back, zeros);
}

#[test]
fn test_mark_bad_block() {
    let mut drv = probed(DummyNand::new_default());
    drv.mark_bad_block(2 * 64 + 10).unwrap();
    assert!(drv.is_block_bad(2 * 64).unwrap());
    assert!(drv.channel().raw_page(128).iter().all(|&b| b == 0));
    assert!(drv.channel().is_erased(129));
}

#[test]
fn test_program_failure_status() {
    let mut nand = DummyNand::new_default();
    nand.fail_program(10);
    let mut drv = probed(nand);
    let data = pattern(PAGE, 1);
    assert_eq!(
        drv.write_page(10, &data, &[], WriteMode::Ecc).unwrap_err(),
        Error::OperationFailed {
            page: 10,
            status: regs::STATUS_OP_ERROR
        }
    );
}

#[test]
fn test_protected_block() {
    let mut nand = DummyNand::new_default();
    nand.protect_block(2);
    let mut drv = probed(nand);
    assert_eq!(
        drv.erase_block(128).unwrap_err(),
        Error::EraseFailed {
            page: 128,
            status: regs::STATUS_MPU_ERROR
        }
    );
    let data = pattern(PAGE, 1);
    assert_eq!(
        drv.write_page(130, &data, &[], WriteMode::Ecc).unwrap_err(),
        Error::ProtectionViolation {
            page: 130,
            status: regs::STATUS_MPU_ERROR
        }
    );
}

#[test]
fn test_verify_writes() {
    let config = DriverConfig {
        verify_writes: true,
        ..DriverConfig::default()
    };
    let mut drv = NandDriver::new(DummyNand::new_default(), config).unwrap();
    drv.probe().unwrap();

    let zeros = vec![0u8; PAGE];
    drv.write_page(70, &zeros, &[], WriteMode::Ecc).unwrap();
    // Programming cannot raise bits, so the read-back differs
    let ones = vec![0xFFu8; PAGE];
    assert_eq!(
        drv.write_page(70, &ones, &[], WriteMode::Ecc).unwrap_err(),
        Error::VerifyFailed { page: 70 }
    );
}

#[test]
fn test_partition_write_read_and_tail_erase() {
    let mut drv = probed(DummyNand::new_default());
    let ptn = boot();
    let image = pattern(3 * (PAGE + OOB), 5);

    let stats = drv.write(&ptn, OOB as u32, &image).unwrap();
    assert_eq!(stats.pages_written, 3);
    assert_eq!(stats.blocks_erased, 4);
    assert_eq!(stats.blocks_marked_bad, 0);
    assert_eq!(drv.channel().erases(), &[1, 2, 3, 4]);

    let mut out = vec![0u8; image.len()];
    let rs = drv.read_extended(&ptn, OOB as u32, 0, &mut out).unwrap();
    assert_eq!(rs.pages_read, 3);
    assert_eq!(rs.errors, 0);
    assert_eq!(out, image);

    assert_eq!(drv.channel().page_data(64), &image[..PAGE]);
    assert_eq!(drv.channel().page_spare(64), &image[PAGE..PAGE + OOB]);

    // Everything after the image up to the partition end is erased
    assert!((67..ptn.end_page()).all(|p| drv.channel().is_erased(p)));
    let mut tail = vec![0u8; PAGE];
    drv.read_extended(&ptn, 0, 4 * 64 * PAGE as u32 - PAGE as u32, &mut tail)
        .unwrap();
    assert!(tail.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_partition_write_relocates_after_program_failure() {
    let mut nand = DummyNand::new_default();
    nand.fail_program(65);
    let mut drv = probed(nand);
    let ptn = boot();
    let image = pattern(3 * PAGE, 11);

    let stats = drv.write(&ptn, 0, &image).unwrap();
    assert_eq!(stats.pages_written, 3);
    assert_eq!(stats.blocks_marked_bad, 1);
    assert!(drv.is_block_bad(64).unwrap());
    assert_eq!(drv.channel().page_data(128), &image[..PAGE]);
    assert_eq!(drv.channel().page_data(130), &image[2 * PAGE..]);

    let mut out = vec![0u8; image.len()];
    let rs = drv.read_extended(&ptn, 0, 0, &mut out).unwrap();
    assert_eq!(out, image);
    assert_eq!(rs.errors, 1);

    // Block 1 holds nothing but the bad-block mark
    let nand = drv.channel();
    assert!(nand.raw_page(64).iter().all(|&b| b == 0x00 || b == 0xFF));
    assert!((65..128).all(|p| nand.is_erased(p)));
    assert_eq!(nand.erases(), &[1, 1, 2, 3, 4]);

    // No other block was marked or written
    assert!((0..64).all(|p| nand.is_erased(p)));
    assert!((131..ptn.end_page()).all(|p| nand.is_erased(p)));
    let bad: Vec<u32> = (0..8)
        .filter(|b| drv.is_block_bad(b * 64).unwrap())
        .collect();
    assert_eq!(bad, [1]);
}

#[test]
fn test_partition_skips_factory_bad_block() {
    let mut nand = DummyNand::new_default();
    nand.mark_factory_bad(1);
    let mut drv = probed(nand);
    let ptn = boot();
    let image = pattern(2 * PAGE, 21);

    let stats = drv.write(&ptn, 0, &image).unwrap();
    assert_eq!(stats.blocks_skipped, 1);
    assert_eq!(drv.channel().page_data(128), &image[..PAGE]);
    assert!(!drv.channel().erases().contains(&1));

    // Logical page 1 lives on physical page 129
    let mut out = vec![0u8; PAGE];
    drv.read_extended(&ptn, 0, PAGE as u32, &mut out).unwrap();
    assert_eq!(out, &image[PAGE..]);
}

#[test]
fn test_partition_out_of_good_blocks() {
    let mut nand = DummyNand::new_default();
    nand.mark_factory_bad(5);
    let mut drv = probed(nand);
    let ptn = PartitionEntry::new("tiny", 5, 1, PartitionType::Apps);

    let mut out = vec![0u8; PAGE];
    assert_eq!(
        drv.read_extended(&ptn, 0, 0, &mut out).unwrap_err(),
        Error::CapacityExceeded
    );
    assert_eq!(
        drv.write(&ptn, 0, &vec![0u8; PAGE]).unwrap_err(),
        Error::CapacityExceeded
    );
}

#[test]
fn test_partition_read_ends_exactly_at_partition_end() {
    let mut drv = probed(DummyNand::new_default());
    let ptn = PartitionEntry::new("one", 6, 1, PartitionType::Apps);
    let mut out = vec![0u8; 64 * PAGE];
    let rs = drv.read_extended(&ptn, 0, 0, &mut out).unwrap();
    assert_eq!(rs.pages_read, 64);
    assert!(out.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_partition_erase_counts() {
    let mut nand = DummyNand::new_default();
    nand.mark_factory_bad(2);
    nand.fail_erase(4);
    let mut drv = probed(nand);
    let stats = drv.erase(&boot()).unwrap();
    assert_eq!(stats.blocks_erased, 2);
    assert_eq!(stats.blocks_skipped, 2);
    assert_eq!(drv.channel().erases(), &[1, 3]);
}

#[test]
fn test_partition_outside_device_rejected() {
    let mut drv = probed(DummyNand::new_default());
    let far = PartitionEntry::new("far", 1 << 26, 1, PartitionType::Apps);
    let past_end = PartitionEntry::new("past", 2047, 2, PartitionType::Apps);
    let empty = PartitionEntry::new("empty", 1, 0, PartitionType::Apps);

    for ptn in [&far, &past_end, &empty] {
        assert_eq!(drv.erase(ptn).unwrap_err(), Error::AddressOutOfBounds);
        let mut out = vec![0u8; PAGE];
        assert_eq!(
            drv.read_extended(ptn, 0, 0, &mut out).unwrap_err(),
            Error::AddressOutOfBounds
        );
        assert_eq!(
            drv.write(ptn, 0, &vec![0u8; PAGE]).unwrap_err(),
            Error::AddressOutOfBounds
        );
    }
    assert!(drv.channel().erases().is_empty());
    assert_eq!(drv.channel().programs(), 0);
}

#[test]
fn test_modem_partition_write_refused() {
    let mut drv = probed(DummyNand::new_default());
    let ptn = PartitionEntry::new("modem", 1, 2, PartitionType::Modem);
    assert_eq!(
        drv.write(&ptn, 0, &vec![0u8; PAGE]).unwrap_err(),
        Error::UnsupportedPartition
    );
    assert!(drv.channel().erases().is_empty());
}

#[test]
fn test_partition_table_set_once() {
    let mut drv = probed(DummyNand::new_default());
    let mut table = PartitionTable::new();
    table.add(boot());
    drv.set_partition_table(table.clone()).unwrap();
    assert_eq!(drv.find_partition("boot").unwrap().start, 1);
    assert_eq!(
        drv.find_partition("system").unwrap_err(),
        Error::PartitionNotFound
    );
    assert_eq!(
        drv.set_partition_table(table).unwrap_err(),
        Error::PartitionTableAlreadySet
    );
}

#[test]
fn test_partition_table_validated_against_device() {
    let mut drv = probed(DummyNand::new_default());
    let mut table = PartitionTable::new();
    table.add(PartitionEntry::new("huge", 2000, 100, PartitionType::Apps));
    assert_eq!(
        drv.set_partition_table(table).unwrap_err(),
        Error::PartitionTableInvalid
    );
    assert!(drv.partition_table().is_none());
}

#[test]
fn test_transport_failure_aborts() {
    let mut nand = DummyNand::new_default();
    nand.fail_address(regs::SFLASHC_BURST_CFG);
    let mut drv = driver(nand);
    assert_eq!(
        drv.probe().unwrap_err(),
        Error::Transport {
            addr: regs::SFLASHC_BURST_CFG,
            status: INJECTED_FAULT
        }
    );
    // The fetch-ID command never ran
    assert_eq!(drv.channel_mut().read_word(regs::READ_ID).unwrap(), 0);
}

#[test]
fn test_transport_failure_log_and_continue() {
    let mut nand = DummyNand::new_default();
    nand.fail_address(regs::SFLASHC_BURST_CFG);
    let config = DriverConfig {
        policy: TransportPolicy::LogAndContinue,
        ..DriverConfig::default()
    };
    let mut drv = NandDriver::new(nand, config).unwrap();
    assert_eq!(
        drv.probe().unwrap_err(),
        Error::Transport {
            addr: regs::SFLASHC_BURST_CFG,
            status: INJECTED_FAULT
        }
    );
    // The rest of the list still ran
    assert_eq!(
        drv.channel_mut().read_word(regs::READ_ID).unwrap(),
        0x1500_aaec
    );

    drv.channel_mut().clear_faults();
    assert_eq!(drv.probe().unwrap().id, 0x1500_aaec);
}

#[test]
fn test_status_poll_timeout() {
    let mut nand = DummyNand::new_default();
    nand.stall_status(true);
    let config = DriverConfig {
        poll_limit: 5,
        ..DriverConfig::default()
    };
    let mut drv = NandDriver::new(nand, config).unwrap();
    assert_eq!(
        drv.probe().unwrap_err(),
        Error::Timeout {
            addr: regs::FLASH_STATUS
        }
    );
}

#[test]
fn test_list_pushed_and_pulled_once() {
    let mut drv = probed(DummyNand::new_default());
    drv.channel_mut().reset_stats();
    drv.is_block_bad(0).unwrap();
    let stats = drv.channel().stats();
    // Writes: arena push, CFG0/CFG1 stream, status latch, marker stream
    assert_eq!(stats.block_writes, 4);
    // Reads: CFG0/CFG1 stream, marker stream, arena pull
    assert_eq!(stats.block_reads, 3);
}

#[test]
fn test_wide_device() {
    let mut nand = DummyNand::new(DummyConfig::for_id(0x5500_baec));
    assert!(nand.config().wide);
    nand.mark_factory_bad(2);
    let mut drv = probed(nand);

    let info = drv.info().unwrap();
    assert_eq!(info.flash_type, FlashType::Nand16);
    assert_eq!(drv.flash().config().unwrap().cfg1 & regs::CFG1_WIDE_FLASH, 2);

    assert!(drv.is_block_bad(128).unwrap());
    assert!(!drv.is_block_bad(64).unwrap());

    let data = pattern(PAGE, 77);
    let spare = pattern(OOB, 1);
    drv.write_page(64, &data, &spare, WriteMode::Ecc).unwrap();
    assert!(!drv.is_block_bad(64).unwrap());
    let mut back = vec![0u8; PAGE];
    let mut spare_back = vec![0u8; OOB];
    drv.read_page(64, &mut back, &mut spare_back).unwrap();
    assert_eq!(back, data);
    assert_eq!(spare_back, spare);
}
