//! NAND controller register map and command codes

/// Controller register block base
pub const NAND_BASE: u32 = 0xA0A0_0000;

/// Command FIFO port (command, address 0, address 1, chip select)
pub const FLASH_CMD: u32 = NAND_BASE;
/// Row/column address, low word
pub const FLASH_ADDR0: u32 = NAND_BASE + 0x04;
/// Address, high byte
pub const FLASH_ADDR1: u32 = NAND_BASE + 0x08;
/// Chip select
pub const FLASH_CHIP_SELECT: u32 = NAND_BASE + 0x0C;
/// Writing 1 starts the queued command
pub const EXEC_CMD: u32 = NAND_BASE + 0x10;
/// Operation status
pub const FLASH_STATUS: u32 = NAND_BASE + 0x14;
/// Buffer/ECC status
pub const BUFFER_STATUS: u32 = NAND_BASE + 0x18;
/// Device 0 configuration word 0
pub const DEV0_CFG0: u32 = NAND_BASE + 0x20;
/// Device 0 configuration word 1
pub const DEV0_CFG1: u32 = NAND_BASE + 0x24;
/// Latched device ID after a fetch-ID command
pub const READ_ID: u32 = NAND_BASE + 0x40;
/// Device status byte latch
pub const READ_STATUS: u32 = NAND_BASE + 0x44;
/// Serial flash burst configuration
pub const SFLASHC_BURST_CFG: u32 = NAND_BASE + 0xE0;
/// ECC buffer configuration
pub const EBI2_ECC_BUF_CFG: u32 = NAND_BASE + 0xF0;
/// Start of the codeword buffer window
pub const FLASH_BUFFER: u32 = NAND_BASE + 0x100;
/// Size of the codeword buffer window
pub const FLASH_BUFFER_SIZE: u32 = 0x2_0000;

/// Read one codeword with ECC disabled
pub const CMD_PAGE_READ: u32 = 0x32;
/// Read every codeword of a page
pub const CMD_PAGE_READ_ALL: u32 = 0x34;
/// Program every codeword of a page
pub const CMD_PRG_PAGE_ALL: u32 = 0x39;
/// Erase the block containing the addressed page
pub const CMD_BLOCK_ERASE: u32 = 0x3A;
/// Fetch the four-byte device ID
pub const CMD_FETCH_ID: u32 = 0x0B;

/// Low nibble of FLASH_STATUS is the controller state; zero is idle
pub const STATUS_BUSY_MASK: u32 = 0x0F;
/// Operation error
pub const STATUS_OP_ERROR: u32 = 0x10;
/// Operation completed successfully (program/erase)
pub const STATUS_SUCCESS: u32 = 0x80;
/// MPU protection violation
pub const STATUS_MPU_ERROR: u32 = 0x100;

/// CFG0 used for raw single-codeword reads (bad-block marker checks)
pub const CFG0_RAW: u32 = 0xA804_20C0;
/// CFG1 used for raw access: ECC disabled, 8-bit bus
pub const CFG1_RAW: u32 = 0x0005_045D;
/// CFG0 loaded for the fetch-ID command
pub const CFG0_FETCH_ID: u32 = 0xAAD4_0000;
/// ECC buffer configuration word used for page I/O
pub const ECC_BUF_CFG: u32 = 0x1FF;
/// FLASH_STATUS clear value written after each programmed codeword
pub const CLEAR_FLASH_STATUS: u32 = 0x20;
/// READ_STATUS clear value written after each programmed codeword
pub const CLEAR_READ_STATUS: u32 = 0xC0;
/// Chip select word for device 0 with DMA enabled
pub const CHIP_SELECT_DEV0: u32 = 4;
/// EXEC_CMD value that starts the queued command
pub const EXEC_GO: u32 = 1;

/// Field shift of "codewords per page minus one" in CFG0
pub const CFG0_CW_SHIFT: u32 = 6;
/// Field mask of "codewords per page minus one" in CFG0
pub const CFG0_CW_MASK: u32 = 7 << CFG0_CW_SHIFT;
/// CFG1: ECC disabled
pub const CFG1_ECC_DISABLE: u32 = 1 << 0;
/// CFG1: 16-bit bus
pub const CFG1_WIDE_FLASH: u32 = 1 << 1;

/// Writes that lift the memory protection in front of the controller
///
/// Each pair is (register, value); they are issued once, before the first
/// probe.
pub const UNLOCK_WRITES: &[(u32, u32)] = &[
    (0xA825_0800, 0),
    (0xA824_0800, 0),
    (0xA0B0_0000, 0),
];
