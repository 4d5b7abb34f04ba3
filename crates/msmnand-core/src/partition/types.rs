//! Partition table types

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::Error;
use crate::nand::PAGES_PER_BLOCK;

/// Kind of data a partition holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum PartitionType {
    /// Applications processor data (boot images, file systems)
    #[default]
    Apps,
    /// Modem processor data; never written from the host
    Modem,
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apps => write!(f, "apps"),
            Self::Modem => write!(f, "modem"),
        }
    }
}

/// A named run of erase blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Partition name
    pub name: String,
    /// First block
    pub start: u32,
    /// Number of blocks
    pub length: u32,
    /// Partition type
    pub kind: PartitionType,
}

impl PartitionEntry {
    /// Create a new partition entry
    pub fn new(name: impl Into<String>, start: u32, length: u32, kind: PartitionType) -> Self {
        Self {
            name: name.into(),
            start,
            length,
            kind,
        }
    }

    /// One past the last block (saturates at `u32::MAX`)
    pub fn end_block(&self) -> u32 {
        self.start.checked_add(self.length).unwrap_or(u32::MAX)
    }

    /// First page (saturates at `u32::MAX`)
    pub fn first_page(&self) -> u32 {
        self.start.checked_mul(PAGES_PER_BLOCK).unwrap_or(u32::MAX)
    }

    /// One past the last page (saturates at `u32::MAX`)
    pub fn end_page(&self) -> u32 {
        self.end_block().checked_mul(PAGES_PER_BLOCK).unwrap_or(u32::MAX)
    }

    /// Check that the partition is non-empty and lies inside a device of
    /// `num_blocks` blocks
    ///
    /// Every page helper is exact once this passes.
    pub fn check_bounds(&self, num_blocks: u32) -> Result<(), Error> {
        if self.length == 0 {
            return Err(Error::AddressOutOfBounds);
        }
        match self.start.checked_add(self.length) {
            Some(end) if end <= num_blocks && end.checked_mul(PAGES_PER_BLOCK).is_some() => Ok(()),
            _ => Err(Error::AddressOutOfBounds),
        }
    }

    /// Check if this partition overlaps with another
    pub fn overlaps(&self, other: &PartitionEntry) -> bool {
        self.start < other.end_block() && other.start < self.end_block()
    }
}

/// Partition table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionTableError {
    /// Partition table file could not be parsed
    ParseError,
    /// Partition table file could not be read
    IoError,
    /// A partition has zero length
    EmptyPartition,
    /// A partition extends past the device
    OutOfBounds,
    /// Two partitions share blocks
    Overlapping,
    /// Two partitions share a name
    DuplicateName,
}

impl fmt::Display for PartitionTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError => write!(f, "failed to parse partition table"),
            Self::IoError => write!(f, "failed to read partition table"),
            Self::EmptyPartition => write!(f, "partition has zero length"),
            Self::OutOfBounds => write!(f, "partition extends past the end of the device"),
            Self::Overlapping => write!(f, "partitions overlap"),
            Self::DuplicateName => write!(f, "duplicate partition name"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PartitionTableError {}

impl From<PartitionTableError> for Error {
    fn from(_: PartitionTableError) -> Self {
        Error::PartitionTableInvalid
    }
}

/// Ordered set of partitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    entries: Vec<PartitionEntry>,
}

impl PartitionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a partition
    ///
    /// Entries are not checked against each other or the device here; call
    /// [`validate`](Self::validate) once the table is complete.
    pub fn add(&mut self, entry: PartitionEntry) {
        self.entries.push(entry);
    }

    /// Find a partition by name
    pub fn find(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Iterate partitions in table order
    pub fn iter(&self) -> impl Iterator<Item = &PartitionEntry> {
        self.entries.iter()
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no partitions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort partitions by start block
    pub fn sort_by_start(&mut self) {
        self.entries.sort_by_key(|p| p.start);
    }

    /// Validate against a device of `num_blocks` blocks
    pub fn validate(&self, num_blocks: u32) -> Result<(), PartitionTableError> {
        for p in &self.entries {
            if p.length == 0 {
                return Err(PartitionTableError::EmptyPartition);
            }
            if p.start.checked_add(p.length).map_or(true, |end| end > num_blocks) {
                return Err(PartitionTableError::OutOfBounds);
            }
        }

        for (i, a) in self.entries.iter().enumerate() {
            for b in self.entries.iter().skip(i + 1) {
                if a.overlaps(b) {
                    return Err(PartitionTableError::Overlapping);
                }
                if a.name == b.name {
                    return Err(PartitionTableError::DuplicateName);
                }
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a PartitionTable {
    type Item = &'a PartitionEntry;
    type IntoIter = core::slice::Iter<'a, PartitionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PartitionTable {
        let mut t = PartitionTable::new();
        t.add(PartitionEntry::new("boot", 10, 5, PartitionType::Apps));
        t.add(PartitionEntry::new("system", 15, 85, PartitionType::Apps));
        t.add(PartitionEntry::new("modem", 100, 20, PartitionType::Modem));
        t
    }

    #[test]
    fn test_entry_pages() {
        let p = PartitionEntry::new("boot", 10, 5, PartitionType::Apps);
        assert_eq!(p.first_page(), 640);
        assert_eq!(p.end_page(), 960);
        assert_eq!(p.end_block(), 15);
    }

    #[test]
    fn test_check_bounds() {
        let p = PartitionEntry::new("boot", 10, 5, PartitionType::Apps);
        assert_eq!(p.check_bounds(15), Ok(()));
        assert_eq!(p.check_bounds(14), Err(Error::AddressOutOfBounds));

        let empty = PartitionEntry::new("empty", 3, 0, PartitionType::Apps);
        assert_eq!(empty.check_bounds(2048), Err(Error::AddressOutOfBounds));

        let far = PartitionEntry::new("far", 1 << 26, 1, PartitionType::Apps);
        assert_eq!(far.check_bounds(u32::MAX), Err(Error::AddressOutOfBounds));
        assert_eq!(far.first_page(), u32::MAX);

        let wrap = PartitionEntry::new("wrap", u32::MAX, 2, PartitionType::Apps);
        assert_eq!(wrap.check_bounds(u32::MAX), Err(Error::AddressOutOfBounds));
        assert_eq!(wrap.end_block(), u32::MAX);
    }

    #[test]
    fn test_find() {
        let t = table();
        assert_eq!(t.find("system").unwrap().start, 15);
        assert!(t.find("cache").is_none());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_validate() {
        let t = table();
        assert!(t.validate(2048).is_ok());
        assert_eq!(t.validate(110), Err(PartitionTableError::OutOfBounds));
    }

    #[test]
    fn test_validate_overlap_and_duplicates() {
        let mut t = table();
        t.add(PartitionEntry::new("cache", 14, 2, PartitionType::Apps));
        assert_eq!(t.validate(2048), Err(PartitionTableError::Overlapping));

        let mut t = table();
        t.add(PartitionEntry::new("boot", 200, 2, PartitionType::Apps));
        assert_eq!(t.validate(2048), Err(PartitionTableError::DuplicateName));

        let mut t = PartitionTable::new();
        t.add(PartitionEntry::new("empty", 0, 0, PartitionType::Apps));
        assert_eq!(t.validate(2048), Err(PartitionTableError::EmptyPartition));
    }
}
