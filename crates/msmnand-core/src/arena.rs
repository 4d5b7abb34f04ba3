//! Scratch memory arena
//!
//! A bump allocator over a host-side mirror of a region of target RAM. The
//! executor pushes the whole used prefix to the target before a command
//! list runs and pulls it back afterwards, so command lists, parameter
//! words and page buffers can be built and inspected locally.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Handle to one allocation inside a [`ScratchArena`]
///
/// Handles are only produced by [`ScratchArena::allocate`] (or narrowed with
/// [`ScratchBuf::slice`]), so their range always lies inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchBuf {
    offset: usize,
    len: usize,
}

impl ScratchBuf {
    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the allocation is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the allocation from the arena base
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Narrow the handle to `len` bytes starting `offset` bytes in
    pub fn slice(&self, offset: usize, len: usize) -> Result<ScratchBuf> {
        let end = offset.checked_add(len).ok_or(Error::AddressOutOfBounds)?;
        if end > self.len {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(ScratchBuf {
            offset: self.offset + offset,
            len,
        })
    }
}

/// Bump-allocated mirror of target scratch RAM
#[derive(Debug)]
pub struct ScratchArena {
    mem: Vec<u8>,
    tail: usize,
    remote_base: u32,
}

impl ScratchArena {
    /// Create an arena mirroring `capacity` bytes at `remote_base`
    pub fn new(remote_base: u32, capacity: usize) -> Result<Self> {
        if capacity % 4 != 0 || remote_base % 4 != 0 {
            return Err(Error::InvalidAlignment);
        }
        if u32::try_from(capacity)
            .ok()
            .and_then(|c| remote_base.checked_add(c))
            .is_none()
        {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            mem: vec![0; capacity],
            tail: 0,
            remote_base,
        })
    }

    /// Reserve `size` bytes aligned to `align` (a power of two)
    pub fn allocate(&mut self, align: usize, size: usize) -> Result<ScratchBuf> {
        if align == 0 || !align.is_power_of_two() {
            return Err(Error::InvalidAlignment);
        }
        // Alignment is relative to the remote address, which is what the
        // controller sees.
        let base = self.remote_base as usize;
        let start = (base + self.tail).next_multiple_of(align) - base;
        let end = start.checked_add(size).ok_or(Error::ArenaOverflow)?;
        if end > self.mem.len() {
            log::error!(
                "scratch arena overflow: need {} bytes at +0x{:x}, capacity {}",
                size,
                start,
                self.mem.len()
            );
            return Err(Error::ArenaOverflow);
        }
        self.tail = end;
        Ok(ScratchBuf { offset: start, len: size })
    }

    /// Remote address of the start of `buf`
    pub fn translate(&self, buf: ScratchBuf) -> Result<u32> {
        self.translate_at(buf, 0)
    }

    /// Remote address of byte `offset` within `buf`
    pub fn translate_at(&self, buf: ScratchBuf, offset: usize) -> Result<u32> {
        if offset > buf.len || buf.offset + buf.len > self.mem.len() {
            return Err(Error::AddressOutOfBounds);
        }
        // Capacity was checked against the remote address space in new()
        Ok(self.remote_base + (buf.offset + offset) as u32)
    }

    /// Remote base address of the arena
    pub fn remote_base(&self) -> u32 {
        self.remote_base
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.mem.len()
    }

    /// Bytes handed out so far
    pub fn used(&self) -> usize {
        self.tail
    }

    /// Whether a remote address falls inside the arena
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.remote_base && ((addr - self.remote_base) as usize) < self.mem.len()
    }

    /// Host view of an allocation
    pub fn bytes(&self, buf: ScratchBuf) -> &[u8] {
        &self.mem[buf.offset..buf.offset + buf.len]
    }

    /// Mutable host view of an allocation
    pub fn bytes_mut(&mut self, buf: ScratchBuf) -> &mut [u8] {
        &mut self.mem[buf.offset..buf.offset + buf.len]
    }

    /// Read the little-endian word at word index `idx` of `buf`
    pub fn word(&self, buf: ScratchBuf, idx: usize) -> Result<u32> {
        let bytes = self.bytes(buf);
        let chunk = bytes
            .get(idx * 4..idx * 4 + 4)
            .ok_or(Error::AddressOutOfBounds)?;
        Ok(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    /// Store a little-endian word at word index `idx` of `buf`
    pub fn set_word(&mut self, buf: ScratchBuf, idx: usize, value: u32) -> Result<()> {
        let bytes = self.bytes_mut(buf);
        let chunk = bytes
            .get_mut(idx * 4..idx * 4 + 4)
            .ok_or(Error::AddressOutOfBounds)?;
        chunk.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// The used prefix as words, ready to push to the target
    pub(crate) fn used_words(&self) -> Vec<u32> {
        self.mem[..self.used_len()]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Replace the used prefix with words pulled from the target
    pub(crate) fn load_words(&mut self, words: &[u32]) {
        for (chunk, word) in self.mem.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Used length rounded up to whole words
    pub(crate) fn used_len(&self) -> usize {
        self.tail.next_multiple_of(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_aligns_and_bumps() {
        let mut arena = ScratchArena::new(0x8000_0000, 256).unwrap();
        let a = arena.allocate(4, 6).unwrap();
        let b = arena.allocate(32, 8).unwrap();
        assert_eq!(arena.translate(a).unwrap(), 0x8000_0000);
        assert_eq!(arena.translate(b).unwrap(), 0x8000_0020);
        assert_eq!(arena.used(), 0x28);
    }

    #[test]
    fn test_allocate_overflow() {
        let mut arena = ScratchArena::new(0x8000_0000, 64).unwrap();
        arena.allocate(4, 60).unwrap();
        assert_eq!(arena.allocate(32, 4), Err(Error::ArenaOverflow));
        // The failed allocation must not move the tail
        assert_eq!(arena.used(), 60);
        assert!(arena.allocate(4, 4).is_ok());
    }

    #[test]
    fn test_allocate_rejects_bad_alignment() {
        let mut arena = ScratchArena::new(0x8000_0000, 64).unwrap();
        assert_eq!(arena.allocate(3, 4), Err(Error::InvalidAlignment));
        assert_eq!(arena.allocate(0, 4), Err(Error::InvalidAlignment));
    }

    #[test]
    fn test_translate_bounds() {
        let mut arena = ScratchArena::new(0x8000_0000, 64).unwrap();
        let buf = arena.allocate(4, 16).unwrap();
        assert_eq!(arena.translate_at(buf, 16).unwrap(), 0x8000_0010);
        assert_eq!(arena.translate_at(buf, 17), Err(Error::AddressOutOfBounds));
        assert_eq!(buf.slice(8, 16), Err(Error::AddressOutOfBounds));
        let inner = buf.slice(8, 8).unwrap();
        assert_eq!(arena.translate(inner).unwrap(), 0x8000_0008);
    }

    #[test]
    fn test_words_round_trip_through_mirror() {
        let mut arena = ScratchArena::new(0x8000_0000, 64).unwrap();
        let buf = arena.allocate(4, 8).unwrap();
        arena.set_word(buf, 1, 0xDEAD_BEEF).unwrap();
        assert_eq!(arena.used_words(), [0, 0xDEAD_BEEF]);
        arena.load_words(&[7, 9]);
        assert_eq!(arena.word(buf, 0).unwrap(), 7);
        assert_eq!(arena.bytes(buf)[4], 9);
        assert_eq!(arena.word(buf, 2), Err(Error::AddressOutOfBounds));
    }

    #[test]
    fn test_contains() {
        let arena = ScratchArena::new(0x8000_0000, 64).unwrap();
        assert!(arena.contains(0x8000_003C));
        assert!(!arena.contains(0x8000_0040));
        assert!(!arena.contains(0x7FFF_FFFC));
    }
}
