//! Remote memory channel
//!
//! The host never touches the controller directly. Every register access,
//! every scratch-memory transfer and every page buffer copy goes through a
//! [`RemoteMemory`] implementation: a debug probe, a download-mode protocol,
//! or the in-memory emulator used by the tests.

use alloc::boxed::Box;

use crate::error::Result;

/// Word-granular access to the target's physical address space
///
/// All addresses are byte addresses of 32-bit words. A failed access is
/// reported as [`Error::Transport`](crate::Error::Transport) carrying the
/// failing address and the channel's status word.
pub trait RemoteMemory {
    /// Read one 32-bit word
    fn read_word(&mut self, addr: u32) -> Result<u32>;

    /// Write one 32-bit word
    fn write_word(&mut self, addr: u32, value: u32) -> Result<()>;

    /// Read `buf.len()` consecutive words starting at `addr`
    fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<()>;

    /// Write `buf.len()` consecutive words starting at `addr`
    fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()>;
}

impl<T: RemoteMemory + ?Sized> RemoteMemory for &mut T {
    fn read_word(&mut self, addr: u32) -> Result<u32> {
        (**self).read_word(addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
        (**self).write_word(addr, value)
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<()> {
        (**self).read_block(addr, buf)
    }

    fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()> {
        (**self).write_block(addr, buf)
    }
}

impl<T: RemoteMemory + ?Sized> RemoteMemory for Box<T> {
    fn read_word(&mut self, addr: u32) -> Result<u32> {
        (**self).read_word(addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
        (**self).write_word(addr, value)
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<()> {
        (**self).read_block(addr, buf)
    }

    fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()> {
        (**self).write_block(addr, buf)
    }
}

/// What the executor does when a remote access fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPolicy {
    /// Stop at the first failed access and return its error
    #[default]
    Abort,
    /// Log the failure, keep interpreting the list, and report the first
    /// failure once the list has finished
    LogAndContinue,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Words(alloc::vec::Vec<u32>);

    impl RemoteMemory for Words {
        fn read_word(&mut self, addr: u32) -> Result<u32> {
            Ok(self.0[addr as usize / 4])
        }

        fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
            self.0[addr as usize / 4] = value;
            Ok(())
        }

        fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<()> {
            let start = addr as usize / 4;
            buf.copy_from_slice(&self.0[start..start + buf.len()]);
            Ok(())
        }

        fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()> {
            let start = addr as usize / 4;
            self.0[start..start + buf.len()].copy_from_slice(buf);
            Ok(())
        }
    }

    #[test]
    fn test_boxed_channel_forwards() {
        let mut chan: Box<dyn RemoteMemory> = Box::new(Words(alloc::vec![0; 8]));
        chan.write_block(8, &[1, 2, 3]).unwrap();
        let mut back = [0u32; 4];
        chan.read_block(4, &mut back).unwrap();
        assert_eq!(back, [0, 1, 2, 3]);
        assert_eq!(TransportPolicy::default(), TransportPolicy::Abort);
    }
}
