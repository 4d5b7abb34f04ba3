//! Software interpreter for command lists

use alloc::vec;
use alloc::vec::Vec;

use log::{trace, warn};
use zerocopy::IntoBytes;

use super::descriptor::{CommandList, DescFlags, Descriptor, DmovRecord, TransferMode};
use crate::arena::{ScratchArena, ScratchBuf};
use crate::error::{Error, Result};
use crate::nand::regs;
use crate::remote::{RemoteMemory, TransportPolicy};

/// Executor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum status reads before a gate gives up with [`Error::Timeout`]
    pub poll_limit: u32,
    /// Register polled for the command-ready gate
    pub ready_register: u32,
    /// Bits of a status word that read non-zero while the controller is busy
    pub busy_mask: u32,
    /// Reaction to failed remote accesses
    pub policy: TransportPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_limit: 1000,
            ready_register: regs::FLASH_STATUS,
            busy_mask: regs::STATUS_BUSY_MASK,
            policy: TransportPolicy::Abort,
        }
    }
}

/// Interprets command lists against a remote channel
///
/// Before a list runs the whole used part of the scratch arena is pushed to
/// the target with one block write, and afterwards it is pulled back with
/// one block read. In between, descriptors move words directly between
/// target addresses, so latched statuses and page data land in target
/// scratch RAM and become visible on the host after the pull.
#[derive(Debug)]
pub struct Executor {
    config: ExecutorConfig,
    pointer: ScratchBuf,
    list: ScratchBuf,
}

impl Executor {
    /// Create an executor, reserving its list regions in `arena`
    pub fn new(arena: &mut ScratchArena, config: ExecutorConfig) -> Result<Self> {
        if config.poll_limit == 0 {
            return Err(Error::InvalidConfig);
        }
        let pointer = arena.allocate(32, 32)?;
        let list = arena.allocate(32, super::MAX_DESCRIPTORS * DmovRecord::SIZE)?;
        Ok(Self {
            config,
            pointer,
            list,
        })
    }

    /// Executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `list` to completion
    pub fn execute<C: RemoteMemory + ?Sized>(
        &self,
        chan: &mut C,
        arena: &mut ScratchArena,
        list: &CommandList,
    ) -> Result<()> {
        self.stage(arena, list)?;

        let base = arena.remote_base();
        let mut session = Session {
            chan,
            config: &self.config,
            first_failure: None,
        };

        session.write_block(base, &arena.used_words())?;

        for desc in list.descriptors() {
            session.run(desc)?;
            if desc.is_terminate() {
                break;
            }
        }

        let mut words = vec![0u32; arena.used_len() / 4];
        if session.read_block(base, &mut words)? {
            arena.load_words(&words);
        }

        session.finish()
    }

    /// Write the hardware image of `list` and its pointer word into the arena
    fn stage(&self, arena: &mut ScratchArena, list: &CommandList) -> Result<()> {
        let records = arena.bytes_mut(self.list);
        for (slot, desc) in records
            .chunks_exact_mut(DmovRecord::SIZE)
            .zip(list.descriptors())
        {
            slot.copy_from_slice(desc.encode().as_bytes());
        }
        let ptr = DmovRecord::list_pointer(arena.translate(self.list)?);
        arena.set_word(self.pointer, 0, ptr)
    }
}

/// State for one list execution
struct Session<'a, C: ?Sized> {
    chan: &'a mut C,
    config: &'a ExecutorConfig,
    first_failure: Option<Error>,
}

impl<C: RemoteMemory + ?Sized> Session<'_, C> {
    fn run(&mut self, desc: &Descriptor) -> Result<()> {
        trace!(
            "dmov {:?} 0x{:08X} -> 0x{:08X} len {}{}",
            desc.mode(),
            desc.src(),
            desc.dst(),
            desc.len(),
            if desc.is_terminate() { " (last)" } else { "" }
        );

        if desc.flags().contains(DescFlags::WAIT_CMD) {
            self.poll_idle(self.config.ready_register)?;
        }

        match desc.mode() {
            TransferMode::Replicate => {
                let value = self.poll_idle(desc.src())?;
                let words = vec![value; desc.words()];
                self.write_block(desc.dst(), &words)?;
            }
            TransferMode::Stream => {
                let mut words = vec![0u32; desc.words()];
                self.read_block(desc.src(), &mut words)?;
                self.write_block(desc.dst(), &words)?;
            }
            TransferMode::Burst => {
                for i in 0..desc.words() as u32 {
                    let value = self.read_word(desc.src() + i * 4)?;
                    self.write_word(desc.dst(), value)?;
                }
            }
        }
        Ok(())
    }

    /// Read `addr` until the busy bits clear, returning the idle value
    fn poll_idle(&mut self, addr: u32) -> Result<u32> {
        for _ in 0..self.config.poll_limit {
            let value = self.read_word(addr)?;
            if value & self.config.busy_mask == 0 {
                return Ok(value);
            }
        }
        warn!(
            "register 0x{:08X} still busy after {} polls",
            addr, self.config.poll_limit
        );
        Err(Error::Timeout { addr })
    }

    /// Apply the transport policy to a failed access
    fn absorb(&mut self, err: Error) -> Result<()> {
        match self.config.policy {
            TransportPolicy::Abort => {
                warn!("{}", err);
                Err(err)
            }
            TransportPolicy::LogAndContinue => {
                warn!("{}; continuing", err);
                self.first_failure.get_or_insert(err);
                Ok(())
            }
        }
    }

    fn read_word(&mut self, addr: u32) -> Result<u32> {
        match self.chan.read_word(addr) {
            Ok(v) => Ok(v),
            Err(e) => self.absorb(e).map(|()| 0),
        }
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
        match self.chan.write_word(addr, value) {
            Ok(()) => Ok(()),
            Err(e) => self.absorb(e),
        }
    }

    /// Returns whether `buf` holds data read from the target
    fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<bool> {
        match self.chan.read_block(addr, buf) {
            Ok(()) => Ok(true),
            Err(e) => self.absorb(e).map(|()| false),
        }
    }

    fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()> {
        match self.chan.write_block(addr, buf) {
            Ok(()) => Ok(()),
            Err(e) => self.absorb(e),
        }
    }

    fn finish(self) -> Result<()> {
        match self.first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmov::CommandListBuilder;
    use alloc::collections::BTreeMap;

    const SCRATCH: u32 = 0x8000_0000;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Access {
        ReadWord(u32),
        WriteWord(u32, u32),
        ReadBlock(u32, usize),
        WriteBlock(u32, usize),
    }

    /// Flat word memory that records every access
    #[derive(Default)]
    struct Recorder {
        mem: BTreeMap<u32, u32>,
        log: Vec<Access>,
        fail_at: Option<u32>,
        busy: Option<u32>,
    }

    impl Recorder {
        fn check(&self, addr: u32) -> Result<()> {
            if self.fail_at == Some(addr) {
                return Err(Error::Transport { addr, status: 0xE1 });
            }
            Ok(())
        }

        fn load(&self, addr: u32) -> u32 {
            if self.busy == Some(addr) {
                return 0x1;
            }
            self.mem.get(&addr).copied().unwrap_or(0)
        }

        fn word_writes(&self) -> Vec<(u32, u32)> {
            self.log
                .iter()
                .filter_map(|a| match a {
                    Access::WriteWord(addr, v) => Some((*addr, *v)),
                    _ => None,
                })
                .collect()
        }
    }

    impl RemoteMemory for Recorder {
        fn read_word(&mut self, addr: u32) -> Result<u32> {
            self.log.push(Access::ReadWord(addr));
            self.check(addr)?;
            Ok(self.load(addr))
        }

        fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
            self.log.push(Access::WriteWord(addr, value));
            self.check(addr)?;
            self.mem.insert(addr, value);
            Ok(())
        }

        fn read_block(&mut self, addr: u32, buf: &mut [u32]) -> Result<()> {
            self.log.push(Access::ReadBlock(addr, buf.len()));
            self.check(addr)?;
            for (i, w) in buf.iter_mut().enumerate() {
                *w = self.load(addr + 4 * i as u32);
            }
            Ok(())
        }

        fn write_block(&mut self, addr: u32, buf: &[u32]) -> Result<()> {
            self.log.push(Access::WriteBlock(addr, buf.len()));
            self.check(addr)?;
            for (i, w) in buf.iter().enumerate() {
                self.mem.insert(addr + 4 * i as u32, *w);
            }
            Ok(())
        }
    }

    fn setup(config: ExecutorConfig) -> (ScratchArena, Executor, ScratchBuf) {
        let mut arena = ScratchArena::new(SCRATCH, 4096).unwrap();
        let exec = Executor::new(&mut arena, config).unwrap();
        let params = arena.allocate(32, 64).unwrap();
        (arena, exec, params)
    }

    #[test]
    fn test_burst_writes_fixed_destination() {
        let (mut arena, exec, params) = setup(ExecutorConfig::default());
        for i in 0..4 {
            arena.set_word(params, i, 0x100 + i as u32).unwrap();
        }
        let src = arena.translate(params).unwrap();

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(src, 0xA0A0_0000, 16)).unwrap();
        let list = b.finish().unwrap();

        let mut chan = Recorder::default();
        exec.execute(&mut chan, &mut arena, &list).unwrap();

        assert_eq!(
            chan.word_writes(),
            [
                (0xA0A0_0000, 0x100),
                (0xA0A0_0000, 0x101),
                (0xA0A0_0000, 0x102),
                (0xA0A0_0000, 0x103)
            ]
        );
        // Arena pushed before and pulled after, once each
        assert!(matches!(chan.log.first(), Some(Access::WriteBlock(SCRATCH, _))));
        assert!(matches!(chan.log.last(), Some(Access::ReadBlock(SCRATCH, _))));
    }

    #[test]
    fn test_stream_copies_contiguous_run() {
        let (mut arena, exec, params) = setup(ExecutorConfig::default());
        let dst = arena.translate(params).unwrap();

        let mut chan = Recorder::default();
        chan.mem.insert(0xA0A0_0100, 0x1111);
        chan.mem.insert(0xA0A0_0104, 0x2222);

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::stream(0xA0A0_0100, dst, 8).begin())
            .unwrap();
        let list = b.finish().unwrap();
        exec.execute(&mut chan, &mut arena, &list).unwrap();

        // Results are visible on the host after the pull
        assert_eq!(arena.word(params, 0).unwrap(), 0x1111);
        assert_eq!(arena.word(params, 1).unwrap(), 0x2222);
    }

    #[test]
    fn test_replicate_latches_status() {
        let (mut arena, exec, params) = setup(ExecutorConfig::default());
        let dst = arena.translate(params).unwrap();

        let mut chan = Recorder::default();
        chan.mem.insert(regs::FLASH_STATUS, 0xA0);

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::latch(regs::FLASH_STATUS, dst, 8)).unwrap();
        exec.execute(&mut chan, &mut arena, &b.finish().unwrap())
            .unwrap();

        assert_eq!(arena.word(params, 0).unwrap(), 0xA0);
        assert_eq!(arena.word(params, 1).unwrap(), 0xA0);
    }

    #[test]
    fn test_replicate_times_out_when_never_idle() {
        let (mut arena, exec, params) = setup(ExecutorConfig {
            poll_limit: 5,
            ..Default::default()
        });
        let dst = arena.translate(params).unwrap();

        let mut chan = Recorder {
            busy: Some(regs::FLASH_STATUS),
            ..Default::default()
        };

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::latch(regs::FLASH_STATUS, dst, 4)).unwrap();
        let err = exec
            .execute(&mut chan, &mut arena, &b.finish().unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            Error::Timeout {
                addr: regs::FLASH_STATUS
            }
        );
        let polls = chan
            .log
            .iter()
            .filter(|a| **a == Access::ReadWord(regs::FLASH_STATUS))
            .count();
        assert_eq!(polls, 5);
    }

    #[test]
    fn test_abort_stops_at_first_failure() {
        let (mut arena, exec, params) = setup(ExecutorConfig::default());
        let src = arena.translate(params).unwrap();

        let mut chan = Recorder {
            fail_at: Some(0xA0A0_0010),
            ..Default::default()
        };

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(src, 0xA0A0_0010, 4)).unwrap();
        b.push(Descriptor::burst(src, 0xA0A0_0020, 4)).unwrap();
        let err = exec
            .execute(&mut chan, &mut arena, &b.finish().unwrap())
            .unwrap_err();

        assert_eq!(
            err,
            Error::Transport {
                addr: 0xA0A0_0010,
                status: 0xE1
            }
        );
        assert!(!chan.log.contains(&Access::WriteWord(0xA0A0_0020, 0)));
    }

    #[test]
    fn test_log_and_continue_reports_at_end() {
        let (mut arena, exec, params) = setup(ExecutorConfig {
            policy: TransportPolicy::LogAndContinue,
            ..Default::default()
        });
        let src = arena.translate(params).unwrap();

        let mut chan = Recorder {
            fail_at: Some(0xA0A0_0010),
            ..Default::default()
        };

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(src, 0xA0A0_0010, 4)).unwrap();
        b.push(Descriptor::burst(src, 0xA0A0_0020, 4)).unwrap();
        let err = exec
            .execute(&mut chan, &mut arena, &b.finish().unwrap())
            .unwrap_err();

        assert!(matches!(err, Error::Transport { addr: 0xA0A0_0010, .. }));
        // The rest of the list still ran
        assert!(chan.log.contains(&Access::WriteWord(0xA0A0_0020, 0)));
    }

    #[test]
    fn test_wait_cmd_polls_ready_register() {
        let (mut arena, exec, params) = setup(ExecutorConfig::default());
        let src = arena.translate(params).unwrap();

        let mut chan = Recorder::default();
        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(src, regs::FLASH_CMD, 4).wait_cmd())
            .unwrap();
        exec.execute(&mut chan, &mut arena, &b.finish().unwrap())
            .unwrap();

        let i_poll = chan
            .log
            .iter()
            .position(|a| *a == Access::ReadWord(regs::FLASH_STATUS))
            .unwrap();
        let i_write = chan
            .log
            .iter()
            .position(|a| matches!(a, Access::WriteWord(regs::FLASH_CMD, _)))
            .unwrap();
        assert!(i_poll < i_write);
    }

    #[test]
    fn test_staged_list_image() {
        let (mut arena, exec, params) = setup(ExecutorConfig::default());
        let src = arena.translate(params).unwrap();

        let mut b = CommandListBuilder::new();
        b.push(Descriptor::burst(src, regs::FLASH_CMD, 4).begin())
            .unwrap();
        let list = b.finish().unwrap();
        let mut chan = Recorder::default();
        exec.execute(&mut chan, &mut arena, &list).unwrap();

        let list_addr = arena.translate(exec.list).unwrap();
        assert_eq!(
            chan.mem.get(&SCRATCH).copied(),
            Some(DmovRecord::list_pointer(list_addr))
        );
        assert_eq!(chan.mem.get(&(list_addr + 4)).copied(), Some(src));
        assert_eq!(
            chan.mem.get(&(list_addr + 8)).copied(),
            Some(regs::FLASH_CMD)
        );
    }
}
