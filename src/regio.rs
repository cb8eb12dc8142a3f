//! Register transport boundary.
//!
//! The sensor and serdes drivers talk to hardware exclusively through the
//! [`RegisterIo`] trait: synchronous, address-oriented reads and writes of
//! 1 to 4 bytes. Helpers in this module add the two access patterns the
//! sensors require on top of the raw transport: ordered table writes that
//! abort on the first failure, and "held" writes bracketed by the sensor's
//! hold register so a multi-byte update latches atomically.

use crate::error::{Error, Result, TransportError};

/// Widest register access supported by the command channel.
pub const REG_LEN_MAX: usize = 4;

/// Synchronous register transport for one device on the command channel.
///
/// Calls may block on a bus transaction. Implementations map their bus
/// failures into [`TransportError`]; the helpers below attach register
/// address context when propagating.
pub trait RegisterIo: Send {
    /// Read `len` bytes (1..=4) from `addr`, returned right-aligned.
    fn read(&mut self, addr: u16, len: usize) -> std::result::Result<u32, TransportError>;

    /// Write the low `len` bytes (1..=4) of `val` to `addr`.
    fn write(&mut self, addr: u16, len: usize, val: u32) -> std::result::Result<(), TransportError>;
}

/// One entry of an ordered register table blob.
///
/// Mode and format setup tables are opaque per-mode data supplied by the
/// sensor profile; entries are always single-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    pub addr: u16,
    pub val: u8,
}

impl RegWrite {
    pub const fn new(addr: u16, val: u8) -> Self {
        Self { addr, val }
    }
}

/// An ordered register table.
pub type RegSeq = [RegWrite];

/// Read a register, attaching address context on failure.
pub fn read_reg(io: &mut dyn RegisterIo, addr: u16, len: usize) -> Result<u32> {
    debug_assert!((1..=REG_LEN_MAX).contains(&len));
    io.read(addr, len)
        .map_err(|source| Error::Transport { addr, source })
}

/// Write a register, attaching address context on failure.
pub fn write_reg(io: &mut dyn RegisterIo, addr: u16, len: usize, val: u32) -> Result<()> {
    debug_assert!((1..=REG_LEN_MAX).contains(&len));
    io.write(addr, len, val)
        .map_err(|source| Error::Transport { addr, source })
}

/// Write a register inside a hold-register bracket.
///
/// Setting the hold register defers the effect of subsequent writes until it
/// is cleared, so a multi-byte value (VMAX, SHR, gain) updates atomically.
/// The hold is cleared on both the success and failure paths of the inner
/// write; an inner failure is reported in preference to a failure of the
/// trailing clear.
pub fn write_held(
    io: &mut dyn RegisterIo,
    hold_addr: u16,
    addr: u16,
    len: usize,
    val: u32,
) -> Result<()> {
    write_reg(io, hold_addr, 1, 0x01)?;

    let inner = write_reg(io, addr, len, val);
    let clear = write_reg(io, hold_addr, 1, 0x00);

    inner?;
    clear
}

/// Write an ordered register table, aborting on the first failure.
///
/// The error carries the failing address; registers already written stay
/// written (no rollback).
pub fn write_table(io: &mut dyn RegisterIo, regs: &RegSeq) -> Result<()> {
    for reg in regs {
        if let Err(e) = write_reg(io, reg.addr, 1, reg.val as u32) {
            tracing::error!("table write failed at 0x{:04X}", reg.addr);
            return Err(e);
        }
    }
    Ok(())
}

pub mod mock {
    //! In-memory register transport for tests.
    //!
    //! Handles are cheap clones over shared state, so a test can keep one
    //! handle for inspection while the driver owns another.

    use super::{RegisterIo, REG_LEN_MAX};
    use crate::error::TransportError;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum IoOp {
        Write { addr: u16, len: usize, val: u32 },
        Read { addr: u16, len: usize },
    }

    #[derive(Default)]
    struct MockInner {
        log: Vec<IoOp>,
        registers: HashMap<u16, u32>,
        fail_writes: HashSet<u16>,
        fail_reads: HashSet<u16>,
    }

    #[derive(Clone, Default)]
    pub struct MockRegisterIo {
        inner: Arc<Mutex<MockInner>>,
    }

    impl MockRegisterIo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Preload a value returned by subsequent reads of `addr`.
        pub fn set_register(&self, addr: u16, val: u32) {
            self.inner.lock().unwrap().registers.insert(addr, val);
        }

        /// Make every write to `addr` fail with a NACK.
        pub fn fail_writes_to(&self, addr: u16) {
            self.inner.lock().unwrap().fail_writes.insert(addr);
        }

        /// Make every read of `addr` fail with a NACK.
        pub fn fail_reads_of(&self, addr: u16) {
            self.inner.lock().unwrap().fail_reads.insert(addr);
        }

        pub fn clear_log(&self) {
            self.inner.lock().unwrap().log.clear();
        }

        pub fn log(&self) -> Vec<IoOp> {
            self.inner.lock().unwrap().log.clone()
        }

        /// All writes, in order, as `(addr, val)` pairs.
        pub fn writes(&self) -> Vec<(u16, u32)> {
            self.inner
                .lock()
                .unwrap()
                .log
                .iter()
                .filter_map(|op| match op {
                    IoOp::Write { addr, val, .. } => Some((*addr, *val)),
                    IoOp::Read { .. } => None,
                })
                .collect()
        }

        /// Number of writes issued to `addr`.
        pub fn writes_to(&self, addr: u16) -> usize {
            self.writes().iter().filter(|(a, _)| *a == addr).count()
        }

        /// Last value written to `addr`, if any.
        pub fn last_write(&self, addr: u16) -> Option<u32> {
            self.writes()
                .iter()
                .rev()
                .find(|(a, _)| *a == addr)
                .map(|(_, v)| *v)
        }
    }

    impl RegisterIo for MockRegisterIo {
        fn read(&mut self, addr: u16, len: usize) -> Result<u32, TransportError> {
            assert!((1..=REG_LEN_MAX).contains(&len), "bad read length {len}");
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(IoOp::Read { addr, len });
            if inner.fail_reads.contains(&addr) {
                return Err(TransportError::Nack);
            }
            Ok(inner.registers.get(&addr).copied().unwrap_or(0))
        }

        fn write(&mut self, addr: u16, len: usize, val: u32) -> Result<(), TransportError> {
            assert!((1..=REG_LEN_MAX).contains(&len), "bad write length {len}");
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_writes.contains(&addr) {
                inner.log.push(IoOp::Write { addr, len, val });
                return Err(TransportError::Nack);
            }
            inner.log.push(IoOp::Write { addr, len, val });
            inner.registers.insert(addr, val);
            Ok(())
        }
    }
}
