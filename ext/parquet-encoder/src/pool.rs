//! Scratch byte buffers reused across page writes.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

/// How many idle buffers each role keeps around
const MAX_IDLE_PER_ROLE: usize = 4;

/// What a scratch buffer is used for. Each role has its own free list so a
/// large compressed buffer is never handed out to hold a page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scratch {
    /// Encoded levels followed by encoded values
    Payload,
    /// Compressor output
    Compressed,
    /// Serialized thrift page header
    Header,
}

impl Scratch {
    fn slot(self) -> usize {
        match self {
            Scratch::Payload => 0,
            Scratch::Compressed => 1,
            Scratch::Header => 2,
        }
    }
}

/// Per-writer pool of scratch buffers
#[derive(Debug, Default)]
pub struct ScratchPool {
    idle: [RefCell<Vec<Vec<u8>>>; 3],
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out an empty buffer. It goes back to the pool when the guard drops.
    pub fn get(&self, role: Scratch) -> PooledBuffer<'_> {
        let slot = &self.idle[role.slot()];
        let buf = slot.borrow_mut().pop().unwrap_or_default();
        PooledBuffer { slot, buf }
    }

    /// Number of idle buffers for `role`
    pub fn idle(&self, role: Scratch) -> usize {
        self.idle[role.slot()].borrow().len()
    }
}

/// A checked-out scratch buffer
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    slot: &'a RefCell<Vec<Vec<u8>>>,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let mut idle = self.slot.borrow_mut();
        if idle.len() < MAX_IDLE_PER_ROLE {
            idle.push(buf);
        }
    }
}
