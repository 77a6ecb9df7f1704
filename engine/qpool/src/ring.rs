// Fixed-width byte ring over caller-owned storage

use crate::config::{CfgError, QueueCfg};
use crate::error::PoolError;
use crate::types::QueueState;
use core::fmt;

/// FIFO ring of fixed-width byte elements laid over borrowed storage.
///
/// This is the per-slot queue of a [`QueuePool`](crate::QueuePool), but it also
/// works standalone:
/// - Element `i` of the storage lives at bytes `i * elem_size .. (i + 1) * elem_size`
/// - `head` is the next write position, `tail` the next read position
/// - `count` disambiguates full from empty, so every position is usable
/// - Nothing is allocated; the storage is only borrowed for `'buf`
pub struct RingBuffer<'buf> {
    storage: &'buf mut [u8],
    capacity: u16,
    elem_size: u8,
    scrub: bool,
    head: u16,
    tail: u16,
    count: u16,
}

impl<'buf> RingBuffer<'buf> {
    /// Lay a queue over `storage` with the geometry in `cfg`.
    ///
    /// The storage must hold at least `capacity * elem_size` bytes. Any bytes
    /// past that are left alone.
    pub fn new(storage: &'buf mut [u8], cfg: QueueCfg) -> Result<Self, CfgError> {
        cfg.validate(storage.len())?;
        Ok(Self::from_validated(storage, cfg))
    }

    // `cfg` must already have passed `validate(storage.len())`.
    pub(crate) fn from_validated(storage: &'buf mut [u8], cfg: QueueCfg) -> Self {
        debug_assert!(cfg.validate(storage.len()).is_ok());
        Self {
            storage,
            capacity: cfg.capacity,
            elem_size: cfg.elem_size,
            scrub: cfg.scrub_on_dequeue,
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    #[inline]
    pub fn elem_size(&self) -> u8 {
        self.elem_size
    }

    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    #[inline]
    pub fn state(&self) -> QueueState {
        QueueState::from_fill(self.count, self.capacity)
    }

    #[inline]
    pub fn head(&self) -> u16 {
        self.head
    }

    #[inline]
    pub fn tail(&self) -> u16 {
        self.tail
    }

    /// Append one element at `head`.
    ///
    /// Returns:
    /// - `Ok(())` if the element was copied in
    /// - `Err(PoolError::Full)` if `count` already equals `capacity`
    /// - `Err(PoolError::ElementSize { .. })` if `elem` is not `elem_size` bytes
    #[inline]
    pub fn enqueue(&mut self, elem: &[u8]) -> Result<(), PoolError> {
        self.check_width(elem.len())?;
        if self.count as u32 + 1 > self.capacity as u32 {
            return Err(PoolError::Full);
        }

        let at = self.byte_range(self.head);
        self.storage[at].copy_from_slice(elem);
        self.head = self.wrap(self.head as u32 + 1);
        self.count += 1;
        Ok(())
    }

    /// Remove the oldest element into `out`.
    #[inline]
    pub fn dequeue(&mut self, out: &mut [u8]) -> Result<(), PoolError> {
        self.check_width(out.len())?;
        if self.count == 0 {
            return Err(PoolError::Empty);
        }

        let at = self.byte_range(self.tail);
        out.copy_from_slice(&self.storage[at.clone()]);
        if self.scrub {
            self.storage[at].fill(0);
        }
        self.tail = self.wrap(self.tail as u32 + 1);
        self.count -= 1;
        Ok(())
    }

    /// Copy the element at `logical_index` (0 = oldest) into `out` without
    /// consuming anything.
    ///
    /// Indices at or past `count` are rejected with `OutOfRange`, so stale
    /// bytes behind `head` are never observable.
    #[inline]
    pub fn peek(&self, out: &mut [u8], logical_index: u16) -> Result<(), PoolError> {
        self.check_width(out.len())?;
        if self.count == 0 {
            return Err(PoolError::Empty);
        }
        if logical_index >= self.count {
            return Err(PoolError::OutOfRange { index: logical_index, count: self.count });
        }

        let pos = self.wrap(self.tail as u32 + logical_index as u32);
        out.copy_from_slice(&self.storage[self.byte_range(pos)]);
        Ok(())
    }

    /// Drop every stored element. Stored bytes are not scrubbed.
    #[inline]
    pub fn flush(&mut self) {
        self.count = 0;
        self.head = 0;
        self.tail = 0;
    }

    /// Give the borrowed storage back, ending this queue.
    pub fn into_storage(self) -> &'buf mut [u8] {
        self.storage
    }

    #[inline]
    fn check_width(&self, len: usize) -> Result<(), PoolError> {
        if len != self.elem_size as usize {
            return Err(PoolError::ElementSize { expected: self.elem_size, actual: len });
        }
        Ok(())
    }

    // Only reached with capacity > 0: callers have already passed the
    // full/empty gate.
    #[inline]
    fn wrap(&self, pos: u32) -> u16 {
        (pos % self.capacity as u32) as u16
    }

    #[inline]
    fn byte_range(&self, pos: u16) -> core::ops::Range<usize> {
        let w = self.elem_size as usize;
        let start = pos as usize * w;
        start..start + w
    }
}

impl fmt::Debug for RingBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("elem_size", &self.elem_size)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("count", &self.count)
            .field("scrub", &self.scrub)
            .finish()
    }
}
