use thiserror::Error;

use crate::MAX_ELEM_SIZE;

/// Per-queue geometry, fixed for the lifetime of a queue instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueueCfg {
    pub capacity: u16,          // max elements held at once
    pub elem_size: u8,          // bytes per element, 1..=MAX_ELEM_SIZE
    pub scrub_on_dequeue: bool, // zero the vacated element after each dequeue
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgError {
    #[error("element size must be at least one byte")]
    ZeroElementSize,
    #[error("backing buffer holds {available} bytes, queue needs {needed}")]
    BufferTooSmall { needed: usize, available: usize },
}

impl QueueCfg {
    pub fn new(capacity: u16, elem_size: u8) -> Self {
        Self { capacity, elem_size, scrub_on_dequeue: true }
    }

    pub fn with_scrub(mut self, scrub: bool) -> Self {
        self.scrub_on_dequeue = scrub;
        self
    }

    /// Bytes of backing storage this queue addresses.
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.capacity as usize * self.elem_size as usize
    }

    pub fn validate(&self, buffer_len: usize) -> Result<(), CfgError> {
        if self.elem_size == 0 { return Err(CfgError::ZeroElementSize); }
        let needed = self.storage_len();
        if buffer_len < needed { return Err(CfgError::BufferTooSmall { needed, available: buffer_len }); }
        Ok(())
    }
}
