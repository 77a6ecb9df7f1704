//! Lock-guarded pool for callers that share one pool between contexts

use parking_lot::Mutex;

use crate::{AcquireError, PoolError, QueueCfg, QueueHandle, QueuePool};

/// A [`QueuePool`] behind a single mutex.
///
/// The lock covers pool metadata and every per-queue operation, so each call
/// is atomic with respect to every other call. Use [`with_pool`](Self::with_pool)
/// to run several operations under one acquisition.
pub struct SharedQueuePool<'buf, const N: usize> {
    inner: Mutex<QueuePool<'buf, N>>,
}

impl<'buf, const N: usize> SharedQueuePool<'buf, N> {
    pub fn new() -> Self {
        Self::from_pool(QueuePool::new())
    }

    pub fn from_pool(pool: QueuePool<'buf, N>) -> Self {
        Self { inner: Mutex::new(pool) }
    }

    pub fn into_inner(self) -> QueuePool<'buf, N> {
        self.inner.into_inner()
    }

    /// Run `f` with exclusive access to the underlying pool.
    pub fn with_pool<R>(&self, f: impl FnOnce(&mut QueuePool<'buf, N>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    pub fn acquire_queue(
        &self,
        capacity: u16,
        elem_size: u8,
        storage: &'buf mut [u8],
    ) -> Result<QueueHandle, AcquireError<'buf>> {
        self.inner.lock().acquire_queue(capacity, elem_size, storage)
    }

    pub fn acquire_queue_with(
        &self,
        cfg: QueueCfg,
        storage: &'buf mut [u8],
    ) -> Result<QueueHandle, AcquireError<'buf>> {
        self.inner.lock().acquire_queue_with(cfg, storage)
    }

    pub fn release_queue(&self, handle: QueueHandle) -> Result<&'buf mut [u8], PoolError> {
        self.inner.lock().release_queue(handle)
    }

    pub fn enqueue(&self, handle: QueueHandle, elem: &[u8]) -> Result<(), PoolError> {
        self.inner.lock().enqueue(handle, elem)
    }

    pub fn dequeue(&self, handle: QueueHandle, out: &mut [u8]) -> Result<(), PoolError> {
        self.inner.lock().dequeue(handle, out)
    }

    pub fn peek(&self, handle: QueueHandle, out: &mut [u8], logical_index: u16) -> Result<(), PoolError> {
        self.inner.lock().peek(handle, out, logical_index)
    }

    pub fn flush(&self, handle: QueueHandle) -> Result<(), PoolError> {
        self.inner.lock().flush(handle)
    }

    pub fn count(&self, handle: QueueHandle) -> u16 {
        self.inner.lock().count(handle)
    }

    pub fn free_slots(&self) -> usize {
        self.inner.lock().free_slots()
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().live_count()
    }
}

impl<const N: usize> Default for SharedQueuePool<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
