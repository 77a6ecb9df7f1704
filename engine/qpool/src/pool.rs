use core::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    AcquireError, Generation, PoolError, PoolId, QueueCfg, QueueHandle, QueueState, RingBuffer, SlotIdx,
    SlotMask,
};

// 0 is reserved for QueueHandle::NONE.
static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

struct Slot<'buf> {
    queue:      Option<RingBuffer<'buf>>,
    generation: Generation,
}

impl Slot<'_> {
    fn vacant() -> Self {
        Self { queue: None, generation: 0 }
    }
}

/// Fixed set of `N` queue slots over caller-owned storage.
///
/// All slot state lives inline, so a pool never touches the heap. Mutating
/// calls take `&mut self`; wrap the pool in a [`SharedQueuePool`](crate::SharedQueuePool)
/// to drive it from more than one context.
///
/// A slot whose generation counter is used up is retired instead of wrapping,
/// so a handle can never resolve again after its release. Retired slots are
/// never handed out and do not count as free.
pub struct QueuePool<'buf, const N: usize> {
    id:         PoolId,
    slots:      [Slot<'buf>; N],
    live:       SlotMask,
    retired:    SlotMask,
    live_count: usize,
}

impl<'buf, const N: usize> QueuePool<'buf, N> {
    const SLOTS_OK: () = assert!(N > 0 && N <= SlotMask::MAX_BITS, "pool must hold 1..=64 slots");

    pub fn new() -> Self {
        let () = Self::SLOTS_OK;
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            slots: core::array::from_fn(|_| Slot::vacant()),
            live: SlotMask::with_len(N),
            retired: SlotMask::with_len(N),
            live_count: 0,
        }
    }

    #[inline] pub fn id(&self) -> PoolId { self.id }
    #[inline] pub fn slot_count(&self) -> usize { N }
    #[inline] pub fn live_count(&self) -> usize { self.live_count }
    #[inline] pub fn retired_count(&self) -> usize { self.retired.count_ones() }
    #[inline] pub fn free_slots(&self) -> usize { N - self.live_count - self.retired_count() }

    /// Take the lowest free slot and lay a `capacity` x `elem_size` queue over `storage`.
    ///
    /// On failure the untouched `storage` comes back inside the error, ready
    /// for another attempt.
    pub fn acquire_queue(
        &mut self,
        capacity: u16,
        elem_size: u8,
        storage: &'buf mut [u8],
    ) -> Result<QueueHandle, AcquireError<'buf>> {
        self.acquire_queue_with(QueueCfg::new(capacity, elem_size), storage)
    }

    /// Like [`acquire_queue`](Self::acquire_queue) with an explicit config.
    ///
    /// The pool is unchanged on any error.
    pub fn acquire_queue_with(
        &mut self,
        cfg: QueueCfg,
        storage: &'buf mut [u8],
    ) -> Result<QueueHandle, AcquireError<'buf>> {
        let idx = match self.first_free() {
            Some(i) => i,
            None => {
                tracing::warn!("QueuePool {} exhausted: no free slot out of {}", self.id, N);
                return Err(AcquireError::new(PoolError::Exhausted, storage));
            }
        };
        if let Err(e) = cfg.validate(storage.len()) {
            tracing::warn!("QueuePool {} rejected queue config: {}", self.id, e);
            return Err(AcquireError::new(e.into(), storage));
        }
        let queue = RingBuffer::from_validated(storage, cfg);

        let slot = &mut self.slots[idx];
        debug_assert!(slot.queue.is_none(), "acquiring an in-use slot");
        slot.queue = Some(queue);
        self.live.set(idx);
        self.live_count += 1;

        let h = QueueHandle { pool: self.id, slot: idx as SlotIdx, generation: slot.generation };
        tracing::debug!(
            "QueuePool {} acquired {:?} ({} x {} bytes), {} free",
            self.id,
            h,
            cfg.capacity,
            cfg.elem_size,
            self.free_slots()
        );
        Ok(h)
    }

    /// Return the slot behind `handle` to the pool and hand its storage back.
    ///
    /// The slot generation moves on, so `handle` and any copy of it stop
    /// resolving.
    pub fn release_queue(&mut self, handle: QueueHandle) -> Result<&'buf mut [u8], PoolError> {
        if self.live_count == 0 {
            tracing::warn!("QueuePool {} release of {:?} with no live queues", self.id, handle);
            return Err(PoolError::EmptyPool);
        }
        let idx = self.resolve(handle).inspect_err(|_| {
            tracing::warn!("QueuePool {} release of unknown handle {:?}", self.id, handle);
        })?;

        let slot = &mut self.slots[idx];
        let queue = slot.queue.take().ok_or(PoolError::InvalidHandle)?;
        self.live.clear(idx);
        self.live_count -= 1;
        match slot.generation.checked_add(1) {
            Some(g) => slot.generation = g,
            None => {
                self.retired.set(idx);
                tracing::warn!("QueuePool {} retired slot {}: generations used up", self.id, idx);
            }
        }

        tracing::debug!("QueuePool {} released {:?}, {} free", self.id, handle, self.free_slots());
        Ok(queue.into_storage())
    }

    pub fn enqueue(&mut self, handle: QueueHandle, elem: &[u8]) -> Result<(), PoolError> {
        self.queue_mut(handle)?.enqueue(elem)
    }

    pub fn dequeue(&mut self, handle: QueueHandle, out: &mut [u8]) -> Result<(), PoolError> {
        self.queue_mut(handle)?.dequeue(out)
    }

    pub fn peek(&self, handle: QueueHandle, out: &mut [u8], logical_index: u16) -> Result<(), PoolError> {
        self.queue(handle)?.peek(out, logical_index)
    }

    pub fn flush(&mut self, handle: QueueHandle) -> Result<(), PoolError> {
        self.queue_mut(handle)?.flush();
        Ok(())
    }

    /// Stored elements, or 0 when `handle` does not resolve.
    #[inline]
    pub fn count(&self, handle: QueueHandle) -> u16 {
        self.queue(handle).map_or(0, RingBuffer::count)
    }

    pub fn capacity(&self, handle: QueueHandle) -> Result<u16, PoolError> {
        self.queue(handle).map(RingBuffer::capacity)
    }

    pub fn elem_size(&self, handle: QueueHandle) -> Result<u8, PoolError> {
        self.queue(handle).map(RingBuffer::elem_size)
    }

    pub fn state(&self, handle: QueueHandle) -> Result<QueueState, PoolError> {
        self.queue(handle).map(RingBuffer::state)
    }

    #[inline]
    pub fn is_live(&self, handle: QueueHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Handles of every live queue, lowest slot first.
    pub fn live_handles(&self) -> impl Iterator<Item = QueueHandle> + '_ {
        self.live.ones().map(move |i| QueueHandle {
            pool: self.id,
            slot: i as SlotIdx,
            generation: self.slots[i].generation,
        })
    }

    pub fn queue(&self, handle: QueueHandle) -> Result<&RingBuffer<'buf>, PoolError> {
        let idx = self.resolve(handle)?;
        self.slots[idx].queue.as_ref().ok_or(PoolError::InvalidHandle)
    }

    pub fn queue_mut(&mut self, handle: QueueHandle) -> Result<&mut RingBuffer<'buf>, PoolError> {
        let idx = self.resolve(handle)?;
        self.slots[idx].queue.as_mut().ok_or(PoolError::InvalidHandle)
    }

    #[inline]
    fn first_free(&self) -> Option<usize> {
        if self.free_slots() == 0 {
            return None;
        }
        self.live.union(self.retired).first_zero()
    }

    #[inline]
    fn resolve(&self, h: QueueHandle) -> Result<usize, PoolError> {
        let i = h.slot as usize;
        if h.pool != self.id || i >= N || !self.live.get(i) || self.slots[i].generation != h.generation {
            return Err(PoolError::InvalidHandle);
        }
        Ok(i)
    }
}

impl<const N: usize> Default for QueuePool<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for QueuePool<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuePool")
            .field("id", &self.id)
            .field("slots", &N)
            .field("live", &self.live_count)
            .field("retired", &self.retired_count())
            .field("mask", &self.live)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_acquire_release_roundtrip() {
        let mut bufs = [[0u8; 4]; 3];
        let [b1, b2, b3] = &mut bufs;
        let mut p: QueuePool<'_, 3> = QueuePool::new();
        let h1 = p.acquire_queue(4, 1, b1).expect("1");
        let h2 = p.acquire_queue(4, 1, b2).expect("2");
        let h3 = p.acquire_queue(2, 2, b3).expect("3");
        assert_eq!((h1.slot(), h2.slot(), h3.slot()), (0, 1, 2));
        assert_eq!(p.free_slots(), 0);

        let mut spare = [0u8; 4];
        let err = p.acquire_queue(4, 1, &mut spare).unwrap_err();
        assert_eq!(err.error, PoolError::Exhausted, "full");
        let spare = err.into_storage();

        p.enqueue(h2, &[42]).unwrap();
        p.enqueue(h2, &[7]).unwrap();
        assert_eq!(p.count(h2), 2);
        assert_eq!(p.count(h1), 0);
        assert_eq!(p.capacity(h3), Ok(2));
        assert_eq!(p.elem_size(h3), Ok(2));

        let back = p.release_queue(h2).unwrap();
        assert_eq!(back, &[42, 7, 0, 0]);
        p.release_queue(h3).unwrap();
        p.release_queue(h1).unwrap();
        assert_eq!(p.free_slots(), 3);
        assert_eq!(p.live_count(), 0);

        let h4 = p.acquire_queue(4, 1, spare).unwrap();
        assert_eq!(h4.slot(), 0, "lowest free slot first");
        assert_ne!(h4, h1, "reused slot carries a new generation");
    }

    #[test]
    fn pool_double_release_is_rejected() {
        let mut a = [0u8; 1];
        let mut b = [0u8; 1];
        let mut p: QueuePool<'_, 2> = QueuePool::new();
        let h = p.acquire_queue(1, 1, &mut a).unwrap();
        let _keep = p.acquire_queue(1, 1, &mut b).unwrap();
        p.release_queue(h).unwrap();
        assert_eq!(p.release_queue(h), Err(PoolError::InvalidHandle));
        assert_eq!(p.live_count(), 1);
    }

    #[test]
    fn pool_release_on_empty_pool() {
        let mut a = [0u8; 1];
        let mut p: QueuePool<'_, 2> = QueuePool::new();
        assert_eq!(p.release_queue(QueueHandle::NONE), Err(PoolError::EmptyPool));
        let h = p.acquire_queue(1, 1, &mut a).unwrap();
        p.release_queue(h).unwrap();
        assert_eq!(p.release_queue(h), Err(PoolError::EmptyPool));
    }

    #[test]
    fn stale_handle_is_poisoned() {
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        let mut p: QueuePool<'_, 1> = QueuePool::new();
        let old = p.acquire_queue(4, 1, &mut a).unwrap();
        p.release_queue(old).unwrap();
        let new = p.acquire_queue(4, 1, &mut b).unwrap();
        assert_eq!(old.slot(), new.slot());

        assert!(!p.is_live(old));
        assert!(p.is_live(new));
        assert_eq!(p.enqueue(old, &[1]), Err(PoolError::InvalidHandle));
        assert_eq!(p.flush(old), Err(PoolError::InvalidHandle));
        assert_eq!(p.count(old), 0);
        assert_eq!(p.count(new), 0, "stale enqueue must not reach the new queue");
    }

    #[test]
    fn handle_from_other_pool_is_rejected() {
        let mut a = [0u8; 2];
        let mut b = [0u8; 2];
        let mut p1: QueuePool<'_, 2> = QueuePool::new();
        let mut p2: QueuePool<'_, 2> = QueuePool::new();
        assert_ne!(p1.id(), p2.id());
        let h1 = p1.acquire_queue(2, 1, &mut a).unwrap();
        let _h2 = p2.acquire_queue(2, 1, &mut b).unwrap();
        assert_eq!(p2.enqueue(h1, &[1]), Err(PoolError::InvalidHandle));
        assert_eq!(p2.release_queue(h1), Err(PoolError::InvalidHandle));
        assert_eq!(p2.live_count(), 1);
    }

    #[test]
    fn none_handle_never_resolves() {
        let mut a = [0u8; 2];
        let mut p: QueuePool<'_, 2> = QueuePool::new();
        let _h = p.acquire_queue(2, 1, &mut a).unwrap();
        let mut out = [0u8; 1];
        assert_eq!(p.count(QueueHandle::NONE), 0);
        assert_eq!(p.dequeue(QueueHandle::NONE, &mut out), Err(PoolError::InvalidHandle));
        assert_eq!(p.peek(QueueHandle::NONE, &mut out, 0), Err(PoolError::InvalidHandle));
        assert_eq!(p.state(QueueHandle::NONE), Err(PoolError::InvalidHandle));
    }

    #[test]
    fn bad_config_leaves_pool_untouched() {
        let mut short = [0u8; 3];
        let mut p: QueuePool<'_, 2> = QueuePool::new();
        let err = p.acquire_queue(4, 1, &mut short).unwrap_err();
        assert_eq!(err.error, PoolError::Config(crate::CfgError::BufferTooSmall { needed: 4, available: 3 }));
        let err = p.acquire_queue(1, 0, err.into_storage()).unwrap_err();
        assert_eq!(err.error, PoolError::Config(crate::CfgError::ZeroElementSize));
        assert_eq!(p.free_slots(), 2);
        assert_eq!(p.live_handles().count(), 0);

        // the same buffer fits a smaller queue
        let h = p.acquire_queue(3, 1, err.into_storage()).unwrap();
        assert_eq!(p.capacity(h), Ok(3));
    }

    #[test]
    fn failed_acquire_storage_is_retried_after_release() {
        let mut a = [0u8; 1];
        let mut b = [0u8; 1];
        let mut p: QueuePool<'_, 1> = QueuePool::new();
        let h = p.acquire_queue(1, 1, &mut a).unwrap();

        let err = p.acquire_queue(1, 1, &mut b).unwrap_err();
        assert_eq!(err.error, PoolError::Exhausted);
        p.release_queue(h).unwrap();

        let h2 = p.acquire_queue(1, 1, err.into_storage()).expect("retry with the same buffer");
        p.enqueue(h2, &[0x42]).unwrap();
        p.release_queue(h2).unwrap();
        drop(p);
        assert_eq!(b, [0x42]);
    }

    #[test]
    fn exhausted_is_reported_before_bad_config() {
        let mut a = [0u8; 4];
        let mut short = [0u8; 1];
        let mut p: QueuePool<'_, 1> = QueuePool::new();
        let _h = p.acquire_queue(4, 1, &mut a).unwrap();

        let err = p.acquire_queue(4, 1, &mut short).unwrap_err();
        assert_eq!(err.error, PoolError::Exhausted);
        let err = p.acquire_queue(1, 0, err.into_storage()).unwrap_err();
        assert_eq!(err.error, PoolError::Exhausted);
        assert_eq!(err.storage.len(), 1);
        assert_eq!(p.live_count(), 1);
    }

    #[test]
    fn slot_retires_when_generations_run_out() {
        let mut bufs = [[0u8; 1]; 4];
        let [a, b, c, d] = &mut bufs;
        let mut p: QueuePool<'_, 2> = QueuePool::new();
        p.slots[0].generation = Generation::MAX - 1;

        let first = p.acquire_queue(1, 1, a).unwrap();
        p.release_queue(first).unwrap();
        let last = p.acquire_queue(1, 1, b).unwrap();
        assert_eq!((last.slot(), last.generation()), (0, Generation::MAX));
        p.release_queue(last).unwrap();

        assert_eq!(p.retired_count(), 1);
        assert_eq!(p.free_slots(), 1);
        assert!(!p.is_live(first));
        assert!(!p.is_live(last));

        let h = p.acquire_queue(1, 1, c).unwrap();
        assert_eq!(h.slot(), 1, "retired slot is skipped");
        let err = p.acquire_queue(1, 1, d).unwrap_err();
        assert_eq!(err.error, PoolError::Exhausted);
        assert_eq!(p.enqueue(first, &[1]), Err(PoolError::InvalidHandle));
    }

    #[test]
    fn live_handles_track_slots() {
        let mut bufs = [[0u8; 1]; 3];
        let [a, b, c] = &mut bufs;
        let mut p: QueuePool<'_, 4> = QueuePool::new();
        let ha = p.acquire_queue(1, 1, a).unwrap();
        let hb = p.acquire_queue(1, 1, b).unwrap();
        let hc = p.acquire_queue(1, 1, c).unwrap();
        p.release_queue(hb).unwrap();
        assert_eq!(p.live_handles().collect::<Vec<_>>(), vec![ha, hc]);
    }
}
