// qpool - fixed-capacity pool of byte-element ring queues over caller-owned storage

mod config;
mod error;
mod pool;
mod ring;
mod shared;
mod slot_mask;
mod types;


pub use config::{CfgError, QueueCfg};
pub use error::{AcquireError, PoolError, Status};
pub use pool::QueuePool;
pub use ring::RingBuffer;
pub use shared::SharedQueuePool;
pub use slot_mask::SlotMask;
pub use types::{Generation, PoolId, QueueHandle, QueueState, SlotIdx};

/// Slots in a [`DefaultQueuePool`].
pub const DEFAULT_POOL_SLOTS: usize = 10;

/// Largest `N` a [`QueuePool`] accepts (one bit per slot in a `u64` mask).
pub const MAX_POOL_SLOTS: usize = SlotMask::MAX_BITS;

/// Largest element a queue can store, in bytes.
pub const MAX_ELEM_SIZE: u8 = u8::MAX;

pub type DefaultQueuePool<'buf> = QueuePool<'buf, DEFAULT_POOL_SLOTS>;
