use core::fmt;

pub type SlotIdx = u8;
pub type Generation = u32;
pub type PoolId = u32;

/// Fill level of a single queue.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum QueueState {
    Empty = 0,
    Partial = 1,
    Full = 2,
}

impl QueueState {
    #[inline]
    pub fn from_fill(count: u16, capacity: u16) -> QueueState {
        if count == 0 {
            QueueState::Empty
        } else if count >= capacity {
            QueueState::Full
        } else {
            QueueState::Partial
        }
    }
}

/// Caller-held reference to one live queue of a [`QueuePool`](crate::QueuePool).
///
/// Handles are plain values. Releasing a queue bumps its slot generation, so
/// every copy of the released handle stops resolving.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct QueueHandle {
    pub(crate) pool: PoolId,
    pub(crate) slot: SlotIdx,
    pub(crate) generation: Generation,
}

impl QueueHandle {
    /// Null handle. Never resolves against any pool.
    pub const NONE: QueueHandle = QueueHandle { pool: 0, slot: SlotIdx::MAX, generation: 0 };

    #[inline]
    pub fn slot(&self) -> SlotIdx {
        self.slot
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        *self == QueueHandle::NONE
    }
}

impl Default for QueueHandle {
    fn default() -> Self {
        QueueHandle::NONE
    }
}

impl fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Q_NONE")
        } else {
            write!(f, "Q({}#{}@{})", self.slot, self.generation, self.pool)
        }
    }
}
