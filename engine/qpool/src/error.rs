//! Error and status types for the queue pool

use core::fmt;
use thiserror::Error;

use crate::config::CfgError;

/// Errors returned by pool and queue operations.
///
/// Every error leaves the pool and the addressed queue exactly as they were.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("no free queue slot left in the pool")]
    Exhausted,

    #[error("release attempted on a pool with no live queues")]
    EmptyPool,

    #[error("handle does not name a live queue of this pool")]
    InvalidHandle,

    #[error("queue is full")]
    Full,

    #[error("queue is empty")]
    Empty,

    #[error("logical index {index} is outside the {count} stored elements")]
    OutOfRange { index: u16, count: u16 },

    #[error("element is {actual} bytes, queue stores {expected}-byte elements")]
    ElementSize { expected: u8, actual: usize },

    #[error("invalid queue configuration: {0}")]
    Config(#[from] CfgError),
}

impl PoolError {
    /// Collapse this error onto the four-way status taxonomy.
    pub fn status(&self) -> Status {
        match self {
            PoolError::Exhausted | PoolError::Full => Status::Full,
            PoolError::EmptyPool | PoolError::Empty => Status::Empty,
            PoolError::InvalidHandle
            | PoolError::OutOfRange { .. }
            | PoolError::ElementSize { .. }
            | PoolError::Config(_) => Status::Fail,
        }
    }
}

/// A failed acquire, carrying the storage it was offered back to the caller.
///
/// The storage is untouched, so it can be passed straight to the next
/// acquire attempt.
#[derive(Error)]
#[error("{error}")]
pub struct AcquireError<'buf> {
    pub error: PoolError,
    pub storage: &'buf mut [u8],
}

impl<'buf> AcquireError<'buf> {
    pub fn new(error: PoolError, storage: &'buf mut [u8]) -> Self {
        Self { error, storage }
    }

    #[inline]
    pub fn error(&self) -> PoolError {
        self.error
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.error.status()
    }

    pub fn into_storage(self) -> &'buf mut [u8] {
        self.storage
    }
}

impl fmt::Debug for AcquireError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireError")
            .field("error", &self.error)
            .field("storage_len", &self.storage.len())
            .finish()
    }
}

impl From<AcquireError<'_>> for PoolError {
    fn from(e: AcquireError<'_>) -> Self {
        e.error
    }
}

/// Numeric status codes for callers that want a flat result value.
#[repr(i8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    Success = 0,
    Fail = -1,
    Full = -2,
    Empty = -3,
}

impl Status {
    #[inline]
    pub fn of<T>(result: &Result<T, PoolError>) -> Status {
        match result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }

    #[inline]
    pub fn code(self) -> i8 {
        self as i8
    }
}

impl<T> From<Result<T, PoolError>> for Status {
    fn from(result: Result<T, PoolError>) -> Self {
        Status::of(&result)
    }
}
