//! Queue error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The channel is at capacity; the caller may retry or drop the job.
    #[error("event queue is full")]
    Full,

    /// The worker has stopped and no longer accepts jobs.
    #[error("event queue is closed")]
    Closed,
}
