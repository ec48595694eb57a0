//! `queue` crate: in-process event queue feeding the automation engine.
//!
//! Producers (the HTTP ingest endpoint, schedulers) push jobs onto a bounded
//! channel; a single worker pulls them off and runs each job on its own
//! tokio task, so a slow job never blocks unrelated ones.  The number of
//! jobs running at once is capped by a semaphore.

pub mod error;
pub mod worker;

pub use error::QueueError;
pub use worker::{EventQueue, JobHandler, QueueConfig, WorkerHandle};
