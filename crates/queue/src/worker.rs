//! Bounded queue with one task per job.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::QueueError;

/// Consumes jobs pulled off the queue.
///
/// Errors are the handler's business: the queue is fire-and-forget, so
/// `handle` returns nothing and implementations log their own failures.
#[async_trait]
pub trait JobHandler<J>: Send + Sync + 'static {
    async fn handle(&self, job: J);
}

/// Tuning knobs for the queue worker.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Jobs that may wait in the channel before producers see `Full`.
    pub capacity: usize,
    /// Jobs that may run at the same time.
    pub max_in_flight: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_in_flight: 64,
        }
    }
}

/// Producer side of the queue.  Cheap to clone; the worker shuts down once
/// every clone has been dropped and in-flight jobs have finished.
pub struct EventQueue<J> {
    tx: mpsc::Sender<J>,
}

impl<J> Clone for EventQueue<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Handle on the worker task.
pub struct WorkerHandle {
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Wait until the queue is closed and every in-flight job has completed.
    pub async fn join(self) {
        let _ = self.join.await;
    }
}

impl<J: Send + 'static> EventQueue<J> {
    /// Spawn the worker and return the producer handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(handler: Arc<dyn JobHandler<J>>, config: QueueConfig) -> (Self, WorkerHandle) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let max_in_flight = config.max_in_flight.clamp(1, Semaphore::MAX_PERMITS);
        let join = tokio::spawn(run(rx, handler, max_in_flight));
        (Self { tx }, WorkerHandle { join })
    }

    /// Enqueue a job, waiting for space if the channel is full.
    pub async fn enqueue(&self, job: J) -> Result<(), QueueError> {
        self.tx.send(job).await.map_err(|_| QueueError::Closed)
    }

    /// Enqueue a job without waiting.
    pub fn try_enqueue(&self, job: J) -> Result<(), QueueError> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

async fn run<J: Send + 'static>(
    mut rx: mpsc::Receiver<J>,
    handler: Arc<dyn JobHandler<J>>,
    max_in_flight: usize,
) {
    let permits = Arc::new(Semaphore::new(max_in_flight));

    while let Some(job) = rx.recv().await {
        // The semaphore is never closed, so acquisition only fails on shutdown.
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            handler.handle(job).await;
            drop(permit);
        });
    }

    debug!("event queue closed, waiting for in-flight jobs");
    let all = u32::try_from(max_in_flight).unwrap_or(u32::MAX);
    let _ = permits.acquire_many(all).await;
    info!("event queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records finished jobs; jobs named "slow" wait on `gate` first.
    struct Recorder {
        gate: Semaphore,
        finished: Mutex<Vec<&'static str>>,
        count: AtomicUsize,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                finished: Mutex::new(Vec::new()),
                count: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl JobHandler<&'static str> for Recorder {
        async fn handle(&self, job: &'static str) {
            if job == "slow" {
                let _ = self.gate.acquire().await;
            }
            self.finished.lock().unwrap().push(job);
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn slow_job_does_not_block_other_jobs() {
        let recorder = Recorder::new();
        let (queue, worker) = EventQueue::<&'static str>::start(recorder.clone(), QueueConfig::default());

        queue.enqueue("slow").await.unwrap();
        queue.enqueue("fast").await.unwrap();
        settle().await;

        assert_eq!(*recorder.finished.lock().unwrap(), vec!["fast"]);

        recorder.gate.add_permits(1);
        drop(queue);
        worker.join().await;
        assert_eq!(*recorder.finished.lock().unwrap(), vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn join_drains_every_queued_job() {
        let recorder = Recorder::new();
        let config = QueueConfig {
            capacity: 8,
            max_in_flight: 2,
        };
        let (queue, worker) = EventQueue::<&'static str>::start(recorder.clone(), config);

        for _ in 0..8 {
            queue.enqueue("job").await.unwrap();
        }
        drop(queue);
        worker.join().await;

        assert_eq!(recorder.count.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn try_enqueue_reports_full_channel() {
        let recorder = Recorder::new();
        let config = QueueConfig {
            capacity: 1,
            max_in_flight: 1,
        };
        let (queue, worker) = EventQueue::<&'static str>::start(recorder.clone(), config);

        // First job occupies the only permit, second is held by the worker
        // waiting for it, third fills the channel.
        queue.enqueue("slow").await.unwrap();
        settle().await;
        queue.enqueue("slow").await.unwrap();
        settle().await;
        queue.try_enqueue("fast").unwrap();

        assert_eq!(queue.try_enqueue("fast"), Err(QueueError::Full));

        recorder.gate.add_permits(2);
        drop(queue);
        worker.join().await;
        assert_eq!(recorder.count.load(Ordering::SeqCst), 3);
    }
}
