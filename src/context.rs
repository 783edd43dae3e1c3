//! One pipeline position: a queue, a worker thread, a transform and a
//! downstream link.

use crate::buffer::BoundedQueue;
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::stage::{Downstream, DownstreamSlot, Item, StageInput, StageRunner, Transform};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// A running stage. Owns its queue and worker thread exclusively.
pub struct StageContext {
    name: Arc<str>,
    queue: Arc<BoundedQueue<Item>>,
    downstream: DownstreamSlot,
    worker: Option<JoinHandle<()>>,
    metrics: StageMetrics,
}

impl StageContext {
    /// Create the stage's queue and spawn its worker thread
    pub fn init(
        name: impl Into<String>,
        transform: Box<dyn Transform>,
        queue_capacity: usize,
    ) -> Result<Self> {
        let name: Arc<str> = Arc::from(name.into());
        let queue = Arc::new(BoundedQueue::new(queue_capacity)?);
        let downstream: DownstreamSlot = Arc::new(RwLock::new(None));
        let metrics = StageMetrics::new();

        let runner = StageRunner::new(
            Arc::clone(&name),
            Arc::clone(&queue),
            Arc::clone(&downstream),
            metrics.clone(),
        );
        let worker = thread::Builder::new()
            .name(format!("stage-{}", name))
            .spawn(move || runner.run(transform))
            .map_err(|e| PipelineError::ThreadError {
                stage: name.to_string(),
                message: format!("spawn failed: {}", e),
            })?;

        info!(stage = %name, capacity = queue_capacity, "stage initialized");

        Ok(Self {
            name,
            queue,
            downstream,
            worker: Some(worker),
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Place a line into this stage's queue, blocking while it is full.
    /// Terminator lines become the end marker.
    pub fn enqueue(&self, line: String) -> Result<()> {
        self.enqueue_item(Item::from_line(line))
    }

    pub fn enqueue_item(&self, item: Item) -> Result<()> {
        self.queue.put(item)
    }

    /// Handle that the previous stage forwards into
    pub fn input(&self) -> StageInput {
        StageInput::new(Arc::clone(&self.name), Arc::clone(&self.queue))
    }

    /// Set where this stage's output goes
    pub fn attach(&self, downstream: Arc<dyn Downstream>) {
        *self.downstream.write() = Some(downstream);
    }

    /// Block until this stage's queue is closed and empty
    pub fn wait_drained(&self) -> Result<()> {
        self.queue.wait_drained();
        debug!(stage = %self.name, "stage drained");
        Ok(())
    }

    pub fn is_drained(&self) -> bool {
        self.queue.is_drained()
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Close the queue, join the worker and release the stage
    pub fn finalize(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.queue.signal_finished();
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        worker.join().map_err(|payload| PipelineError::ThreadError {
            stage: self.name.to_string(),
            message: panic_message(payload.as_ref()),
        })?;
        info!(stage = %self.name, "stage finalized");
        Ok(())
    }
}

impl Drop for StageContext {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.shutdown() {
                error!(stage = %self.name, error = %e, "finalize on drop failed");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", msg)
    } else {
        "worker panicked".to_string()
    }
}
