use crate::buffer::BoundedQueue;
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Canonical end-of-stream marker forwarded between stages
pub const END_MARKER: &str = "<END>";

/// Input records accepted as terminators
const TERMINATORS: [&str; 2] = [END_MARKER, "END"];

/// A unit of work flowing between stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// An owned line of text
    Record(String),
    /// End of stream. Never transformed, always forwarded.
    End,
}

impl Item {
    /// Wrap an input line, recognizing terminator records
    pub fn from_line(line: String) -> Self {
        if Self::is_terminator(&line) {
            Item::End
        } else {
            Item::Record(line)
        }
    }

    /// Whether `line` is one of the terminator literals
    pub fn is_terminator(line: &str) -> bool {
        TERMINATORS.contains(&line)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Item::End)
    }

    /// Text of the item; the end marker for [`Item::End`]
    pub fn as_str(&self) -> &str {
        match self {
            Item::Record(line) => line,
            Item::End => END_MARKER,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string-to-string transformation run by a stage's worker thread
pub trait Transform: Send + 'static {
    /// Transform one record.
    /// `None` means pass the input through unchanged.
    fn apply(&mut self, input: &str) -> Option<String>;

    /// Called on the worker thread before the first record
    fn on_start(&mut self) {}

    /// Called on the worker thread after the last record
    fn on_shutdown(&mut self) {}

    /// Get a human-readable name for this transform
    fn name(&self) -> &str {
        "transform"
    }
}

/// Receiver of a stage's output
pub trait Downstream: Send + Sync {
    /// Take ownership of `item`
    fn accept(&self, item: Item) -> Result<()>;
}

/// Terminal sink: accepts and discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Downstream for Discard {
    fn accept(&self, _item: Item) -> Result<()> {
        Ok(())
    }
}

/// Handle to a stage's input queue, used as the previous stage's downstream
#[derive(Debug, Clone)]
pub struct StageInput {
    stage: Arc<str>,
    queue: Arc<BoundedQueue<Item>>,
}

impl StageInput {
    pub(crate) fn new(stage: Arc<str>, queue: Arc<BoundedQueue<Item>>) -> Self {
        Self { stage, queue }
    }

    /// Name of the stage this handle feeds
    pub fn stage(&self) -> &str {
        &self.stage
    }
}

impl Downstream for StageInput {
    fn accept(&self, item: Item) -> Result<()> {
        self.queue.put(item).map_err(|e| PipelineError::Downstream {
            stage: self.stage.to_string(),
            source: Box::new(e),
        })
    }
}

/// Late-bound downstream link shared between a stage and its worker
pub(crate) type DownstreamSlot = Arc<RwLock<Option<Arc<dyn Downstream>>>>;

/// Runs a stage by pulling from its queue, transforming, and forwarding
pub struct StageRunner {
    name: Arc<str>,
    input: Arc<BoundedQueue<Item>>,
    downstream: DownstreamSlot,
    metrics: StageMetrics,
}

impl StageRunner {
    pub(crate) fn new(
        name: Arc<str>,
        input: Arc<BoundedQueue<Item>>,
        downstream: DownstreamSlot,
        metrics: StageMetrics,
    ) -> Self {
        Self {
            name,
            input,
            downstream,
            metrics,
        }
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Run the stage until the end marker arrives or the queue is closed.
    ///
    /// If the transform panics the end marker is still forwarded and the
    /// queue still drains, then the panic resumes so the join reports it.
    pub fn run(&self, mut transform: Box<dyn Transform>) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            transform.on_start();
            self.run_loop(transform.as_mut());
            transform.on_shutdown();
        }));

        if let Err(payload) = outcome {
            error!(stage = %self.name, "transform panicked, closing stage");
            self.finish();
            panic::resume_unwind(payload);
        }
    }

    fn run_loop(&self, transform: &mut dyn Transform) {
        loop {
            match self.input.get() {
                None => {
                    debug!(stage = %self.name, "queue closed, worker exiting");
                    return;
                }
                Some(Item::End) => {
                    debug!(stage = %self.name, "end marker received");
                    self.finish();
                    return;
                }
                Some(Item::Record(line)) => self.process(transform, line),
            }
        }
    }

    fn process(&self, transform: &mut dyn Transform, line: String) {
        let start = Instant::now();
        let produced = transform.apply(&line);
        self.metrics.record_latency(start.elapsed().as_nanos() as u64);
        self.metrics.record_processed();

        // A fresh result replaces the input, which is dropped here
        let output = produced.unwrap_or(line);

        match self.current_downstream() {
            Some(next) => match next.accept(Item::Record(output)) {
                Ok(()) => self.metrics.record_forwarded(),
                Err(e) => {
                    warn!(stage = %self.name, error = %e, "dropping item, downstream rejected it");
                    self.metrics.record_dropped();
                }
            },
            None => self.metrics.record_released(),
        }
    }

    /// Forward the end marker, close the own queue, and discard anything
    /// that slipped in after the marker so drained can fire.
    fn finish(&self) {
        if let Some(next) = self.current_downstream() {
            if let Err(e) = next.accept(Item::End) {
                warn!(stage = %self.name, error = %e, "could not forward end marker");
            }
        }
        self.input.signal_finished();

        while let Some(late) = self.input.get() {
            warn!(stage = %self.name, item = %late, "discarding item queued after end marker");
            self.metrics.record_dropped();
        }
    }

    fn current_downstream(&self) -> Option<Arc<dyn Downstream>> {
        self.downstream.read().clone()
    }
}
