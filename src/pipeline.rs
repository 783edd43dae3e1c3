use crate::context::StageContext;
use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsSnapshot, StageMetrics};
use crate::registry::Registry;
use crate::stage::{Discard, Downstream, Item, Transform};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

/// How a stage in the builder gets its transform
enum StageSource {
    /// Looked up in the registry at build time
    Named(String),
    /// Supplied directly
    Custom {
        name: String,
        transform: Box<dyn Transform>,
    },
}

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    queue_capacity: usize,
    stages: Vec<StageSource>,
}

impl PipelineBuilder {
    /// Create a builder whose stages all get queues of `queue_capacity`
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            stages: Vec::new(),
        }
    }

    /// Add a stage resolved by identifier from the registry
    pub fn add_named(mut self, name: impl Into<String>) -> Self {
        self.stages.push(StageSource::Named(name.into()));
        self
    }

    /// Add a stage with an explicit transform
    pub fn add_stage(mut self, name: impl Into<String>, transform: Box<dyn Transform>) -> Self {
        self.stages.push(StageSource::Custom {
            name: name.into(),
            transform,
        });
        self
    }

    /// Build with the built-in registry
    pub fn build(self) -> Result<Pipeline> {
        self.build_with(&Registry::builtin())
    }

    /// Initialize every stage in order.
    ///
    /// On the first failure the stages created so far are finalized in
    /// reverse order and that failure is returned.
    pub fn build_with(self, registry: &Registry) -> Result<Pipeline> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::InvalidCapacity(0));
        }

        let mut built: Vec<StageContext> = Vec::with_capacity(self.stages.len());
        for (position, source) in self.stages.into_iter().enumerate() {
            let (name, created) = match source {
                StageSource::Named(name) => {
                    let created = registry
                        .create(&name)
                        .and_then(|t| StageContext::init(name.clone(), t, self.queue_capacity));
                    (name, created)
                }
                StageSource::Custom { name, transform } => {
                    let created = StageContext::init(name.clone(), transform, self.queue_capacity);
                    (name, created)
                }
            };

            match created {
                Ok(stage) => built.push(stage),
                Err(e) => {
                    error!(stage = %name, position, error = %e, "stage init failed, unwinding");
                    for err in finalize_reverse(built) {
                        error!(error = %err, "cleanup after failed build");
                    }
                    return Err(e);
                }
            }
        }

        info!(stages = built.len(), capacity = self.queue_capacity, "pipeline built");
        Ok(Pipeline {
            stages: built,
            input_closed: Mutex::new(false),
        })
    }
}

/// Finalize stages last to first, collecting every failure
fn finalize_reverse(stages: Vec<StageContext>) -> Vec<PipelineError> {
    let mut errors = Vec::new();
    for stage in stages.into_iter().rev() {
        let name = stage.name().to_string();
        if let Err(e) = stage.finalize() {
            error!(stage = %name, error = %e, "stage finalize failed");
            errors.push(e);
        }
    }
    errors
}

/// An ordered chain of running stages
pub struct Pipeline {
    stages: Vec<StageContext>,
    /// Set once the end marker is sent. Held for the whole stage-0 put in
    /// `feed` and `close` so no record can follow `Item::End`; while stage 0
    /// applies backpressure, `close` and `is_closed` block behind the feed.
    input_closed: Mutex<bool>,
}

impl Pipeline {
    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in pipeline order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(StageContext::name).collect()
    }

    /// Get a stage by position
    pub fn stage(&self, index: usize) -> Option<&StageContext> {
        self.stages.get(index)
    }

    /// Get metrics for a specific stage
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.stages.get(index).map(StageContext::metrics)
    }

    /// Link every stage to the next; the last one discards its output
    pub fn wire(&mut self) {
        self.wire_with_sink(Arc::new(Discard));
    }

    /// Link every stage to the next; the last one feeds `sink`
    pub fn wire_with_sink(&mut self, sink: Arc<dyn Downstream>) {
        for pair in self.stages.windows(2) {
            pair[0].attach(Arc::new(pair[1].input()));
            debug!(from = pair[0].name(), to = pair[1].name(), "stage wired");
        }
        if let Some(last) = self.stages.last() {
            last.attach(sink);
        }
    }

    /// Push one line into the first stage, blocking while its queue is full.
    ///
    /// A terminator line closes the pipeline instead.
    pub fn feed(&self, line: String) -> Result<()> {
        if Item::is_terminator(&line) {
            return self.close();
        }

        let closed = self.input_closed.lock();
        if *closed {
            return Err(PipelineError::PipelineClosed);
        }
        self.first()?.enqueue_item(Item::Record(line))
    }

    /// Send the end marker into the first stage. Only the first call sends.
    pub fn close(&self) -> Result<()> {
        let mut closed = self.input_closed.lock();
        if *closed {
            return Ok(());
        }
        *closed = true;
        debug!("sending end marker");
        self.first()?.enqueue_item(Item::End)
    }

    /// Whether the end marker has been sent
    pub fn is_closed(&self) -> bool {
        *self.input_closed.lock()
    }

    /// Wait for each stage to drain, first to last.
    ///
    /// Stage i can only drain after stage i-1 forwarded the end marker, so
    /// returning means the whole pipeline has drained.
    pub fn drain_and_wait(&self) -> Result<()> {
        for stage in &self.stages {
            stage.wait_drained()?;
            info!(stage = stage.name(), "stage finished");
        }
        Ok(())
    }

    /// Finalize stages last to first. Failures are collected, never abort.
    ///
    /// Metrics are read after the joins, so records a worker consumed while
    /// finalizing are counted.
    pub fn teardown(mut self) -> ShutdownReport {
        let stages = std::mem::take(&mut self.stages);
        let handles: Vec<(String, StageMetrics)> = stages
            .iter()
            .map(|stage| (stage.name().to_string(), stage.metrics().clone()))
            .collect();

        let errors = finalize_reverse(stages);
        info!(errors = errors.len(), "pipeline torn down");
        ShutdownReport {
            stages: handles
                .into_iter()
                .map(|(name, metrics)| StageReport {
                    name,
                    metrics: metrics.snapshot(),
                })
                .collect(),
            errors,
        }
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (i, stage) in self.stages.iter().enumerate() {
            summary.push_str(&format!(
                "  Stage {} ({}): {}\n",
                i,
                stage.name(),
                stage.metrics().snapshot()
            ));
        }
        summary
    }

    fn first(&self) -> Result<&StageContext> {
        self.stages.first().ok_or(PipelineError::NoStages)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // Stages left here were never torn down; close them in reverse
        while let Some(stage) = self.stages.pop() {
            drop(stage);
        }
    }
}

/// Final metrics of one stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: String,
    pub metrics: MetricsSnapshot,
}

/// Outcome of [`Pipeline::teardown`]
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Per-stage metrics in pipeline order
    pub stages: Vec<StageReport>,
    /// Finalize failures in teardown order
    pub errors: Vec<PipelineError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
