//! A multi-stage, line-oriented text pipeline.
//!
//! Each stage owns a worker thread and a bounded blocking queue. Stages are
//! chained by handing items to the next stage's queue, so a slow stage
//! stalls the ones before it instead of growing memory. Records stream
//! through until the `<END>` marker, which every stage forwards before
//! reporting itself drained.
//!
//! # Features
//!
//! - Sticky-signal [`Monitor`] that never loses a wakeup
//! - [`BoundedQueue`] with blocking put/get, close, and a drained signal
//! - Generic stage worker loop with forward-or-release ownership handling
//! - Fail-fast pipeline construction with reverse-order teardown
//! - Static stage [`Registry`] with the built-in text transforms
//! - Per-stage metrics: processed, forwarded, released, dropped, latency
//!
//! # Example
//!
//! ```no_run
//! use line_pipeline::PipelineBuilder;
//!
//! let mut pipeline = PipelineBuilder::new(10)
//!     .add_named("uppercaser")
//!     .add_named("logger")
//!     .build()?;
//! pipeline.wire();
//!
//! pipeline.feed("hello".to_string())?;
//! pipeline.close()?;
//! pipeline.drain_and_wait()?;
//! let report = pipeline.teardown();
//! assert!(report.is_clean());
//! # Ok::<(), line_pipeline::PipelineError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod pipeline;
pub mod registry;
pub mod stage;
pub mod transforms;

// Re-exports for convenience
pub use buffer::BoundedQueue;
pub use config::PipelineConfig;
pub use context::StageContext;
pub use error::{ErrorKind, PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use monitor::Monitor;
pub use pipeline::{Pipeline, PipelineBuilder, ShutdownReport, StageReport};
pub use registry::Registry;
pub use stage::{Discard, Downstream, Item, StageInput, StageRunner, Transform, END_MARKER};
pub use transforms::{Expander, FnTransform, Flipper, Identity, Logger, Rotator, Typewriter, Uppercaser};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
