use thiserror::Error;

/// Result type for line pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Coarse classification of a [`PipelineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad capacity, unknown stage, empty stage list
    Config,
    /// Allocation or synchronization primitive failure
    Resource,
    /// Put into a queue or pipeline that no longer accepts items
    ClosedQueue,
    /// Worker spawn or join failure
    Thread,
    /// Downstream refused an item
    Downstream,
    /// Reading external input failed
    Io,
}

/// Errors that can occur while building, running or tearing down a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Queue capacity must be a positive integer
    #[error("Invalid queue capacity {0}: must be greater than 0")]
    InvalidCapacity(i64),

    /// Stage identifier not present in the registry
    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    /// No stages in pipeline
    #[error("Cannot build pipeline with no stages")]
    NoStages,

    /// Other configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Queue storage could not be allocated
    #[error("Out of memory allocating queue of capacity {0}")]
    OutOfMemory(usize),

    /// Other resource error
    #[error("Resource error: {0}")]
    ResourceError(String),

    /// Put after the queue was closed
    #[error("Queue is closed")]
    QueueClosed,

    /// Feed after the pipeline input was closed
    #[error("Pipeline input is closed")]
    PipelineClosed,

    /// Thread spawn or join error
    #[error("Thread error in stage '{stage}': {message}")]
    ThreadError { stage: String, message: String },

    /// Hand-off to the next stage failed
    #[error("Stage '{stage}' could not accept item: {source}")]
    Downstream {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// Input read error
    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidCapacity(_)
            | PipelineError::UnknownStage(_)
            | PipelineError::NoStages
            | PipelineError::ConfigError(_) => ErrorKind::Config,
            PipelineError::OutOfMemory(_) | PipelineError::ResourceError(_) => {
                ErrorKind::Resource
            }
            PipelineError::QueueClosed | PipelineError::PipelineClosed => ErrorKind::ClosedQueue,
            PipelineError::ThreadError { .. } => ErrorKind::Thread,
            PipelineError::Downstream { .. } => ErrorKind::Downstream,
            PipelineError::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PipelineError::InvalidCapacity(0).kind(), ErrorKind::Config);
        assert_eq!(PipelineError::UnknownStage("x".into()).kind(), ErrorKind::Config);
        assert_eq!(PipelineError::OutOfMemory(8).kind(), ErrorKind::Resource);
        assert_eq!(PipelineError::QueueClosed.kind(), ErrorKind::ClosedQueue);
        let join = PipelineError::ThreadError {
            stage: "flipper".into(),
            message: "panicked".into(),
        };
        assert_eq!(join.kind(), ErrorKind::Thread);
    }

    #[test]
    fn test_error_messages_name_the_stage() {
        let err = PipelineError::Downstream {
            stage: "rotator".into(),
            source: Box::new(PipelineError::QueueClosed),
        };
        assert_eq!(
            err.to_string(),
            "Stage 'rotator' could not accept item: Queue is closed"
        );
    }
}
