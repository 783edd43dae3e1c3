use crate::error::{PipelineError, Result};
use crate::pipeline::PipelineBuilder;
use crate::registry::Registry;

/// Launch-time pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of every stage queue. Signed so that bad input from the
    /// command line can be reported as it was given.
    pub queue_capacity: i64,
    /// Stage identifiers in pipeline order
    pub stages: Vec<String>,
}

impl PipelineConfig {
    pub fn new(queue_capacity: i64, stages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            queue_capacity,
            stages: stages.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the configuration against `registry` without creating anything
    pub fn validate(&self, registry: &Registry) -> Result<usize> {
        let capacity = self.capacity()?;
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }
        if let Some(unknown) = self.stages.iter().find(|name| !registry.contains(name)) {
            return Err(PipelineError::UnknownStage(unknown.clone()));
        }
        Ok(capacity)
    }

    /// Queue capacity as a positive size
    pub fn capacity(&self) -> Result<usize> {
        usize::try_from(self.queue_capacity)
            .ok()
            .filter(|&capacity| capacity > 0)
            .ok_or(PipelineError::InvalidCapacity(self.queue_capacity))
    }

    /// A builder with every configured stage added by name
    pub fn builder(&self) -> Result<PipelineBuilder> {
        let builder = PipelineBuilder::new(self.capacity()?);
        Ok(self
            .stages
            .iter()
            .fold(builder, |builder, name| builder.add_named(name.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_valid_config() {
        let config = PipelineConfig::new(10, ["uppercaser", "logger"]);
        assert_eq!(config.validate(&Registry::builtin()).unwrap(), 10);
    }

    #[test]
    fn test_non_positive_capacity() {
        for capacity in [0, -1, -100] {
            let config = PipelineConfig::new(capacity, ["flipper"]);
            let err = config.validate(&Registry::builtin()).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidCapacity(c) if c == capacity));
            assert_eq!(err.kind(), ErrorKind::Config);
        }
    }

    #[test]
    fn test_unknown_stage() {
        let config = PipelineConfig::new(4, ["flipper", "nope", "logger"]);
        assert!(matches!(
            config.validate(&Registry::builtin()),
            Err(PipelineError::UnknownStage(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_empty_stage_list() {
        let config = PipelineConfig::new(4, Vec::<String>::new());
        assert!(matches!(
            config.validate(&Registry::builtin()),
            Err(PipelineError::NoStages)
        ));
    }
}
