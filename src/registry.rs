use crate::error::{PipelineError, Result};
use crate::stage::Transform;
use crate::transforms::{
    Expander, Flipper, Identity, Logger, Rotator, Typewriter, Uppercaser, TYPEWRITER_DELAY,
};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Creates a fresh transform for each stage instance
pub type TransformFactory = Arc<dyn Fn() -> Box<dyn Transform> + Send + Sync>;

/// Static table of stage identifiers and the transforms they create
#[derive(Clone, Default)]
pub struct Registry {
    factories: BTreeMap<String, TransformFactory>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in stages with the default typewriter delay
    pub fn builtin() -> Self {
        Self::with_typewriter_delay(TYPEWRITER_DELAY)
    }

    /// The built-in stages with a custom typewriter per-character delay
    pub fn with_typewriter_delay(delay: Duration) -> Self {
        let mut registry = Self::new();
        registry
            .register("logger", || Box::new(Logger::new()))
            .register("typewriter", move || {
                Box::new(Typewriter::with_writer(io::stdout(), delay))
            })
            .register("uppercaser", || Box::new(Uppercaser))
            .register("rotator", || Box::new(Rotator))
            .register("flipper", || Box::new(Flipper))
            .register("expander", || Box::new(Expander));
        registry
    }

    /// Add or replace a stage identifier
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Transform> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register a stage that passes records through unchanged
    pub fn register_identity(&mut self, name: impl Into<String>) -> &mut Self {
        self.register(name, || Box::new(Identity))
    }

    /// Create the transform for `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn Transform>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec!["expander", "flipper", "logger", "rotator", "typewriter", "uppercaser"]
        );
    }

    #[test]
    fn test_create_known_stage() {
        let registry = Registry::builtin();
        let mut flipper = registry.create("flipper").unwrap();
        assert_eq!(flipper.name(), "flipper");
        assert_eq!(flipper.apply("abc"), Some("cba".to_string()));
    }

    #[test]
    fn test_unknown_stage() {
        let registry = Registry::builtin();
        assert!(!registry.contains("reverser"));
        assert!(matches!(
            registry.create("reverser"),
            Err(PipelineError::UnknownStage(name)) if name == "reverser"
        ));
    }

    #[test]
    fn test_register_custom_stage() {
        let mut registry = Registry::new();
        registry.register_identity("id");
        let mut stage = registry.create("id").unwrap();
        assert_eq!(stage.apply("x"), None);
    }
}
