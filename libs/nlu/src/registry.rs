//! Component registry for configuration-based pipeline construction
//!
//! Maps component names, as they appear in `frame.json`, to factories. A
//! pipeline is built by looking each configured name up here, so adding a
//! component means registering it rather than touching the pipeline.

use crate::component::Component;
use crate::tokenizers::WhitespaceTokenizer;
use crate::{NluError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Creates a fresh component instance
pub type ComponentFactory = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Registry of available components by name
#[derive(Default)]
pub struct ComponentRegistry {
    factories: BTreeMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in component
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtin: ComponentFactory = Box::new(|| Box::new(WhitespaceTokenizer) as Box<dyn Component>);
        registry.factories.insert(WhitespaceTokenizer::NAME.to_string(), builtin);
        registry
    }

    /// Register a factory under `name`; names are unique
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(NluError::DuplicateComponent { name });
        }
        debug!(component = %name, "Registered NLU component");
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Instantiate the component registered as `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn Component>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| NluError::UnknownComponent {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
