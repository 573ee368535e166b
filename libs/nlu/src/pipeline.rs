//! Ordered component pipeline
//!
//! Every component runs on the same input text; their contexts are merged
//! in order, so a later component overrides keys set by an earlier one.

use crate::component::{Component, Context, PROCESS};
use crate::registry::ComponentRegistry;
use crate::{NluError, Result};
use tracing::debug;

pub struct Pipeline {
    components: Vec<Box<dyn Component>>,
}

impl Pipeline {
    /// Build from component names, resolved through `registry`
    pub fn build<S: AsRef<str>>(registry: &ComponentRegistry, names: &[S]) -> Result<Self> {
        let components = names
            .iter()
            .map(|name| registry.create(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_components(components)
    }

    pub fn from_components(components: Vec<Box<dyn Component>>) -> Result<Self> {
        if components.is_empty() {
            return Err(NluError::EmptyPipeline);
        }
        Ok(Self { components })
    }

    /// Run every component on `text` and merge their outputs
    pub fn process(&self, text: &str) -> Result<Context> {
        let mut context = Context::new();
        for component in &self.components {
            let output = component.process(text)?;
            if let Some(field) = component
                .provides(PROCESS)
                .iter()
                .find(|field| !output.contains_key(**field))
            {
                return Err(NluError::MissingField {
                    component: component.name(),
                    field: *field,
                });
            }
            debug!(component = component.name(), fields = output.len(), "Component processed text");
            context.extend(output);
        }
        Ok(context)
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("components", &self.component_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Provides;
    use serde_json::{json, Value};

    /// Declares "tokens" but never produces it
    struct Forgetful;

    impl Component for Forgetful {
        fn name(&self) -> &'static str {
            "forgetful"
        }

        fn context_provides(&self) -> Provides {
            &[("process", &["tokens"])]
        }

        fn process(&self, _text: &str) -> Result<Context> {
            Ok(Context::new())
        }
    }

    /// Overrides "tokens" with a single upper-cased token
    struct Shouter;

    impl Component for Shouter {
        fn name(&self) -> &'static str {
            "shouter"
        }

        fn context_provides(&self) -> Provides {
            &[("process", &["tokens", "loud"])]
        }

        fn process(&self, text: &str) -> Result<Context> {
            let mut context = Context::new();
            context.insert("tokens".into(), json!([text.to_uppercase()]));
            context.insert("loud".into(), Value::Bool(true));
            Ok(context)
        }
    }

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::with_builtins();
        registry.register("forgetful", || Box::new(Forgetful)).unwrap();
        registry.register("shouter", || Box::new(Shouter)).unwrap();
        registry
    }

    #[test]
    fn test_default_pipeline_tokenizes() {
        let pipeline = Pipeline::build(&registry(), &["tokenizer_whitespace"]).unwrap();
        let context = pipeline.process("hello world foo").unwrap();
        assert_eq!(
            Value::Object(context),
            json!({ "tokens": ["hello", "world", "foo"] })
        );
    }

    #[test]
    fn test_later_components_override_earlier_keys() {
        let pipeline = Pipeline::build(&registry(), &["tokenizer_whitespace", "shouter"]).unwrap();
        assert_eq!(pipeline.component_names(), vec!["tokenizer_whitespace", "shouter"]);

        let context = pipeline.process("a b").unwrap();
        assert_eq!(Value::Object(context), json!({ "tokens": ["A B"], "loud": true }));
    }

    #[test]
    fn test_missing_declared_field_fails() {
        let pipeline = Pipeline::build(&registry(), &["forgetful"]).unwrap();
        assert_eq!(
            pipeline.process("a").unwrap_err(),
            NluError::MissingField {
                component: "forgetful",
                field: "tokens"
            }
        );
    }

    #[test]
    fn test_build_errors() {
        let empty: [&str; 0] = [];
        assert_eq!(
            Pipeline::build(&registry(), &empty).unwrap_err(),
            NluError::EmptyPipeline
        );
        assert!(matches!(
            Pipeline::build(&registry(), &["tokenizer_whitespace", "nope"]),
            Err(NluError::UnknownComponent { .. })
        ));
    }
}
