//! Component and tokenizer traits

use crate::Result;
use serde_json::{Map, Value};

/// Named outputs a component run produces, merged across a pipeline
pub type Context = Map<String, Value>;

/// Operation name paired with the context fields it produces
pub type Provides = &'static [(&'static str, &'static [&'static str])];

/// Operation every component exposes to the pipeline
pub const PROCESS: &str = "process";

/// A named, pluggable processing step
pub trait Component: Send + Sync {
    /// Stable identifier used in pipeline configuration
    fn name(&self) -> &'static str;

    /// Published contract: which fields each operation produces
    fn context_provides(&self) -> Provides;

    fn process(&self, text: &str) -> Result<Context>;

    /// Fields promised by `operation`, empty if it is not declared
    fn provides(&self, operation: &str) -> &'static [&'static str] {
        self.context_provides()
            .iter()
            .find(|(op, _)| *op == operation)
            .map(|(_, fields)| *fields)
            .unwrap_or_default()
    }
}

/// Splits raw text into tokens
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}
