//! # NLU - Pluggable Text Processing Components
//!
//! Components are named processing steps that each turn input text into a
//! [`Context`] of named fields. A [`Pipeline`] is assembled from component
//! names through a [`ComponentRegistry`] and merges the outputs of every
//! step in order.
//!
//! ```
//! use nlu::{ComponentRegistry, Pipeline};
//!
//! let registry = ComponentRegistry::with_builtins();
//! let pipeline = Pipeline::build(&registry, &["tokenizer_whitespace"]).unwrap();
//! let context = pipeline.process("hello world").unwrap();
//! assert_eq!(context["tokens"], serde_json::json!(["hello", "world"]));
//! ```

pub mod component;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod tokenizers;

pub use component::{Component, Context, Provides, Tokenizer, PROCESS};
pub use error::{NluError, Result};
pub use pipeline::Pipeline;
pub use registry::{ComponentFactory, ComponentRegistry};
pub use tokenizers::WhitespaceTokenizer;
