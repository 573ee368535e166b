use thiserror::Error;

/// NLU component and pipeline errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NluError {
    #[error("Component '{name}' is already registered")]
    DuplicateComponent { name: String },

    #[error("Unknown component '{name}'")]
    UnknownComponent { name: String },

    #[error("Pipeline must contain at least one component")]
    EmptyPipeline,

    /// A component did not produce a field it declares
    #[error("Component '{component}' did not produce declared field '{field}'")]
    MissingField {
        component: &'static str,
        field: &'static str,
    },

    #[error("Component '{component}' failed: {message}")]
    Component {
        component: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, NluError>;
