//! Built-in tokenizers

mod whitespace;

pub use whitespace::WhitespaceTokenizer;
