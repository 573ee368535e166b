use crate::component::{Component, Context, Provides, Tokenizer, PROCESS};
use crate::Result;
use serde_json::Value;

const PROVIDES: Provides = &[(PROCESS, &[WhitespaceTokenizer::TOKENS])];

/// Splits on runs of Unicode whitespace and the ASCII information
/// separators U+001C..=U+001F
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

impl WhitespaceTokenizer {
    pub const NAME: &'static str = "tokenizer_whitespace";
    pub const TOKENS: &'static str = "tokens";
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(is_separator)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Component for WhitespaceTokenizer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn context_provides(&self) -> Provides {
        PROVIDES
    }

    fn process(&self, text: &str) -> Result<Context> {
        let tokens = self.tokenize(text).into_iter().map(Value::String).collect();
        let mut context = Context::new();
        context.insert(Self::TOKENS.to_string(), Value::Array(tokens));
        Ok(context)
    }
}
