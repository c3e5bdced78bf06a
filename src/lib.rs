//! Tokenizer for a small template language.
//!
//! Templates mix plain text with three constructs:
//!
//! - `{% name args %}` tags, optionally scoping a body closed by `{% endname %}`
//! - `{{ path|filter(args) }}` variables (`{{! ... }}` marks the output for escaping)
//! - `{# ... #}` comments, which are dropped
//!
//! Tag names are validated against a caller-supplied [`TagRegistry`]. The result is a
//! sequence of [`Token`]s borrowing from the source, where block tags carry the tokens of
//! their body.
//!
//! ```
//! use tplex::{Token, TagRegistry, tokenize};
//!
//! let tags = TagRegistry::builtin();
//! let tokens = tokenize("{% if user %}Hi {{ user.name|title }}{% endif %}", &tags).unwrap();
//! let [Token::Logic(tag)] = &tokens[..] else { unreachable!() };
//! assert_eq!(tag.name, "if");
//! assert_eq!(tag.body().len(), 2);
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod registry;
pub mod tokenizer;

pub use ast::{Filter, LogicToken, Token, VariableToken};
pub use error::{Delimiter, TokenizeError};
pub use registry::{TagDefinition, TagRegistry};
pub use tokenizer::Tokenizer;

/// Tokenize `source` against `registry` with default options.
pub fn tokenize<'a>(
    source: &'a str,
    registry: &'a TagRegistry,
) -> Result<Vec<Token<'a>>, TokenizeError> {
    Tokenizer::new(registry).tokenize(source)
}
