use std::fmt;

use thiserror::Error;

use crate::parser::Rule;

/// The three delimiter families recognized in template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// `{% ... %}`
    Tag,
    /// `{{ ... }}`
    Variable,
    /// `{# ... #}`
    Comment,
}

impl Delimiter {
    pub const fn opener(self) -> &'static str {
        match self {
            Delimiter::Tag => "{%",
            Delimiter::Variable => "{{",
            Delimiter::Comment => "{#",
        }
    }

    pub const fn closer(self) -> &'static str {
        match self {
            Delimiter::Tag => "%}",
            Delimiter::Variable => "}}",
            Delimiter::Comment => "#}",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.opener(), self.closer())
    }
}

/// Structural errors raised while tokenizing a template.
///
/// Offsets are byte offsets into the tokenized source and point at the start of the
/// offending construct, except for [`TokenizeError::UnterminatedQuote`] which points at the
/// opening quote itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unknown tag `{name}` at byte {offset}")]
    UnknownTag { name: String, offset: usize },

    #[error("tag `{name}` opened at byte {offset} is never closed by `end{name}`")]
    MissingClose { name: String, offset: usize },

    #[error("`end{name}` at byte {offset} closes `{name}`, which does not take a closing tag")]
    UnexpectedClose { name: String, offset: usize },

    #[error("`end{name}` at byte {offset} does not close the innermost open tag{}", expected_suffix(.expected))]
    UnbalancedClose {
        name: String,
        expected: Option<String>,
        offset: usize,
    },

    #[error("`end{name}` at byte {offset} takes no arguments")]
    ArgumentsOnClose { name: String, offset: usize },

    #[error("unterminated `{}` at byte {offset}, expected `{}`", .delimiter.opener(), .delimiter.closer())]
    UnterminatedDelimiter { delimiter: Delimiter, offset: usize },

    #[error("unterminated quote at byte {offset}")]
    UnterminatedQuote { offset: usize },

    #[error("malformed variable `{interior}` at byte {offset}")]
    MalformedVariable { interior: String, offset: usize },

    #[error("tag at byte {offset} has no name")]
    EmptyTag { offset: usize },

    #[error("tag `{name}` at byte {offset} exceeds the maximum nesting depth of {max_depth}")]
    NestingTooDeep {
        name: String,
        max_depth: usize,
        offset: usize,
    },

    #[error("template grammar error: {0}")]
    Grammar(Box<pest::error::Error<Rule>>),
}

fn expected_suffix(expected: &Option<String>) -> String {
    match expected {
        Some(open) => format!(" `{open}`"),
        None => " (no tag is open)".to_string(),
    }
}

impl TokenizeError {
    /// Byte offset of the error in the source, when one is known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            TokenizeError::UnknownTag { offset, .. }
            | TokenizeError::MissingClose { offset, .. }
            | TokenizeError::UnexpectedClose { offset, .. }
            | TokenizeError::UnbalancedClose { offset, .. }
            | TokenizeError::ArgumentsOnClose { offset, .. }
            | TokenizeError::UnterminatedDelimiter { offset, .. }
            | TokenizeError::UnterminatedQuote { offset }
            | TokenizeError::MalformedVariable { offset, .. }
            | TokenizeError::EmptyTag { offset }
            | TokenizeError::NestingTooDeep { offset, .. } => Some(*offset),
            TokenizeError::Grammar(err) => match err.location {
                pest::error::InputLocation::Pos(pos) => Some(pos),
                pest::error::InputLocation::Span((start, _)) => Some(start),
            },
        }
    }

    /// 1-based line and column of the error in `source`.
    pub fn line_col(&self, source: &str) -> Option<(usize, usize)> {
        self.offset().and_then(|offset| line_col(source, offset))
    }
}

impl From<pest::error::Error<Rule>> for TokenizeError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        TokenizeError::Grammar(Box::new(err))
    }
}

/// 1-based line and column (in chars) of a byte offset, `None` when the offset is past the
/// end of `source` or not on a char boundary.
pub fn line_col(source: &str, offset: usize) -> Option<(usize, usize)> {
    pest::Position::new(source, offset).map(|pos| pos.line_col())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "ab\ncd{% x";
        assert_eq!(line_col(source, 0), Some((1, 1)));
        assert_eq!(line_col(source, 3), Some((2, 1)));
        assert_eq!(line_col(source, 5), Some((2, 3)));
        assert_eq!(line_col(source, source.len()), Some((2, 7)));
        assert_eq!(line_col(source, 100), None);
    }

    #[test]
    fn test_line_col_counts_chars() {
        assert_eq!(line_col("œ∑{{", 5), Some((1, 3)));
        assert_eq!(line_col("œ∑{{", 1), None);

        let source = "a\n{% x";
        let err = TokenizeError::UnterminatedDelimiter {
            delimiter: Delimiter::Tag,
            offset: 2,
        };
        assert_eq!(err.line_col(source), Some((2, 1)));
    }

    #[test]
    fn test_display() {
        let err = TokenizeError::UnterminatedDelimiter {
            delimiter: Delimiter::Comment,
            offset: 4,
        };
        assert_eq!(err.to_string(), "unterminated `{#` at byte 4, expected `#}`");

        let err = TokenizeError::UnbalancedClose {
            name: "foo".to_string(),
            expected: Some("blah".to_string()),
            offset: 10,
        };
        assert_eq!(
            err.to_string(),
            "`endfoo` at byte 10 does not close the innermost open tag `blah`"
        );
        assert_eq!(err.offset(), Some(10));
    }
}
