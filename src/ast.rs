use std::fmt;

use crate::registry::TagDefinition;

/// Top-level tokenized construct
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Literal text between constructs, verbatim
    Text(&'a str),
    /// Tag: `{% name args %}`, with its body when the tag requires closing
    Logic(LogicToken<'a>),
    /// Variable: `{{ path|filter(args) }}`
    Variable(VariableToken<'a>),
}

impl Token<'_> {
    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text(_))
    }

    /// Text that renders as nothing but whitespace.
    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, Token::Text(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicToken<'a> {
    pub name: &'a str,
    /// Raw arguments, quotes and escapes preserved
    pub args: Vec<&'a str>,
    pub definition: &'a TagDefinition,
    /// Enclosing open block tags, outermost first
    pub ancestors: Vec<&'a str>,
    /// Present exactly when `definition` requires closing
    pub body: Option<Vec<Token<'a>>>,
}

impl<'a> LogicToken<'a> {
    pub fn requires_close(&self) -> bool {
        self.definition.requires_close()
    }

    pub fn body(&self) -> &[Token<'a>] {
        self.body.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableToken<'a> {
    /// Dotted accessor, not split
    pub path: &'a str,
    pub filters: Vec<Filter<'a>>,
    pub escape: bool,
    /// Arguments attached to the path itself: `{{ path(a, b) }}`
    pub args: Option<Vec<&'a str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Logic(logic) => write!(f, "{logic}"),
            Token::Variable(var) => write!(f, "{var}"),
        }
    }
}

impl fmt::Display for LogicToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{% {}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        f.write_str(" %}")?;

        if let Some(body) = &self.body {
            for token in body {
                write!(f, "{token}")?;
            }
            write!(f, "{{% end{} %}}", self.name)?;
        }
        Ok(())
    }
}

impl fmt::Display for VariableToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.escape { "{{! " } else { "{{ " })?;
        f.write_str(self.path)?;
        if let Some(args) = &self.args {
            write!(f, "({})", args.join(", "))?;
        }
        for filter in &self.filters {
            write!(f, "|{filter}")?;
        }
        f.write_str(" }}")
    }
}

impl fmt::Display for Filter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if !self.args.is_empty() {
            write!(f, "({})", self.args.join(", "))?;
        }
        Ok(())
    }
}
