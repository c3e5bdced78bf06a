use crate::ast::{LogicToken, Token};
use crate::error::TokenizeError;
use crate::parser::{Segment, TemplateParser};
use crate::registry::TagRegistry;

/// Prefix marking a closing tag: `{% endfor %}` closes `{% for %}`.
pub const CLOSE_PREFIX: &str = "end";

const DEFAULT_MAX_DEPTH: usize = 100;

/// A block tag that is open and collecting its body.
struct OpenTag<'a> {
    token: LogicToken<'a>,
    body: Vec<Token<'a>>,
    offset: usize,
}

/// Template tokenizer validating tags against a registry
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer<'r> {
    registry: &'r TagRegistry,
    max_depth: usize,
}

impl<'r> Tokenizer<'r> {
    pub fn new(registry: &'r TagRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how many block tags may be open at once
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Tokenize template source (main entry point)
    pub fn tokenize<'a>(&self, source: &'a str) -> Result<Vec<Token<'a>>, TokenizeError>
    where
        'r: 'a,
    {
        let span = tracing::debug_span!("tokenize", len = source.len(), tags = self.registry.len());
        let _guard = span.enter();

        let result = self.tokenize_segments(source);
        if let Err(err) = &result {
            tracing::debug!(%err, "tokenizing failed");
        }
        result
    }

    fn tokenize_segments<'a>(&self, source: &'a str) -> Result<Vec<Token<'a>>, TokenizeError>
    where
        'r: 'a,
    {
        let mut tokens = Vec::new();
        let mut open: Vec<OpenTag<'a>> = Vec::new();

        for segment in TemplateParser::scan(source)? {
            let token = match segment {
                Segment::Text { text, .. } => Token::Text(text),
                Segment::Variable {
                    interior,
                    escape,
                    offset,
                } => Token::Variable(TemplateParser::parse_variable(interior, escape, offset)?),
                Segment::Tag { interior, offset } => {
                    match self.parse_tag(interior, offset, &mut open)? {
                        Some(token) => token,
                        None => continue,
                    }
                }
            };

            match open.last_mut() {
                Some(parent) => parent.body.push(token),
                None => tokens.push(token),
            }
        }

        if let Some(unclosed) = open.pop() {
            return Err(TokenizeError::MissingClose {
                name: unclosed.token.name.to_string(),
                offset: unclosed.offset,
            });
        }

        if tokens.iter().all(Token::is_blank) {
            tokens.clear();
        }
        Ok(tokens)
    }

    /// Handle one `{% %}` construct.
    ///
    /// Returns the token to append to the current body, or `None` when the tag was
    /// consumed by the open-tag stack (opened a block, or closed one).
    fn parse_tag<'a>(
        &self,
        interior: &'a str,
        offset: usize,
        open: &mut Vec<OpenTag<'a>>,
    ) -> Result<Option<Token<'a>>, TokenizeError>
    where
        'r: 'a,
    {
        let words = TemplateParser::split_tag(interior, offset)?;
        let Some((&name, args)) = words.split_first() else {
            return Err(TokenizeError::EmptyTag { offset });
        };

        if let Some(target) = self.closed_tag(name) {
            if !args.is_empty() {
                return Err(TokenizeError::ArgumentsOnClose {
                    name: target.to_string(),
                    offset,
                });
            }
            return self.close_tag(target, offset, open).map(Some);
        }

        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| TokenizeError::UnknownTag {
                name: name.to_string(),
                offset,
            })?;

        let token = LogicToken {
            name,
            args: args.to_vec(),
            definition,
            ancestors: open.iter().map(|tag| tag.token.name).collect(),
            body: None,
        };

        if !definition.requires_close() {
            tracing::trace!(tag = name, offset, "inline tag");
            return Ok(Some(Token::Logic(token)));
        }

        if open.len() >= self.max_depth {
            return Err(TokenizeError::NestingTooDeep {
                name: name.to_string(),
                max_depth: self.max_depth,
                offset,
            });
        }

        tracing::trace!(tag = name, offset, depth = open.len(), "opening block tag");
        open.push(OpenTag {
            token,
            body: Vec::new(),
            offset,
        });
        Ok(None)
    }

    /// The tag a closer refers to, when `name` is a closer at all.
    ///
    /// Registered names win, so a tag literally named `endless` is not a closer.
    fn closed_tag<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.registry.is_defined(name) {
            return None;
        }
        name.strip_prefix(CLOSE_PREFIX)
            .filter(|target| !target.is_empty())
    }

    /// Pop the innermost open tag for `end<target>`, returning it with its finished body.
    fn close_tag<'a>(
        &self,
        target: &str,
        offset: usize,
        open: &mut Vec<OpenTag<'a>>,
    ) -> Result<Token<'a>, TokenizeError> {
        if self
            .registry
            .get(target)
            .is_some_and(|definition| !definition.requires_close())
        {
            return Err(TokenizeError::UnexpectedClose {
                name: target.to_string(),
                offset,
            });
        }

        match open.pop() {
            Some(OpenTag {
                mut token, body, ..
            }) if token.name == target => {
                tracing::trace!(tag = target, offset, depth = open.len(), "closing block tag");
                token.body = Some(body);
                Ok(Token::Logic(token))
            }
            innermost => Err(TokenizeError::UnbalancedClose {
                name: target.to_string(),
                expected: innermost.map(|tag| tag.token.name.to_string()),
                offset,
            }),
        }
    }
}
