use pest::{Parser, iterators::Pair};
use pest_derive::Parser;

use crate::ast::{Filter, VariableToken};
use crate::error::{Delimiter, TokenizeError};

/// Length of every opener and closer: `{%`, `%}`, `{{`, `}}`, `{#`, `#}`.
const DELIMITER_LEN: usize = 2;

#[derive(Parser)]
#[grammar = "src/template.pest"]
pub struct TemplateParser;

/// A lexical span of template source. Comments never produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text {
        text: &'a str,
        offset: usize,
    },
    Tag {
        interior: &'a str,
        offset: usize,
    },
    Variable {
        interior: &'a str,
        escape: bool,
        offset: usize,
    },
}

impl TemplateParser {
    /// Split template source into text runs and construct interiors, in source order
    pub fn scan(source: &str) -> Result<Vec<Segment<'_>>, TokenizeError> {
        let mut pairs = TemplateParser::parse(Rule::template, source)?;
        let Some(template) = pairs.next() else {
            return Ok(Vec::new());
        };

        let mut segments = Vec::new();
        for pair in template.into_inner() {
            if let Some(segment) = Self::parse_segment(pair)? {
                segments.push(segment);
            }
        }
        Ok(segments)
    }

    fn parse_segment(pair: Pair<'_, Rule>) -> Result<Option<Segment<'_>>, TokenizeError> {
        let offset = pair.as_span().start();
        match pair.as_rule() {
            Rule::text => {
                tracing::trace!(offset, len = pair.as_str().len(), "text");
                Ok(Some(Segment::Text {
                    text: pair.as_str(),
                    offset,
                }))
            }
            Rule::comment => {
                tracing::trace!(offset, "skipping comment");
                Ok(None)
            }
            Rule::tag => {
                let interior = pair
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::tag_body)
                    .map(|p| p.as_str())
                    .unwrap_or_default();
                tracing::trace!(offset, interior, "tag");
                Ok(Some(Segment::Tag { interior, offset }))
            }
            Rule::variable => {
                let mut escape = false;
                let mut interior = "";
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::escape_marker => escape = true,
                        Rule::variable_body => interior = inner.as_str(),
                        _ => {}
                    }
                }
                tracing::trace!(offset, interior, escape, "variable");
                Ok(Some(Segment::Variable {
                    interior,
                    escape,
                    offset,
                }))
            }
            Rule::unterminated_tag => Err(TokenizeError::UnterminatedDelimiter {
                delimiter: Delimiter::Tag,
                offset,
            }),
            Rule::unterminated_variable => Err(TokenizeError::UnterminatedDelimiter {
                delimiter: Delimiter::Variable,
                offset,
            }),
            Rule::unterminated_comment => Err(TokenizeError::UnterminatedDelimiter {
                delimiter: Delimiter::Comment,
                offset,
            }),
            _ => Ok(None),
        }
    }

    /// Split a tag interior into its name and raw arguments on whitespace outside quotes.
    ///
    /// `offset` is the position of the tag's `{%` in the source.
    pub fn split_tag(interior: &str, offset: usize) -> Result<Vec<&str>, TokenizeError> {
        let base = offset + DELIMITER_LEN;
        let mut pairs = TemplateParser::parse(Rule::tag_interior, interior)?;
        let Some(tag) = pairs.next() else {
            return Ok(Vec::new());
        };

        let mut words = Vec::new();
        for word in tag.into_inner().filter(|p| p.as_rule() == Rule::tag_word) {
            check_quotes(&word, base)?;
            words.push(word.as_str());
        }
        Ok(words)
    }

    /// Parse a variable interior: `path`, `path(args)`, then any `|filter` / `|filter(args)`.
    ///
    /// `offset` is the position of the variable's `{{` in the source.
    pub fn parse_variable(
        interior: &str,
        escape: bool,
        offset: usize,
    ) -> Result<VariableToken<'_>, TokenizeError> {
        let base = offset + DELIMITER_LEN + usize::from(escape);
        let malformed = || TokenizeError::MalformedVariable {
            interior: interior.trim().to_string(),
            offset,
        };

        let pipeline = TemplateParser::parse(Rule::pipeline, interior)
            .ok()
            .and_then(|mut pairs| pairs.next())
            .ok_or_else(malformed)?;

        // Chain is local to this construct; filters never carry over.
        let mut head = None;
        let mut filters = Vec::new();
        for stage in pipeline
            .into_inner()
            .filter(|p| p.as_rule() == Rule::stage)
        {
            check_quotes(&stage, base)?;
            let (name, args) = Self::parse_call(stage.as_str()).ok_or_else(malformed)?;
            if head.is_none() {
                head = Some((name, args));
            } else {
                filters.push(Filter {
                    name,
                    args: args.unwrap_or_default(),
                });
            }
        }

        let (path, args) = head.ok_or_else(malformed)?;
        Ok(VariableToken {
            path,
            filters,
            escape,
            args,
        })
    }

    /// `name` or `name(arg, arg)`; `None` when the stage is not of that shape.
    fn parse_call(stage: &str) -> Option<(&str, Option<Vec<&str>>)> {
        let call = TemplateParser::parse(Rule::call, stage).ok()?.next()?;

        let mut name = None;
        let mut args = None;
        for pair in call.into_inner() {
            match pair.as_rule() {
                Rule::name => name = Some(pair.as_str()),
                Rule::call_args => {
                    args = Some(
                        pair.into_inner()
                            .filter(|p| p.as_rule() == Rule::call_arg)
                            .map(|p| p.as_str())
                            .collect(),
                    )
                }
                _ => {}
            }
        }
        Some((name?, args))
    }
}

/// Fail on the first quote in `pair` that never closes.
fn check_quotes(pair: &Pair<'_, Rule>, base: usize) -> Result<(), TokenizeError> {
    match pair
        .clone()
        .into_inner()
        .find(|p| p.as_rule() == Rule::open_quote)
    {
        Some(quote) => Err(TokenizeError::UnterminatedQuote {
            offset: base + quote.as_span().start(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_mixed() {
        let input = "a {{ b }}{# c #}\n{% d e %}{{!f}}";
        let segments = TemplateParser::scan(input).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text { text: "a ", offset: 0 },
                Segment::Variable {
                    interior: " b ",
                    escape: false,
                    offset: 2
                },
                Segment::Text { text: "\n", offset: 16 },
                Segment::Tag {
                    interior: " d e ",
                    offset: 17
                },
                Segment::Variable {
                    interior: "f",
                    escape: true,
                    offset: 26
                },
            ]
        );
    }

    #[test]
    fn test_scan_empty() {
        assert!(TemplateParser::scan("").unwrap().is_empty());
    }

    #[test]
    fn test_scan_lone_braces_are_text() {
        let segments = TemplateParser::scan("a { b } % #}").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Text {
                text: "a { b } % #}",
                offset: 0
            }]
        );
    }

    #[test]
    fn test_scan_closer_ignores_quotes() {
        let segments = TemplateParser::scan(r#"{% a "%}" %}"#).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Tag {
                    interior: r#" a ""#,
                    offset: 0
                },
                Segment::Text {
                    text: r#"" %}"#,
                    offset: 8
                },
            ]
        );
    }

    #[test]
    fn test_scan_unterminated() {
        let cases = [
            ("abc {% foo", Delimiter::Tag, 4),
            ("{{ foo }", Delimiter::Variable, 0),
            ("x{# never", Delimiter::Comment, 1),
        ];
        for (input, delimiter, offset) in cases {
            assert_eq!(
                TemplateParser::scan(input),
                Err(TokenizeError::UnterminatedDelimiter { delimiter, offset }),
                "{input}"
            );
        }
    }

    #[test]
    fn test_split_tag() {
        assert_eq!(TemplateParser::split_tag(" blah ", 0).unwrap(), vec!["blah"]);
        assert_eq!(
            TemplateParser::split_tag(r#" blah "foo bar" barfoo 'x\'y' "#, 0).unwrap(),
            vec!["blah", r#""foo bar""#, "barfoo", r#"'x\'y'"#]
        );
        assert_eq!(
            TemplateParser::split_tag("set\tx=\"a b\"\n", 0).unwrap(),
            vec!["set", "x=\"a b\""]
        );
        assert!(TemplateParser::split_tag("  ", 0).unwrap().is_empty());
    }

    #[test]
    fn test_split_tag_unterminated_quote() {
        assert_eq!(
            TemplateParser::split_tag(r#" blah "oops "#, 10),
            Err(TokenizeError::UnterminatedQuote { offset: 18 })
        );
        assert_eq!(
            TemplateParser::split_tag(r#" blah "esc\" "#, 0),
            Err(TokenizeError::UnterminatedQuote { offset: 8 })
        );
    }

    #[test]
    fn test_parse_variable_path() {
        let var = TemplateParser::parse_variable(" foo.bar ", false, 0).unwrap();
        assert_eq!(var.path, "foo.bar");
        assert!(var.filters.is_empty());
        assert_eq!(var.args, None);
        assert!(!var.escape);
    }

    #[test]
    fn test_parse_variable_filters() {
        let var =
            TemplateParser::parse_variable(r#" foobar|baz(1)|rad | awesome("param", 2) "#, false, 0)
                .unwrap();
        assert_eq!(var.path, "foobar");
        assert_eq!(
            var.filters,
            vec![
                Filter {
                    name: "baz",
                    args: vec!["1"]
                },
                Filter {
                    name: "rad",
                    args: vec![]
                },
                Filter {
                    name: "awesome",
                    args: vec![r#""param""#, "2"]
                },
            ]
        );
    }

    #[test]
    fn test_parse_variable_quoted_pipes_and_commas() {
        let var = TemplateParser::parse_variable(r#"x|join("|, ")|f('a,b', "c)")"#, false, 0)
            .unwrap();
        assert_eq!(var.filters[0].args, vec![r#""|, ""#]);
        assert_eq!(var.filters[1].args, vec!["'a,b'", r#""c)""#]);
    }

    #[test]
    fn test_parse_variable_own_args() {
        let var = TemplateParser::parse_variable(" greet('you')|upper ", true, 0).unwrap();
        assert_eq!(var.path, "greet");
        assert_eq!(var.args, Some(vec!["'you'"]));
        assert!(var.escape);
        assert_eq!(var.filters.len(), 1);

        let var = TemplateParser::parse_variable("now()", false, 0).unwrap();
        assert_eq!(var.args, Some(vec![]));
    }

    #[test]
    fn test_parse_variable_malformed() {
        for interior in ["", "  ", "foo|", "foo|bar(1", "foo|bar(g(1)", "foo|bar(1))", "foo|bar(1) x", "foo(a,)", "|foo"] {
            assert!(
                matches!(
                    TemplateParser::parse_variable(interior, false, 3),
                    Err(TokenizeError::MalformedVariable { offset: 3, .. })
                ),
                "{interior:?}"
            );
        }
    }

    #[test]
    fn test_parse_variable_expression_args() {
        let cases: [(&str, Vec<&str>); 6] = [
            ("x|f(a + b)", vec!["a + b"]),
            ("x|f(g(1), 2)", vec!["g(1)", "2"]),
            ("x|f( 1 , 2 )", vec!["1", "2"]),
            ("x|f()", vec![]),
            ("x|f(a b)", vec!["a b"]),
            (r#"x|f(g("(", ')'), h((1, 2)) )"#, vec![r#"g("(", ')')"#, "h((1, 2))"]),
        ];
        for (interior, args) in cases {
            let var = TemplateParser::parse_variable(interior, false, 0).unwrap();
            assert_eq!(var.filters[0].args, args, "{interior:?}");
        }

        let var = TemplateParser::parse_variable("range(0, n - 1)", false, 0).unwrap();
        assert_eq!(var.path, "range");
        assert_eq!(var.args, Some(vec!["0", "n - 1"]));
    }

    #[test]
    fn test_parse_variable_unterminated_quote() {
        assert_eq!(
            TemplateParser::parse_variable(r#" foo|blah("abc) "#, false, 0),
            Err(TokenizeError::UnterminatedQuote { offset: 12 })
        );
    }
}
