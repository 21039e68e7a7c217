//! Positional printf-style templates.
//!
//! A template is rendered against the argument list
//! `[whole match, group 1, group 2, ...]`:
//!
//! - `%s` takes the next sequential argument (the first one is the whole match)
//! - `%N$s` takes argument `N`, counting from 1 (`%2$s` is capture group 1)
//! - `%%` is a literal percent sign
//!
//! Arguments that do not exist, or capture groups that did not take part in
//! the match, render as an empty string.

use regex::Captures;
use thiserror::Error;

/// Errors raised while compiling a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unsupported directive `{directive}` at offset {offset}")]
    Unsupported { directive: String, offset: usize },

    #[error("argument numbers start at 1 (offset {offset})")]
    ZeroArgument { offset: usize },

    #[error("dangling `%` at the end of the template")]
    Dangling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `%s`
    Next,
    /// `%N$s`, stored zero-based.
    Arg(usize),
}

/// A compiled positional template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            match chars.next() {
                None => return Err(TemplateError::Dangling),
                Some((_, '%')) => literal.push('%'),
                Some((_, 's')) => {
                    flush(&mut literal, &mut segments);
                    segments.push(Segment::Next);
                }
                Some((_, d)) if d.is_ascii_digit() => {
                    let mut number = String::from(d);
                    while let Some(&(_, d)) = chars.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        number.push(d);
                        chars.next();
                    }

                    let dollar = chars.next().map(|(_, c)| c);
                    let conversion = chars.next().map(|(_, c)| c);
                    if dollar != Some('$') || conversion != Some('s') {
                        let end = chars.peek().map(|&(i, _)| i).unwrap_or(source.len());
                        return Err(TemplateError::Unsupported {
                            directive: source[offset..end].to_string(),
                            offset,
                        });
                    }

                    let index: usize = number.parse().map_err(|_| TemplateError::Unsupported {
                        directive: format!("%{}$s", number),
                        offset,
                    })?;
                    if index == 0 {
                        return Err(TemplateError::ZeroArgument { offset });
                    }

                    flush(&mut literal, &mut segments);
                    segments.push(Segment::Arg(index - 1));
                }
                Some((next, other)) => {
                    return Err(TemplateError::Unsupported {
                        directive: source[offset..next + other.len_utf8()].to_string(),
                        offset,
                    });
                }
            }
        }

        flush(&mut literal, &mut segments);

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as written in the configuration.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render against regex captures (index 0 is the whole match).
    pub fn render(&self, captures: &Captures<'_>) -> String {
        self.render_with(|index| captures.get(index).map(|m| m.as_str()))
    }

    /// Render with an arbitrary argument lookup.
    pub fn render_with<'a>(&self, lookup: impl Fn(usize) -> Option<&'a str>) -> String {
        let mut out = String::new();
        let mut next = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Next => {
                    out.push_str(lookup(next).unwrap_or_default());
                    next += 1;
                }
                Segment::Arg(index) => out.push_str(lookup(*index).unwrap_or_default()),
            }
        }

        out
    }
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}
