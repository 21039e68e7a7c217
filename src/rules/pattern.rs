//! Rule pattern compilation.
//!
//! Patterns are plain `regex` syntax. Patterns carried over from PCRE-style
//! configuration (`@...@i`) are unwrapped and their trailing flags turned into
//! an inline flag group.

use regex::Regex;
use thiserror::Error;

/// Characters accepted as PCRE-style delimiters.
const DELIMITERS: &[char] = &['/', '@', '#', '~', '!', '%', '|'];

/// Errors raised while compiling a pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern must not be empty")]
    Empty,

    #[error("unsupported pattern flag `{0}`")]
    UnknownFlag(char),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Compile a rule pattern.
pub fn compile_pattern(source: &str) -> Result<Regex, PatternError> {
    if source.is_empty() {
        return Err(PatternError::Empty);
    }

    let Some((body, flags)) = split_delimited(source) else {
        return Ok(Regex::new(source)?);
    };

    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' | 'U' => {
                if !inline.contains(flag) {
                    inline.push(flag);
                }
            }
            // Unicode matching is always on
            'u' => {}
            other => return Err(PatternError::UnknownFlag(other)),
        }
    }

    if body.is_empty() {
        return Err(PatternError::Empty);
    }

    if inline.is_empty() {
        Ok(Regex::new(body)?)
    } else {
        Ok(Regex::new(&format!("(?{}){}", inline, body))?)
    }
}

/// Split `@body@flags` into body and flags, if the source is delimited.
fn split_delimited(source: &str) -> Option<(&str, &str)> {
    let delimiter = source.chars().next().filter(|c| DELIMITERS.contains(c))?;
    let close = source.rfind(delimiter).filter(|&i| i > 0)?;
    let flags = &source[close + delimiter.len_utf8()..];

    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((&source[delimiter.len_utf8()..close], flags))
}
