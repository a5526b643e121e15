use polydict_types::{MatchKind, MatchMode};
use regex::Regex;

use crate::error::DictError;
use crate::preprocess::{DefaultPreprocessor, Preprocessor, fold_case};

/// A validated headword query.
///
/// Matching is case-insensitive in every mode. Wildcards accept `*`, `?`
/// and `[...]` classes and must match the whole headword; regular
/// expressions may match anywhere.
#[derive(Debug, Clone)]
pub struct WordPattern {
    text: String,
    folded: String,
    regex: Option<Regex>,
}

impl WordPattern {
    pub fn new(text: &str, mode: MatchMode) -> Result<Self, DictError> {
        let text = DefaultPreprocessor.process(text);
        let folded = fold_case(&text);

        let regex = match mode {
            MatchMode::Literal => None,
            MatchMode::Wildcard => Some(Regex::new(&format!(
                "(?i)^{}$",
                wildcard_to_regex(&text)?
            ))?),
            MatchMode::Regex => Some(Regex::new(&format!("(?i){text}"))?),
        };

        Ok(Self {
            text,
            folded,
            regex,
        })
    }

    pub fn literal(text: &str) -> Self {
        let text = DefaultPreprocessor.process(text);
        Self {
            folded: fold_case(&text),
            text,
            regex: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Match tier of `candidate`, or `None` when it does not match at all
    pub fn classify(&self, candidate: &str) -> Option<MatchKind> {
        let folded = fold_case(candidate);
        if folded == self.folded {
            return Some(MatchKind::Exact);
        }

        match &self.regex {
            None => {
                if folded.starts_with(&self.folded) {
                    Some(MatchKind::Prefix)
                } else if folded.contains(&self.folded) {
                    Some(MatchKind::Fuzzy)
                } else {
                    None
                }
            }
            Some(regex) => regex.find(candidate).map(|found| {
                if found.start() == 0 {
                    MatchKind::Prefix
                } else {
                    MatchKind::Fuzzy
                }
            }),
        }
    }
}

/// Translates shell-style wildcards into an unanchored regex body
pub fn wildcard_to_regex(pattern: &str) -> Result<String, DictError> {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' || inner == '[' {
                        out.push('\\');
                    }
                    out.push(inner);
                }
                if !closed {
                    return Err(DictError::QueryInvalid(format!(
                        "unterminated character class in '{pattern}'"
                    )));
                }
                out.push(']');
            }
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(r"\\"),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    Ok(out)
}
