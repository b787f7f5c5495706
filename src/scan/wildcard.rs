//! Wildcard patterns compiled to anchored, case-insensitive regexes.
//!
//! `*` matches any run of characters, `?` exactly one, and `\` escapes the
//! character that follows it. Neither wildcard ever crosses a path separator.

use crate::error::{AdapterError, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Characters that may never appear in a pattern (path separators and drive designators).
const INVALID_CHARS: [char; 4] = [':', '<', '>', '/'];

/// Separators accepted between tokens of a filter list.
pub const FILTER_SEPARATORS: [char; 3] = [',', ';', '|'];

/// A compiled wildcard pattern.
#[derive(Clone)]
pub struct WildcardMatcher {
    pattern: String,
    regex: Regex,
}

impl WildcardMatcher {
    pub fn compile(pattern: &str) -> Result<Self> {
        if let Some(c) = pattern.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(AdapterError::Validation(format!(
                "invalid character '{}' in wildcard pattern '{}'",
                c, pattern
            )));
        }

        let regex = RegexBuilder::new(&wildcard_to_regex(pattern))
            .case_insensitive(true)
            .build()
            .map_err(|e| AdapterError::Validation(format!("wildcard '{}': {}", pattern, e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for WildcardMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WildcardMatcher").field(&self.pattern).finish()
    }
}

/// Translate a wildcard into regex source.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(r"[^/\\]*"),
            '?' => out.push_str(r"[^/\\]"),
            // A trailing escape has nothing to escape and adds no requirement
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(next.encode_utf8(&mut [0; 4])));
                }
            }
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    out
}

/// One wildcard token of a filter list.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    matcher: WildcardMatcher,
}

impl FilterSpec {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            matcher: WildcardMatcher::compile(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}

/// Split a `,`/`;`/`|` separated filter string into compiled specs, keeping declaration order.
pub fn parse_filter_list(filter: &str) -> Result<Vec<FilterSpec>> {
    let specs = filter
        .split(FILTER_SEPARATORS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(FilterSpec::new)
        .collect::<Result<Vec<_>>>()?;

    if specs.is_empty() {
        return Err(AdapterError::Validation(format!(
            "filter '{}' contains no wildcard tokens",
            filter
        )));
    }

    Ok(specs)
}
