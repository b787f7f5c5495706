//! Ordering of one filter spec's filtered result set.

use crate::error::AdapterError;
use crate::scan::candidate::Candidate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOptions {
    /// Keep scan order
    #[default]
    None,
    NameAscending,
    NameDescending,
    CreationTimeUtcAscending,
    CreationTimeUtcDescending,
}

impl SortOptions {
    pub const ALL: [SortOptions; 5] = [
        SortOptions::None,
        SortOptions::NameAscending,
        SortOptions::NameDescending,
        SortOptions::CreationTimeUtcAscending,
        SortOptions::CreationTimeUtcDescending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOptions::None => "None",
            SortOptions::NameAscending => "NameAscending",
            SortOptions::NameDescending => "NameDescending",
            SortOptions::CreationTimeUtcAscending => "CreationTimeUtcAscending",
            SortOptions::CreationTimeUtcDescending => "CreationTimeUtcDescending",
        }
    }

    /// Stable in-place sort; equal keys keep their scan order.
    pub fn sort(&self, candidates: &mut [Candidate]) {
        match self {
            SortOptions::None => {}
            SortOptions::NameAscending => candidates.sort_by(compare_names),
            SortOptions::NameDescending => candidates.sort_by(|a, b| compare_names(b, a)),
            SortOptions::CreationTimeUtcAscending => candidates.sort_by_key(|c| c.created),
            SortOptions::CreationTimeUtcDescending => {
                candidates.sort_by(|a, b| b.created.cmp(&a.created))
            }
        }
    }
}

/// Case-insensitive first, ordinal as a tie-break.
fn compare_names(a: &Candidate, b: &Candidate) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

impl fmt::Display for SortOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOptions {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOptions::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AdapterError::Validation(format!("unknown sort option '{}'", s)))
    }
}
