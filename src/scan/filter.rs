//! Attribute and age predicates applied lazily to a scan stream.

use crate::scan::candidate::{Candidate, FileAttributes};
use chrono::{DateTime, Duration, Utc};

/// Which normally-excluded files are let through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncludeFlags {
    pub empty: bool,
    pub hidden: bool,
    pub read_only: bool,
    pub system: bool,
    pub temporary: bool,
}

impl IncludeFlags {
    pub fn all() -> Self {
        Self {
            empty: true,
            hidden: true,
            read_only: true,
            system: true,
            temporary: true,
        }
    }
}

/// Predicate chain for one scan pass.
#[derive(Debug, Clone, Copy)]
pub struct AttributeFilter {
    include: IncludeFlags,
    /// Files created at or after this instant are still settling
    cutoff: DateTime<Utc>,
}

impl AttributeFilter {
    /// A `min_age` reaching past the earliest representable instant leaves
    /// nothing old enough.
    pub fn new(include: IncludeFlags, min_age: Duration, now: DateTime<Utc>) -> Self {
        Self {
            include,
            cutoff: now
                .checked_sub_signed(min_age)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Wrap `input` in one lazy stage per predicate, in fixed order.
    pub fn apply<'a, I>(&self, input: I) -> Box<dyn Iterator<Item = Candidate> + 'a>
    where
        I: Iterator<Item = Candidate> + 'a,
    {
        let mut stream: Box<dyn Iterator<Item = Candidate> + 'a> = Box::new(input);

        if !self.include.empty {
            stream = Box::new(stream.filter(|c| c.size > 0));
        }
        for (included, attr) in [
            (self.include.hidden, FileAttributes::HIDDEN),
            (self.include.read_only, FileAttributes::READ_ONLY),
            (self.include.system, FileAttributes::SYSTEM),
            (self.include.temporary, FileAttributes::TEMPORARY),
        ] {
            if !included {
                stream = Box::new(stream.filter(move |c| !c.attributes.contains(attr)));
            }
        }

        let cutoff = self.cutoff;
        Box::new(stream.filter(move |c| c.created < cutoff))
    }

    pub fn accepts(&self, candidate: &Candidate) -> bool {
        self.apply(std::iter::once(candidate.clone())).next().is_some()
    }
}
