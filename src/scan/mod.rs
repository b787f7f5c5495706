//! File discovery: wildcard matching, lazy directory scans, attribute
//! filtering and per-spec sorting.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +-----------------+     +--------+
//! | DirectoryScanner | --> | AttributeFilter | --> | Sorter |  (per filter spec)
//! +------------------+     +-----------------+     +--------+
//!                                                      |
//!                                              MatchPipeline (concat, limit)
//! ```

pub mod candidate;
pub mod filter;
pub mod pipeline;
pub mod scanner;
pub mod sort;
pub mod wildcard;

pub use candidate::{Candidate, FileAttributes};
pub use filter::{AttributeFilter, IncludeFlags};
pub use pipeline::{MatchPipeline, MatchRequest};
pub use scanner::{scan, DirectoryScanner};
pub use sort::SortOptions;
pub use wildcard::{parse_filter_list, FilterSpec, WildcardMatcher};
