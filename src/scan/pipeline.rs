//! Scan -> filter -> sort composition, one pass per filter spec.
//!
//! ```text
//! spec 1: DirectoryScanner -> AttributeFilter -> Sorter --+
//! spec 2: DirectoryScanner -> AttributeFilter -> Sorter --+--> concat --> limit
//! ...                                                     |
//! ```
//!
//! Specs are evaluated in declaration order and never merged, so a file
//! matching two specs is yielded twice.

use crate::error::{AdapterError, Result};
use crate::scan::candidate::Candidate;
use crate::scan::filter::{AttributeFilter, IncludeFlags};
use crate::scan::scanner::DirectoryScanner;
use crate::scan::sort::SortOptions;
use crate::scan::wildcard::{parse_filter_list, FilterSpec};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a pipeline needs to select files.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub root: PathBuf,
    /// At least one spec, in declaration order
    specs: Vec<FilterSpec>,
    pub recurse: bool,
    pub include: IncludeFlags,
    /// Settle window
    pub min_age: Duration,
    pub sort: SortOptions,
    /// Cap on the total number of matches yielded
    pub limit: Option<usize>,
}

impl MatchRequest {
    /// Request with default flags for a `,`/`;`/`|` separated filter.
    pub fn new(root: impl Into<PathBuf>, filter: &str) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(AdapterError::Validation("path must not be blank".to_string()));
        }

        Ok(Self {
            root,
            specs: parse_filter_list(filter)?,
            recurse: false,
            include: IncludeFlags::default(),
            min_age: Duration::ZERO,
            sort: SortOptions::None,
            limit: None,
        })
    }

    pub fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn include(mut self, include: IncludeFlags) -> Self {
        self.include = include;
        self
    }

    pub fn min_age(mut self, min_age: Duration) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn sort(mut self, sort: SortOptions) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// The "all matches" and "first match" queries over a request.
#[derive(Debug, Clone)]
pub struct MatchPipeline {
    request: MatchRequest,
}

impl MatchPipeline {
    pub fn new(request: MatchRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &MatchRequest {
        &self.request
    }

    pub fn matches(&self) -> Result<Box<dyn Iterator<Item = Candidate>>> {
        self.matches_at(Utc::now())
    }

    pub fn find_first(&self) -> Result<Option<Candidate>> {
        self.find_first_at(Utc::now())
    }

    /// All matches, judging the settle window against `now`.
    ///
    /// Every spec's scanner is set up front, so a missing root fails here
    /// rather than reading as "no matches". Later specs are only walked once
    /// earlier ones are exhausted; entries that become unreadable during the
    /// walk are logged and skipped.
    pub fn matches_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Box<dyn Iterator<Item = Candidate>>> {
        let filter = self.attribute_filter(now)?;
        let scanners = self
            .request
            .specs
            .iter()
            .map(|spec| self.scanner(spec))
            .collect::<Result<Vec<_>>>()?;

        let sort = self.request.sort;
        let all = scanners
            .into_iter()
            .flat_map(move |scanner| spec_results(scanner, filter, sort));

        Ok(match self.request.limit {
            Some(limit) => Box::new(all.take(limit)),
            None => Box::new(all),
        })
    }

    /// First match of the first spec that has any, ignoring later specs entirely.
    pub fn find_first_at(&self, now: DateTime<Utc>) -> Result<Option<Candidate>> {
        let filter = self.attribute_filter(now)?;

        for spec in &self.request.specs {
            let mut results = spec_results(self.scanner(spec)?, filter, self.request.sort);
            if let Some(first) = results.next() {
                return Ok(Some(first));
            }
            tracing::debug!("No match for '{}', trying next filter", spec.pattern());
        }

        Ok(None)
    }

    fn scanner(&self, spec: &FilterSpec) -> Result<DirectoryScanner> {
        DirectoryScanner::new(&self.request.root, spec.clone(), self.request.recurse)
    }

    fn attribute_filter(&self, now: DateTime<Utc>) -> Result<AttributeFilter> {
        let min_age = chrono::Duration::from_std(self.request.min_age).map_err(|_| {
            AdapterError::Validation(format!(
                "min file age {:?} out of range",
                self.request.min_age
            ))
        })?;
        Ok(AttributeFilter::new(self.request.include, min_age, now))
    }
}

/// One spec's filtered stream, sorted if asked for.
///
/// Unsorted results stay lazy; sorting materializes only this spec's set.
fn spec_results(
    scanner: DirectoryScanner,
    filter: AttributeFilter,
    sort: SortOptions,
) -> Box<dyn Iterator<Item = Candidate>> {
    let filtered = filter.apply(scanner);
    if sort == SortOptions::None {
        return filtered;
    }

    let mut set: Vec<Candidate> = filtered.collect();
    sort.sort(&mut set);
    Box::new(set.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// "now" far enough ahead that freshly written files are past any settle window used here.
    fn later() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::hours(1)
    }

    fn names(it: impl Iterator<Item = Candidate>) -> Vec<String> {
        it.map(|c| c.name).collect()
    }

    #[test]
    fn test_spec_order_outranks_sort() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("z.txt"), "t").unwrap();
        fs::write(tmp.path().join("a.csv"), "c").unwrap();

        for sort in SortOptions::ALL {
            let request = MatchRequest::new(tmp.path(), "*.txt;*.csv").unwrap().sort(sort);
            let pipeline = MatchPipeline::new(request);
            let got = names(pipeline.matches_at(later()).unwrap());
            assert_eq!(got, vec!["z.txt", "a.csv"], "sort {:?}", sort);
        }
    }

    #[test]
    fn test_sort_within_spec() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.txt", "c.txt", "a.txt", "b.csv", "a.csv"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }

        let request = MatchRequest::new(tmp.path(), "*.txt|*.csv")
            .unwrap()
            .sort(SortOptions::NameDescending);
        let got = names(MatchPipeline::new(request).matches_at(later()).unwrap());
        assert_eq!(got, vec!["c.txt", "b.txt", "a.txt", "b.csv", "a.csv"]);
    }

    #[test]
    fn test_duplicates_across_specs() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("data.txt"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.txt,data.*").unwrap();
        let got = names(MatchPipeline::new(request).matches_at(later()).unwrap());
        assert_eq!(got, vec!["data.txt", "data.txt"]);
    }

    #[test]
    fn test_limit_caps_across_specs() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.csv"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }

        let request = MatchRequest::new(tmp.path(), "*.txt;*.csv")
            .unwrap()
            .sort(SortOptions::NameAscending)
            .limit(Some(2));
        let got = names(MatchPipeline::new(request).matches_at(later()).unwrap());
        assert_eq!(got, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_find_first_falls_through_to_later_spec() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("only.txt"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.csv;*.txt")
            .unwrap()
            .sort(SortOptions::NameAscending);
        let first = MatchPipeline::new(request).find_first_at(later()).unwrap();
        assert_eq!(first.unwrap().name, "only.txt");
    }

    #[test]
    fn test_find_first_prefers_earlier_spec_over_sort() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("zzz.csv"), "x").unwrap();
        fs::write(tmp.path().join("aaa.txt"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.csv;*.txt")
            .unwrap()
            .sort(SortOptions::NameAscending);
        let first = MatchPipeline::new(request).find_first_at(later()).unwrap();
        assert_eq!(first.unwrap().name, "zzz.csv");
    }

    #[test]
    fn test_find_first_none() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.bin"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.csv;*.txt").unwrap();
        assert!(MatchPipeline::new(request)
            .find_first_at(later())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_settle_window_rechecked_each_cycle() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("fresh.txt"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.txt")
            .unwrap()
            .min_age(Duration::from_secs(600));
        let pipeline = MatchPipeline::new(request);

        let now = Utc::now();
        assert_eq!(pipeline.matches_at(now).unwrap().count(), 0);
        assert_eq!(pipeline.matches_at(now).unwrap().count(), 0);

        let past_window = now + chrono::Duration::seconds(601);
        assert_eq!(pipeline.matches_at(past_window).unwrap().count(), 1);
        assert_eq!(pipeline.matches_at(past_window).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_files_excluded_by_default() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("empty.txt"), "").unwrap();
        fs::write(tmp.path().join("full.txt"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.txt").unwrap();
        let got = names(MatchPipeline::new(request.clone()).matches_at(later()).unwrap());
        assert_eq!(got, vec!["full.txt"]);

        let request = request.include(IncludeFlags {
            empty: true,
            ..Default::default()
        });
        assert_eq!(MatchPipeline::new(request).matches_at(later()).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let request = MatchRequest::new(tmp.path().join("gone"), "*").unwrap();
        let pipeline = MatchPipeline::new(request);
        assert!(pipeline.matches().err().unwrap().is_not_found());
        assert!(pipeline.find_first().unwrap_err().is_not_found());
    }

    #[test]
    fn test_every_filter_checks_root_before_streaming() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("drop");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), "x").unwrap();
        fs::write(root.join("b.csv"), "x").unwrap();

        let request = MatchRequest::new(&root, "*.txt;*.csv").unwrap();
        let pipeline = MatchPipeline::new(request);
        let matches = pipeline.matches().unwrap();

        // Removed after the scan was set up: later filters find nothing
        fs::remove_dir_all(&root).unwrap();
        assert!(matches.count() <= 2);

        // Removed before: the whole call fails instead of yielding a partial batch
        assert!(pipeline.matches().err().unwrap().is_not_found());
    }

    #[test]
    fn test_huge_min_age_matches_nothing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "x").unwrap();

        let request = MatchRequest::new(tmp.path(), "*.txt")
            .unwrap()
            .min_age(Duration::from_secs(10_000_000_000_000));
        let pipeline = MatchPipeline::new(request);
        assert_eq!(pipeline.matches().unwrap().count(), 0);
        assert!(pipeline.find_first().unwrap().is_none());
    }

    #[test]
    fn test_blank_path_rejected() {
        assert!(matches!(
            MatchRequest::new("", "*").unwrap_err(),
            AdapterError::Validation(_)
        ));
    }
}
