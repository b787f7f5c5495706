//! Lazy directory enumeration for one filter spec.

use crate::error::{AdapterError, Result};
use crate::scan::candidate::Candidate;
use crate::scan::wildcard::FilterSpec;
use ignore::{Walk, WalkBuilder};
use std::path::Path;

/// Iterator over the files under a root whose names match one filter spec.
///
/// The walk advances only as items are pulled, so callers that stop early
/// never touch the rest of the tree.
pub struct DirectoryScanner {
    walk: Walk,
    spec: FilterSpec,
}

impl DirectoryScanner {
    pub fn new(root: &Path, spec: FilterSpec, recurse: bool) -> Result<Self> {
        if !root.is_dir() {
            return Err(AdapterError::NotFound {
                path: root.to_path_buf(),
            });
        }

        // Plain enumeration: no ignore files, no hidden-file skipping (the
        // attribute filter owns that decision)
        let walk = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(if recurse { None } else { Some(1) })
            .build();

        Ok(Self { walk, spec })
    }
}

impl Iterator for DirectoryScanner {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            // Depth 0 is the root itself
            if entry.depth() == 0 {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !self.spec.matches(&name) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Failed to stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            return Some(Candidate::from_metadata(entry.path(), &metadata));
        }
    }
}

/// Scan `root` for files matching `spec`.
pub fn scan(root: &Path, spec: FilterSpec, recurse: bool) -> Result<DirectoryScanner> {
    DirectoryScanner::new(root, spec, recurse)
}
