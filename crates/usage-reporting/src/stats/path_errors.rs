//! Error counts keyed by response path

use std::collections::HashMap;

use crate::proto;
use crate::report::{estimated_bytes_for_string, SizeEstimator};

/// Trie of error counts keyed by field names, list indices elided.
///
/// Entries are only ever added during a report window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathErrorStats {
    /// Keyed by field name
    pub children: HashMap<String, PathErrorStats>,
    /// Errors recorded at this path
    pub errors_count: u64,
    /// Erroring nodes recorded at this path
    pub requests_with_errors_count: u64,
}

impl PathErrorStats {
    /// Child entry for `segment`, created on first use
    pub fn child_mut(&mut self, segment: &str, size: &mut SizeEstimator) -> &mut PathErrorStats {
        if !self.children.contains_key(segment) {
            size.add(estimated_bytes_for_string(segment) + 4);
        }
        self.children.entry(segment.to_string()).or_default()
    }

    /// Descend along `path`, creating entries as needed
    pub fn descend(&mut self, path: &[&str], size: &mut SizeEstimator) -> &mut PathErrorStats {
        let mut current = self;
        for segment in path {
            current = current.child_mut(segment, size);
        }
        current
    }

    /// Entry at `path`, if it exists
    pub fn get(&self, path: &[&str]) -> Option<&PathErrorStats> {
        let mut current = self;
        for segment in path {
            current = current.children.get(*segment)?;
        }
        Some(current)
    }

    /// Convert into the wire form, children included
    pub fn to_proto(&self) -> proto::PathErrorStats {
        proto::PathErrorStats {
            children: self
                .children
                .iter()
                .map(|(name, child)| (name.clone(), child.to_proto()))
                .collect(),
            errors_count: self.errors_count,
            requests_with_errors_count: self.requests_with_errors_count,
        }
    }
}
