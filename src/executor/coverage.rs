use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::executor::path_condition::{BranchDiscriminator, BranchSite, PathCondition};

/// Counts the distinct paths explored over many concrete executions.
///
/// Each execution contributes its sequence of branch decisions, that is the
/// branch site, how many times the site was reached so far in that
/// execution, and the discriminator. Two executions that take the same
/// decisions in the same order count as one path. Constraint contents are
/// ignored, so executions differing only in input values collapse.
///
/// # Methods
/// ## `record`
/// Hashes the decision sequence of a finished execution and stores it.
/// Returns `true` when the path was not seen before.
///
/// ## `record_branch` / `record_path`
/// Incremental form of `record` for callers that observe decisions one at a
/// time. `record_path` finalizes the current sequence and clears it.
///
/// ## `site_visits`
/// Number of times a branch site was recorded over all executions.
///
/// ## `coverage_count`
/// Number of distinct recorded paths.
///
/// # Example
/// ```rust
/// use concolic::executor::coverage::PathCoverageTracker;
/// use concolic::executor::path_condition::{BranchDiscriminator, BranchSite};
///
/// let mut tracker = PathCoverageTracker::new();
/// let site = BranchSite::new("Main", "check", 0);
///
/// tracker.record_branch(&site, BranchDiscriminator::Bool(true));
/// assert!(tracker.record_path());
///
/// tracker.record_branch(&site, BranchDiscriminator::Bool(true));
/// assert!(!tracker.record_path());
///
/// tracker.record_branch(&site, BranchDiscriminator::Bool(false));
/// assert!(tracker.record_path());
///
/// assert_eq!(tracker.coverage_count(), 2);
/// assert_eq!(tracker.site_visits(&site), 3);
/// tracker.clear();
/// assert_eq!(tracker.coverage_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct PathCoverageTracker {
    paths: FxHashSet<u64>,
    site_visits: FxHashMap<BranchSite, usize>,
    visit_counter: FxHashMap<BranchSite, usize>,
    current_path: Vec<(BranchSite, usize, BranchDiscriminator)>,
}

impl PathCoverageTracker {
    pub fn new() -> Self {
        PathCoverageTracker::default()
    }

    pub fn record(&mut self, path: &PathCondition) -> bool {
        self.clear_current_path();
        for branch in path {
            self.record_branch(&branch.site, branch.discriminator);
        }
        self.record_path()
    }

    pub fn record_branch(&mut self, site: &BranchSite, discriminator: BranchDiscriminator) {
        let count = self.visit_counter.entry(site.clone()).or_insert(0);
        *count += 1;
        let count = *count;
        *self.site_visits.entry(site.clone()).or_insert(0) += 1;
        self.current_path.push((site.clone(), count, discriminator));
    }

    pub fn record_path(&mut self) -> bool {
        let path_hash = self.hash_current_path();
        self.clear_current_path();
        self.paths.insert(path_hash)
    }

    fn hash_current_path(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.current_path.hash(&mut hasher);
        hasher.finish()
    }

    pub fn clear(&mut self) {
        self.clear_current_path();
        self.paths.clear();
        self.site_visits.clear();
    }

    pub fn clear_current_path(&mut self) {
        self.visit_counter.clear();
        self.current_path.clear();
    }

    pub fn site_visits(&self, site: &BranchSite) -> usize {
        self.site_visits.get(site).copied().unwrap_or(0)
    }

    pub fn coverage_count(&self) -> usize {
        self.paths.len()
    }
}
