mod utils;

use concolic::executor::concrete::ConcreteValue;
use concolic::executor::coverage::PathCoverageTracker;
use concolic::executor::path_condition::{BranchDiscriminator, PathCondition};
use concolic::executor::symbolic_value::{Comparator, Sort};

use utils::{enter, executor, if_zero, load, run, site};

/// `if (x > 0) { if (x > 0) ... }` style execution: the same site is
/// reached twice when `repeat` is set.
fn execute(x: i32, repeat: bool) -> PathCondition {
    let mut sexe = executor();
    enter(&mut sexe, "check", "(I)V", &[("x", ConcreteValue::Int(x))]);
    run(&mut sexe, &[load(Sort::Int32, 0), if_zero(Comparator::Le, 0, x)]);
    if repeat {
        run(&mut sexe, &[load(Sort::Int32, 0), if_zero(Comparator::Le, 0, x)]);
    }
    sexe.into_path_condition()
}

#[test]
fn test_same_decisions_count_once() {
    let mut tracker = PathCoverageTracker::new();
    assert!(tracker.record(&execute(5, false)));
    assert!(!tracker.record(&execute(9, false)));
    assert_eq!(tracker.coverage_count(), 1);

    assert!(tracker.record(&execute(-1, false)));
    assert_eq!(tracker.coverage_count(), 2);
    assert_eq!(tracker.site_visits(&site(0)), 3);
}

#[test]
fn test_repeated_site_is_a_different_path() {
    let mut tracker = PathCoverageTracker::new();
    assert!(tracker.record(&execute(5, false)));
    assert!(tracker.record(&execute(5, true)));
    assert!(!tracker.record(&execute(6, true)));
    assert_eq!(tracker.coverage_count(), 2);
    assert_eq!(tracker.site_visits(&site(0)), 5);
}

#[test]
fn test_incremental_recording_matches_whole_paths() {
    let mut tracker = PathCoverageTracker::new();
    let path = execute(3, false);
    for branch in &path {
        tracker.record_branch(&branch.site, branch.discriminator);
    }
    assert!(tracker.record_path());
    assert!(!tracker.record(&path));

    tracker.record_branch(&site(0), BranchDiscriminator::Label(1));
    tracker.clear_current_path();
    assert!(!tracker.record(&path));
    assert_eq!(tracker.coverage_count(), 1);
}

#[test]
fn test_empty_path_is_recorded() {
    let mut tracker = PathCoverageTracker::new();
    assert!(tracker.record(&PathCondition::default()));
    assert!(!tracker.record(&PathCondition::default()));
    assert_eq!(tracker.coverage_count(), 1);
}
