//! Progression engine tests.

mod common;

use common::{household, t0};
use nestegg_core::{
    profile::Profile,
    progression::{complete_lesson, newly_unlocked, next_lesson, progress_percent, Lesson},
};
use std::collections::BTreeSet;

fn lesson(id: &str, requirement: u32) -> Lesson {
    Lesson {
        id: id.into(),
        title: format!("Lesson {id}"),
        duration: "60s".into(),
        requirement,
        content: String::new(),
    }
}

fn catalog() -> Vec<Lesson> {
    vec![lesson("a", 0), lesson("b", 3), lesson("c", 5)]
}

fn done(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn fresh_profile_gets_the_zero_requirement_lesson_unlocked() {
    let cat = catalog();
    let status = next_lesson(&cat, &BTreeSet::new(), 0).unwrap();
    assert_eq!(status.lesson.id, "a");
    assert!(!status.locked);
    assert_eq!(status.progress_percent, 0.0);
    assert_eq!(status.remaining_actions, 0);
}

#[test]
fn next_pending_lesson_is_shown_locked_with_progress() {
    let cat = catalog();
    let status = next_lesson(&cat, &done(&["a"]), 2).unwrap();
    assert_eq!(status.lesson.id, "b");
    assert!(status.locked);
    assert!((status.progress_percent - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(status.remaining_actions, 1);
}

#[test]
fn unlocked_pending_lesson_wins_over_earlier_locked_one() {
    let cat = vec![lesson("late", 10), lesson("early", 1)];
    let status = next_lesson(&cat, &BTreeSet::new(), 2).unwrap();
    assert_eq!(status.lesson.id, "early");
    assert!(!status.locked);
}

#[test]
fn everything_completed_returns_the_last_lesson() {
    let cat = catalog();
    let status = next_lesson(&cat, &done(&["a", "b", "c"]), 9).unwrap();
    assert_eq!(status.lesson.id, "c");
    assert!(!status.locked);
    assert_eq!(status.progress_percent, 100.0);
}

#[test]
fn empty_catalog_has_no_next_lesson() {
    assert!(next_lesson(&[], &BTreeSet::new(), 3).is_none());
}

#[test]
fn progress_guards_zero_requirement_and_caps_at_100() {
    assert_eq!(progress_percent(0, 0), 0.0);
    assert_eq!(progress_percent(0, 4), 100.0);
    assert_eq!(progress_percent(8, 2), 25.0);
    assert_eq!(progress_percent(5, 50), 100.0);
}

#[test]
fn completing_twice_is_a_no_op() {
    let p = Profile::new(household(), t0());
    let (once, first) = complete_lesson(&p, "a");
    assert!(first);
    assert_eq!(once.completed_lessons, done(&["a"]));

    let (twice, again) = complete_lesson(&once, "a");
    assert!(!again, "second completion must not report a first completion");
    assert_eq!(twice, once);
}

#[test]
fn crossing_a_threshold_reports_newly_unlocked_lessons() {
    let cat = catalog();
    let ids = |v: Vec<&Lesson>| v.into_iter().map(|l| l.id.clone()).collect::<Vec<_>>();

    assert_eq!(ids(newly_unlocked(&cat, 2, 3)), vec!["b"]);
    assert_eq!(ids(newly_unlocked(&cat, 0, 5)), vec!["b", "c"]);
    assert!(newly_unlocked(&cat, 3, 4).is_empty());
}
