//! Progression Engine: which lesson comes next, and whether it is open.
//!
//! Selection order over the statically ordered catalog:
//!   1. first lesson not yet completed whose requirement <= actions_count
//!   2. else first lesson not yet completed (shown locked, as "what's next")
//!   3. else the last lesson (everything done)
//!
//! All functions here are pure.

use crate::{
    profile::Profile,
    types::LessonId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub id:          LessonId,
    pub title:       String,
    /// Reading time label, e.g. "60s".
    pub duration:    String,
    /// Minimum action count before the lesson opens.
    pub requirement: u32,
    pub content:     String,
}

impl Lesson {
    pub fn is_unlocked(&self, actions_count: u32) -> bool {
        actions_count >= self.requirement
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LessonStatus<'a> {
    pub lesson:            &'a Lesson,
    pub locked:            bool,
    pub progress_percent:  f64,
    pub remaining_actions: u32,
}

pub fn next_lesson<'a>(
    catalog:       &'a [Lesson],
    completed:     &BTreeSet<LessonId>,
    actions_count: u32,
) -> Option<LessonStatus<'a>> {
    let pending = move || catalog.iter().filter(move |l| !completed.contains(&l.id));

    let lesson = pending()
        .find(|l| l.is_unlocked(actions_count))
        .or_else(|| pending().next())
        .or_else(|| catalog.last())?;

    Some(status(lesson, actions_count))
}

pub fn status(lesson: &Lesson, actions_count: u32) -> LessonStatus<'_> {
    LessonStatus {
        lesson,
        locked: !lesson.is_unlocked(actions_count),
        progress_percent: progress_percent(lesson.requirement, actions_count),
        remaining_actions: lesson.requirement.saturating_sub(actions_count),
    }
}

/// min(100, actions / max(requirement, 1) * 100)
pub fn progress_percent(requirement: u32, actions_count: u32) -> f64 {
    let denom = requirement.max(1) as f64;
    (actions_count as f64 / denom * 100.0).min(100.0)
}

/// Mark a lesson completed. Returns the new profile and whether this call
/// was the first completion; repeats are a no-op returning `false`.
pub fn complete_lesson(profile: &Profile, lesson_id: &str) -> (Profile, bool) {
    if profile.has_completed(lesson_id) {
        return (profile.clone(), false);
    }
    let mut next = profile.clone();
    next.completed_lessons.insert(lesson_id.to_string());
    (next, true)
}

/// Lessons whose requirement was crossed moving from `before` to `after`.
pub fn newly_unlocked(catalog: &[Lesson], before: u32, after: u32) -> Vec<&Lesson> {
    catalog
        .iter()
        .filter(|l| !l.is_unlocked(before) && l.is_unlocked(after))
        .collect()
}
