//! Shared primitive types used across the engine.

/// Stable identifier of a ledgered decision (UUID v4, hyphenated).
pub type DecisionId = String;

/// Stable catalog identifier of a lesson; key into `completed_lessons`.
pub type LessonId = String;

/// Stable catalog identifier of a meal template.
pub type MealId = String;

/// Fixed per-installation key under which the Profile is stored.
pub type StorageKey = String;

/// Timestamps are always UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
