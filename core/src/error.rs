use thiserror::Error;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("No profile loaded; onboard first")]
    ProfileNotFound,

    #[error("Stored profile is corrupt: {reason}")]
    CorruptProfile { reason: String },

    #[error("Lesson '{lesson_id}' not found")]
    UnknownLesson { lesson_id: String },

    #[error("Lesson '{lesson_id}' is locked: {remaining} more actions required")]
    LessonLocked { lesson_id: String, remaining: u32 },

    #[error("Meal '{meal_id}' not found")]
    UnknownMeal { meal_id: String },

    #[error("Meal plan is empty")]
    EmptyMealPlan,

    #[error("Invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LensError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LensError::InvalidInput { field, reason: reason.into() }
    }
}

pub type LensResult<T> = Result<T, LensError>;

/// Failure of an external oracle call. Never escapes the advisory gateway
/// or the entitlement gate; both recover locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("oracle timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("oracle transport failure: {0}")]
    Transport(String),

    #[error("oracle response malformed: {0}")]
    Malformed(String),
}
