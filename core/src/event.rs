//! Session events: what each engine operation did.
//!
//! Operations return the events they caused so the UI collaborator can
//! react (celebrate a commit, show an unlocked lesson, present an upgrade
//! path) without inspecting Profile diffs.

use crate::{
    entitlement::SubscriptionState,
    types::{DecisionId, LessonId},
};
use serde::{Deserialize, Serialize};

/// Variants are added over time, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── Profile lifecycle ──────────────────────────
    ProfileCreated,
    ProfileUpdated,
    ProfileReset,

    // ── Entitlement ────────────────────────────────
    EntitlementSynced {
        state:     SubscriptionState,
        corrected: bool,
    },
    EntitlementSyncFailed {
        reason: String,
    },

    // ── Ledger / progression ───────────────────────
    DecisionCommitted {
        decision_id:   DecisionId,
        savings:       f64,
        total_saved:   f64,
        actions_count: u32,
    },
    LessonUnlocked {
        lesson_id: LessonId,
        title:     String,
    },
    LessonCompleted {
        lesson_id: LessonId,
    },
}
