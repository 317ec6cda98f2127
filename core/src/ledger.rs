//! Decision Ledger: append-only history and its derived aggregates.
//!
//! RULE: History is append-only. Decisions are never edited or removed;
//! a reset discards the whole Profile instead.
//!
//! commit() returns a new Profile with history, total_saved and
//! actions_count updated together, so no caller ever observes a profile
//! where one has moved and the others have not.

use crate::{
    error::{LensError, LensResult},
    profile::{Decision, DecisionKind, Profile, PurchaseCategory},
    projection::PurchaseImpact,
    types::Timestamp,
};
use uuid::Uuid;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Window used by the "this week" dashboard figure.
pub const THIS_WEEK_DAYS: f64 = 7.0;

impl Decision {
    /// Build a new decision with a fresh id.
    pub fn new(
        item:           &str,
        category:       PurchaseCategory,
        savings:        f64,
        kind:           DecisionKind,
        original_price: Option<f64>,
        date:           Timestamp,
    ) -> LensResult<Self> {
        if !savings.is_finite() || savings < 0.0 {
            return Err(LensError::invalid("savings", format!("{savings} must be finite and >= 0")));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            item: item.to_string(),
            category,
            savings,
            date,
            kind,
            original_price,
        })
    }

    /// The decision recorded when the household takes the recommended swap.
    pub fn swap(impact: &PurchaseImpact, date: Timestamp) -> LensResult<Self> {
        let swap = impact.swaps.recommended();
        Self::new(
            &impact.input.item,
            impact.input.category,
            swap.savings,
            DecisionKind::Swap,
            Some(impact.input.price),
            date,
        )
    }

    /// Age relative to `now` in fractional days. Negative for future dates.
    pub fn age_in_days(&self, now: Timestamp) -> f64 {
        (now - self.date).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
    }
}

/// Append `decision` and recompute the aggregates.
pub fn commit(profile: &Profile, decision: Decision) -> LensResult<Profile> {
    if !decision.savings.is_finite() || decision.savings < 0.0 {
        return Err(LensError::invalid(
            "savings",
            format!("{} must be finite and >= 0", decision.savings),
        ));
    }

    let mut next = profile.clone();
    next.total_saved += decision.savings;
    next.actions_count += 1;
    log::debug!(
        "ledger: commit {} kind={:?} savings={:.2} total={:.2} actions={}",
        decision.id, decision.kind, decision.savings, next.total_saved, next.actions_count
    );
    next.history.push(decision);
    Ok(next)
}

/// Sum of savings for decisions no older than `window_days` (inclusive).
pub fn trailing_window_savings(profile: &Profile, window_days: f64, now: Timestamp) -> f64 {
    profile
        .history
        .iter()
        .filter(|d| d.age_in_days(now) <= window_days)
        .map(|d| d.savings)
        .sum()
}

/// The last `n` decisions, newest first.
pub fn recent(profile: &Profile, n: usize) -> Vec<&Decision> {
    profile.history.iter().rev().take(n).collect()
}
