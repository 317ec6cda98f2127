//! The Profile, durable root of a household's state, and the Decision
//! records it owns.
//!
//! RULE: A Profile is never partially updated. Every mutation builds a
//! whole new value (ledger commit, lesson completion, entitlement
//! correction, settings edit) and the session swaps it in only after the
//! store accepted it.
//!
//! Invariants checked on every load:
//!   - actions_count == history.len()
//!   - total_saved   == sum(history[i].savings)
//!   - completed_lessons is a set (enforced by the type)

use crate::{
    error::{LensError, LensResult},
    types::{DecisionId, LessonId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Tolerance used when comparing the cached total against the history sum.
const TOTAL_SAVED_TOLERANCE: f64 = 1e-6;

// ── Household attributes ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HouseholdSize {
    #[serde(rename = "1-2")]
    OneToTwo,
    #[serde(rename = "3-4")]
    ThreeToFour,
    #[serde(rename = "5+")]
    FivePlus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BudgetBand {
    #[serde(rename = "Under $150")]
    Under150,
    #[serde(rename = "$150-$250")]
    From150To250,
    #[serde(rename = "$250+")]
    Over250,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvestingLevel {
    Beginner,
    Curious,
    Ready,
}

impl FromStr for HouseholdSize {
    type Err = LensError;

    fn from_str(s: &str) -> LensResult<Self> {
        match s.trim() {
            "1-2" => Ok(Self::OneToTwo),
            "3-4" => Ok(Self::ThreeToFour),
            "5+"  => Ok(Self::FivePlus),
            other => Err(LensError::invalid("household_size", format!("unknown size '{other}'"))),
        }
    }
}

impl FromStr for BudgetBand {
    type Err = LensError;

    fn from_str(s: &str) -> LensResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "under $150" | "under150"  => Ok(Self::Under150),
            "$150-$250"  | "150-250"   => Ok(Self::From150To250),
            "$250+"      | "250+"      => Ok(Self::Over250),
            other => Err(LensError::invalid("weekly_budget", format!("unknown band '{other}'"))),
        }
    }
}

impl FromStr for InvestingLevel {
    type Err = LensError;

    fn from_str(s: &str) -> LensResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "curious"  => Ok(Self::Curious),
            "ready"    => Ok(Self::Ready),
            other => Err(LensError::invalid("investing_level", format!("unknown level '{other}'"))),
        }
    }
}

/// The answers collected during onboarding and editable from settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Household {
    pub household_size:  HouseholdSize,
    pub weekly_budget:   BudgetBand,
    pub investing_level: InvestingLevel,
}

// ── Decisions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PurchaseCategory {
    Groceries,
    Home,
    Kids,
    Meals,
    Other,
}

impl FromStr for PurchaseCategory {
    type Err = LensError;

    fn from_str(s: &str) -> LensResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groceries" => Ok(Self::Groceries),
            "home"      => Ok(Self::Home),
            "kids"      => Ok(Self::Kids),
            "meals"     => Ok(Self::Meals),
            "other"     => Ok(Self::Other),
            other => Err(LensError::invalid("category", format!("unknown category '{other}'"))),
        }
    }
}

impl fmt::Display for PurchaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Groceries => "Groceries",
            Self::Home      => "Home",
            Self::Kids      => "Kids",
            Self::Meals     => "Meals",
            Self::Other     => "Other",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Swap,
    MealPlan,
    Lesson,
}

/// One accepted swap or plan commitment. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub id:             DecisionId,
    pub item:           String,
    pub category:       PurchaseCategory,
    /// Weekly-equivalent savings. Finite and >= 0.
    pub savings:        f64,
    pub date:           Timestamp,
    pub kind:           DecisionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
}

// ── Profile ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub household:         Household,
    /// Cached subscription flag. The entitlement oracle is authoritative.
    pub is_plus:           bool,
    pub total_saved:       f64,
    pub actions_count:     u32,
    pub completed_lessons: BTreeSet<LessonId>,
    pub history:           Vec<Decision>,
    pub joined_at:         Timestamp,
}

impl Profile {
    /// A fresh profile as produced by onboarding.
    pub fn new(household: Household, joined_at: Timestamp) -> Self {
        Self {
            household,
            is_plus: false,
            total_saved: 0.0,
            actions_count: 0,
            completed_lessons: BTreeSet::new(),
            history: Vec::new(),
            joined_at,
        }
    }

    pub fn with_household(&self, household: Household) -> Self {
        Self { household, ..self.clone() }
    }

    pub fn with_plus(&self, is_plus: bool) -> Self {
        Self { is_plus, ..self.clone() }
    }

    pub fn has_completed(&self, lesson_id: &str) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    /// Verify the aggregate invariants against the history.
    pub fn check_invariants(&self) -> LensResult<()> {
        if self.actions_count as usize != self.history.len() {
            return Err(LensError::CorruptProfile {
                reason: format!(
                    "actions_count={} but history has {} entries",
                    self.actions_count,
                    self.history.len()
                ),
            });
        }

        let sum: f64 = self.history.iter().map(|d| d.savings).sum();
        if (sum - self.total_saved).abs() > TOTAL_SAVED_TOLERANCE {
            return Err(LensError::CorruptProfile {
                reason: format!("total_saved={} but history sums to {sum}", self.total_saved),
            });
        }

        if let Some(bad) = self.history.iter().find(|d| !d.savings.is_finite() || d.savings < 0.0) {
            return Err(LensError::CorruptProfile {
                reason: format!("decision {} has invalid savings {}", bad.id, bad.savings),
            });
        }
        Ok(())
    }

    /// Pretty JSON export of the whole profile (settings "export my data").
    pub fn export_json(&self) -> LensResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
