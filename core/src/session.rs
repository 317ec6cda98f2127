//! The session: one household, one Profile value, threaded through every
//! operation.
//!
//! FLOW (reveal → commit):
//!   1. Entitlement gate checks the projection quota
//!   2. Projection calculator computes the cost figures
//!   3. Advisory gateway supplies swaps (never empty)
//!   4. Caller discards the impact, or commits the recommended swap
//!   5. Ledger appends and recomputes aggregates
//!   6. Progression re-evaluates which lessons just unlocked
//!
//! RULES:
//!   - Every mutation builds a whole new Profile, saves it, and only then
//!     replaces the in-session value. A failed save leaves the session
//!     exactly as it was.
//!   - Oracle calls are the only suspension points; both are bounded by
//!     timeouts and recovered locally.

use crate::{
    advisory::{AdvisoryGateway, AdvisoryOracle},
    clock::Clock,
    config::EngineConfig,
    entitlement::{
        EntitlementGate, EntitlementOracle, Gated, Package, PackageRef, PurchaseOutcome,
        RestoreOutcome, SubscriptionState, SyncOutcome,
    },
    error::{LensError, LensResult},
    event::SessionEvent,
    ledger::{self, THIS_WEEK_DAYS},
    meal_plan::{MealPlan, MealTemplate},
    profile::{Decision, Household, Profile},
    progression::{self, LessonStatus},
    projection::{project, PurchaseImpact, PurchaseInput},
    store::ProfileStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Number of decisions shown on the dashboard.
pub const RECENT_DECISIONS: usize = 3;

/// Dashboard figures derived from the current Profile.
#[derive(Debug, Clone, Serialize)]
pub struct Summary<'a> {
    pub total_saved:       f64,
    pub actions_count:     u32,
    pub is_plus:           bool,
    pub this_week_savings: f64,
    pub recent:            Vec<&'a Decision>,
    pub next_lesson:       Option<LessonStatus<'a>>,
}

pub struct Session {
    config:    EngineConfig,
    store:     Box<dyn ProfileStore>,
    advisory:  AdvisoryGateway,
    gate:      EntitlementGate,
    clock:     Arc<dyn Clock>,
    profile:   Option<Profile>,
    meal_plan: MealPlan,
}

impl Session {
    pub fn new(
        config:      EngineConfig,
        store:       Box<dyn ProfileStore>,
        advisory:    Box<dyn AdvisoryOracle>,
        entitlement: Box<dyn EntitlementOracle>,
        clock:       Arc<dyn Clock>,
    ) -> Self {
        Self {
            advisory: AdvisoryGateway::new(advisory, config.advisory_timeout),
            gate: EntitlementGate::new(
                entitlement,
                config.entitlement_timeout,
                config.quotas,
                config.entitlement_user_id.clone(),
            ),
            config,
            store,
            clock,
            profile: None,
            meal_plan: MealPlan::new(),
        }
    }

    /// Load the stored profile (if any) and reconcile its subscription flag.
    pub async fn start(&mut self) -> LensResult<Vec<SessionEvent>> {
        self.profile = self.store.load(&self.config.storage_key)?;
        match &self.profile {
            None => {
                log::info!("session: no stored profile, onboarding required");
                Ok(Vec::new())
            }
            Some(p) => {
                log::info!(
                    "session: loaded profile actions={} total_saved={:.2}",
                    p.actions_count,
                    p.total_saved
                );
                self.sync_entitlement().await
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        self.gate.state()
    }

    // ── Onboarding and settings ───────────────────────────────────

    pub async fn onboard(&mut self, household: Household) -> LensResult<Vec<SessionEvent>> {
        if self.profile.is_some() {
            return Err(LensError::invalid("profile", "already onboarded; reset first"));
        }
        let joined_at = self.clock.now();
        self.replace_profile(Profile::new(household, joined_at))?;

        let mut events = vec![SessionEvent::ProfileCreated];
        events.extend(self.sync_entitlement().await?);
        Ok(events)
    }

    pub fn update_household(&mut self, household: Household) -> LensResult<Vec<SessionEvent>> {
        let next = self.require_profile()?.with_household(household);
        self.replace_profile(next)?;
        Ok(vec![SessionEvent::ProfileUpdated])
    }

    pub fn export_json(&self) -> LensResult<String> {
        self.require_profile()?.export_json()
    }

    /// Discard the whole profile. History is never trimmed piecemeal.
    pub fn reset(&mut self) -> LensResult<Vec<SessionEvent>> {
        self.store.clear(&self.config.storage_key)?;
        self.profile = None;
        self.meal_plan.clear();
        log::info!("session: profile reset");
        Ok(vec![SessionEvent::ProfileReset])
    }

    // ── Projection and swaps ──────────────────────────────────────

    pub async fn reveal_impact(&self, input: &PurchaseInput) -> LensResult<Gated<PurchaseImpact>> {
        let profile = self.require_profile()?;
        if let Gated::QuotaExceeded(signal) = self.gate.check_projection(profile) {
            return Ok(Gated::QuotaExceeded(signal));
        }

        let projection = project(input.price)?;
        let swaps = self
            .advisory
            .get_swaps(&input.item, input.category, input.price)
            .await?;
        log::debug!(
            "session: impact for '{}' yearly={:.2} five_year={:.2} swaps={} ({:?})",
            input.item,
            projection.yearly_cost,
            projection.five_year_invested,
            swaps.len(),
            swaps.source()
        );
        Ok(Gated::Allowed(PurchaseImpact::new(input.clone(), projection, swaps)))
    }

    /// Commit the recommended swap of a revealed impact.
    pub fn choose_swap(&mut self, impact: &PurchaseImpact) -> LensResult<Vec<SessionEvent>> {
        let decision = Decision::swap(impact, self.clock.now())?;
        self.commit_decision(decision)
    }

    fn commit_decision(&mut self, decision: Decision) -> LensResult<Vec<SessionEvent>> {
        let current = self.require_profile()?;
        let before = current.actions_count;
        let decision_id = decision.id.clone();
        let savings = decision.savings;
        let next = ledger::commit(current, decision)?;

        let mut events = vec![SessionEvent::DecisionCommitted {
            decision_id,
            savings,
            total_saved: next.total_saved,
            actions_count: next.actions_count,
        }];
        events.extend(
            progression::newly_unlocked(&self.config.lessons, before, next.actions_count)
                .into_iter()
                .filter(|l| !next.has_completed(&l.id))
                .map(|l| SessionEvent::LessonUnlocked {
                    lesson_id: l.id.clone(),
                    title: l.title.clone(),
                }),
        );

        self.replace_profile(next)?;
        Ok(events)
    }

    // ── Progression ───────────────────────────────────────────────

    pub fn next_lesson(&self) -> LensResult<Option<LessonStatus<'_>>> {
        let profile = self.require_profile()?;
        Ok(progression::next_lesson(
            &self.config.lessons,
            &profile.completed_lessons,
            profile.actions_count,
        ))
    }

    /// Mark an unlocked lesson as read. Completing it again does nothing
    /// and emits nothing.
    pub fn complete_lesson(&mut self, lesson_id: &str) -> LensResult<Vec<SessionEvent>> {
        let lesson = self
            .config
            .lesson(lesson_id)
            .ok_or_else(|| LensError::UnknownLesson { lesson_id: lesson_id.to_string() })?;
        let profile = self.require_profile()?;
        if !lesson.is_unlocked(profile.actions_count) {
            return Err(LensError::LessonLocked {
                lesson_id: lesson_id.to_string(),
                remaining: lesson.requirement.saturating_sub(profile.actions_count),
            });
        }

        let (next, first_time) = progression::complete_lesson(profile, lesson_id);
        if !first_time {
            return Ok(Vec::new());
        }
        self.replace_profile(next)?;
        Ok(vec![SessionEvent::LessonCompleted { lesson_id: lesson_id.to_string() }])
    }

    pub fn summary(&self) -> LensResult<Summary<'_>> {
        let profile = self.require_profile()?;
        Ok(Summary {
            total_saved: profile.total_saved,
            actions_count: profile.actions_count,
            is_plus: self.gate.is_plus(profile),
            this_week_savings: ledger::trailing_window_savings(profile, THIS_WEEK_DAYS, self.clock.now()),
            recent: ledger::recent(profile, RECENT_DECISIONS),
            next_lesson: self.next_lesson()?,
        })
    }

    // ── Meal planner ──────────────────────────────────────────────

    /// Opening the planner starts a fresh selection; the free-tier meal
    /// quota counts only what is selected in this sitting.
    pub fn open_meal_planner(&mut self) -> &[MealTemplate] {
        self.meal_plan.clear();
        &self.config.meals
    }

    pub fn meal_plan(&self) -> &MealPlan {
        &self.meal_plan
    }

    /// Select or deselect a meal. Returns whether it is selected afterwards.
    /// Deselecting is never gated.
    pub fn toggle_meal(&mut self, meal_id: &str) -> LensResult<Gated<bool>> {
        let meal = self
            .config
            .meal(meal_id)
            .ok_or_else(|| LensError::UnknownMeal { meal_id: meal_id.to_string() })?;
        let profile = self.require_profile()?;

        if !self.meal_plan.contains(meal_id) {
            if let Gated::QuotaExceeded(signal) =
                self.gate.check_meal_selection(profile, self.meal_plan.len())
            {
                return Ok(Gated::QuotaExceeded(signal));
            }
        }
        Ok(Gated::Allowed(self.meal_plan.toggle(meal)))
    }

    /// Ledger the current selection as one meal-plan decision.
    pub fn commit_meal_plan(&mut self) -> LensResult<Vec<SessionEvent>> {
        let decision = self
            .meal_plan
            .to_decision(self.config.takeaway_cost_per_serving, self.clock.now())?;
        let events = self.commit_decision(decision)?;
        self.meal_plan.clear();
        Ok(events)
    }

    // ── Entitlement ───────────────────────────────────────────────

    async fn sync_entitlement(&mut self) -> LensResult<Vec<SessionEvent>> {
        let current = self.require_profile()?.clone();
        let (next, outcome) = self.gate.sync(&current).await;

        let event = match outcome {
            SyncOutcome::Confirmed { .. } => SessionEvent::EntitlementSynced {
                state: self.gate.state(),
                corrected: false,
            },
            SyncOutcome::Corrected { .. } => {
                self.replace_profile(next)?;
                SessionEvent::EntitlementSynced {
                    state: self.gate.state(),
                    corrected: true,
                }
            }
            SyncOutcome::Failed { reason } => SessionEvent::EntitlementSyncFailed { reason },
        };
        Ok(vec![event])
    }

    pub async fn offerings(&mut self) -> Vec<Package> {
        self.gate.offerings().await
    }

    pub async fn purchase(&mut self, package: &PackageRef) -> LensResult<PurchaseOutcome> {
        let current = self.require_profile()?.clone();
        let (next, outcome) = self.gate.purchase(&current, package).await;
        if outcome == PurchaseOutcome::Upgraded {
            self.replace_profile(next)?;
        }
        Ok(outcome)
    }

    /// "Nothing to restore" is an outcome, not an error.
    pub async fn restore(&mut self) -> LensResult<RestoreOutcome> {
        let current = self.require_profile()?.clone();
        let (next, outcome) = self.gate.restore(&current).await;
        if outcome == RestoreOutcome::Restored {
            self.replace_profile(next)?;
        }
        Ok(outcome)
    }

    // ── Internals ─────────────────────────────────────────────────

    fn require_profile(&self) -> LensResult<&Profile> {
        self.profile.as_ref().ok_or(LensError::ProfileNotFound)
    }

    fn replace_profile(&mut self, next: Profile) -> LensResult<()> {
        self.store.save(&self.config.storage_key, &next)?;
        self.profile = Some(next);
        Ok(())
    }
}
