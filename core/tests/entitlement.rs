//! Entitlement gate tests: sync, quotas, purchase and restore.

mod common;

use common::{household, init_logging, t0, ScriptedEntitlement};
use nestegg_core::{
    config::QuotaConfig,
    entitlement::{
        EntitlementGate, Feature, Gated, Package, PackageRef, PurchaseOutcome, QuotaSignal,
        RestoreOutcome, SubscriptionState, SyncOutcome,
    },
    profile::Profile,
};
use std::time::Duration;

const QUOTAS: QuotaConfig = QuotaConfig {
    free_projection_limit: 5,
    free_meal_plan_items: 1,
};

fn gate(oracle: ScriptedEntitlement) -> EntitlementGate {
    gate_for(oracle, None)
}

fn gate_for(oracle: ScriptedEntitlement, user_id: Option<&str>) -> EntitlementGate {
    init_logging();
    EntitlementGate::new(
        Box::new(oracle),
        Duration::from_millis(100),
        QUOTAS,
        user_id.map(str::to_string),
    )
}

fn profile(is_plus: bool, actions: u32) -> Profile {
    let mut p = Profile::new(household(), t0()).with_plus(is_plus);
    // Quota checks only read the counter.
    p.actions_count = actions;
    p
}

#[tokio::test]
async fn oracle_corrects_a_stale_free_flag() {
    let mut g = gate(ScriptedEntitlement::entitled(true));
    assert_eq!(g.state(), SubscriptionState::Unknown);

    let (synced, outcome) = g.sync(&profile(false, 0)).await;
    assert!(synced.is_plus);
    assert_eq!(outcome, SyncOutcome::Corrected { from: false, to: true });
    assert_eq!(g.state(), SubscriptionState::Plus);
}

#[tokio::test]
async fn oracle_revokes_a_stale_plus_flag() {
    let mut g = gate_for(ScriptedEntitlement::entitled(false), Some("household-1"));
    let (synced, outcome) = g.sync(&profile(true, 0)).await;
    assert!(!synced.is_plus);
    assert_eq!(outcome, SyncOutcome::Corrected { from: true, to: false });
    assert_eq!(g.state(), SubscriptionState::Free);
}

#[tokio::test]
async fn agreement_is_confirmed_without_change() {
    let mut g = gate(ScriptedEntitlement::entitled(true));
    let before = profile(true, 2);
    let (synced, outcome) = g.sync(&before).await;
    assert_eq!(synced, before);
    assert_eq!(outcome, SyncOutcome::Confirmed { is_plus: true });
}

#[tokio::test]
async fn oracle_failure_keeps_the_cached_flag() {
    let mut g = gate(ScriptedEntitlement::failing());
    let (synced, outcome) = g.sync(&profile(false, 0)).await;
    assert!(!synced.is_plus);
    assert!(matches!(outcome, SyncOutcome::Failed { .. }));
    assert_eq!(g.state(), SubscriptionState::Free);

    let mut g = gate(ScriptedEntitlement::failing());
    let (synced, _) = g.sync(&profile(true, 0)).await;
    assert!(synced.is_plus);
    assert_eq!(g.state(), SubscriptionState::Plus);
}

#[test]
fn free_tier_projection_quota_trips_at_five_actions() {
    let g = gate(ScriptedEntitlement::default());
    assert!(g.check_projection(&profile(false, 4)).is_allowed());
    assert_eq!(
        g.check_projection(&profile(false, 5)),
        Gated::QuotaExceeded(QuotaSignal { feature: Feature::Projection, limit: 5 })
    );
    assert!(g.check_projection(&profile(true, 5)).is_allowed());
    assert!(g.check_projection(&profile(true, 500)).is_allowed());
}

#[test]
fn free_tier_meal_quota_allows_one_item() {
    let g = gate(ScriptedEntitlement::default());
    // The meal quota ignores the action counter entirely.
    let free = profile(false, 40);
    assert!(g.check_meal_selection(&free, 0).is_allowed());
    assert_eq!(
        g.check_meal_selection(&free, 1),
        Gated::QuotaExceeded(QuotaSignal { feature: Feature::MealPlan, limit: 1 })
    );
    assert!(g.check_meal_selection(&profile(true, 0), 3).is_allowed());
}

#[tokio::test]
async fn resolved_state_overrides_the_cached_flag_for_quotas() {
    let mut g = gate(ScriptedEntitlement::entitled(true));
    let stale = profile(false, 5);
    let _ = g.sync(&stale).await;
    // Even a stale copy of the profile is treated as Plus once synced.
    assert!(g.check_projection(&stale).is_allowed());
}

#[tokio::test]
async fn purchase_upgrades_only_when_confirmed() {
    let oracle = ScriptedEntitlement { purchase_activates: true, ..ScriptedEntitlement::default() };
    let mut g = gate(oracle);
    let (upgraded, outcome) = g.purchase(&profile(false, 5), &PackageRef("monthly".into())).await;
    assert_eq!(outcome, PurchaseOutcome::Upgraded);
    assert!(upgraded.is_plus);
    assert_eq!(g.state(), SubscriptionState::Plus);

    let mut g = gate(ScriptedEntitlement::default());
    let (same, outcome) = g.purchase(&profile(false, 5), &PackageRef("monthly".into())).await;
    assert_eq!(outcome, PurchaseOutcome::NotCompleted);
    assert!(!same.is_plus);

    let mut g = gate(ScriptedEntitlement::failing());
    let (same, outcome) = g.purchase(&profile(false, 5), &PackageRef("monthly".into())).await;
    assert!(matches!(outcome, PurchaseOutcome::Failed { .. }));
    assert!(!same.is_plus);
}

#[tokio::test]
async fn restore_with_nothing_active_is_not_an_error() {
    let mut g = gate(ScriptedEntitlement::default());
    let (same, outcome) = g.restore(&profile(false, 0)).await;
    assert_eq!(outcome, RestoreOutcome::NothingToRestore);
    assert!(!same.is_plus);

    let oracle = ScriptedEntitlement { restore_finds: true, ..ScriptedEntitlement::default() };
    let mut g = gate(oracle);
    let (restored, outcome) = g.restore(&profile(false, 0)).await;
    assert_eq!(outcome, RestoreOutcome::Restored);
    assert!(restored.is_plus);
}

#[tokio::test]
async fn offerings_are_empty_when_the_provider_is_down() {
    let package = Package {
        id: "monthly".into(),
        title: "NestEgg Plus".into(),
        price_label: "$9.99/mo".into(),
    };
    let oracle = ScriptedEntitlement { packages: vec![package.clone()], ..ScriptedEntitlement::default() };
    let mut g = gate(oracle);
    assert_eq!(g.offerings().await, vec![package]);

    let mut g = gate(ScriptedEntitlement::failing());
    assert!(g.offerings().await.is_empty());
}

#[tokio::test]
async fn every_init_uses_the_configured_user_id() {
    let oracle = ScriptedEntitlement {
        purchase_activates: true,
        ..ScriptedEntitlement::init_fails_first(1)
    };
    let recorder = oracle.clone();
    let mut g = gate_for(oracle, Some("household-1"));

    let (synced, outcome) = g.sync(&profile(false, 0)).await;
    assert!(matches!(outcome, SyncOutcome::Failed { .. }));
    assert!(!synced.is_plus);

    // The failed init is retried by the purchase, under the same identity.
    let (upgraded, outcome) = g.purchase(&synced, &PackageRef("monthly".into())).await;
    assert_eq!(outcome, PurchaseOutcome::Upgraded);
    assert!(upgraded.is_plus);

    let ids = recorder.recorded_init_ids();
    assert_eq!(ids, vec![Some("household-1".to_string()); 2]);

    // Initialized now; later calls do not init again.
    let _ = g.restore(&upgraded).await;
    assert_eq!(recorder.recorded_init_ids().len(), 2);
}

#[tokio::test]
async fn slow_provider_times_out_without_changing_the_tier() {
    let slow = || ScriptedEntitlement {
        entitled: true,
        purchase_activates: true,
        restore_finds: true,
        ..ScriptedEntitlement::slow(Duration::from_secs(5))
    };

    let mut g = gate(slow());
    let (synced, outcome) = g.sync(&profile(false, 0)).await;
    assert_eq!(outcome, SyncOutcome::Failed { reason: "oracle timed out after 100ms".into() });
    assert!(!synced.is_plus);
    assert_eq!(g.state(), SubscriptionState::Free);

    let (same, outcome) = g.purchase(&synced, &PackageRef("monthly".into())).await;
    assert!(matches!(outcome, PurchaseOutcome::Failed { ref reason } if reason.contains("timed out")));
    assert_eq!(same, synced);

    let (same, outcome) = g.restore(&synced).await;
    assert!(matches!(outcome, RestoreOutcome::Failed { ref reason } if reason.contains("timed out")));
    assert_eq!(same, synced);
    assert_eq!(g.state(), SubscriptionState::Free);

    // A cached Plus flag survives the timeout too.
    let mut g = gate(slow());
    let (synced, _) = g.sync(&profile(true, 0)).await;
    assert!(synced.is_plus);
    assert_eq!(g.state(), SubscriptionState::Plus);
}
