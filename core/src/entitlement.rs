//! Entitlement Gate: free vs. Plus tier, and the free-tier quotas.
//!
//! STATE MACHINE:
//!   Unknown ──sync()──▶ Syncing ──oracle answers──▶ Free | Plus
//!                              └─oracle fails────▶ tier of the cached flag
//!   Free ──purchase()/restore() confirmed──▶ Plus
//!
//! The cached `is_plus` flag on the Profile is a UI optimisation only.
//! When the oracle answers and disagrees, the cache is corrected. Oracle
//! failures are logged and swallowed; they never change the tier.
//!
//! QUOTAS (Free only, independent of each other):
//!   - projections: rejected once actions_count >= free_projection_limit
//!   - meal plan:   adding a meal rejected once selected >= free_meal_plan_items

use crate::{
    config::QuotaConfig,
    error::OracleError,
    profile::Profile,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// A purchasable subscription package as listed by the billing provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id:          String,
    pub title:       String,
    pub price_label: String,
}

/// Opaque reference to a package, passed back to the provider on purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageRef(pub String);

impl From<&Package> for PackageRef {
    fn from(p: &Package) -> Self {
        PackageRef(p.id.clone())
    }
}

/// The external billing provider. Every call may fail.
#[async_trait]
pub trait EntitlementOracle: Send + Sync {
    async fn init(&self, user_id: Option<&str>) -> Result<(), OracleError>;
    /// Whether the Plus entitlement is currently active.
    async fn check_entitlement(&self) -> Result<bool, OracleError>;
    /// Whether the entitlement is active after the purchase.
    async fn purchase(&self, package: &PackageRef) -> Result<bool, OracleError>;
    /// Whether an active entitlement was found to restore.
    async fn restore(&self) -> Result<bool, OracleError>;
    async fn offerings(&self) -> Result<Vec<Package>, OracleError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Unknown,
    Syncing,
    Free,
    Plus,
}

impl SubscriptionState {
    fn from_flag(is_plus: bool) -> Self {
        if is_plus { Self::Plus } else { Self::Free }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Projection,
    MealPlan,
}

/// Why a free-tier request was turned away. The caller is expected to
/// present an upgrade path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaSignal {
    pub feature: Feature,
    pub limit:   u32,
}

/// Result of a gated operation. Quota is a signal, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
    Allowed(T),
    QuotaExceeded(QuotaSignal),
}

impl<T> Gated<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Gated::Allowed(_))
    }

    pub fn allowed(self) -> Option<T> {
        match self {
            Gated::Allowed(v) => Some(v),
            Gated::QuotaExceeded(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Confirmed { is_plus: bool },
    Corrected { from: bool, to: bool },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Upgraded,
    NotCompleted,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    Restored,
    NothingToRestore,
    Failed { reason: String },
}

pub struct EntitlementGate {
    oracle:      Box<dyn EntitlementOracle>,
    timeout:     Duration,
    quotas:      QuotaConfig,
    state:       SubscriptionState,
    initialized: bool,
    /// Identity every `init` call is made under.
    user_id:     Option<String>,
}

impl EntitlementGate {
    pub fn new(
        oracle:  Box<dyn EntitlementOracle>,
        timeout: Duration,
        quotas:  QuotaConfig,
        user_id: Option<String>,
    ) -> Self {
        Self {
            oracle,
            timeout,
            quotas,
            state: SubscriptionState::Unknown,
            initialized: false,
            user_id,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Effective tier: the resolved state once known, else the cached flag.
    pub fn is_plus(&self, profile: &Profile) -> bool {
        match self.state {
            SubscriptionState::Plus => true,
            SubscriptionState::Free => false,
            SubscriptionState::Unknown | SubscriptionState::Syncing => profile.is_plus,
        }
    }

    /// Reconcile the cached flag with the oracle. Returns the (possibly
    /// corrected) profile.
    pub async fn sync(&mut self, profile: &Profile) -> (Profile, SyncOutcome) {
        let cached = profile.is_plus;
        self.state = SubscriptionState::Syncing;

        let answer = match self.ensure_init().await {
            Ok(()) => self.bounded(self.oracle.check_entitlement()).await,
            Err(e) => Err(e),
        };

        match answer {
            Ok(is_plus) => {
                self.state = SubscriptionState::from_flag(is_plus);
                if is_plus == cached {
                    log::debug!("entitlement: confirmed is_plus={is_plus}");
                    (profile.clone(), SyncOutcome::Confirmed { is_plus })
                } else {
                    log::info!("entitlement: correcting cached is_plus {cached} -> {is_plus}");
                    (profile.with_plus(is_plus), SyncOutcome::Corrected { from: cached, to: is_plus })
                }
            }
            Err(e) => {
                self.state = SubscriptionState::from_flag(cached);
                log::warn!("entitlement sync failed, keeping cached is_plus={cached}: {e}");
                (profile.clone(), SyncOutcome::Failed { reason: e.to_string() })
            }
        }
    }

    pub fn check_projection(&self, profile: &Profile) -> Gated<()> {
        if self.is_plus(profile) {
            return Gated::Allowed(());
        }
        let limit = self.quotas.free_projection_limit;
        if profile.actions_count >= limit {
            log::debug!("quota: projection refused at actions_count={}", profile.actions_count);
            return Gated::QuotaExceeded(QuotaSignal { feature: Feature::Projection, limit });
        }
        Gated::Allowed(())
    }

    /// Gate adding one more meal to a selection of `selected` meals.
    pub fn check_meal_selection(&self, profile: &Profile, selected: usize) -> Gated<()> {
        if self.is_plus(profile) {
            return Gated::Allowed(());
        }
        let limit = self.quotas.free_meal_plan_items;
        if selected >= limit as usize {
            log::debug!("quota: meal selection refused with {selected} selected");
            return Gated::QuotaExceeded(QuotaSignal { feature: Feature::MealPlan, limit });
        }
        Gated::Allowed(())
    }

    pub async fn purchase(&mut self, profile: &Profile, package: &PackageRef) -> (Profile, PurchaseOutcome) {
        let answer = match self.ensure_init().await {
            Ok(()) => self.bounded(self.oracle.purchase(package)).await,
            Err(e) => Err(e),
        };
        match answer {
            Ok(true) => {
                self.state = SubscriptionState::Plus;
                log::info!("entitlement: purchase of '{}' confirmed", package.0);
                (profile.with_plus(true), PurchaseOutcome::Upgraded)
            }
            Ok(false) => {
                log::info!("entitlement: purchase of '{}' did not activate Plus", package.0);
                (profile.clone(), PurchaseOutcome::NotCompleted)
            }
            Err(e) => {
                log::warn!("entitlement: purchase failed: {e}");
                (profile.clone(), PurchaseOutcome::Failed { reason: e.to_string() })
            }
        }
    }

    pub async fn restore(&mut self, profile: &Profile) -> (Profile, RestoreOutcome) {
        let answer = match self.ensure_init().await {
            Ok(()) => self.bounded(self.oracle.restore()).await,
            Err(e) => Err(e),
        };
        match answer {
            Ok(true) => {
                self.state = SubscriptionState::Plus;
                log::info!("entitlement: restore found an active subscription");
                (profile.with_plus(true), RestoreOutcome::Restored)
            }
            Ok(false) => (profile.clone(), RestoreOutcome::NothingToRestore),
            Err(e) => {
                log::warn!("entitlement: restore failed: {e}");
                (profile.clone(), RestoreOutcome::Failed { reason: e.to_string() })
            }
        }
    }

    /// Purchasable packages, or an empty list if the provider is unreachable.
    pub async fn offerings(&mut self) -> Vec<Package> {
        let answer = match self.ensure_init().await {
            Ok(()) => self.bounded(self.oracle.offerings()).await,
            Err(e) => Err(e),
        };
        answer.unwrap_or_else(|e| {
            log::warn!("entitlement: offerings unavailable: {e}");
            Vec::new()
        })
    }

    /// Initialize once, always under the configured user id. A failed
    /// init is retried by the next call.
    async fn ensure_init(&mut self) -> Result<(), OracleError> {
        if self.initialized {
            return Ok(());
        }
        self.bounded(self.oracle.init(self.user_id.as_deref())).await?;
        self.initialized = true;
        Ok(())
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, OracleError>>,
    ) -> Result<T, OracleError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| OracleError::Timeout { millis: self.timeout.as_millis() as u64 })?
    }
}
