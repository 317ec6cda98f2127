//! Scripted oracles and builders shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use nestegg_core::{
    advisory::{AdvisoryOracle, AdvisoryRequest},
    clock::FixedClock,
    config::EngineConfig,
    entitlement::{EntitlementOracle, Package, PackageRef},
    error::OracleError,
    profile::{BudgetBand, Household, HouseholdSize, InvestingLevel, Profile},
    store::{ProfileStore, SqliteProfileStore},
    types::Timestamp,
    LensError, LensResult, Session,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn household() -> Household {
    Household {
        household_size:  HouseholdSize::ThreeToFour,
        weekly_budget:   BudgetBand::From150To250,
        investing_level: InvestingLevel::Beginner,
    }
}

// ── Advisory ──────────────────────────────────────────────────────

#[derive(Clone)]
pub enum AdvisoryScript {
    Respond(Value),
    Fail(OracleError),
    Slow(Duration, Value),
}

pub struct ScriptedAdvisory {
    script:    AdvisoryScript,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedAdvisory {
    pub fn new(script: AdvisoryScript) -> Self {
        Self { script, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn respond(body: Value) -> Self {
        Self::new(AdvisoryScript::Respond(body))
    }

    pub fn failing() -> Self {
        Self::new(AdvisoryScript::Fail(OracleError::Transport("connection refused".into())))
    }
}

#[async_trait]
impl AdvisoryOracle for ScriptedAdvisory {
    async fn suggest(&self, _request: &AdvisoryRequest) -> Result<Value, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            AdvisoryScript::Respond(body) => Ok(body.clone()),
            AdvisoryScript::Fail(e) => Err(e.clone()),
            AdvisoryScript::Slow(delay, body) => {
                tokio::time::sleep(*delay).await;
                Ok(body.clone())
            }
        }
    }
}

pub fn two_swaps() -> Value {
    json!([
        { "name": "Home-brewed cold brew", "price": 1.20, "reason": "Batch it on Sunday.", "savings": 3.30 },
        { "name": "Supermarket iced coffee", "price": 2.00, "reason": "Same caffeine.", "savings": 2.50 }
    ])
}

// ── Entitlement ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ScriptedEntitlement {
    pub entitled:           bool,
    pub fail:               bool,
    pub restore_finds:      bool,
    pub purchase_activates: bool,
    pub packages:           Vec<Package>,
    /// Delay before every call other than `init` answers.
    pub delay:              Option<Duration>,
    /// Number of `init` calls that fail before one succeeds.
    pub init_failures:      Arc<AtomicUsize>,
    /// User id passed to each `init` call, in order.
    pub init_user_ids:      Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedEntitlement {
    pub fn entitled(entitled: bool) -> Self {
        Self { entitled, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn init_fails_first(times: usize) -> Self {
        Self { init_failures: Arc::new(AtomicUsize::new(times)), ..Self::default() }
    }

    pub fn recorded_init_ids(&self) -> Vec<Option<String>> {
        self.init_user_ids.lock().unwrap().clone()
    }

    async fn check(&self) -> Result<(), OracleError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(OracleError::Transport("billing provider unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntitlementOracle for ScriptedEntitlement {
    async fn init(&self, user_id: Option<&str>) -> Result<(), OracleError> {
        self.init_user_ids.lock().unwrap().push(user_id.map(str::to_string));
        let pending = self.init_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.init_failures.store(pending - 1, Ordering::SeqCst);
            return Err(OracleError::Transport("billing provider still starting".into()));
        }
        if self.fail {
            return Err(OracleError::Transport("billing provider unreachable".into()));
        }
        Ok(())
    }

    async fn check_entitlement(&self) -> Result<bool, OracleError> {
        self.check().await?;
        Ok(self.entitled)
    }

    async fn purchase(&self, _package: &PackageRef) -> Result<bool, OracleError> {
        self.check().await?;
        Ok(self.purchase_activates)
    }

    async fn restore(&self) -> Result<bool, OracleError> {
        self.check().await?;
        Ok(self.restore_finds)
    }

    async fn offerings(&self) -> Result<Vec<Package>, OracleError> {
        self.check().await?;
        Ok(self.packages.clone())
    }
}

// ── Stores ────────────────────────────────────────────────────────

pub fn memory_store() -> SqliteProfileStore {
    let store = SqliteProfileStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

/// In-memory store whose saves can be made to fail.
pub struct FlakyStore {
    inner:          SqliteProfileStore,
    pub fail_saves: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self { inner: memory_store(), fail_saves: Arc::new(AtomicBool::new(false)) }
    }
}

impl ProfileStore for FlakyStore {
    fn load(&self, key: &str) -> LensResult<Option<Profile>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, profile: &Profile) -> LensResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LensError::Other(anyhow::anyhow!("disk full")));
        }
        self.inner.save(key, profile)
    }

    fn clear(&self, key: &str) -> LensResult<()> {
        self.inner.clear(key)
    }
}

// ── Session builders ──────────────────────────────────────────────

pub fn build_session(
    store:       Box<dyn ProfileStore>,
    advisory:    ScriptedAdvisory,
    entitlement: ScriptedEntitlement,
) -> (Session, Arc<FixedClock>) {
    build_session_with(EngineConfig::default_test(), store, advisory, entitlement)
}

pub fn build_session_with(
    config:      EngineConfig,
    store:       Box<dyn ProfileStore>,
    advisory:    ScriptedAdvisory,
    entitlement: ScriptedEntitlement,
) -> (Session, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(t0()));
    let session = Session::new(
        config,
        store,
        Box::new(advisory),
        Box::new(entitlement),
        clock.clone(),
    );
    (session, clock)
}

/// A session with a freshly onboarded free-tier profile.
pub async fn onboarded_session(
    advisory:    ScriptedAdvisory,
    entitlement: ScriptedEntitlement,
) -> (Session, Arc<FixedClock>) {
    init_logging();
    let (mut session, clock) = build_session(Box::new(memory_store()), advisory, entitlement);
    session.start().await.expect("start");
    session.onboard(household()).await.expect("onboard");
    (session, clock)
}
