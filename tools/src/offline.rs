//! Oracles for running without network access.
//!
//! The advisory oracle always fails, so every reveal uses the fallback
//! swaps. The billing provider is reported unreachable, so the cached
//! subscription flag stands.

use async_trait::async_trait;
use nestegg_core::{
    advisory::{AdvisoryOracle, AdvisoryRequest},
    entitlement::{EntitlementOracle, Package, PackageRef},
    OracleError,
};
use serde_json::Value;

pub struct OfflineAdvisory;

#[async_trait]
impl AdvisoryOracle for OfflineAdvisory {
    async fn suggest(&self, request: &AdvisoryRequest) -> Result<Value, OracleError> {
        log::debug!("offline advisory: no suggestions for '{}'", request.item);
        Err(OracleError::Transport("advisory service not configured".into()))
    }
}

pub struct OfflineEntitlement;

fn unreachable_provider<T>() -> Result<T, OracleError> {
    Err(OracleError::Transport("billing provider not configured".into()))
}

#[async_trait]
impl EntitlementOracle for OfflineEntitlement {
    async fn init(&self, _user_id: Option<&str>) -> Result<(), OracleError> {
        unreachable_provider()
    }

    async fn check_entitlement(&self) -> Result<bool, OracleError> {
        unreachable_provider()
    }

    async fn purchase(&self, _package: &PackageRef) -> Result<bool, OracleError> {
        unreachable_provider()
    }

    async fn restore(&self) -> Result<bool, OracleError> {
        unreachable_provider()
    }

    async fn offerings(&self) -> Result<Vec<Package>, OracleError> {
        unreachable_provider()
    }
}
