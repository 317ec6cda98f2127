//! Advisory Gateway: cheaper alternatives for a purchase.
//!
//! The primary path asks the external advisory oracle once. Its answer is
//! untyped JSON and is validated here, at the boundary, before anything
//! else sees it:
//!   - an array decodes element-wise into {name, price, reason, savings}
//!   - a single object is coerced into a one-element array
//!   - all four fields are required; names must be non-empty and numbers
//!     finite and >= 0
//!
//! Any oracle failure (transport, timeout, malformed shape, empty list) is
//! logged and replaced by a deterministic fallback derived only from the
//! price. The caller always gets a non-empty list; the first entry is the
//! recommended swap.

use crate::{
    error::{LensResult, OracleError},
    profile::PurchaseCategory,
    projection::validate_price,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

// Fallback pricing as fractions of the original price.
pub const GENERIC_PRICE_FACTOR:   f64 = 0.65;
pub const GENERIC_SAVINGS_FACTOR: f64 = 0.35;
pub const BULK_PRICE_FACTOR:      f64 = 0.80;
pub const BULK_SAVINGS_FACTOR:    f64 = 0.20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapSuggestion {
    pub name:    String,
    pub price:   f64,
    pub reason:  String,
    /// Weekly savings versus the original purchase. Always >= 0.
    pub savings: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwapSource {
    Oracle,
    Fallback,
}

/// A non-empty, ordered list of suggestions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SwapSet {
    suggestions: Vec<SwapSuggestion>,
    source:      SwapSource,
}

impl SwapSet {
    /// None when `suggestions` is empty.
    fn from_parts(suggestions: Vec<SwapSuggestion>, source: SwapSource) -> Option<Self> {
        if suggestions.is_empty() {
            None
        } else {
            Some(Self { suggestions, source })
        }
    }

    pub fn recommended(&self) -> &SwapSuggestion {
        &self.suggestions[0]
    }

    pub fn suggestions(&self) -> &[SwapSuggestion] {
        &self.suggestions
    }

    pub fn source(&self) -> SwapSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SwapSource::Fallback
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    /// Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}

/// What the oracle is asked about.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdvisoryRequest {
    pub item:     String,
    pub category: PurchaseCategory,
    pub price:    f64,
}

impl AdvisoryRequest {
    /// Natural-language brief for generative backends.
    pub fn prompt(&self) -> String {
        format!(
            "I am buying \"{}\" in the \"{}\" category for ${:.2}. \
             Give me two smarter, cheaper household-friendly alternatives (swaps) \
             that save money but keep quality or convenience. \
             Answer as a JSON array of objects with fields name, price, reason, savings.",
            self.item, self.category, self.price
        )
    }
}

/// The external advisory backend. Implementations return the raw decoded
/// JSON body; shape validation is the gateway's job.
#[async_trait]
pub trait AdvisoryOracle: Send + Sync {
    async fn suggest(&self, request: &AdvisoryRequest) -> Result<Value, OracleError>;
}

pub struct AdvisoryGateway {
    oracle:  Box<dyn AdvisoryOracle>,
    timeout: Duration,
}

impl AdvisoryGateway {
    pub fn new(oracle: Box<dyn AdvisoryOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Suggestions for a purchase. Only an invalid price fails; oracle
    /// problems fall back.
    pub async fn get_swaps(
        &self,
        item:     &str,
        category: PurchaseCategory,
        price:    f64,
    ) -> LensResult<SwapSet> {
        validate_price(price)?;

        let request = AdvisoryRequest { item: item.to_string(), category, price };
        match self.ask_oracle(&request).await {
            Ok(suggestions) => {
                log::debug!("advisory: {} suggestion(s) for '{item}'", suggestions.len());
                Ok(SwapSet::from_parts(suggestions, SwapSource::Oracle)
                    .unwrap_or_else(|| fallback_swaps(item, price)))
            }
            Err(e) => {
                log::warn!("advisory unavailable for '{item}', using fallback: {e}");
                Ok(fallback_swaps(item, price))
            }
        }
    }

    async fn ask_oracle(&self, request: &AdvisoryRequest) -> Result<Vec<SwapSuggestion>, OracleError> {
        let raw = tokio::time::timeout(self.timeout, self.oracle.suggest(request))
            .await
            .map_err(|_| OracleError::Timeout { millis: self.timeout.as_millis() as u64 })??;
        decode_swaps(raw)
    }
}

/// Wire shape. Every field is required.
#[derive(Debug, Deserialize)]
struct WireSwap {
    name:    String,
    price:   f64,
    reason:  String,
    savings: f64,
}

/// Strictly decode an oracle body into suggestions.
pub fn decode_swaps(raw: Value) -> Result<Vec<SwapSuggestion>, OracleError> {
    let entries = match raw {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(OracleError::Malformed(format!(
                "expected an array or object, got {}",
                json_kind(&other)
            )))
        }
    };
    if entries.is_empty() {
        return Err(OracleError::Malformed("empty suggestion list".into()));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let wire: WireSwap = serde_json::from_value(entry)
                .map_err(|e| OracleError::Malformed(format!("suggestion {i}: {e}")))?;
            validate_wire(i, wire)
        })
        .collect()
}

fn validate_wire(index: usize, wire: WireSwap) -> Result<SwapSuggestion, OracleError> {
    let name = wire.name.trim();
    if name.is_empty() {
        return Err(OracleError::Malformed(format!("suggestion {index}: empty name")));
    }
    for (field, value) in [("price", wire.price), ("savings", wire.savings)] {
        if !value.is_finite() || value < 0.0 {
            return Err(OracleError::Malformed(format!(
                "suggestion {index}: {field}={value} out of range"
            )));
        }
    }
    Ok(SwapSuggestion {
        name:    name.to_string(),
        price:   wire.price,
        reason:  wire.reason.trim().to_string(),
        savings: wire.savings,
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

/// Deterministic suggestions derived from the price alone.
pub fn fallback_swaps(item: &str, price: f64) -> SwapSet {
    let suggestions = vec![
        SwapSuggestion {
            name:    format!("Generic brand {item}"),
            price:   price * GENERIC_PRICE_FACTOR,
            reason:  "Store and generic brands often use the same ingredients for about a third less.".into(),
            savings: price * GENERIC_SAVINGS_FACTOR,
        },
        SwapSuggestion {
            name:    format!("Bulk-buy or DIY {item}"),
            price:   price * BULK_PRICE_FACTOR,
            reason:  "Buying in bulk or making it at home spreads the cost across the week.".into(),
            savings: price * BULK_SAVINGS_FACTOR,
        },
    ];
    SwapSet { suggestions, source: SwapSource::Fallback }
}
