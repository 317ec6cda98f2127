//! Projection Calculator: what a recurring purchase costs over a year, and
//! what the same money would grow to if invested instead.
//!
//! The rate and horizon are fixed illustrative assumptions:
//!   - contributions of weekly_cost * 4.33 per month (average weeks/month)
//!   - 6% nominal annual rate, compounded monthly
//!   - 5 year horizon
//!
//! FV = monthly * ((1 + r/n)^(n*t) - 1) / (r/n)
//!
//! Pure and deterministic. No I/O.

use crate::{
    advisory::SwapSet,
    error::{LensError, LensResult},
    profile::PurchaseCategory,
};
use serde::{Deserialize, Serialize};

pub const WEEKS_PER_YEAR:   f64 = 52.0;
pub const WEEKS_PER_MONTH:  f64 = 4.33;
pub const ANNUAL_RATE:      f64 = 0.06;
pub const COMPOUNDS_PER_YEAR: u32 = 12;
pub const HORIZON_YEARS:    u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Projection {
    pub weekly_cost:        f64,
    pub yearly_cost:        f64,
    pub five_year_invested: f64,
}

/// Project a positive weekly cost.
pub fn project(weekly_cost: f64) -> LensResult<Projection> {
    validate_price(weekly_cost)?;

    let yearly_cost = weekly_cost * WEEKS_PER_YEAR;

    let periodic_rate = ANNUAL_RATE / COMPOUNDS_PER_YEAR as f64;
    let periods = (COMPOUNDS_PER_YEAR * HORIZON_YEARS) as i32;
    let monthly_contribution = weekly_cost * WEEKS_PER_MONTH;
    let five_year_invested =
        monthly_contribution * ((1.0 + periodic_rate).powi(periods) - 1.0) / periodic_rate;

    Ok(Projection { weekly_cost, yearly_cost, five_year_invested })
}

/// Prices must be finite and strictly positive.
pub fn validate_price(price: f64) -> LensResult<()> {
    if !price.is_finite() {
        return Err(LensError::invalid("price", format!("{price} is not a finite number")));
    }
    if price <= 0.0 {
        return Err(LensError::invalid("price", format!("{price} must be greater than zero")));
    }
    Ok(())
}

/// A purchase the household is considering. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseInput {
    pub item:     String,
    pub category: PurchaseCategory,
    pub price:    f64,
}

impl PurchaseInput {
    /// Build and validate. The item label is trimmed.
    pub fn new(item: &str, category: PurchaseCategory, price: f64) -> LensResult<Self> {
        let item = item.trim();
        if item.is_empty() {
            return Err(LensError::invalid("item", "label must not be empty"));
        }
        validate_price(price)?;
        Ok(Self { item: item.to_string(), category, price })
    }

    /// Parse from free text as typed into a form or sent over IPC.
    pub fn parse(item: &str, category: &str, price: &str) -> LensResult<Self> {
        let category: PurchaseCategory = category.parse()?;
        let price: f64 = price
            .trim()
            .parse()
            .map_err(|_| LensError::invalid("price", format!("'{}' is not numeric", price.trim())))?;
        Self::new(item, category, price)
    }
}

/// Projection result plus the swap suggestions to show alongside it.
/// Discarded once the household commits or cancels.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PurchaseImpact {
    pub input:      PurchaseInput,
    pub projection: Projection,
    pub swaps:      SwapSet,
}

impl PurchaseImpact {
    pub fn new(input: PurchaseInput, projection: Projection, swaps: SwapSet) -> Self {
        Self { input, projection, swaps }
    }
}
