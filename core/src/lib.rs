//! NestEgg purchase impact & decision engine.
//!
//! Is a recurring purchase worth its long-run opportunity cost? This crate
//! answers that deterministically, suggests cheaper swaps, and ledgers the
//! swaps a household commits to.

pub mod advisory;
pub mod clock;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod event;
pub mod ledger;
pub mod meal_plan;
pub mod profile;
pub mod progression;
pub mod projection;
pub mod session;
pub mod store;
pub mod types;

pub use error::{LensError, LensResult, OracleError};
pub use session::Session;
