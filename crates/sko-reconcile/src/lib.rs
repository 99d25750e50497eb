//! sko-reconcile
//!
//! Stock deduction planning for the pantry.
//!
//! Architectural decisions:
//! - Same-item plan lines are summed before any stock check
//! - Untracked ingredients never touch the stock view
//! - Under-stock is a reported shortage, not a partial draw
//! - A deduction that lands on exactly zero marks the row for removal
//!
//! Deterministic, pure logic. No IO. No database calls. The caller reads
//! stock inside its own transaction, runs the engine, then applies the
//! resulting plan.

mod engine;
mod types;

pub use engine::plan_deductions;
pub use types::*;
