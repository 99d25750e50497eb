//! sko-pantry
//!
//! The domain service over the ledger store: batch reconciliation of
//! planned ingredient usages, manual stock adjustment, item
//! registration, and operator sessions.
//!
//! Every mutating path runs inside a single transaction with row-level
//! locks on the touched stock rows, and appends its movement rows in the
//! same transaction — a storage failure unwinds the whole batch.

mod error;
mod service;
mod session;

pub use error::{PantryError, ValidationError};
pub use service::{
    AdjustOutcome, AdjustRequest, NewItemSpec, PantryService, ReconcileOutcome,
};
pub use session::{create_user, login, AuthError, Role, Session};
