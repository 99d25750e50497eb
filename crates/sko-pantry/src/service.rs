//! The pantry service: reconcile, adjust, registration, and read views.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use sko_audit::JournalWriter;
use sko_db::{NewCatalogItem, NewMovement};
use sko_reconcile::{plan_deductions, DeductionPlan, PlannedUse, StockView};
use sko_schemas::{InventoryRow, MovementKind, MovementRecord, PLANNER_ACTOR};

use crate::error::{PantryError, ValidationError};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Requests / outcomes
// ---------------------------------------------------------------------------

/// One manual stock movement triggered by direct operator input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustRequest {
    pub item_id: i64,
    pub kind: MovementKind,
    pub qty_milli: i64,
    pub price_micros: Option<i64>,
    pub vendor: Option<String>,
}

/// Result of a manual adjustment. `new_qty_milli` is `None` when the
/// stock row was removed (subtraction clamped at removal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustOutcome {
    pub movement_id: i64,
    pub new_qty_milli: Option<i64>,
}

/// Result of one reconciliation batch: the applied plan plus the ids of
/// the movement rows it appended. NOT idempotent — running the same
/// batch twice deducts twice; at-most-once invocation is the caller's
/// responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub plan: DeductionPlan,
    pub movement_ids: Vec<i64>,
}

/// Registration spec for a new catalog item, with optional opening stock.
#[derive(Debug, Clone)]
pub struct NewItemSpec {
    pub name: String,
    pub category: String,
    pub unit_label: String,
    pub unit_kind: String,
    pub shelf_life_days: Option<i32>,
    pub initial_qty_milli: i64,
    pub vendor: Option<String>,
    pub price_micros: Option<i64>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Service handle shared across callers (CLI invocation or daemon state).
#[derive(Clone)]
pub struct PantryService {
    pool: PgPool,
    journal: Option<Arc<Mutex<JournalWriter>>>,
}

impl PantryService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            journal: None,
        }
    }

    pub fn with_journal(pool: PgPool, journal: JournalWriter) -> Self {
        Self {
            pool,
            journal: Some(Arc::new(Mutex::new(journal))),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Reconcile
    // -----------------------------------------------------------------------

    /// Apply a batch of planned ingredient usages against current stock.
    ///
    /// Behavior per aggregated item:
    /// - enough stock: the full requirement is deducted, the row is
    ///   deleted when it lands on exactly zero, and one CONSUME movement
    ///   is appended with the fixed planner attribution;
    /// - not enough stock: reported as a shortage, nothing deducted;
    /// - untracked: reported as a shortage without any store access.
    ///
    /// The whole batch runs in one transaction over row-locked stock
    /// rows; any storage error rolls everything back and surfaces as
    /// [`PantryError::Storage`]. Shortages are a normal outcome, carried
    /// in the returned plan.
    pub async fn reconcile(
        &self,
        session: &Session,
        planned: &[PlannedUse],
    ) -> Result<ReconcileOutcome, PantryError> {
        // Fail fast before touching the store.
        for line in planned {
            if line.qty_milli < 0 {
                return Err(ValidationError::NegativePlannedQuantity {
                    display_name: line.display_name.clone(),
                    qty_milli: line.qty_milli,
                }
                .into());
            }
        }

        let mut item_ids: Vec<i64> = planned
            .iter()
            .filter_map(|p| p.item.catalog_id())
            .collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin reconcile transaction")
            .map_err(PantryError::Storage)?;

        let locked = sko_db::lock_stock(&mut *tx, &item_ids)
            .await
            .map_err(PantryError::Storage)?;
        let stock: StockView = locked.into_iter().collect();

        let plan = plan_deductions(&stock, planned);

        let mut movement_ids = Vec::with_capacity(plan.deductions.len());
        for d in &plan.deductions {
            // The engine only emits deductions for rows present in the
            // locked view, so the lookup cannot miss.
            let have = stock.get(&d.item_id).copied().unwrap_or(0);
            let remaining = have - d.qty_milli;

            sko_db::set_stock(&mut *tx, d.item_id, remaining)
                .await
                .map_err(PantryError::Storage)?;

            let movement_id = sko_db::append_movement(
                &mut *tx,
                &NewMovement {
                    item_id: d.item_id,
                    kind: MovementKind::Consume,
                    qty_milli: d.qty_milli,
                    price_micros: None,
                    actor: PLANNER_ACTOR.to_string(),
                    vendor: None,
                },
            )
            .await
            .map_err(PantryError::Storage)?;
            movement_ids.push(movement_id);
        }

        tx.commit()
            .await
            .context("commit reconcile transaction")
            .map_err(PantryError::Storage)?;

        info!(
            deductions = plan.deductions.len(),
            shortages = plan.shortages.len(),
            actor = %session.username,
            "reconcile batch applied"
        );

        self.journal_event(
            &session.username,
            "reconcile_batch",
            json!({
                "consumed": plan.consumed_lines(),
                "shortages": plan.shortage_lines(),
                "movement_ids": movement_ids,
            }),
        )
        .await;

        Ok(ReconcileOutcome { plan, movement_ids })
    }

    // -----------------------------------------------------------------------
    // Adjust
    // -----------------------------------------------------------------------

    /// Apply a single signed stock movement.
    ///
    /// PURCHASE adds (atomic increment, row created if absent) and
    /// refreshes the catalog's last vendor/price. CONSUME/WASTE subtract
    /// under a row lock; a result at or below zero removes the row —
    /// stock is clamped at removal, never negative. Exactly one movement
    /// row is appended per successful call.
    pub async fn adjust(
        &self,
        session: &Session,
        req: &AdjustRequest,
    ) -> Result<AdjustOutcome, PantryError> {
        if req.qty_milli <= 0 {
            return Err(ValidationError::NonPositiveQuantity {
                qty_milli: req.qty_milli,
            }
            .into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin adjust transaction")
            .map_err(PantryError::Storage)?;

        let item = sko_db::fetch_catalog_item(&mut *tx, req.item_id)
            .await
            .map_err(PantryError::Storage)?;
        if item.is_none() {
            return Err(ValidationError::UnknownItem {
                item_id: req.item_id,
            }
            .into());
        }

        let new_qty_milli = if req.kind.is_additive() {
            let qty = sko_db::add_stock(&mut *tx, req.item_id, req.qty_milli)
                .await
                .map_err(PantryError::Storage)?;
            sko_db::refresh_vendor_price(
                &mut *tx,
                req.item_id,
                req.vendor.as_deref(),
                req.price_micros,
            )
            .await
            .map_err(PantryError::Storage)?;
            Some(qty)
        } else {
            let locked = sko_db::lock_stock(&mut *tx, &[req.item_id])
                .await
                .map_err(PantryError::Storage)?;
            let have = locked.first().map(|(_, q)| *q).unwrap_or(0);
            let remaining = have - req.qty_milli;

            sko_db::set_stock(&mut *tx, req.item_id, remaining)
                .await
                .map_err(PantryError::Storage)?;

            if remaining > 0 {
                Some(remaining)
            } else {
                None
            }
        };

        let movement_id = sko_db::append_movement(
            &mut *tx,
            &NewMovement {
                item_id: req.item_id,
                kind: req.kind,
                qty_milli: req.qty_milli,
                price_micros: req.price_micros,
                actor: session.username.clone(),
                vendor: req.vendor.clone(),
            },
        )
        .await
        .map_err(PantryError::Storage)?;

        tx.commit()
            .await
            .context("commit adjust transaction")
            .map_err(PantryError::Storage)?;

        self.journal_event(
            &session.username,
            "manual_adjust",
            json!({
                "item_id": req.item_id,
                "kind": req.kind.as_str(),
                "qty_milli": req.qty_milli,
                "new_qty_milli": new_qty_milli,
                "movement_id": movement_id,
            }),
        )
        .await;

        Ok(AdjustOutcome {
            movement_id,
            new_qty_milli,
        })
    }

    // -----------------------------------------------------------------------
    // Catalog / stock management
    // -----------------------------------------------------------------------

    /// Register a new catalog item; opening stock (if any) is applied as
    /// a PURCHASE in the same transaction.
    pub async fn register_item(
        &self,
        session: &Session,
        spec: &NewItemSpec,
    ) -> Result<i64, PantryError> {
        if spec.name.trim().is_empty() {
            return Err(ValidationError::EmptyItemName.into());
        }
        if spec.initial_qty_milli < 0 {
            return Err(ValidationError::NonPositiveQuantity {
                qty_milli: spec.initial_qty_milli,
            }
            .into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin register transaction")
            .map_err(PantryError::Storage)?;

        let item_id = sko_db::insert_catalog_item(
            &mut *tx,
            &NewCatalogItem {
                name: spec.name.trim().to_string(),
                category: spec.category.clone(),
                unit_label: spec.unit_label.clone(),
                unit_kind: spec.unit_kind.clone(),
                shelf_life_days: spec.shelf_life_days,
                vendor: spec.vendor.clone(),
                price_micros: spec.price_micros,
            },
        )
        .await
        .map_err(PantryError::Storage)?;

        if spec.initial_qty_milli > 0 {
            sko_db::add_stock(&mut *tx, item_id, spec.initial_qty_milli)
                .await
                .map_err(PantryError::Storage)?;
            sko_db::append_movement(
                &mut *tx,
                &NewMovement {
                    item_id,
                    kind: MovementKind::Purchase,
                    qty_milli: spec.initial_qty_milli,
                    price_micros: spec.price_micros,
                    actor: session.username.clone(),
                    vendor: spec.vendor.clone(),
                },
            )
            .await
            .map_err(PantryError::Storage)?;
        }

        tx.commit()
            .await
            .context("commit register transaction")
            .map_err(PantryError::Storage)?;

        Ok(item_id)
    }

    /// Operator "remove from pantry": deletes the stock row only. The
    /// catalog row stays (movement history references it).
    pub async fn remove_stock_entry(&self, item_id: i64) -> Result<(), PantryError> {
        sko_db::set_stock(&self.pool, item_id, 0)
            .await
            .map_err(PantryError::Storage)
    }

    // -----------------------------------------------------------------------
    // Read views
    // -----------------------------------------------------------------------

    pub async fn inventory(&self) -> Result<Vec<InventoryRow>, PantryError> {
        sko_db::list_inventory(&self.pool)
            .await
            .map_err(PantryError::Storage)
    }

    pub async fn movements(
        &self,
        item_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<MovementRecord>, PantryError> {
        sko_db::list_movements(&self.pool, item_id, limit)
            .await
            .map_err(PantryError::Storage)
    }

    pub async fn catalog(&self) -> Result<Vec<sko_db::CatalogRow>, PantryError> {
        sko_db::list_catalog(&self.pool)
            .await
            .map_err(PantryError::Storage)
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Journal an event after the transaction committed. A journal write
    /// failure must not fail the committed operation; it is logged and
    /// the call proceeds.
    async fn journal_event(&self, actor: &str, event_type: &str, payload: serde_json::Value) {
        if let Some(journal) = &self.journal {
            let mut writer = journal.lock().await;
            if let Err(e) = writer.append(actor, "stock", event_type, payload) {
                warn!(error = %e, event_type, "journal append failed");
            }
        }
    }
}
