use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sko_schemas::{format_qty, UnitKind};

/// On-hand stock as read inside the caller's transaction:
/// `item_id -> qty_milli`. Items without a row are simply absent.
pub type StockView = BTreeMap<i64, i64>;

/// Reference to the item a plan line talks about.
///
/// Raw sentinel ids (`-1`) from upstream payloads are decoded into
/// `Untracked` at the planning boundary; the engine never sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemRef {
    /// Resolved to an existing catalog item.
    Catalog(i64),
    /// The planning source could not map this ingredient to the catalog.
    Untracked,
}

impl ItemRef {
    pub fn catalog_id(&self) -> Option<i64> {
        match self {
            ItemRef::Catalog(id) => Some(*id),
            ItemRef::Untracked => None,
        }
    }
}

/// One planned ingredient usage, already validated at the boundary:
/// `qty_milli` is never negative by the time it reaches the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedUse {
    pub item: ItemRef,
    pub display_name: String,
    pub qty_milli: i64,
    pub unit_label: String,
}

impl PlannedUse {
    pub fn catalog(id: i64, name: impl Into<String>, qty_milli: i64, unit: impl Into<String>) -> Self {
        Self {
            item: ItemRef::Catalog(id),
            display_name: name.into(),
            qty_milli,
            unit_label: unit.into(),
        }
    }

    pub fn untracked(name: impl Into<String>, qty_milli: i64, unit: impl Into<String>) -> Self {
        Self {
            item: ItemRef::Untracked,
            display_name: name.into(),
            qty_milli,
            unit_label: unit.into(),
        }
    }
}

/// A full deduction the caller must apply: subtract `qty_milli` from the
/// item's stock row; when `exhausted` the row lands on exactly zero and
/// must be deleted rather than kept at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub item_id: i64,
    pub display_name: String,
    pub qty_milli: i64,
    pub unit_label: String,
    pub exhausted: bool,
}

/// Why a planned usage could not be (fully) met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShortageReason {
    /// Not mapped to any catalog item ("not in pantry").
    NotInCatalog,
    /// Catalog item exists but holds no stock row.
    NoStock,
    /// Stock row exists but holds less than required. Nothing is deducted.
    Insufficient,
}

/// One unmet planned usage. `available_milli` is 0 for `NotInCatalog`
/// and `NoStock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub item_id: Option<i64>,
    pub display_name: String,
    pub required_milli: i64,
    pub available_milli: i64,
    pub unit_label: String,
    pub reason: ShortageReason,
}

/// Output of [`plan_deductions`](crate::plan_deductions): what to apply
/// and what to report. Ordering within each list is the insertion order
/// of first encounter in the input batch; no ordering is promised across
/// the two lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionPlan {
    pub deductions: Vec<Deduction>,
    pub shortages: Vec<Shortage>,
}

impl DeductionPlan {
    pub fn empty() -> Self {
        Self {
            deductions: Vec::new(),
            shortages: Vec::new(),
        }
    }

    /// Every aggregated usage was fully met.
    pub fn is_fully_met(&self) -> bool {
        self.shortages.is_empty()
    }

    /// Human-readable "used" lines, e.g. `Rice: 3.5 kg`.
    pub fn consumed_lines(&self) -> Vec<String> {
        self.deductions
            .iter()
            .map(|d| {
                format!(
                    "{}: {} {}",
                    d.display_name,
                    format_qty(d.qty_milli, UnitKind::Continuous),
                    d.unit_label
                )
            })
            .collect()
    }

    /// Human-readable shortage lines, e.g.
    /// `Milk: need 0.5 L, have 0.2 L` or `Saffron: not in pantry`.
    pub fn shortage_lines(&self) -> Vec<String> {
        self.shortages
            .iter()
            .map(|s| match s.reason {
                ShortageReason::NotInCatalog => {
                    format!("{}: not in pantry", s.display_name)
                }
                ShortageReason::NoStock => format!(
                    "{}: need {} {}, have none",
                    s.display_name,
                    format_qty(s.required_milli, UnitKind::Continuous),
                    s.unit_label
                ),
                ShortageReason::Insufficient => format!(
                    "{}: need {} {}, have {} {}",
                    s.display_name,
                    format_qty(s.required_milli, UnitKind::Continuous),
                    s.unit_label,
                    format_qty(s.available_milli, UnitKind::Continuous),
                    s.unit_label
                ),
            })
            .collect()
    }
}
