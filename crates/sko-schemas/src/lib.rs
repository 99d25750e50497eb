//! Shared wire types and fixed-point scales for the Smart Kitchen OS
//! workspace.
//!
//! Quantities and money never use floats past the decode boundary:
//! - stock quantities are `i64` at 1e-3 scale (`qty_milli`), and
//! - prices are `i64` at 1e-6 scale (`price_micros`).
//!
//! Floats appear only in upstream JSON payloads (AI responses, plan files)
//! and are converted to milli units immediately on decode.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milli scale (1e-3) used for stock quantities. 1.000 unit == 1_000.
pub const MILLI_SCALE: i64 = 1_000;

/// Micros scale (1e-6) used for prices.
pub const MICROS_SCALE: i64 = 1_000_000;

/// Fixed actor tag recorded on CONSUME movements written by the automated
/// reconciliation path (as opposed to an operator's username).
pub const PLANNER_ACTOR: &str = "menu-planner";

/// Sentinel `item_id` used on the wire for "item not tracked in catalog".
/// Decoded into a tagged variant at the boundary; never stored.
pub const UNTRACKED_ITEM_ID: i64 = -1;

// ---------------------------------------------------------------------------
// MovementKind
// ---------------------------------------------------------------------------

/// Closed set of stock movement kinds. The DB column carries the same
/// values under a CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    Purchase,
    Consume,
    Waste,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Purchase => "PURCHASE",
            MovementKind::Consume => "CONSUME",
            MovementKind::Waste => "WASTE",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PURCHASE" => Ok(MovementKind::Purchase),
            "CONSUME" => Ok(MovementKind::Consume),
            "WASTE" => Ok(MovementKind::Waste),
            other => Err(anyhow!(
                "invalid movement kind '{}'. expected one of: PURCHASE | CONSUME | WASTE",
                other
            )),
        }
    }

    /// PURCHASE adds stock; CONSUME and WASTE subtract.
    pub fn is_additive(&self) -> bool {
        matches!(self, MovementKind::Purchase)
    }
}

// ---------------------------------------------------------------------------
// UnitKind
// ---------------------------------------------------------------------------

/// How a catalog item's quantity is displayed: discrete items round to
/// whole units, continuous items keep fractional precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Discrete,
    Continuous,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Discrete => "discrete",
            UnitKind::Continuous => "continuous",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" => Ok(UnitKind::Discrete),
            "continuous" => Ok(UnitKind::Continuous),
            other => Err(anyhow!(
                "invalid unit kind '{}'. expected: discrete | continuous",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed-point conversion
// ---------------------------------------------------------------------------

/// Convert an upstream JSON number into milli units, rounding half-up at
/// the third decimal. Rejects negatives, NaN/inf, and magnitudes that
/// would overflow the milli representation.
pub fn qty_milli_from_f64(qty: f64) -> Result<i64> {
    if !qty.is_finite() {
        return Err(anyhow!("quantity must be a finite number, got {qty}"));
    }
    if qty < 0.0 {
        return Err(anyhow!("quantity must be non-negative, got {qty}"));
    }
    let scaled = qty * MILLI_SCALE as f64;
    if scaled > i64::MAX as f64 / 2.0 {
        return Err(anyhow!("quantity {qty} out of range"));
    }
    Ok((scaled + 0.5).floor() as i64)
}

/// Render a milli quantity for reports. Discrete units round to whole
/// numbers; continuous units keep up to two decimals, trimming trailing
/// zeros (`3.50` -> `3.5`, `2.00` -> `2`).
pub fn format_qty(qty_milli: i64, kind: UnitKind) -> String {
    match kind {
        UnitKind::Discrete => {
            let rounded = (qty_milli + MILLI_SCALE / 2).div_euclid(MILLI_SCALE);
            rounded.to_string()
        }
        UnitKind::Continuous => {
            let centi = if qty_milli >= 0 {
                (qty_milli + 5) / 10
            } else {
                (qty_milli - 5) / 10
            };
            let whole = centi / 100;
            let frac = (centi % 100).abs();
            if frac == 0 {
                whole.to_string()
            } else if frac % 10 == 0 {
                format!("{}.{}", whole, frac / 10)
            } else {
                format!("{}.{:02}", whole, frac)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

/// One planned ingredient usage as supplied by the planning source
/// (AI-resolved or a manual plan file). `item_id == -1` is the untracked
/// sentinel. Quantities are raw JSON numbers here; callers convert to
/// milli units at the decode boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLine {
    pub item_id: i64,
    pub display_name: String,
    pub quantity: f64,
    pub unit: String,
}

/// One line extracted from a scanned bill by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLine {
    pub item_name: String,
    pub quantity: f64,
    pub unit: String,
}

/// A single dish suggestion from the menu planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRecommendation {
    pub dish_name: String,
    pub assigned_chef: String,
    pub estimated_time: String,
    pub ingredients_used: Vec<String>,
}

/// Full menu-planner response after strict decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuPlan {
    pub recommendations: Vec<MenuRecommendation>,
}

/// One row of the live inventory view (stock joined with catalog).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRow {
    pub item_id: i64,
    pub name: String,
    pub category: String,
    pub qty_milli: i64,
    pub unit_label: String,
    pub unit_kind: String,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRow {
    /// Human-readable quantity using the item's unit kind; falls back to
    /// continuous formatting when the stored kind string is unknown.
    pub fn display_qty(&self) -> String {
        let kind = UnitKind::parse(&self.unit_kind).unwrap_or(UnitKind::Continuous);
        format_qty(self.qty_milli, kind)
    }
}

/// One movement-log row as surfaced to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRecord {
    pub movement_id: i64,
    pub item_id: i64,
    pub kind: String,
    pub qty_milli: i64,
    pub price_micros: Option<i64>,
    pub actor: String,
    pub vendor: Option<String>,
    pub ts_utc: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_kind_round_trips() {
        for kind in [
            MovementKind::Purchase,
            MovementKind::Consume,
            MovementKind::Waste,
        ] {
            assert_eq!(MovementKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn movement_kind_parse_is_case_insensitive() {
        assert_eq!(
            MovementKind::parse("waste").unwrap(),
            MovementKind::Waste
        );
        assert_eq!(
            MovementKind::parse(" purchase ").unwrap(),
            MovementKind::Purchase
        );
    }

    #[test]
    fn movement_kind_rejects_unknown() {
        assert!(MovementKind::parse("TRANSFER").is_err());
    }

    #[test]
    fn only_purchase_is_additive() {
        assert!(MovementKind::Purchase.is_additive());
        assert!(!MovementKind::Consume.is_additive());
        assert!(!MovementKind::Waste.is_additive());
    }

    #[test]
    fn qty_conversion_rounds_half_up_at_third_decimal() {
        assert_eq!(qty_milli_from_f64(2.0).unwrap(), 2_000);
        assert_eq!(qty_milli_from_f64(0.01).unwrap(), 10);
        assert_eq!(qty_milli_from_f64(1.2345).unwrap(), 1_235);
        assert_eq!(qty_milli_from_f64(0.0).unwrap(), 0);
    }

    #[test]
    fn qty_conversion_rejects_negative_and_nonfinite() {
        assert!(qty_milli_from_f64(-0.5).is_err());
        assert!(qty_milli_from_f64(f64::NAN).is_err());
        assert!(qty_milli_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn discrete_format_rounds_to_whole_units() {
        assert_eq!(format_qty(2_000, UnitKind::Discrete), "2");
        assert_eq!(format_qty(2_499, UnitKind::Discrete), "2");
        assert_eq!(format_qty(2_500, UnitKind::Discrete), "3");
    }

    #[test]
    fn continuous_format_trims_trailing_zeros() {
        assert_eq!(format_qty(3_500, UnitKind::Continuous), "3.5");
        assert_eq!(format_qty(2_000, UnitKind::Continuous), "2");
        assert_eq!(format_qty(1_234, UnitKind::Continuous), "1.23");
        assert_eq!(format_qty(200, UnitKind::Continuous), "0.2");
        assert_eq!(format_qty(10, UnitKind::Continuous), "0.01");
    }

    #[test]
    fn plan_line_deserializes_sentinel() {
        let line: PlanLine = serde_json::from_str(
            r#"{"item_id": -1, "display_name": "Saffron", "quantity": 0.01, "unit": "kg"}"#,
        )
        .unwrap();
        assert_eq!(line.item_id, UNTRACKED_ITEM_ID);
        assert_eq!(line.display_name, "Saffron");
    }
}
