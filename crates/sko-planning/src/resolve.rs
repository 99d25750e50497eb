//! Resolution of plan input to validated engine input.
//!
//! Upstream payloads talk about ingredients by free-form name or by raw
//! id with a `-1` sentinel. Both forms are converted to the tagged
//! [`ItemRef`] here, so malformed references are rejected at the boundary
//! and the engine only ever sees validated variants.

use std::collections::HashMap;

use sko_reconcile::{ItemRef, PlannedUse};
use sko_schemas::{qty_milli_from_f64, PlanLine, UNTRACKED_ITEM_ID};

use crate::PlannerError;

/// Case-insensitive name → (item_id, unit_label) lookup built from the
/// catalog once per resolution pass.
#[derive(Debug, Default, Clone)]
pub struct CatalogIndex {
    by_name: HashMap<String, (i64, String)>,
}

impl CatalogIndex {
    pub fn from_entries(entries: impl IntoIterator<Item = (i64, String, String)>) -> Self {
        let by_name = entries
            .into_iter()
            .map(|(id, name, unit)| (name.trim().to_lowercase(), (id, unit)))
            .collect();
        Self { by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<(i64, &str)> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|(id, unit)| (*id, unit.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Convert wire plan lines (explicit ids, `-1` sentinel allowed) into
/// engine input. Rejects ids below the sentinel and invalid quantities.
pub fn decode_plan_lines(lines: &[PlanLine]) -> Result<Vec<PlannedUse>, PlannerError> {
    let mut out = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let item = match line.item_id {
            UNTRACKED_ITEM_ID => ItemRef::Untracked,
            id if id > 0 => ItemRef::Catalog(id),
            other => {
                return Err(PlannerError::Decode(format!(
                    "plan line {i}: item_id {other} is neither a catalog id nor the sentinel"
                )))
            }
        };

        let qty_milli = qty_milli_from_f64(line.quantity)
            .map_err(|e| PlannerError::Decode(format!("plan line {i}: {e}")))?;

        out.push(PlannedUse {
            item,
            display_name: line.display_name.clone(),
            qty_milli,
            unit_label: line.unit.clone(),
        });
    }

    Ok(out)
}

/// Resolve named ingredient lines (e.g. from a menu plan or a scanned
/// bill) against the catalog. Unmatched names become untracked entries;
/// they surface as shortages downstream and never touch the store.
pub fn resolve_named_lines(
    index: &CatalogIndex,
    lines: &[(String, f64, String)],
) -> Result<Vec<PlannedUse>, PlannerError> {
    let mut out = Vec::with_capacity(lines.len());

    for (i, (name, quantity, unit)) in lines.iter().enumerate() {
        let qty_milli = qty_milli_from_f64(*quantity)
            .map_err(|e| PlannerError::Decode(format!("ingredient line {i}: {e}")))?;

        match index.lookup(name) {
            Some((id, unit_label)) => out.push(PlannedUse {
                item: ItemRef::Catalog(id),
                display_name: name.clone(),
                qty_milli,
                unit_label: unit_label.to_string(),
            }),
            None => out.push(PlannedUse {
                item: ItemRef::Untracked,
                display_name: name.clone(),
                qty_milli,
                unit_label: unit.clone(),
            }),
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> CatalogIndex {
        CatalogIndex::from_entries([
            (1, "Rice".to_string(), "kg".to_string()),
            (2, "Milk".to_string(), "L".to_string()),
        ])
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let idx = index();
        assert_eq!(idx.lookup("rice"), Some((1, "kg")));
        assert_eq!(idx.lookup("  MILK "), Some((2, "L")));
        assert_eq!(idx.lookup("Saffron"), None);
    }

    #[test]
    fn plan_lines_map_sentinel_to_untracked() {
        let lines = vec![
            PlanLine {
                item_id: 1,
                display_name: "Rice".to_string(),
                quantity: 2.0,
                unit: "kg".to_string(),
            },
            PlanLine {
                item_id: -1,
                display_name: "Saffron".to_string(),
                quantity: 0.01,
                unit: "kg".to_string(),
            },
        ];
        let uses = decode_plan_lines(&lines).unwrap();
        assert_eq!(uses[0].item, ItemRef::Catalog(1));
        assert_eq!(uses[0].qty_milli, 2_000);
        assert_eq!(uses[1].item, ItemRef::Untracked);
        assert_eq!(uses[1].qty_milli, 10);
    }

    #[test]
    fn plan_lines_reject_invalid_ids() {
        let lines = vec![PlanLine {
            item_id: -7,
            display_name: "Ghost".to_string(),
            quantity: 1.0,
            unit: "kg".to_string(),
        }];
        assert!(matches!(
            decode_plan_lines(&lines),
            Err(PlannerError::Decode(_))
        ));

        // Zero is not a valid bigserial id either.
        let lines = vec![PlanLine {
            item_id: 0,
            display_name: "Ghost".to_string(),
            quantity: 1.0,
            unit: "kg".to_string(),
        }];
        assert!(decode_plan_lines(&lines).is_err());
    }

    #[test]
    fn plan_lines_reject_negative_quantity() {
        let lines = vec![PlanLine {
            item_id: 1,
            display_name: "Rice".to_string(),
            quantity: -2.0,
            unit: "kg".to_string(),
        }];
        assert!(decode_plan_lines(&lines).is_err());
    }

    #[test]
    fn named_lines_resolve_against_catalog() {
        let uses = resolve_named_lines(
            &index(),
            &[
                ("rice".to_string(), 3.5, "kg".to_string()),
                ("Saffron".to_string(), 0.01, "g".to_string()),
            ],
        )
        .unwrap();

        assert_eq!(uses[0].item, ItemRef::Catalog(1));
        // Unit label comes from the catalog for matched items.
        assert_eq!(uses[0].unit_label, "kg");
        assert_eq!(uses[1].item, ItemRef::Untracked);
        // Unmatched items keep the caller-supplied unit.
        assert_eq!(uses[1].unit_label, "g");
    }
}
