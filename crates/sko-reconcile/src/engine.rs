use std::collections::HashMap;

use crate::{Deduction, DeductionPlan, ItemRef, PlannedUse, Shortage, ShortageReason, StockView};

/// Per-item requirement accumulated across plan lines, in first-encounter
/// order. Display name and unit label are taken from the first line that
/// mentioned the item.
struct Requirement {
    item_id: i64,
    display_name: String,
    unit_label: String,
    required_milli: i64,
}

/// Turn a batch of planned usages into a deduction plan against the given
/// stock view.
///
/// - Zero-quantity lines are ignored (negative ones never reach the
///   engine; they are dropped here as well so the output stays total).
/// - Lines sharing a catalog id are summed into one requirement before
///   any stock check, so an item requested by two dishes in the same
///   batch is deducted once with the combined quantity.
/// - Untracked lines are classified as shortages immediately and do not
///   participate in aggregation or stock lookups.
/// - `have >= need` deducts the full requirement (`exhausted` when the
///   row lands on zero). `have < need` reports a shortage and deducts
///   nothing — under-stock is a reporting outcome only.
pub fn plan_deductions(stock: &StockView, planned: &[PlannedUse]) -> DeductionPlan {
    let mut requirements: Vec<Requirement> = Vec::new();
    let mut slot_by_id: HashMap<i64, usize> = HashMap::new();
    let mut untracked: Vec<Shortage> = Vec::new();

    for line in planned {
        if line.qty_milli <= 0 {
            continue;
        }

        match line.item {
            ItemRef::Untracked => {
                untracked.push(Shortage {
                    item_id: None,
                    display_name: line.display_name.clone(),
                    required_milli: line.qty_milli,
                    available_milli: 0,
                    unit_label: line.unit_label.clone(),
                    reason: ShortageReason::NotInCatalog,
                });
            }
            ItemRef::Catalog(id) => match slot_by_id.get(&id) {
                Some(&slot) => {
                    requirements[slot].required_milli += line.qty_milli;
                }
                None => {
                    slot_by_id.insert(id, requirements.len());
                    requirements.push(Requirement {
                        item_id: id,
                        display_name: line.display_name.clone(),
                        unit_label: line.unit_label.clone(),
                        required_milli: line.qty_milli,
                    });
                }
            },
        }
    }

    let mut plan = DeductionPlan::empty();
    plan.shortages = untracked;

    for req in requirements {
        match stock.get(&req.item_id).copied() {
            None => plan.shortages.push(Shortage {
                item_id: Some(req.item_id),
                display_name: req.display_name,
                required_milli: req.required_milli,
                available_milli: 0,
                unit_label: req.unit_label,
                reason: ShortageReason::NoStock,
            }),
            Some(have) if have < req.required_milli => plan.shortages.push(Shortage {
                item_id: Some(req.item_id),
                display_name: req.display_name,
                required_milli: req.required_milli,
                available_milli: have,
                unit_label: req.unit_label,
                reason: ShortageReason::Insufficient,
            }),
            Some(have) => plan.deductions.push(Deduction {
                item_id: req.item_id,
                display_name: req.display_name,
                qty_milli: req.required_milli,
                unit_label: req.unit_label,
                exhausted: have == req.required_milli,
            }),
        }
    }

    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(entries: &[(i64, i64)]) -> StockView {
        entries.iter().copied().collect()
    }

    #[test]
    fn empty_batch_produces_empty_plan() {
        let plan = plan_deductions(&stock(&[(1, 500)]), &[]);
        assert_eq!(plan, DeductionPlan::empty());
        assert!(plan.is_fully_met());
    }

    #[test]
    fn zero_quantity_lines_are_ignored() {
        let plan = plan_deductions(
            &stock(&[(1, 500)]),
            &[PlannedUse::catalog(1, "Rice", 0, "kg")],
        );
        assert!(plan.deductions.is_empty());
        assert!(plan.shortages.is_empty());
    }

    #[test]
    fn split_lines_deduct_the_same_as_one_summed_line() {
        let view = stock(&[(1, 5_000)]);
        let split = plan_deductions(
            &view,
            &[
                PlannedUse::catalog(1, "Rice", 2_000, "kg"),
                PlannedUse::catalog(1, "Rice", 1_500, "kg"),
            ],
        );
        let summed = plan_deductions(&view, &[PlannedUse::catalog(1, "Rice", 3_500, "kg")]);
        assert_eq!(split, summed);
        assert_eq!(split.deductions.len(), 1);
        assert_eq!(split.deductions[0].qty_milli, 3_500);
    }

    #[test]
    fn full_deduction_reports_exhaustion_at_exact_zero() {
        let plan = plan_deductions(
            &stock(&[(7, 2_000)]),
            &[PlannedUse::catalog(7, "Butter", 2_000, "kg")],
        );
        assert_eq!(plan.deductions.len(), 1);
        assert!(plan.deductions[0].exhausted);
    }

    #[test]
    fn partial_stock_is_reported_not_deducted() {
        let plan = plan_deductions(
            &stock(&[(3, 200)]),
            &[PlannedUse::catalog(3, "Milk", 500, "L")],
        );
        assert!(plan.deductions.is_empty());
        assert_eq!(plan.shortages.len(), 1);
        let s = &plan.shortages[0];
        assert_eq!(s.reason, ShortageReason::Insufficient);
        assert_eq!(s.required_milli, 500);
        assert_eq!(s.available_milli, 200);
    }

    #[test]
    fn missing_stock_row_is_a_full_shortage() {
        let plan = plan_deductions(
            &stock(&[]),
            &[PlannedUse::catalog(9, "Cumin", 50, "kg")],
        );
        assert_eq!(plan.shortages.len(), 1);
        assert_eq!(plan.shortages[0].reason, ShortageReason::NoStock);
        assert_eq!(plan.shortages[0].available_milli, 0);
    }

    #[test]
    fn untracked_lines_never_consult_stock() {
        // Stock view deliberately empty: an untracked line must classify
        // without any lookup and carry no item id.
        let plan = plan_deductions(
            &stock(&[]),
            &[PlannedUse::untracked("Saffron", 10, "kg")],
        );
        assert!(plan.deductions.is_empty());
        assert_eq!(plan.shortages.len(), 1);
        assert_eq!(plan.shortages[0].item_id, None);
        assert_eq!(plan.shortages[0].reason, ShortageReason::NotInCatalog);
    }

    #[test]
    fn mixed_batch_keeps_first_encounter_order() {
        let view = stock(&[(1, 5_000), (2, 1_000), (4, 300)]);
        let plan = plan_deductions(
            &view,
            &[
                PlannedUse::catalog(2, "Oil", 400, "L"),
                PlannedUse::catalog(1, "Rice", 2_000, "kg"),
                PlannedUse::catalog(4, "Milk", 500, "L"),
                PlannedUse::catalog(1, "Rice", 1_500, "kg"),
            ],
        );
        let deducted: Vec<i64> = plan.deductions.iter().map(|d| d.item_id).collect();
        assert_eq!(deducted, vec![2, 1]);
        assert_eq!(plan.shortages.len(), 1);
        assert_eq!(plan.shortages[0].item_id, Some(4));
    }

    #[test]
    fn aggregated_requirement_can_tip_into_shortage() {
        // Each line alone fits, together they exceed stock: the aggregate
        // must classify as one Insufficient shortage with nothing drawn.
        let plan = plan_deductions(
            &stock(&[(1, 3_000)]),
            &[
                PlannedUse::catalog(1, "Rice", 2_000, "kg"),
                PlannedUse::catalog(1, "Rice", 1_500, "kg"),
            ],
        );
        assert!(plan.deductions.is_empty());
        assert_eq!(plan.shortages.len(), 1);
        assert_eq!(plan.shortages[0].required_milli, 3_500);
        assert_eq!(plan.shortages[0].available_milli, 3_000);
    }

    #[test]
    fn report_lines_render_quantities() {
        let plan = plan_deductions(
            &stock(&[(1, 5_000), (3, 200)]),
            &[
                PlannedUse::catalog(1, "Rice", 3_500, "kg"),
                PlannedUse::catalog(3, "Milk", 500, "L"),
                PlannedUse::untracked("Saffron", 10, "kg"),
            ],
        );
        assert_eq!(plan.consumed_lines(), vec!["Rice: 3.5 kg"]);
        assert_eq!(
            plan.shortage_lines(),
            vec!["Saffron: not in pantry", "Milk: need 0.5 L, have 0.2 L"]
        );
    }
}
