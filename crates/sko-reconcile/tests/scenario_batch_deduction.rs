use std::collections::BTreeMap;

use sko_reconcile::*;

fn stock(entries: &[(i64, i64)]) -> StockView {
    entries.iter().copied().collect::<BTreeMap<_, _>>()
}

#[test]
fn scenario_two_meals_share_rice_and_saffron_is_unknown() {
    // Pantry: Rice = 5 kg. Plan: meal A wants 2 kg rice, meal B wants
    // 1.5 kg rice, plus 0.01 kg of an ingredient the catalog never heard
    // of. Expected: one combined 3.5 kg deduction, one shortage line.
    let view = stock(&[(1, 5_000)]);
    let plan = plan_deductions(
        &view,
        &[
            PlannedUse::catalog(1, "Rice", 2_000, "kg"),
            PlannedUse::catalog(1, "Rice", 1_500, "kg"),
            PlannedUse::untracked("Saffron", 10, "kg"),
        ],
    );

    assert_eq!(plan.deductions.len(), 1);
    let d = &plan.deductions[0];
    assert_eq!(d.item_id, 1);
    assert_eq!(d.qty_milli, 3_500);
    assert!(!d.exhausted); // 1.5 kg remains

    assert_eq!(plan.shortages.len(), 1);
    assert_eq!(plan.shortages[0].display_name, "Saffron");
    assert_eq!(plan.shortages[0].reason, ShortageReason::NotInCatalog);

    assert_eq!(plan.consumed_lines(), vec!["Rice: 3.5 kg"]);
}

#[test]
fn scenario_under_stocked_milk_is_left_untouched() {
    // Pantry: Milk = 0.2 L, plan needs 0.5 L. The plan must contain no
    // deduction for milk at all — the available 0.2 L is not drawn.
    let view = stock(&[(3, 200)]);
    let plan = plan_deductions(&view, &[PlannedUse::catalog(3, "Milk", 500, "L")]);

    assert!(plan.deductions.is_empty());
    assert_eq!(plan.shortages.len(), 1);
    assert_eq!(plan.shortages[0].required_milli, 500);
    assert_eq!(plan.shortages[0].available_milli, 200);
    assert_eq!(
        plan.shortage_lines(),
        vec!["Milk: need 0.5 L, have 0.2 L"]
    );
}

#[test]
fn scenario_exact_fit_marks_row_for_removal() {
    let view = stock(&[(5, 750)]);
    let plan = plan_deductions(&view, &[PlannedUse::catalog(5, "Yeast", 750, "g")]);

    assert_eq!(plan.deductions.len(), 1);
    assert!(plan.deductions[0].exhausted);
    assert!(plan.is_fully_met());
}

#[test]
fn scenario_untracked_batch_touches_nothing() {
    // A plan made purely of unknown ingredients yields shortages only,
    // in encounter order, with no deduction against any stock row.
    let view = stock(&[(1, 5_000)]);
    let plan = plan_deductions(
        &view,
        &[
            PlannedUse::untracked("Saffron", 10, "kg"),
            PlannedUse::untracked("Truffle", 5, "g"),
        ],
    );

    assert!(plan.deductions.is_empty());
    let names: Vec<&str> = plan
        .shortages
        .iter()
        .map(|s| s.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Saffron", "Truffle"]);
    assert!(plan.shortages.iter().all(|s| s.item_id.is_none()));
}
