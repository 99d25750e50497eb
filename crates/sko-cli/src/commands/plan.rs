//! `sko plan reconcile` — run one reconciliation batch from a plan file.
//!
//! The plan file is a JSON array of lines in the planning-source wire
//! shape: `{"item_id": <id | -1>, "display_name": "...", "quantity":
//! <number>, "unit": "..."}`. Lines with names instead of ids can be
//! resolved with `--by-name`, which matches display names against the
//! catalog case-insensitively and maps misses to the untracked sentinel.

use anyhow::{Context, Result};
use sko_pantry::{PantryService, Session};
use sko_planning::resolve::{decode_plan_lines, resolve_named_lines, CatalogIndex};
use sko_reconcile::PlannedUse;
use sko_schemas::PlanLine;
use std::fs;

/// Load and decode the plan file into validated engine input.
pub async fn load_plan(
    service: &PantryService,
    path: &str,
    by_name: bool,
) -> Result<Vec<PlannedUse>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read plan file: {path}"))?;
    let lines: Vec<PlanLine> =
        serde_json::from_str(raw.trim()).context("plan file must be a JSON array of plan lines")?;

    if by_name {
        let catalog = service.catalog().await?;
        let index = CatalogIndex::from_entries(
            catalog
                .into_iter()
                .map(|c| (c.item_id, c.name, c.unit_label)),
        );
        let named: Vec<(String, f64, String)> = lines
            .into_iter()
            .map(|l| (l.display_name, l.quantity, l.unit))
            .collect();
        Ok(resolve_named_lines(&index, &named)?)
    } else {
        Ok(decode_plan_lines(&lines)?)
    }
}

/// Execute the batch and print the report (human lines or JSON).
pub async fn run_reconcile(
    service: &PantryService,
    session: &Session,
    path: &str,
    by_name: bool,
    json: bool,
) -> Result<()> {
    let planned = load_plan(service, path, by_name).await?;
    let outcome = service.reconcile(session, &planned).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.plan.deductions.is_empty() {
        println!("nothing deducted");
    } else {
        println!("deducted:");
        for line in outcome.plan.consumed_lines() {
            println!("  {line}");
        }
    }

    if !outcome.plan.shortages.is_empty() {
        println!("short:");
        for line in outcome.plan.shortage_lines() {
            println!("  {line}");
        }
    }

    Ok(())
}
