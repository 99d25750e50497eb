//! Command handler modules for sko-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod plan;

use anyhow::{Context, Result};
use sko_pantry::Session;
use sko_schemas::{qty_milli_from_f64, MICROS_SCALE};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve operator credentials from flags or `SKO_USER`/`SKO_PASSWORD`
/// env vars, and log in. Every mutating command goes through this — the
/// session it returns is the only login state that exists.
pub async fn authenticate(
    pool: &PgPool,
    user: Option<String>,
    password: Option<String>,
) -> Result<Session> {
    let user = match user.or_else(|| std::env::var("SKO_USER").ok()) {
        Some(u) => u,
        None => anyhow::bail!("missing operator: pass --user or set SKO_USER"),
    };
    let password = match password.or_else(|| std::env::var("SKO_PASSWORD").ok()) {
        Some(p) => p,
        None => anyhow::bail!("missing password: pass --password or set SKO_PASSWORD"),
    };

    sko_pantry::login(pool, &user, &password)
        .await
        .map_err(|e| anyhow::anyhow!("login failed: {e}"))
}

/// Parse a decimal quantity string (e.g. "3.5") into milli units.
pub fn parse_qty_milli(s: &str) -> Result<i64> {
    let qty: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("invalid quantity '{}'", s))?;
    qty_milli_from_f64(qty)
}

/// Parse a decimal price string (e.g. "55.00") into micros.
pub fn parse_price_micros(s: &str) -> Result<i64> {
    let price: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("invalid price '{}'", s))?;
    if !price.is_finite() || price < 0.0 {
        anyhow::bail!("price must be a non-negative number, got {}", s);
    }
    Ok((price * MICROS_SCALE as f64 + 0.5).floor() as i64)
}

/// Resolve `--item` (catalog name) to its id.
pub async fn resolve_item_id(pool: &PgPool, name: &str) -> Result<i64> {
    let row = sko_db::fetch_catalog_item_by_name(pool, name)
        .await?
        .with_context(|| format!("no catalog item named '{}'", name))?;
    Ok(row.item_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_strings_convert_to_milli() {
        assert_eq!(parse_qty_milli("3.5").unwrap(), 3_500);
        assert_eq!(parse_qty_milli("0.01").unwrap(), 10);
        assert_eq!(parse_qty_milli(" 2 ").unwrap(), 2_000);
        assert!(parse_qty_milli("-1").is_err());
        assert!(parse_qty_milli("abc").is_err());
    }

    #[test]
    fn price_strings_convert_to_micros() {
        assert_eq!(parse_price_micros("55").unwrap(), 55_000_000);
        assert_eq!(parse_price_micros("0.25").unwrap(), 250_000);
        assert!(parse_price_micros("-5").is_err());
    }
}
