use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sko_schemas::{InventoryRow, MovementKind, MovementRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool, Row};

pub const ENV_DB_URL: &str = "SKO_DATABASE_URL";

/// Connect to Postgres using SKO_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='movement_log'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_movement_log: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_movement_log: bool,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewCatalogItem {
    pub name: String,
    pub category: String,
    pub unit_label: String,
    pub unit_kind: String, // discrete | continuous (CHECK-enforced)
    pub shelf_life_days: Option<i32>,
    pub vendor: Option<String>,
    pub price_micros: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CatalogRow {
    pub item_id: i64,
    pub name: String,
    pub category: String,
    pub unit_label: String,
    pub unit_kind: String,
    pub shelf_life_days: Option<i32>,
    pub last_vendor: Option<String>,
    pub last_price_micros: Option<i64>,
    pub created_at: DateTime<Utc>,
}

fn catalog_row(row: &sqlx::postgres::PgRow) -> Result<CatalogRow> {
    Ok(CatalogRow {
        item_id: row.try_get("item_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit_label: row.try_get("unit_label")?,
        unit_kind: row.try_get("unit_kind")?,
        shelf_life_days: row.try_get("shelf_life_days")?,
        last_vendor: row.try_get("last_vendor")?,
        last_price_micros: row.try_get("last_price_micros")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Register a new catalog item and return its id. Catalog rows are never
/// hard-deleted (movement_log references them).
pub async fn insert_catalog_item<'e>(
    ex: impl PgExecutor<'e>,
    item: &NewCatalogItem,
) -> Result<i64> {
    let (item_id,): (i64,) = sqlx::query_as(
        r#"
        insert into catalog_items (
          name, category, unit_label, unit_kind, shelf_life_days,
          last_vendor, last_price_micros
        ) values (
          $1, $2, $3, $4, $5, $6, $7
        )
        returning item_id
        "#,
    )
    .bind(&item.name)
    .bind(&item.category)
    .bind(&item.unit_label)
    .bind(&item.unit_kind)
    .bind(item.shelf_life_days)
    .bind(&item.vendor)
    .bind(item.price_micros)
    .fetch_one(ex)
    .await
    .context("insert_catalog_item failed")?;

    Ok(item_id)
}

pub async fn fetch_catalog_item<'e>(
    ex: impl PgExecutor<'e>,
    item_id: i64,
) -> Result<Option<CatalogRow>> {
    let row = sqlx::query(
        r#"
        select
          item_id, name, category, unit_label, unit_kind,
          shelf_life_days, last_vendor, last_price_micros, created_at
        from catalog_items
        where item_id = $1
        "#,
    )
    .bind(item_id)
    .fetch_optional(ex)
    .await
    .context("fetch_catalog_item failed")?;

    row.as_ref().map(catalog_row).transpose()
}

/// Case-insensitive name lookup, used when resolving AI plan lines.
pub async fn fetch_catalog_item_by_name<'e>(
    ex: impl PgExecutor<'e>,
    name: &str,
) -> Result<Option<CatalogRow>> {
    let row = sqlx::query(
        r#"
        select
          item_id, name, category, unit_label, unit_kind,
          shelf_life_days, last_vendor, last_price_micros, created_at
        from catalog_items
        where lower(name) = lower($1)
        "#,
    )
    .bind(name)
    .fetch_optional(ex)
    .await
    .context("fetch_catalog_item_by_name failed")?;

    row.as_ref().map(catalog_row).transpose()
}

pub async fn list_catalog<'e>(ex: impl PgExecutor<'e>) -> Result<Vec<CatalogRow>> {
    let rows = sqlx::query(
        r#"
        select
          item_id, name, category, unit_label, unit_kind,
          shelf_life_days, last_vendor, last_price_micros, created_at
        from catalog_items
        order by name
        "#,
    )
    .fetch_all(ex)
    .await
    .context("list_catalog failed")?;

    rows.iter().map(catalog_row).collect()
}

/// Repeat-purchase refresh: overwrite last vendor/price where supplied,
/// keep the previous value where not.
pub async fn refresh_vendor_price<'e>(
    ex: impl PgExecutor<'e>,
    item_id: i64,
    vendor: Option<&str>,
    price_micros: Option<i64>,
) -> Result<()> {
    sqlx::query(
        r#"
        update catalog_items
        set last_vendor = coalesce($2, last_vendor),
            last_price_micros = coalesce($3, last_price_micros)
        where item_id = $1
        "#,
    )
    .bind(item_id)
    .bind(vendor)
    .bind(price_micros)
    .execute(ex)
    .await
    .context("refresh_vendor_price failed")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// Current quantity for one item, `None` when no row exists (a stock row
/// exists only while quantity is positive).
pub async fn get_stock<'e>(ex: impl PgExecutor<'e>, item_id: i64) -> Result<Option<i64>> {
    let row: Option<(i64,)> =
        sqlx::query_as("select qty_milli from stock_levels where item_id = $1")
            .bind(item_id)
            .fetch_optional(ex)
            .await
            .context("get_stock failed")?;

    Ok(row.map(|(q,)| q))
}

/// Row-lock and read the stock rows for a batch of items inside the
/// caller's transaction. Items without a row are simply absent from the
/// result. Concurrent writers on the same items serialize here.
pub async fn lock_stock<'e>(
    ex: impl PgExecutor<'e>,
    item_ids: &[i64],
) -> Result<Vec<(i64, i64)>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        select item_id, qty_milli
        from stock_levels
        where item_id = any($1)
        for update
        "#,
    )
    .bind(item_ids)
    .fetch_all(ex)
    .await
    .context("lock_stock failed")?;

    Ok(rows)
}

/// Write an absolute quantity with delete-if-zero semantics: a
/// non-positive value removes the row, anything else upserts it.
pub async fn set_stock<'e>(ex: impl PgExecutor<'e>, item_id: i64, qty_milli: i64) -> Result<()> {
    if qty_milli <= 0 {
        sqlx::query("delete from stock_levels where item_id = $1")
            .bind(item_id)
            .execute(ex)
            .await
            .context("set_stock delete failed")?;
        return Ok(());
    }

    sqlx::query(
        r#"
        insert into stock_levels (item_id, qty_milli, updated_at)
        values ($1, $2, now())
        on conflict (item_id) do update
        set qty_milli = excluded.qty_milli,
            updated_at = now()
        "#,
    )
    .bind(item_id)
    .bind(qty_milli)
    .execute(ex)
    .await
    .context("set_stock upsert failed")?;

    Ok(())
}

/// Atomic purchase increment: inserts the row if absent, otherwise adds
/// `delta_milli` in a single statement (no read-then-write window).
pub async fn add_stock<'e>(ex: impl PgExecutor<'e>, item_id: i64, delta_milli: i64) -> Result<i64> {
    if delta_milli <= 0 {
        return Err(anyhow!("add_stock delta must be > 0, got {delta_milli}"));
    }

    let (qty,): (i64,) = sqlx::query_as(
        r#"
        insert into stock_levels (item_id, qty_milli, updated_at)
        values ($1, $2, now())
        on conflict (item_id) do update
        set qty_milli = stock_levels.qty_milli + excluded.qty_milli,
            updated_at = now()
        returning qty_milli
        "#,
    )
    .bind(item_id)
    .bind(delta_milli)
    .fetch_one(ex)
    .await
    .context("add_stock failed")?;

    Ok(qty)
}

/// Live inventory view: stock rows joined with their catalog entries.
pub async fn list_inventory<'e>(ex: impl PgExecutor<'e>) -> Result<Vec<InventoryRow>> {
    let rows = sqlx::query(
        r#"
        select
          s.item_id,
          c.name,
          c.category,
          s.qty_milli,
          c.unit_label,
          c.unit_kind,
          s.updated_at
        from stock_levels s
        join catalog_items c on c.item_id = s.item_id
        order by c.name
        "#,
    )
    .fetch_all(ex)
    .await
    .context("list_inventory failed")?;

    rows.iter()
        .map(|row| {
            Ok(InventoryRow {
                item_id: row.try_get("item_id")?,
                name: row.try_get("name")?,
                category: row.try_get("category")?,
                qty_milli: row.try_get("qty_milli")?,
                unit_label: row.try_get("unit_label")?,
                unit_kind: row.try_get("unit_kind")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Movement log (append-only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub item_id: i64,
    pub kind: MovementKind,
    pub qty_milli: i64,
    pub price_micros: Option<i64>,
    pub actor: String,
    pub vendor: Option<String>,
}

/// Append one movement row. This is the only write path to movement_log;
/// no update or delete exists anywhere in this crate.
pub async fn append_movement<'e>(ex: impl PgExecutor<'e>, mv: &NewMovement) -> Result<i64> {
    let (movement_id,): (i64,) = sqlx::query_as(
        r#"
        insert into movement_log (
          item_id, kind, qty_milli, price_micros, actor, vendor, ts_utc
        ) values (
          $1, $2, $3, $4, $5, $6, now()
        )
        returning movement_id
        "#,
    )
    .bind(mv.item_id)
    .bind(mv.kind.as_str())
    .bind(mv.qty_milli)
    .bind(mv.price_micros)
    .bind(&mv.actor)
    .bind(&mv.vendor)
    .fetch_one(ex)
    .await
    .context("append_movement failed")?;

    Ok(movement_id)
}

pub async fn list_movements<'e>(
    ex: impl PgExecutor<'e>,
    item_id: Option<i64>,
    limit: i64,
) -> Result<Vec<MovementRecord>> {
    let rows = sqlx::query(
        r#"
        select movement_id, item_id, kind, qty_milli, price_micros, actor, vendor, ts_utc
        from movement_log
        where ($1::bigint is null or item_id = $1)
        order by ts_utc desc, movement_id desc
        limit $2
        "#,
    )
    .bind(item_id)
    .bind(limit)
    .fetch_all(ex)
    .await
    .context("list_movements failed")?;

    rows.iter()
        .map(|row| {
            Ok(MovementRecord {
                movement_id: row.try_get("movement_id")?,
                item_id: row.try_get("item_id")?,
                kind: row.try_get("kind")?,
                qty_milli: row.try_get("qty_milli")?,
                price_micros: row.try_get("price_micros")?,
                actor: row.try_get("actor")?,
                vendor: row.try_get("vendor")?,
                ts_utc: row.try_get("ts_utc")?,
            })
        })
        .collect()
}

pub async fn count_movements<'e>(ex: impl PgExecutor<'e>) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from movement_log")
        .fetch_one(ex)
        .await
        .context("count_movements failed")?;

    Ok(n)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UserAuthRow {
    pub user_id: i64,
    pub username: String,
    pub password_sha256: String,
    pub full_name: Option<String>,
    pub role: String,
}

pub async fn fetch_user_auth<'e>(
    ex: impl PgExecutor<'e>,
    username: &str,
) -> Result<Option<UserAuthRow>> {
    let row = sqlx::query(
        r#"
        select user_id, username, password_sha256, full_name, role
        from users
        where username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(ex)
    .await
    .context("fetch_user_auth failed")?;

    row.map(|row| {
        Ok(UserAuthRow {
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            password_sha256: row.try_get("password_sha256")?,
            full_name: row.try_get("full_name")?,
            role: row.try_get("role")?,
        })
    })
    .transpose()
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_sha256: String,
    pub full_name: Option<String>,
    pub role: String, // admin | staff (CHECK-enforced)
}

pub async fn insert_user<'e>(ex: impl PgExecutor<'e>, user: &NewUser) -> Result<i64> {
    let (user_id,): (i64,) = sqlx::query_as(
        r#"
        insert into users (username, password_sha256, full_name, role)
        values ($1, $2, $3, $4)
        returning user_id
        "#,
    )
    .bind(&user.username)
    .bind(&user.password_sha256)
    .bind(&user.full_name)
    .bind(&user.role)
    .fetch_one(ex)
    .await
    .context("insert_user failed")?;

    Ok(user_id)
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Detect a Postgres unique constraint violation by name.
pub fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.constraint() == Some(constraint)
                // Postgres unique_violation is 23505. Not always present, but helps.
                || db_err.code().as_deref() == Some("23505")
                    && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Detect a Postgres CHECK constraint violation (SQLSTATE 23514).
pub fn is_check_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.code().as_deref() == Some("23514")
    } else {
        false
    }
}
