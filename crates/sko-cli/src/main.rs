use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sko_pantry::{AdjustRequest, NewItemSpec, PantryService, Role};
use sko_planning::forecast::{FootfallSource, NaiveFootfallSource, StaticHolidayCalendar};
use sko_schemas::{format_qty, MovementKind, UnitKind};
use std::fs;

mod commands;

use commands::{authenticate, parse_price_micros, parse_qty_milli, resolve_item_id};

#[derive(Parser)]
#[command(name = "sko")]
#[command(about = "Smart Kitchen OS CLI", long_about = None)]
struct Cli {
    /// Operator username (or SKO_USER env var)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Operator password (or SKO_PASSWORD env var)
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Catalog item commands
    Item {
        #[command(subcommand)]
        cmd: ItemCmd,
    },

    /// Stock commands
    Stock {
        #[command(subcommand)]
        cmd: StockCmd,
    },

    /// Plan reconciliation commands
    Plan {
        #[command(subcommand)]
        cmd: PlanCmd,
    },

    /// Kitchen journal utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Predict footfall for a date
    Forecast {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Optional sales history file: JSON array of {"date": "YYYY-MM-DD", "customers": N}
        #[arg(long)]
        history: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses when the movement log is non-empty unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB that already holds movement history.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Create the initial admin user (bootstrap; no session required)
    SeedAdmin {
        #[arg(long)]
        username: String,

        #[arg(long = "admin-password")]
        admin_password: String,

        #[arg(long)]
        full_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ItemCmd {
    /// Register a catalog item, optionally with opening stock
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        category: String,

        /// Unit label (e.g. kg, L, pack)
        #[arg(long)]
        unit: String,

        /// discrete | continuous
        #[arg(long, default_value = "continuous")]
        unit_kind: String,

        #[arg(long)]
        shelf_life_days: Option<i32>,

        /// Opening stock quantity (decimal, in units)
        #[arg(long, default_value = "0")]
        qty: String,

        /// Purchase price per unit (decimal)
        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        vendor: Option<String>,
    },

    /// List catalog items
    List,
}

#[derive(Subcommand)]
enum StockCmd {
    /// Apply a manual stock movement (PURCHASE | CONSUME | WASTE)
    Adjust {
        /// Catalog item name
        #[arg(long)]
        item: String,

        /// PURCHASE | CONSUME | WASTE
        #[arg(long)]
        kind: String,

        /// Quantity (decimal, in units)
        #[arg(long)]
        qty: String,

        /// Unit price (decimal; PURCHASE refreshes the catalog price)
        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        vendor: Option<String>,
    },

    /// Remove an item's stock row (catalog entry is kept)
    Remove {
        /// Catalog item name
        #[arg(long)]
        item: String,
    },

    /// Show the live inventory
    List,
}

#[derive(Subcommand)]
enum PlanCmd {
    /// Reconcile a plan file against current stock
    Reconcile {
        /// Plan file: JSON array of plan lines
        #[arg(long)]
        file: String,

        /// Resolve lines by display name against the catalog instead of by id
        #[arg(long, default_value_t = false)]
        by_name: bool,

        /// Print the full outcome as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a journal file
    Verify {
        /// Journal path (JSONL)
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience).
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = sko_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = sko_db::status(&pool).await?;
                    println!("db_ok={} has_movement_log={}", s.ok, s.has_movement_log);
                }
                DbCmd::Migrate { yes } => {
                    // Guardrail: a non-empty movement log means this DB is in
                    // real use; require an explicit acknowledgement.
                    let st = sko_db::status(&pool).await?;
                    if st.has_movement_log {
                        let n = sko_db::count_movements(&pool).await?;
                        if n > 0 && !yes {
                            anyhow::bail!(
                                "REFUSING MIGRATE: movement log holds {} row(s). Re-run with: `sko db migrate --yes`",
                                n
                            );
                        }
                    }
                    sko_db::migrate(&pool).await?;
                    println!("migrations applied");
                }
                DbCmd::SeedAdmin {
                    username,
                    admin_password,
                    full_name,
                } => {
                    let user_id = sko_pantry::create_user(
                        &pool,
                        &username,
                        &admin_password,
                        full_name.as_deref(),
                        Role::Admin,
                    )
                    .await?;
                    println!("created admin user_id={user_id} username={username}");
                }
            }
        }

        Commands::Item { cmd } => {
            let pool = sko_db::connect_from_env().await?;
            match cmd {
                ItemCmd::Add {
                    name,
                    category,
                    unit,
                    unit_kind,
                    shelf_life_days,
                    qty,
                    price,
                    vendor,
                } => {
                    let service = build_service(pool.clone())?;
                    let session = authenticate(&pool, cli.user, cli.password).await?;

                    let spec = NewItemSpec {
                        name,
                        category,
                        unit_label: unit,
                        unit_kind,
                        shelf_life_days,
                        initial_qty_milli: parse_qty_milli(&qty)?,
                        vendor,
                        price_micros: price.as_deref().map(parse_price_micros).transpose()?,
                    };
                    let item_id = service.register_item(&session, &spec).await?;
                    println!("registered item_id={item_id}");
                }
                ItemCmd::List => {
                    for row in sko_db::list_catalog(&pool).await? {
                        println!(
                            "{:>5}  {:<24} {:<12} unit={} vendor={} price_micros={}",
                            row.item_id,
                            row.name,
                            row.category,
                            row.unit_label,
                            row.last_vendor.as_deref().unwrap_or("-"),
                            row.last_price_micros
                                .map(|p| p.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        );
                    }
                }
            }
        }

        Commands::Stock { cmd } => {
            let pool = sko_db::connect_from_env().await?;
            match cmd {
                StockCmd::Adjust {
                    item,
                    kind,
                    qty,
                    price,
                    vendor,
                } => {
                    let service = build_service(pool.clone())?;
                    let session = authenticate(&pool, cli.user, cli.password).await?;
                    let item_id = resolve_item_id(&pool, &item).await?;

                    let req = AdjustRequest {
                        item_id,
                        kind: MovementKind::parse(&kind)?,
                        qty_milli: parse_qty_milli(&qty)?,
                        price_micros: price.as_deref().map(parse_price_micros).transpose()?,
                        vendor,
                    };
                    let outcome = service.adjust(&session, &req).await?;
                    match outcome.new_qty_milli {
                        Some(q) => println!(
                            "adjusted: movement_id={} new_qty={}",
                            outcome.movement_id,
                            format_qty(q, UnitKind::Continuous)
                        ),
                        None => println!(
                            "adjusted: movement_id={} stock row removed",
                            outcome.movement_id
                        ),
                    }
                }
                StockCmd::Remove { item } => {
                    let service = build_service(pool.clone())?;
                    let _session = authenticate(&pool, cli.user, cli.password).await?;
                    let item_id = resolve_item_id(&pool, &item).await?;
                    service.remove_stock_entry(item_id).await?;
                    println!("stock row removed for '{item}'");
                }
                StockCmd::List => {
                    for row in sko_db::list_inventory(&pool).await? {
                        println!(
                            "{:>5}  {:<24} {:<12} {} {}",
                            row.item_id,
                            row.name,
                            row.category,
                            row.display_qty(),
                            row.unit_label,
                        );
                    }
                }
            }
        }

        Commands::Plan { cmd } => {
            let pool = sko_db::connect_from_env().await?;
            match cmd {
                PlanCmd::Reconcile {
                    file,
                    by_name,
                    json,
                } => {
                    let service = build_service(pool.clone())?;
                    let session = authenticate(&pool, cli.user, cli.password).await?;
                    commands::plan::run_reconcile(&service, &session, &file, by_name, json)
                        .await?;
                }
            }
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => match sko_audit::verify_hash_chain(&path)? {
                sko_audit::VerifyResult::Valid { lines } => {
                    println!("journal OK: {lines} event(s), chain intact");
                }
                sko_audit::VerifyResult::Broken { line, reason } => {
                    anyhow::bail!("journal BROKEN at line {line}: {reason}");
                }
            },
        },

        Commands::Forecast { date, history } => {
            let date: NaiveDate = date
                .parse()
                .with_context(|| format!("invalid --date '{date}', expected YYYY-MM-DD"))?;

            let samples = match history {
                Some(path) => load_history(&path)?,
                None => Vec::new(),
            };

            let config = load_config()?;
            let source = NaiveFootfallSource::new(
                config.forecast.default_footfall,
                Box::new(StaticHolidayCalendar::with_defaults()),
            );
            let f = source.predict(date, &samples)?;
            println!(
                "predicted={} holiday={}",
                f.predicted,
                f.holiday_name.as_deref().unwrap_or("none")
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

/// Config layers: `SKO_CONFIG` names the base file, `SKO_CONFIG_LOCAL`
/// an optional override. No file at all means defaults.
fn load_config() -> Result<sko_config::AppConfig> {
    let mut paths: Vec<String> = Vec::new();
    if let Ok(p) = std::env::var("SKO_CONFIG") {
        paths.push(p);
    }
    if let Ok(p) = std::env::var("SKO_CONFIG_LOCAL") {
        paths.push(p);
    }
    if paths.is_empty() {
        return Ok(sko_config::AppConfig::default());
    }

    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    Ok(sko_config::load_layered_yaml(&refs)?.config)
}

/// Build the service, attaching the journal when one is configured. An
/// existing journal is resumed so its hash chain continues unbroken.
fn build_service(pool: sqlx::PgPool) -> Result<PantryService> {
    let config = load_config()?;
    Ok(match &config.journal_path {
        Some(path) => {
            let journal = sko_audit::JournalWriter::resume(path, true)?;
            PantryService::with_journal(pool, journal)
        }
        None => PantryService::new(pool),
    })
}

#[derive(serde::Deserialize)]
struct HistoryRow {
    date: NaiveDate,
    customers: i64,
}

fn load_history(path: &str) -> Result<Vec<(NaiveDate, i64)>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read history file: {path}"))?;
    let rows: Vec<HistoryRow> =
        serde_json::from_str(raw.trim()).context("history file must be a JSON array")?;
    Ok(rows.into_iter().map(|r| (r.date, r.customers)).collect())
}
