// ============================================================================
// whitelist-db: CLI inspection and seeding tool for the premint whitelist
// ============================================================================
// Usage:
//   whitelist-db stats                              Show level and mint counts
//   whitelist-db status <ADDRESS> [--at RFC3339]    Evaluate minting eligibility
//   whitelist-db import --level LEVEL --file PATH   Import an address list
//                [--force]                        (required outside development)
//   whitelist-db list-mints [--recipient ADDRESS]   List announced mints
//   whitelist-db export --format json               Export full database as JSON
// ============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use whitelist_core::eligibility::evaluate;
use whitelist_core::import::parse_address_list;
use whitelist_core::{AppConfig, Environment, Schedule, WhitelistDb, WhitelistLevel};

/// Premint whitelist database tool
#[derive(Parser)]
#[command(name = "whitelist-db", version, about = "Inspect and seed the premint whitelist database")]
struct Cli {
    /// Path to the database file (default: $WHITELIST_DB_PATH or ~/.whitelist/whitelist.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Tier schedule JSON (default: $WHITELIST_SCHEDULE_PATH or the built-in schedule)
    #[arg(long, global = true)]
    schedule: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whitelisted wallets per level and mint totals
    Stats,

    /// Evaluate minting eligibility for a wallet
    Status {
        /// Wallet address
        address: String,

        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long)]
        at: Option<String>,
    },

    /// Import a newline-separated address list into a level
    Import {
        /// airdrop, super-premint, premint or developer
        #[arg(long)]
        level: String,

        /// File with one address per line
        #[arg(long)]
        file: PathBuf,

        /// Import even when WHITELIST_ENV is not development
        #[arg(long)]
        force: bool,
    },

    /// List announced mint transactions
    ListMints {
        /// Only show mints sent to this address
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Export full database contents as JSON
    Export {
        /// Output format (currently only json is supported)
        #[arg(long, default_value = "json")]
        format: String,
    },
}

fn parse_level(s: &str) -> Result<WhitelistLevel> {
    WhitelistLevel::from_slug(s).with_context(|| {
        format!(
            "Unknown level '{}'. Valid values: airdrop, super-premint, premint, developer",
            s
        )
    })
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp '{}', expected RFC 3339", s))?;
    Ok(parsed.with_timezone(&Utc))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn check_import_allowed(environment: Environment, force: bool) -> Result<()> {
    if environment.allows_imports() {
        return Ok(());
    }
    if !force {
        anyhow::bail!(
            "Imports are disabled in the {} environment. Set WHITELIST_ENV=development or pass --force.",
            environment
        );
    }
    eprintln!("WARNING: importing into the {} environment (--force)", environment);
    Ok(())
}

fn load_schedule(path: Option<PathBuf>) -> Result<Schedule> {
    let mut config = AppConfig::from_env()?;
    if path.is_some() {
        config.schedule_path = path;
    }
    Ok(config.load_schedule()?)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let db = WhitelistDb::open(cli.db_path.as_deref())?;

    match cli.command {
        Commands::Stats => cmd_stats(&db),
        Commands::Status { address, at } => cmd_status(&db, cli.schedule, &address, at),
        Commands::Import { level, file, force } => {
            check_import_allowed(AppConfig::from_env()?.environment, force)?;
            cmd_import(&db, &level, &file)
        }
        Commands::ListMints { recipient } => cmd_list_mints(&db, recipient),
        Commands::Export { format } => cmd_export(&db, &format),
    }
}

fn cmd_stats(db: &WhitelistDb) -> Result<()> {
    let stats = db.stats()?;

    println!("=== Premint Whitelist Database Stats ===");
    println!("Database: {}", db.path().display());
    println!();
    println!("Wallets:  {} total", stats.levels.total);
    for level in WhitelistLevel::ALL {
        println!("  {:14} {}", level.display_name(), stats.levels.get(level));
    }
    println!("Mints:    {}", stats.total_mints);
    println!("Recipients: {}", stats.unique_recipients);

    Ok(())
}

fn cmd_status(
    db: &WhitelistDb,
    schedule_path: Option<PathBuf>,
    address: &str,
    at: Option<String>,
) -> Result<()> {
    let schedule = load_schedule(schedule_path)?;
    let now = at.as_deref().map(parse_instant).transpose()?.unwrap_or_else(Utc::now);

    let assignment = db.get_assignment(address)?;
    let minted = match &assignment {
        Some(_) => db.mint_count(address)?,
        None => 0,
    };
    let result = evaluate(address, now, assignment.as_ref(), minted, &schedule);

    println!("Wallet:   {}", result.wallet_address);
    println!("Level:    {}", result.level);
    println!("Allowed:  {}", if result.minting_allowed { "yes" } else { "no" });
    println!("Opens at: {}", format_timestamp(&result.minting_allowed_at));
    match result.max_mint_amount {
        Some(max) => println!("Minted:   {} / {}", minted, max),
        None => println!("Minted:   {} (no cap)", minted),
    }

    Ok(())
}

fn cmd_import(db: &WhitelistDb, level: &str, file: &Path) -> Result<()> {
    let level = parse_level(level)?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let batch = parse_address_list(&raw, level, Utc::now());
    db.upsert_assignments(&batch.assignments)?;

    let summary = batch.summary();
    println!(
        "Imported {} addresses into {} ({} duplicates skipped)",
        summary.imported, summary.level, summary.duplicates
    );
    Ok(())
}

fn cmd_list_mints(db: &WhitelistDb, recipient: Option<String>) -> Result<()> {
    let mints = db.list_mints(recipient.as_deref())?;

    if mints.is_empty() {
        println!("No mints found.");
        return Ok(());
    }

    println!(
        "{:<24}  {:<44}  {:>6}  {}",
        "ANNOUNCED AT", "RECIPIENT", "AMOUNT", "TX ID"
    );
    println!("{}", "-".repeat(110));

    for mint in &mints {
        let tx_id = mint.tx_id.chars().take(30).collect::<String>();
        println!(
            "{:<24}  {:<44}  {:>6}  {}",
            format_timestamp(&mint.announced_at),
            mint.recipient_address,
            mint.amount,
            tx_id
        );
    }

    println!("\nTotal: {} mints", mints.len());
    Ok(())
}

fn cmd_export(db: &WhitelistDb, format: &str) -> Result<()> {
    if format != "json" {
        anyhow::bail!("Unsupported format '{}'. Only 'json' is supported.", format);
    }

    let export = serde_json::json!({
        "exportedAt": Utc::now().to_rfc3339(),
        "stats": db.stats()?,
        "whitelist": db.list_assignments()?,
        "mints": db.list_mints(None)?,
    });

    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}
