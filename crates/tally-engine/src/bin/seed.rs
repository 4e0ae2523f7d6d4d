//! # Demo Ledger Generator
//!
//! Opens a shift, records a day of documents and closes it, for development.
//!
//! ## Usage
//! ```bash
//! # One demo shift with 20 sales (default)
//! cargo run -p tally-engine --bin tally-seed
//!
//! # More sales
//! cargo run -p tally-engine --bin tally-seed -- --sales 200
//!
//! # Specify database path
//! cargo run -p tally-engine --bin tally-seed -- --db ./data/ledger.db
//! ```
//!
//! ## Generated Documents
//! - Sales cycling through every tender, every fourth one mixed
//! - One credit and one layaway, each with an abono
//! - One expense and one income movement
//!
//! The shift is closed declaring exactly the expected cash.

use std::env;
use std::path::PathBuf;

use tally_core::{AccountKind, Money, MovementKind, Tender, TenderBreakdown};
use tally_engine::{init_tracing, Ledger, LedgerConfig};

const DEFAULT_SALES: usize = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut sales = DEFAULT_SALES;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(DEFAULT_SALES);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Demo Ledger Generator");
                println!();
                println!("Usage: tally-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>      Number of sales to record (default: {})", DEFAULT_SALES);
                println!("  -d, --db <PATH>      Database file path (default: from ledger.toml)");
                println!("  -c, --config <PATH>  Config file path");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if db_path.is_some() {
        config.database.path = db_path;
    }
    let branch = config.terminal.branch;

    println!("Tally Demo Ledger Generator");
    println!("===========================");
    println!("Database: {}", config.database_path().display());
    println!("Terminal: branch {:02}, register {:02}", branch, config.terminal.register);
    println!("Sales:    {}", sales);
    println!();

    let ledger = Ledger::open(&config).await?;
    let shifts = ledger.reconciliation();
    let documents = ledger.documents();

    if let Some(open) = shifts.current_shift(branch).await? {
        println!("Branch {} already has an open shift: {}", branch, open.folio);
        println!("  Close it before seeding another one.");
        return Ok(());
    }

    let shift = shifts
        .open_shift(branch, Money::from_major_minor(500, 0), "seed")
        .await?;
    println!("Opened shift {}", shift.folio);

    for n in 0..sales {
        let total = Money::from_cents(1_500 + ((n as i64 * 733) % 25_000));
        let (tendered, payment) = if n % 4 == 3 {
            let cash = Money::from_cents(total.cents() / 2);
            let card = total - cash;
            (
                total,
                TenderBreakdown::mixed([(Tender::Cash, cash), (Tender::Debit, card)]),
            )
        } else {
            let tender = Tender::ALL[n % Tender::ALL.len()];
            let tendered = if tender == Tender::Cash {
                Money::from_cents((total.cents() / 5_000 + 1) * 5_000)
            } else {
                total
            };
            (tendered, TenderBreakdown::Single(tender))
        };
        documents.record_sale("seed", total, tendered, payment).await?;
    }
    println!("Recorded {} sales", sales);

    for kind in [AccountKind::Credit, AccountKind::Layaway] {
        let account = documents
            .record_account(kind, "customer-demo", Money::from_major_minor(1_200, 0))
            .await?;
        documents
            .record_account_payment(
                kind,
                &account.id,
                Money::from_major_minor(150, 0),
                TenderBreakdown::Single(Tender::Cash),
                "seed",
            )
            .await?;
        println!("Opened {} {} with one abono", kind, account.folio);
    }

    shifts
        .add_movement(&shift.id, MovementKind::Expense, "Cleaning supplies", Money::from_major_minor(30, 0), "seed")
        .await?;
    shifts
        .add_movement(&shift.id, MovementKind::Income, "Change fund top-up", Money::from_major_minor(50, 0), "seed")
        .await?;

    let preview = shifts.preview_close(&shift.id, Money::zero()).await?;
    let closed = shifts
        .close_shift(&shift.id, preview.expected_cash, Some("Demo shift".to_string()))
        .await?;

    println!();
    println!("Closed shift {}", closed.shift.folio);
    for tender in Tender::ALL {
        println!("  {:<14} {}", tender.tag(), closed.shift.tender_sales(tender));
    }
    println!("  Productivity   {}", Money::from_cents(closed.shift.productivity_cents));
    println!("  Expected cash  {}", closed.shift.expected_cash());
    println!("  Surplus        {}", closed.shift.surplus());
    println!("  Stamped        {} documents", closed.stamped.total());

    Ok(())
}
