use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, PrimitiveDateTime};

use money_tracker::{AppState, DEFAULT_TIMEZONE, Transaction, TransactionType, setup_logging};

/// A utility for creating a test database for money_tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The canonical name of the local timezone, e.g. "Asia/Ho_Chi_Minh".
    #[arg(long, env = "MONEY_TRACKER_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    timezone: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;
    let state = AppState::new(conn, &args.timezone)?;

    println!("Creating test user...");
    state
        .session
        .register("Người dùng thử", "test@example.com", "test123", "test123")?;

    println!("Creating sample transactions...");
    let now = state.now()?;
    for transaction in sample_transactions(now) {
        state.ledger.create(transaction)?;
    }

    let summary = state.ledger.summary()?;
    println!(
        "Success! Income {}, expenses {}, balance {}",
        summary.total_income, summary.total_expense, summary.balance
    );

    Ok(())
}

fn sample_transactions(now: PrimitiveDateTime) -> Vec<money_tracker::TransactionBuilder> {
    let days_ago = |days: i64| now - Duration::days(days);

    vec![
        Transaction::build(TransactionType::Income, "Lương", 15_000_000.0)
            .date_time(days_ago(30))
            .note(Some("Lương tháng")),
        Transaction::build(TransactionType::Expense, "Tiền nhà", 4_000_000.0).date_time(days_ago(29)),
        Transaction::build(TransactionType::Expense, "Ăn uống", 50_000.0).date_time(days_ago(7)),
        Transaction::build(TransactionType::Expense, "Di chuyển", 30_000.0).date_time(days_ago(3)),
        Transaction::build(TransactionType::Expense, "Ăn uống", 120_000.0)
            .date_time(days_ago(1))
            .note(Some("Ăn tối")),
        Transaction::build(TransactionType::Income, "Thưởng", 1_000_000.0).date_time(now),
    ]
}
