use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use money_tracker::{AppState, DEFAULT_TIMEZONE, setup_logging};

/// A utility for logging the user out of a money_tracker database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The canonical name of the local timezone, e.g. "Asia/Ho_Chi_Minh".
    #[arg(long, env = "MONEY_TRACKER_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    timezone: String,
}

/// Clear the stored session so the app asks the user to log in again.
fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let conn = Connection::open(db_path)?;
    let state = AppState::new(conn, &args.timezone)?;

    if !state.session.is_authenticated() {
        println!("No user is logged in, nothing to do.");
        return Ok(());
    }

    println!("Logging out {}", state.session.user_name()?);
    state.session.log_out()?;
    println!("Success!");

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }
}
