//! Transaction records for the ledger.
//!
//! This module contains:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Parsing and formatting of the user-editable date-time field

mod core;
mod date_time;

pub use core::{Transaction, TransactionBuilder, TransactionId, TransactionType};
pub use date_time::{format_date_time, parse_date_time};
