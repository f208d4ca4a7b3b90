//! Money Tracker is a personal finance tracker for recording income and
//! expenses.
//!
//! This library provides the local storage core of the app: a ledger of
//! transactions kept in a key-value blob store, the aggregates shown on the
//! dashboard and in reports, and a mock login session.

#![warn(missing_docs)]

mod app_state;
mod db;
mod key_value;
mod ledger;
mod logging;
mod period;
mod session;
mod summary;
mod timezone;
mod transaction;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use key_value::{KeyValueStore, MemoryKeyValueStore, SQLiteKeyValueStore};
pub use ledger::LedgerStore;
pub use logging::setup_logging;
pub use period::{DateRange, Period};
pub use session::{Credentials, DEFAULT_USER_NAME, Session, SessionToken};
pub use summary::{
    CategoryTotal, MonthlySummary, Summary, aggregate, totals_by_category, totals_by_month,
};
pub use timezone::{DEFAULT_TIMEZONE, get_local_offset};
pub use transaction::{
    Transaction, TransactionBuilder, TransactionId, TransactionType, format_date_time,
    parse_date_time,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The caller supplied invalid input, e.g. a transaction without a title.
    ///
    /// These errors are expected to be shown to the user next to the
    /// offending form field and are never fatal.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reading from or writing to the underlying storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The configured timezone is not a valid, canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),
}

impl Error {
    /// Whether the error was caused by invalid input from the caller.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Whether the error was caused by the storage layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Error::Storage(value.into())
    }
}

/// Invalid input that was rejected before anything was written.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    /// A transaction must have a non-empty title.
    #[error("the transaction title cannot be empty")]
    EmptyTitle,

    /// A transaction amount must not be negative.
    ///
    /// Whether a transaction adds or removes money is decided by its
    /// [TransactionType], not by the sign of the amount.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(f64),

    /// The amount was NaN or infinite.
    #[error("the transaction amount must be a finite number")]
    NonFiniteAmount,

    /// A transaction must have a non-empty ID.
    #[error("the transaction ID cannot be empty")]
    EmptyId,

    /// A transaction with the same ID is already in the ledger.
    #[error("a transaction with the ID \"{0}\" already exists")]
    DuplicateId(TransactionId),

    /// The date-time text could not be parsed.
    #[error("could not parse \"{0}\" as a date and time, expected YYYY-MM-DDTHH:MM")]
    InvalidDateTime(String),

    /// No email address was given.
    #[error("the email cannot be empty")]
    EmptyEmail,

    /// The email address is not of the form `local@domain.tld`.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// No password was given.
    #[error("the password cannot be empty")]
    EmptyPassword,

    /// The password is shorter than [Credentials::MIN_PASSWORD_LENGTH].
    #[error("the password must be at least {} characters long", Credentials::MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    /// No display name was given when registering.
    #[error("the name cannot be empty")]
    EmptyName,

    /// The password confirmation does not match the password.
    #[error("the passwords do not match")]
    PasswordMismatch,
}

/// A failure in the persistence layer.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StorageError {
    /// The persisted ledger exists but could not be deserialized.
    ///
    /// This is distinct from an empty ledger: callers may choose to treat the
    /// ledger as empty, but the stored data is left untouched.
    #[error("the stored ledger is corrupt: {0}")]
    CorruptLedger(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// A value could not be serialized for storage.
    #[error("could not serialize as JSON: {0}")]
    Serialization(String),

    /// Could not acquire a storage lock because another thread panicked
    /// while holding it.
    #[error("could not acquire the storage lock")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        StorageError::SqlError(value)
    }
}
