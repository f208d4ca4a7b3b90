//! Implements a struct that holds the long-lived state of the app.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::PrimitiveDateTime;

use crate::{
    Error,
    db::initialize,
    key_value::SQLiteKeyValueStore,
    ledger::LedgerStore,
    session::Session,
    timezone::get_local_offset,
};

/// The state shared by every screen of the app.
///
/// Construct it once at start up and hand references to the screens that
/// need the ledger or the session.
#[derive(Debug)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Ho_Chi_Minh".
    pub local_timezone: String,

    /// The transactions recorded by the user.
    pub ledger: LedgerStore<SQLiteKeyValueStore>,

    /// The login state of the user.
    pub session: Session<SQLiteKeyValueStore>,

    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables the
    /// app needs. `local_timezone` should be a valid, canonical timezone
    /// name, e.g. "Asia/Ho_Chi_Minh".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the timezone
    /// is unknown.
    pub fn new(db_connection: Connection, local_timezone: &str) -> Result<Self, Error> {
        let local_offset = get_local_offset(local_timezone)
            .ok_or_else(|| Error::InvalidTimezone(local_timezone.to_owned()))?;

        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let store = SQLiteKeyValueStore::new(connection.clone());

        tracing::debug!("Using timezone {local_timezone} ({local_offset})");

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            ledger: LedgerStore::with_local_timezone(store.clone(), local_timezone),
            session: Session::new(store),
            db_connection: connection,
        })
    }

    /// The current local time, truncated to the minute.
    ///
    /// Use this to pre-fill the date-time field of a new transaction. It is
    /// the same clock the ledger uses for transactions created without a
    /// date-time.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the configured timezone is unknown.
    pub fn now(&self) -> Result<PrimitiveDateTime, Error> {
        self.ledger.now()
    }
}
