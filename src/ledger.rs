//! The ledger store: durable storage of the transaction list.
//!
//! All transactions are kept as a single JSON array under one key of a
//! [KeyValueStore]. Writes are a read-modify-write of the whole array, done
//! while holding the store's write lock so that back-to-back appends cannot
//! lose each other's updates.

use std::{collections::HashSet, sync::Mutex};

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::{
    Error, StorageError, ValidationError,
    key_value::KeyValueStore,
    period::DateRange,
    summary::{Summary, aggregate},
    timezone::{get_local_offset, now_local},
    transaction::{Transaction, TransactionBuilder, TransactionId},
};

const TRANSACTIONS_KEY: &str = "transactions";

/// Owns the persisted list of transactions.
///
/// Construct one per application and share it with everything that reads or
/// records transactions.
#[derive(Debug)]
pub struct LedgerStore<S> {
    store: S,
    write_lock: Mutex<()>,
    local_timezone: Option<String>,
}

impl<S: KeyValueStore> LedgerStore<S> {
    /// Create a ledger backed by `store` that uses UTC for "now".
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            local_timezone: None,
        }
    }

    /// Create a ledger backed by `store` that fills in the date-time of
    /// transactions created without one from the wall clock of
    /// `local_timezone`, a canonical timezone name such as "Asia/Ho_Chi_Minh".
    pub fn with_local_timezone(store: S, local_timezone: &str) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            local_timezone: Some(local_timezone.to_owned()),
        }
    }

    /// The current local time, truncated to the minute.
    ///
    /// The timezone's offset is looked up on every call, so the result
    /// follows daylight saving changes.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the configured timezone is unknown.
    pub fn now(&self) -> Result<PrimitiveDateTime, Error> {
        let local_offset = match &self.local_timezone {
            Some(timezone) => get_local_offset(timezone)
                .ok_or_else(|| Error::InvalidTimezone(timezone.clone()))?,
            None => UtcOffset::UTC,
        };

        Ok(now_local(local_offset))
    }

    /// Get all transactions, most recent first.
    ///
    /// Transactions with the same date-time are ordered by when they were
    /// added, most recently added first. A ledger that has never been written
    /// to is empty.
    ///
    /// # Errors
    /// This function will return a:
    /// - [StorageError::CorruptLedger] if the stored ledger cannot be read,
    /// - or another [StorageError] if the store fails.
    pub fn list(&self) -> Result<Vec<Transaction>, Error> {
        let mut transactions = self.load()?;
        sort_newest_first(&mut transactions);

        Ok(transactions)
    }

    /// Get up to `limit` of the most recent transactions.
    ///
    /// # Errors
    /// See [LedgerStore::list].
    pub fn recent(&self, limit: usize) -> Result<Vec<Transaction>, Error> {
        let mut transactions = self.list()?;
        transactions.truncate(limit);

        Ok(transactions)
    }

    /// Get the transactions whose date lies within `range`, most recent first.
    ///
    /// # Errors
    /// See [LedgerStore::list].
    pub fn list_in_range(&self, range: DateRange) -> Result<Vec<Transaction>, Error> {
        let mut transactions = self.list()?;
        transactions.retain(|transaction| range.contains(transaction.date_time.date()));

        Ok(transactions)
    }

    /// Get the number of transactions in the ledger.
    ///
    /// # Errors
    /// See [LedgerStore::list].
    pub fn count(&self) -> Result<usize, Error> {
        Ok(self.load()?.len())
    }

    /// The income, expense and balance totals of the whole ledger.
    ///
    /// # Errors
    /// See [LedgerStore::list].
    pub fn summary(&self) -> Result<Summary, Error> {
        Ok(aggregate(&self.load()?))
    }

    /// Add a fully populated transaction to the ledger.
    ///
    /// The transaction is durable once this function returns. If it fails,
    /// the stored ledger is unchanged.
    ///
    /// # Errors
    /// This function will return a:
    /// - [ValidationError] if the transaction is invalid (see
    ///   [Transaction::validate]) or its ID is already in the ledger,
    /// - [StorageError::CorruptLedger] if the stored ledger cannot be read,
    /// - or another [StorageError] if the store fails.
    pub fn append(&self, transaction: Transaction) -> Result<Transaction, Error> {
        if let Err(error) = transaction.validate() {
            tracing::debug!("Rejected transaction {}: {error}", transaction.id);
            return Err(error.into());
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        let mut transactions = self.load()?;

        if transactions
            .iter()
            .any(|existing| existing.id == transaction.id)
        {
            tracing::warn!("Rejected transaction with duplicate ID {}", transaction.id);
            return Err(ValidationError::DuplicateId(transaction.id).into());
        }

        transactions.push(transaction.clone());
        self.save(&transactions)?;

        tracing::info!(
            "Added transaction {} ({:?}, {})",
            transaction.id,
            transaction.kind,
            transaction.amount
        );

        Ok(transaction)
    }

    /// Create a transaction from `builder` with a fresh ID and add it to the
    /// ledger.
    ///
    /// The date-time defaults to the current local time.
    ///
    /// # Errors
    /// See [LedgerStore::append].
    pub fn create(&self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        if let Err(error) = builder.validate() {
            tracing::debug!("Rejected new transaction: {error}");
            return Err(error.into());
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        let mut transactions = self.load()?;
        let now = match builder.date_time {
            Some(date_time) => date_time,
            None => self.now()?,
        };
        let transaction = builder.finalise(next_id(&transactions), now);

        transactions.push(transaction.clone());
        self.save(&transactions)?;

        tracing::info!(
            "Created transaction {} ({:?}, {})",
            transaction.id,
            transaction.kind,
            transaction.amount
        );

        Ok(transaction)
    }

    /// Read the ledger in the order the transactions were added.
    fn load(&self) -> Result<Vec<Transaction>, StorageError> {
        let Some(text) = self.store.get(TRANSACTIONS_KEY)? else {
            tracing::debug!("No stored ledger, starting empty");
            return Ok(Vec::new());
        };

        let transactions: Vec<Transaction> = serde_json::from_str(&text).map_err(|error| {
            tracing::error!("Could not parse the stored ledger: {error}");
            StorageError::CorruptLedger(error.to_string())
        })?;

        tracing::debug!("Loaded {} transactions", transactions.len());

        Ok(transactions)
    }

    fn save(&self, transactions: &[Transaction]) -> Result<(), StorageError> {
        let text = serde_json::to_string(transactions)
            .map_err(|error| StorageError::Serialization(error.to_string()))?;

        self.store.set(TRANSACTIONS_KEY, &text).inspect_err(|error| {
            tracing::error!("Could not save the ledger: {error}");
        })
    }
}

fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.reverse();
    // Stable, so equal date-times stay most-recently-added first.
    transactions.sort_by(|a, b| b.date_time.cmp(&a.date_time));
}

/// Generate an ID from the current time in milliseconds that is not used by
/// any of `existing`.
fn next_id(existing: &[Transaction]) -> TransactionId {
    let used: HashSet<&str> = existing.iter().map(|t| t.id.as_str()).collect();
    let mut millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

    loop {
        let candidate = millis.to_string();

        if !used.contains(candidate.as_str()) {
            return TransactionId::new(candidate);
        }

        millis += 1;
    }
}

#[cfg(test)]
mod ledger_store_tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        thread,
    };

    use rusqlite::Connection;
    use time::{
        PrimitiveDateTime,
        macros::{date, datetime},
    };

    use crate::{
        Error, StorageError, ValidationError,
        db::initialize,
        key_value::{KeyValueStore, MemoryKeyValueStore, SQLiteKeyValueStore},
        period::Period,
        summary::{Summary, aggregate},
        transaction::{Transaction, TransactionId, TransactionType},
    };

    use super::{LedgerStore, TRANSACTIONS_KEY};

    fn get_ledger() -> LedgerStore<MemoryKeyValueStore> {
        LedgerStore::new(MemoryKeyValueStore::new())
    }

    fn create_test_transaction(
        id: &str,
        kind: TransactionType,
        title: &str,
        amount: f64,
        date_time: PrimitiveDateTime,
    ) -> Transaction {
        Transaction::build(kind, title, amount)
            .date_time(date_time)
            .finalise(TransactionId::new(id), date_time)
    }

    /// Fails every write, but reads from the wrapped store.
    struct ReadOnlyStore(MemoryKeyValueStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, _: &str, _: &str) -> Result<(), StorageError> {
            Err(StorageError::SqlError(rusqlite::Error::InvalidQuery))
        }

        fn remove(&self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::SqlError(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn list_never_written_is_empty() {
        let ledger = get_ledger();

        assert_eq!(ledger.list(), Ok(vec![]));
        assert_eq!(aggregate(&ledger.list().unwrap()), Summary::default());
    }

    #[test]
    fn append_then_list_returns_record() {
        let ledger = get_ledger();
        let transaction = create_test_transaction(
            "1",
            TransactionType::Income,
            "Lương",
            200_000.0,
            datetime!(2025-03-01 08:30),
        );

        ledger.append(transaction.clone()).unwrap();

        assert_eq!(ledger.list(), Ok(vec![transaction]));
    }

    #[test]
    fn salary_then_food_scenario() {
        let ledger = get_ledger();
        let salary = create_test_transaction(
            "1",
            TransactionType::Income,
            "Lương",
            200_000.0,
            datetime!(2025-03-01 08:30),
        );
        let food = create_test_transaction(
            "2",
            TransactionType::Expense,
            "Ăn uống",
            50_000.0,
            datetime!(2025-03-02 12:00),
        );

        ledger.append(salary.clone()).unwrap();
        let got = ledger.list().unwrap();
        assert_eq!(got, vec![salary.clone()]);
        assert_eq!(
            aggregate(&got),
            Summary {
                total_income: 200_000.0,
                total_expense: 0.0,
                balance: 200_000.0,
            }
        );

        ledger.append(food.clone()).unwrap();
        let got = ledger.list().unwrap();
        assert_eq!(got, vec![food, salary]);
        assert_eq!(
            aggregate(&got),
            Summary {
                total_income: 200_000.0,
                total_expense: 50_000.0,
                balance: 150_000.0,
            }
        );
        assert_eq!(ledger.summary(), Ok(aggregate(&got)));
    }

    #[test]
    fn list_is_sorted_descending_by_date_time() {
        let ledger = get_ledger();
        let date_times = [
            datetime!(2025-03-05 10:00),
            datetime!(2025-01-01 00:00),
            datetime!(2025-03-05 09:59),
            datetime!(2026-10-16 23:59),
        ];
        for (i, date_time) in date_times.iter().enumerate() {
            ledger
                .append(create_test_transaction(
                    &i.to_string(),
                    TransactionType::Expense,
                    "Cà phê",
                    1.0,
                    *date_time,
                ))
                .unwrap();
        }

        let got = ledger.list().unwrap();

        assert!(
            got.windows(2).all(|pair| pair[0].date_time > pair[1].date_time),
            "got transactions that were not sorted in descending order: {got:?}"
        );
    }

    #[test]
    fn list_orders_equal_date_times_by_most_recently_added() {
        let ledger = get_ledger();
        let date_time = datetime!(2025-03-01 08:30);
        let first =
            create_test_transaction("a", TransactionType::Income, "Lương", 1.0, date_time);
        let second =
            create_test_transaction("b", TransactionType::Income, "Thưởng", 2.0, date_time);

        ledger.append(first.clone()).unwrap();
        ledger.append(second.clone()).unwrap();

        assert_eq!(ledger.list(), Ok(vec![second, first]));
    }

    #[test]
    fn append_then_list_keeps_fraction_of_a_second() {
        let ledger = get_ledger();
        let transaction = create_test_transaction(
            "1",
            TransactionType::Income,
            "Lương",
            1.0,
            datetime!(2025-03-01 08:30:15.5),
        );

        ledger.append(transaction.clone()).unwrap();

        assert_eq!(ledger.list(), Ok(vec![transaction]));
    }

    #[test]
    fn list_orders_date_times_within_the_same_second() {
        let ledger = get_ledger();
        let later = create_test_transaction(
            "a",
            TransactionType::Income,
            "Lương",
            1.0,
            datetime!(2025-03-01 08:30:00.2),
        );
        let earlier = create_test_transaction(
            "b",
            TransactionType::Income,
            "Thưởng",
            2.0,
            datetime!(2025-03-01 08:30:00.1),
        );

        ledger.append(later.clone()).unwrap();
        ledger.append(earlier.clone()).unwrap();

        assert_eq!(ledger.list(), Ok(vec![later, earlier]));
    }

    #[test]
    fn list_reads_utc_timestamps() {
        let store = MemoryKeyValueStore::new();
        store
            .set(
                TRANSACTIONS_KEY,
                r#"[{"id":"1","type":"Thu","title":"Lương","amount":1,"dateTime":"2025-03-01T08:30:00.000Z"}]"#,
            )
            .unwrap();
        let ledger = LedgerStore::new(store);

        let got = ledger.list().unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].date_time, datetime!(2025-03-01 08:30));
    }

    #[test]
    fn create_fails_on_unknown_timezone() {
        let ledger = LedgerStore::with_local_timezone(MemoryKeyValueStore::new(), "Not/A_Zone");

        let result = ledger.create(Transaction::build(TransactionType::Income, "Lương", 1.0));

        assert_eq!(
            result,
            Err(Error::InvalidTimezone("Not/A_Zone".to_owned()))
        );
        assert_eq!(ledger.count(), Ok(0));
    }

    #[test]
    fn create_with_date_time_ignores_timezone() {
        let ledger = LedgerStore::with_local_timezone(MemoryKeyValueStore::new(), "Not/A_Zone");

        let transaction = ledger
            .create(
                Transaction::build(TransactionType::Income, "Lương", 1.0)
                    .date_time(datetime!(2025-03-01 08:30)),
            )
            .unwrap();

        assert_eq!(transaction.date_time, datetime!(2025-03-01 08:30));
        assert_eq!(ledger.list(), Ok(vec![transaction]));
    }

    #[test]
    fn list_is_idempotent() {
        let ledger = get_ledger();
        for i in 0..5 {
            ledger
                .create(
                    Transaction::build(TransactionType::Expense, "Ăn uống", i as f64)
                        .date_time(datetime!(2025-03-01 08:00)),
                )
                .unwrap();
        }

        assert_eq!(ledger.list(), ledger.list());
    }

    #[test]
    fn append_fails_on_empty_title_and_leaves_ledger_unchanged() {
        let ledger = get_ledger();
        let existing = create_test_transaction(
            "1",
            TransactionType::Income,
            "Lương",
            1.0,
            datetime!(2025-03-01 08:30),
        );
        ledger.append(existing.clone()).unwrap();

        let result = ledger.append(create_test_transaction(
            "2",
            TransactionType::Income,
            "",
            1.0,
            datetime!(2025-03-01 08:30),
        ));

        assert_eq!(result, Err(Error::Validation(ValidationError::EmptyTitle)));
        assert_eq!(ledger.list(), Ok(vec![existing]));
    }

    #[test]
    fn append_fails_on_negative_amount_and_leaves_ledger_unchanged() {
        let ledger = get_ledger();

        let result = ledger.append(create_test_transaction(
            "1",
            TransactionType::Expense,
            "Xăng",
            -5.0,
            datetime!(2025-03-01 08:30),
        ));

        assert_eq!(
            result,
            Err(Error::Validation(ValidationError::NegativeAmount(-5.0)))
        );
        assert_eq!(ledger.list(), Ok(vec![]));
    }

    #[test]
    fn append_fails_on_duplicate_id() {
        let ledger = get_ledger();
        let transaction = create_test_transaction(
            "1",
            TransactionType::Income,
            "Lương",
            1.0,
            datetime!(2025-03-01 08:30),
        );
        ledger.append(transaction.clone()).unwrap();

        let result = ledger.append(transaction.clone());

        assert_eq!(
            result,
            Err(Error::Validation(ValidationError::DuplicateId(
                TransactionId::new("1")
            )))
        );
        assert_eq!(ledger.count(), Ok(1));
    }

    #[test]
    fn create_assigns_unique_ids() {
        let ledger = get_ledger();

        let ids: HashSet<TransactionId> = (0..20)
            .map(|i| {
                ledger
                    .create(Transaction::build(TransactionType::Expense, "Ăn uống", i as f64))
                    .unwrap()
                    .id
            })
            .collect();

        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn create_fills_in_missing_date_time() {
        let ledger = get_ledger();

        let transaction = ledger
            .create(Transaction::build(TransactionType::Income, "Lương", 1.0))
            .unwrap();

        assert_eq!(transaction.date_time.second(), 0);
        assert_eq!(ledger.list(), Ok(vec![transaction]));
    }

    #[test]
    fn create_fails_on_empty_title() {
        let ledger = get_ledger();

        let result = ledger.create(Transaction::build(TransactionType::Income, " ", 1.0));

        assert_eq!(result, Err(Error::Validation(ValidationError::EmptyTitle)));
        assert_eq!(ledger.count(), Ok(0));
    }

    #[test]
    fn concurrent_creates_do_not_lose_updates() {
        let ledger = Arc::new(get_ledger());

        thread::scope(|scope| {
            for _ in 0..8 {
                let ledger = Arc::clone(&ledger);
                scope.spawn(move || {
                    for _ in 0..10 {
                        ledger
                            .create(Transaction::build(TransactionType::Expense, "Cà phê", 1.0))
                            .unwrap();
                    }
                });
            }
        });

        let transactions = ledger.list().unwrap();
        let ids: HashSet<&TransactionId> = transactions.iter().map(|t| &t.id).collect();
        assert_eq!(transactions.len(), 80);
        assert_eq!(ids.len(), 80);
    }

    #[test]
    fn corrupt_ledger_is_reported_and_not_overwritten() {
        let store = MemoryKeyValueStore::new();
        store.set(TRANSACTIONS_KEY, "{not json").unwrap();
        let ledger = LedgerStore::new(store.clone());

        let listed = ledger.list();
        let appended = ledger.create(Transaction::build(TransactionType::Income, "Lương", 1.0));

        assert!(
            matches!(listed, Err(Error::Storage(StorageError::CorruptLedger(_)))),
            "want corrupt ledger error, got {listed:?}"
        );
        assert!(
            matches!(appended, Err(Error::Storage(StorageError::CorruptLedger(_)))),
            "want corrupt ledger error, got {appended:?}"
        );
        assert_eq!(store.get(TRANSACTIONS_KEY), Ok(Some("{not json".to_owned())));
    }

    #[test]
    fn ledger_with_bad_record_is_corrupt() {
        let store = MemoryKeyValueStore::new();
        store
            .set(
                TRANSACTIONS_KEY,
                r#"[{"id":"1","type":"Thu","title":"Lương","amount":1,"dateTime":"hôm qua"}]"#,
            )
            .unwrap();
        let ledger = LedgerStore::new(store);

        let result = ledger.list();

        assert!(
            matches!(result, Err(Error::Storage(StorageError::CorruptLedger(_)))),
            "want corrupt ledger error, got {result:?}"
        );
    }

    #[test]
    fn failed_write_is_reported() {
        let ledger = LedgerStore::new(ReadOnlyStore(MemoryKeyValueStore::new()));

        let result = ledger.create(Transaction::build(TransactionType::Income, "Lương", 1.0));

        assert_eq!(
            result,
            Err(Error::Storage(StorageError::SqlError(
                rusqlite::Error::InvalidQuery
            )))
        );
        assert_eq!(ledger.list(), Ok(vec![]));
    }

    #[test]
    fn recent_returns_most_recent() {
        let ledger = get_ledger();
        for day in 1..=9 {
            ledger
                .create(
                    Transaction::build(TransactionType::Expense, "Ăn uống", day as f64)
                        .date_time(PrimitiveDateTime::new(
                            date!(2025 - 03 - 01).replace_day(day).unwrap(),
                            time::Time::MIDNIGHT,
                        )),
                )
                .unwrap();
        }

        let got = ledger.recent(5).unwrap();

        let amounts: Vec<f64> = got.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![9.0, 8.0, 7.0, 6.0, 5.0]);
    }

    #[test]
    fn list_in_range_filters_by_date() {
        let ledger = get_ledger();
        let inside = ledger
            .create(
                Transaction::build(TransactionType::Expense, "Ăn uống", 1.0)
                    .date_time(datetime!(2025-03-31 23:59)),
            )
            .unwrap();
        ledger
            .create(
                Transaction::build(TransactionType::Expense, "Ăn uống", 2.0)
                    .date_time(datetime!(2025-04-01 00:00)),
            )
            .unwrap();

        let got = ledger
            .list_in_range(Period::Month.range(date!(2025 - 03 - 15)))
            .unwrap();

        assert_eq!(got, vec![inside]);
    }

    #[test]
    fn sqlite_ledger_survives_reopening() {
        let path = std::env::temp_dir().join(format!(
            "money_tracker_ledger_test_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let transaction = {
            let conn = Connection::open(&path).unwrap();
            initialize(&conn).unwrap();
            let ledger = LedgerStore::new(SQLiteKeyValueStore::new(Arc::new(Mutex::new(conn))));
            ledger
                .create(Transaction::build(TransactionType::Income, "Lương", 200_000.0))
                .unwrap()
        };

        let conn = Connection::open(&path).unwrap();
        let ledger = LedgerStore::new(SQLiteKeyValueStore::new(Arc::new(Mutex::new(conn))));
        let got = ledger.list();
        let _ = std::fs::remove_file(&path);

        assert_eq!(got, Ok(vec![transaction]));
    }
}
