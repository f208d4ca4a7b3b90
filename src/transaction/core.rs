//! Defines the core data models for transactions.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};
use time::PrimitiveDateTime;

use crate::{ValidationError, transaction::date_time::serde_format};

// ============================================================================
// MODELS
// ============================================================================

/// The opaque, unique identifier of a transaction.
///
/// IDs created by the ledger are the creation time in milliseconds since the
/// Unix epoch, but callers should not rely on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap an existing ID string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty or only whitespace.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a transaction earned or spent money.
///
/// Persisted with the app's labels, "Thu" for income and "Chi" for expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money earned, counted towards the total income.
    #[serde(rename = "Thu", alias = "Income")]
    Income,
    /// Money spent, counted towards the total expenses.
    #[serde(rename = "Chi", alias = "Expense")]
    Expense,
}

impl TransactionType {
    /// The sign applied to the amount when computing a balance.
    pub fn sign(self) -> f64 {
        match self {
            TransactionType::Income => 1.0,
            TransactionType::Expense => -1.0,
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build] and hand the builder
/// to [crate::LedgerStore::create].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Whether this transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// A short label for the transaction, also used as its report category.
    pub title: String,
    /// The amount of money spent or earned. Never negative.
    pub amount: f64,
    /// When the transaction happened, in local time.
    #[serde(rename = "dateTime", with = "serde_format")]
    pub date_time: PrimitiveDateTime,
    /// An optional free-text annotation.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub note: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder::new] for discoverability.
    pub fn build(kind: TransactionType, title: &str, amount: f64) -> TransactionBuilder {
        TransactionBuilder::new(kind, title, amount)
    }

    /// The amount with the sign of the transaction type applied, i.e.
    /// negative for expenses.
    pub fn signed_amount(&self) -> f64 {
        self.kind.sign() * self.amount
    }

    /// Check the invariants that every stored transaction must uphold.
    ///
    /// # Errors
    /// This function will return a:
    /// - [ValidationError::EmptyId] if the ID is empty,
    /// - [ValidationError::EmptyTitle] if the title is empty or only whitespace,
    /// - [ValidationError::NonFiniteAmount] if the amount is NaN or infinite,
    /// - or [ValidationError::NegativeAmount] if the amount is less than zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }

        validate_fields(&self.title, self.amount)
    }
}

fn validate_fields(title: &str, amount: f64) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    if !amount.is_finite() {
        return Err(ValidationError::NonFiniteAmount);
    }

    if amount < 0.0 {
        return Err(ValidationError::NegativeAmount(amount));
    }

    Ok(())
}

fn empty_string_as_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let note = Option::<String>::deserialize(deserializer)?;

    Ok(note.filter(|text| !text.is_empty()))
}

/// A builder for creating [Transaction] instances.
///
/// The ID is assigned by the ledger when the transaction is stored, and the
/// date-time defaults to the time of creation.
///
/// # Examples
///
/// ```
/// use money_tracker::{LedgerStore, MemoryKeyValueStore, Transaction, TransactionType};
/// use time::macros::datetime;
///
/// let ledger = LedgerStore::new(MemoryKeyValueStore::new());
///
/// let transaction = ledger
///     .create(
///         Transaction::build(TransactionType::Expense, "Ăn uống", 50_000.0)
///             .date_time(datetime!(2025-03-01 12:15))
///             .note(Some("Phở")),
///     )
///     .unwrap();
///
/// assert_eq!(ledger.list().unwrap(), vec![transaction]);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// Whether the transaction is income or an expense.
    pub kind: TransactionType,

    /// A short label for the transaction, e.g. "Lương" or "Ăn uống".
    ///
    /// Must not be empty. Reports group transactions by this label.
    pub title: String,

    /// The amount of money spent or earned. Must be finite and not negative.
    pub amount: f64,

    /// When the transaction happened.
    ///
    /// `None` means "now", which the ledger fills in from its clock.
    pub date_time: Option<PrimitiveDateTime>,

    /// An optional free-text annotation.
    pub note: Option<String>,
}

impl TransactionBuilder {
    /// Create a builder for a transaction happening now.
    pub fn new(kind: TransactionType, title: &str, amount: f64) -> Self {
        Self {
            kind,
            title: title.to_owned(),
            amount,
            date_time: None,
            note: None,
        }
    }

    /// Set the date and time of the transaction.
    pub fn date_time(mut self, date_time: PrimitiveDateTime) -> Self {
        self.date_time = Some(date_time);
        self
    }

    /// Set the note for the transaction. An empty note is stored as `None`.
    pub fn note(mut self, note: Option<&str>) -> Self {
        self.note = note.filter(|text| !text.is_empty()).map(str::to_owned);
        self
    }

    /// Check the title and amount before an ID is assigned.
    ///
    /// # Errors
    /// See [Transaction::validate].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, self.amount)
    }

    /// Build the final [Transaction] with the specified `id`.
    ///
    /// `now` is used when no date-time was set.
    ///
    /// **Note**: No validation is performed. The ledger validates every
    /// transaction before it is stored.
    pub fn finalise(self, id: TransactionId, now: PrimitiveDateTime) -> Transaction {
        Transaction {
            id,
            kind: self.kind,
            title: self.title,
            amount: self.amount,
            date_time: self.date_time.unwrap_or(now),
            note: self.note,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
