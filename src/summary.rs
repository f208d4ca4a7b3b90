//! Totals derived from a list of transactions for the dashboard and reports.
//!
//! Every function here is pure: the caller fetches the transactions from the
//! ledger and passes them in.

use std::{
    collections::{BTreeMap, HashMap},
    ops::Add,
};

use serde::Serialize;
use time::Date;

use crate::{
    period::month_abbrev,
    transaction::{Transaction, TransactionType},
};

/// The income, expense and balance totals of a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// The sum of the amounts of all income transactions.
    pub total_income: f64,
    /// The sum of the amounts of all expense transactions.
    pub total_expense: f64,
    /// Total income minus total expenses.
    pub balance: f64,
}

impl Summary {
    fn from_totals(total_income: f64, total_expense: f64) -> Self {
        Self {
            total_income,
            total_expense,
            balance: total_income - total_expense,
        }
    }

    fn add_transaction(&mut self, transaction: &Transaction) {
        match transaction.kind {
            TransactionType::Income => self.total_income += transaction.amount,
            TransactionType::Expense => self.total_expense += transaction.amount,
        }

        self.balance = self.total_income - self.total_expense;
    }
}

impl Add for Summary {
    type Output = Summary;

    fn add(self, rhs: Self) -> Self::Output {
        Summary::from_totals(
            self.total_income + rhs.total_income,
            self.total_expense + rhs.total_expense,
        )
    }
}

/// Calculate the total income, total expenses and balance of `transactions`.
///
/// Returns all zeros for an empty slice.
pub fn aggregate(transactions: &[Transaction]) -> Summary {
    let mut summary = Summary::default();

    for transaction in transactions {
        summary.add_transaction(transaction);
    }

    summary
}

/// The total amount for one category of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category, i.e. the transaction title.
    pub category: String,
    /// The sum of the amounts in the category.
    pub total: f64,
}

/// Sum the amounts of the transactions of type `kind`, grouped by title.
///
/// The largest totals come first, ties are ordered by category name.
pub fn totals_by_category(transactions: &[Transaction], kind: TransactionType) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.kind == kind) {
        *totals.entry(transaction.title.trim()).or_insert(0.0) += transaction.amount;
    }

    let mut totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_owned(),
            total,
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    totals
}

/// The totals for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// The first day of the month.
    pub month: Date,
    /// The totals of the transactions in the month.
    pub summary: Summary,
}

impl MonthlySummary {
    /// A label such as "Mar 2025".
    pub fn label(&self) -> String {
        format!("{} {}", month_abbrev(self.month.month()), self.month.year())
    }
}

/// Aggregate transactions by calendar month.
///
/// Only months that contain at least one transaction are returned, in
/// chronological order.
pub fn totals_by_month(transactions: &[Transaction]) -> Vec<MonthlySummary> {
    let mut totals: BTreeMap<Date, Summary> = BTreeMap::new();

    for transaction in transactions {
        let date = transaction.date_time.date();
        let month = date.replace_day(1).unwrap_or(date);
        totals.entry(month).or_default().add_transaction(transaction);
    }

    totals
        .into_iter()
        .map(|(month, summary)| MonthlySummary { month, summary })
        .collect()
}
