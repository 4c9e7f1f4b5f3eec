#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use budget_ledger::{
    currency::Money,
    ledger::{Budget, Date, Month, Transaction},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Returns a fresh directory that outlives the calling test.
pub fn scratch_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn cents(value: i64) -> Money {
    Money::from_cents(value)
}

pub fn date(month: u32, day: u32, year: i32) -> Date {
    Date::new(year, Month::from_number(month).expect("valid month"), day)
}

pub fn transaction(amount: i64, description: &str, when: Date) -> Transaction {
    Transaction::new(cents(amount), description, when)
}

/// A budget exercising every kind of entry the file format stores.
pub fn populated_budget() -> Budget {
    let mut budget = Budget::new();
    budget.credit(transaction(213435, "btnrh", date(11, 22, 2019)));
    budget.verify_credit(&transaction(213435, "btnrh", date(11, 22, 2019)));
    budget.credit(transaction(0, "nothing at all", date(11, 23, 2019)));
    budget.transfer_to("Groceries", cents(5000), date(6, 3, 2021));
    budget.debit("Groceries", transaction(1205, "milk and   eggs", date(6, 4, 2021)));
    budget.debit("Gifts", transaction(2500, "Sam's 24th", date(12, 27, 2020)));
    budget.debit("Seth's Car Loan", transaction(32124, "honda", date(12, 27, 2020)));
    budget.verify_debit("Seth's Car Loan", &transaction(32124, "honda", date(12, 27, 2020)));
    budget
}
