use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::currency::Money;
use crate::errors::Result;
use crate::storage::{AccountDeserialization, AccountDeserializationObserver, AccountSerialization};

use super::date::Date;
use super::transaction::{Transaction, TransactionRecord, VerifiableTransaction};

pub const REDUCTION_DESCRIPTION: &str = "reduction";

/// Receives changes to a single [`Account`].
pub trait AccountObserver {
    fn balance_changed(&self, balance: Money);
    fn credit_added(&self, record: &mut TransactionRecord);
    fn debit_added(&self, record: &mut TransactionRecord);
    fn will_be_removed(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Credit,
    Debit,
}

/// A named list of credits and debits.
///
/// The balance is never stored: it is recomputed from the records on every call.
pub struct Account {
    name: String,
    credits: Vec<TransactionRecord>,
    debits: Vec<TransactionRecord>,
    observer: Option<Rc<dyn AccountObserver>>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credits: Vec::new(),
            debits: Vec::new(),
            observer: None,
        }
    }

    /// Replaces any previously attached observer.
    pub fn attach(&mut self, observer: Rc<dyn AccountObserver>) {
        self.observer = Some(observer);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credits(&self) -> &[TransactionRecord] {
        &self.credits
    }

    pub fn debits(&self) -> &[TransactionRecord] {
        &self.debits
    }

    pub fn credit(&mut self, transaction: Transaction) {
        self.add(Side::Credit, transaction, false);
    }

    pub fn debit(&mut self, transaction: Transaction) {
        self.add(Side::Debit, transaction, false);
    }

    /// Appends a credit that needs no reconciliation.
    pub(crate) fn credit_verified(&mut self, transaction: Transaction) {
        self.add(Side::Credit, transaction, true);
    }

    pub(crate) fn debit_verified(&mut self, transaction: Transaction) {
        self.add(Side::Debit, transaction, true);
    }

    /// Verifies the earliest unverified credit equal to `transaction`.
    pub fn verify_credit(&mut self, transaction: &Transaction) -> bool {
        verify_first(&mut self.credits, transaction)
    }

    pub fn verify_debit(&mut self, transaction: &Transaction) -> bool {
        verify_first(&mut self.debits, transaction)
    }

    /// Removes the earliest credit equal to `transaction`, verified or not.
    pub fn remove_credit(&mut self, transaction: &Transaction) -> bool {
        self.remove_first(Side::Credit, transaction)
    }

    pub fn remove_debit(&mut self, transaction: &Transaction) -> bool {
        self.remove_first(Side::Debit, transaction)
    }

    pub fn balance(&self) -> Money {
        total(&self.credits) - total(&self.debits)
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Collapses the history into one verified entry carrying the net balance.
    ///
    /// A negative balance becomes a debit of its magnitude; anything else, zero
    /// included, becomes a credit.
    pub fn reduce(&mut self, date: Date) {
        let balance = self.balance();
        clear_records(&mut self.debits);
        clear_records(&mut self.credits);
        let transaction = Transaction::new(balance.abs(), REDUCTION_DESCRIPTION, date);
        debug!(account = %self.name, balance = %balance, "reducing account");
        if balance.is_negative() {
            self.add(Side::Debit, transaction, true);
        } else {
            self.add(Side::Credit, transaction, true);
        }
    }

    /// Drops every record and reports the resulting zero balance.
    pub fn clear(&mut self) {
        clear_records(&mut self.credits);
        clear_records(&mut self.debits);
        self.notify_balance();
    }

    /// Tells the observer this account is going away.
    pub fn remove(&self) {
        if let Some(observer) = &self.observer {
            observer.will_be_removed();
        }
    }

    pub fn find_unverified_credits(&self, amount: Money) -> Vec<Transaction> {
        unverified_with_amount(&self.credits, amount)
    }

    pub fn find_unverified_debits(&self, amount: Money) -> Vec<Transaction> {
        unverified_with_amount(&self.debits, amount)
    }

    pub fn save(&self, serialization: &mut dyn AccountSerialization) -> Result<()> {
        serialization.save(&self.name, &self.credits, &self.debits)
    }

    pub fn load(&mut self, deserialization: &mut dyn AccountDeserialization) -> Result<()> {
        deserialization.load(self)
    }

    fn add(&mut self, side: Side, transaction: Transaction, verified: bool) {
        let mut record = self.announce(side);
        record.initialize(transaction);
        if verified {
            record.verify();
        }
        self.records_mut(side).push(record);
        self.notify_balance();
    }

    fn add_loaded(&mut self, side: Side, loaded: VerifiableTransaction) {
        let mut record = self.announce(side);
        record.ready(loaded);
        self.records_mut(side).push(record);
        self.notify_balance();
    }

    fn announce(&self, side: Side) -> TransactionRecord {
        let mut record = TransactionRecord::new();
        if let Some(observer) = &self.observer {
            match side {
                Side::Credit => observer.credit_added(&mut record),
                Side::Debit => observer.debit_added(&mut record),
            }
        }
        record
    }

    fn remove_first(&mut self, side: Side, transaction: &Transaction) -> bool {
        let records = self.records_mut(side);
        let Some(index) = records.iter().position(|record| record.matches(transaction)) else {
            return false;
        };
        records[index].remove();
        records.remove(index);
        self.notify_balance();
        true
    }

    fn records_mut(&mut self, side: Side) -> &mut Vec<TransactionRecord> {
        match side {
            Side::Credit => &mut self.credits,
            Side::Debit => &mut self.debits,
        }
    }

    fn notify_balance(&self) {
        if let Some(observer) = &self.observer {
            observer.balance_changed(self.balance());
        }
    }
}

impl AccountDeserializationObserver for Account {
    fn credit_ready(&mut self, loaded: VerifiableTransaction) {
        self.add_loaded(Side::Credit, loaded);
    }

    fn debit_ready(&mut self, loaded: VerifiableTransaction) {
        self.add_loaded(Side::Debit, loaded);
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("credits", &self.credits)
            .field("debits", &self.debits)
            .finish()
    }
}

/// Builds the accounts a budget creates on demand.
pub trait AccountFactory {
    fn make(&self, name: &str) -> Account;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryAccountFactory;

impl AccountFactory for InMemoryAccountFactory {
    fn make(&self, name: &str) -> Account {
        Account::new(name)
    }
}

fn total(records: &[TransactionRecord]) -> Money {
    records.iter().map(TransactionRecord::amount).sum()
}

fn verify_first(records: &mut [TransactionRecord], transaction: &Transaction) -> bool {
    records.iter_mut().any(|record| record.verifies(transaction))
}

fn clear_records(records: &mut Vec<TransactionRecord>) {
    for record in records.iter() {
        record.remove();
    }
    records.clear();
}

fn unverified_with_amount(records: &[TransactionRecord], amount: Money) -> Vec<Transaction> {
    records
        .iter()
        .filter(|record| !record.is_verified() && record.amount() == amount)
        .map(|record| record.transaction().clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::ledger::date::Month;
    use crate::ledger::transaction::TransactionObserver;

    fn date(day: u32) -> Date {
        Date::new(2021, Month::March, day)
    }

    fn transaction(cents: i64, description: &str, day: u32) -> Transaction {
        Transaction::new(Money::from_cents(cents), description, date(day))
    }

    #[derive(Default)]
    struct RecordingAccountObserver {
        balances: RefCell<Vec<i64>>,
        added: RefCell<Vec<&'static str>>,
        removed: RefCell<bool>,
        record_events: Rc<RefCell<Vec<String>>>,
    }

    struct RecordObserver {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl TransactionObserver for RecordObserver {
        fn transaction_is(&self, transaction: &Transaction) {
            self.events
                .borrow_mut()
                .push(format!("is {}", transaction.description));
        }

        fn verified(&self) {
            self.events.borrow_mut().push("verified".into());
        }

        fn will_be_removed(&self) {
            self.events.borrow_mut().push("removed".into());
        }
    }

    impl AccountObserver for RecordingAccountObserver {
        fn balance_changed(&self, balance: Money) {
            self.balances.borrow_mut().push(balance.cents());
        }

        fn credit_added(&self, record: &mut TransactionRecord) {
            self.added.borrow_mut().push("credit");
            record.attach(Rc::new(RecordObserver {
                events: self.record_events.clone(),
            }));
        }

        fn debit_added(&self, record: &mut TransactionRecord) {
            self.added.borrow_mut().push("debit");
            record.attach(Rc::new(RecordObserver {
                events: self.record_events.clone(),
            }));
        }

        fn will_be_removed(&self) {
            *self.removed.borrow_mut() = true;
        }
    }

    #[test]
    fn balance_is_credits_minus_debits() {
        let mut account = Account::new("Gifts");
        account.credit(transaction(5000, "transfer", 1));
        account.debit(transaction(2500, "present", 2));
        account.debit(transaction(125, "card", 3));
        account.credit(transaction(1, "refund", 4));
        assert_eq!(account.balance().cents(), 5000 - 2500 - 125 + 1);
    }

    #[test]
    fn notifies_balance_after_each_change() {
        let observer = Rc::new(RecordingAccountObserver::default());
        let mut account = Account::new("Gifts");
        account.attach(observer.clone());
        account.credit(transaction(1000, "a", 1));
        account.debit(transaction(300, "b", 1));
        account.remove_debit(&transaction(300, "b", 1));
        assert_eq!(*observer.balances.borrow(), vec![1000, 700, 1000]);
        assert_eq!(*observer.added.borrow(), vec!["credit", "debit"]);
    }

    #[test]
    fn observer_attached_on_add_sees_the_transaction() {
        let observer = Rc::new(RecordingAccountObserver::default());
        let mut account = Account::new("Gifts");
        account.attach(observer.clone());
        account.debit(transaction(300, "book", 1));
        account.verify_debit(&transaction(300, "book", 1));
        assert_eq!(
            *observer.record_events.borrow(),
            vec!["is book", "verified"]
        );
    }

    #[test]
    fn verification_marks_earliest_unverified_duplicate() {
        let mut account = Account::new("Food");
        let duplicate = transaction(700, "lunch", 5);
        account.debit(duplicate.clone());
        account.debit(duplicate.clone());
        assert!(account.verify_debit(&duplicate));
        assert!(account.debits()[0].is_verified());
        assert!(!account.debits()[1].is_verified());
        assert!(account.verify_debit(&duplicate));
        assert!(account.debits()[1].is_verified());
        assert!(!account.verify_debit(&duplicate));
    }

    #[test]
    fn verifying_a_missing_transaction_is_a_no_op() {
        let mut account = Account::new("Food");
        account.credit(transaction(700, "lunch", 5));
        assert!(!account.verify_credit(&transaction(700, "dinner", 5)));
        assert!(!account.credits()[0].is_verified());
    }

    #[test]
    fn removal_takes_the_earliest_match_regardless_of_verification() {
        let mut account = Account::new("Food");
        let duplicate = transaction(700, "lunch", 5);
        account.credit(duplicate.clone());
        account.credit(transaction(100, "other", 6));
        account.credit(duplicate.clone());
        account.verify_credit(&duplicate);
        assert!(account.remove_credit(&duplicate));
        assert_eq!(account.credits().len(), 2);
        assert_eq!(account.credits()[0].transaction().description, "other");
        assert!(!account.credits()[1].is_verified());
        assert!(!account.remove_credit(&transaction(1, "absent", 1)));
        assert_eq!(account.credits().len(), 2);
    }

    #[test]
    fn reduce_replaces_history_with_a_verified_net_debit() {
        let observer = Rc::new(RecordingAccountObserver::default());
        let mut account = Account::new("Car");
        account.attach(observer.clone());
        account.credit(transaction(1000, "in", 1));
        account.debit(transaction(2500, "out", 2));
        observer.record_events.borrow_mut().clear();

        account.reduce(date(31));

        assert!(account.credits().is_empty());
        assert_eq!(account.debits().len(), 1);
        let entry = account.debits()[0].entry();
        assert_eq!(entry.transaction, transaction(1500, REDUCTION_DESCRIPTION, 31));
        assert!(entry.verified);
        assert_eq!(account.balance().cents(), -1500);
        assert_eq!(
            *observer.record_events.borrow(),
            vec!["removed", "removed", "is reduction", "verified"]
        );
    }

    #[test]
    fn reduce_of_a_zero_balance_leaves_a_zero_credit() {
        let mut account = Account::new("Even");
        account.credit(transaction(1000, "in", 1));
        account.debit(transaction(1000, "out", 2));
        account.reduce(date(31));
        assert!(account.debits().is_empty());
        assert_eq!(account.credits().len(), 1);
        assert_eq!(account.credits()[0].amount(), Money::ZERO);
        assert!(account.credits()[0].is_verified());
        assert_eq!(account.balance(), Money::ZERO);
    }

    #[test]
    fn finds_unverified_entries_by_amount() {
        let mut account = Account::new("Food");
        account.debit(transaction(700, "lunch", 5));
        account.debit(transaction(700, "snack", 6));
        account.debit(transaction(900, "dinner", 6));
        account.verify_debit(&transaction(700, "lunch", 5));
        let found = account.find_unverified_debits(Money::from_cents(700));
        assert_eq!(found, vec![transaction(700, "snack", 6)]);
    }

    #[test]
    fn remove_and_clear_notify() {
        let observer = Rc::new(RecordingAccountObserver::default());
        let mut account = Account::new("Food");
        account.attach(observer.clone());
        account.credit(transaction(10, "x", 1));
        account.clear();
        assert_eq!(account.balance(), Money::ZERO);
        assert_eq!(observer.balances.borrow().last(), Some(&0));
        account.remove();
        assert!(*observer.removed.borrow());
    }

    #[test]
    fn rename_changes_the_name_only() {
        let mut account = Account::new("Rent");
        account.debit(transaction(10, "x", 1));
        account.rename("Seth's Rent");
        assert_eq!(account.name(), "Seth's Rent");
        assert_eq!(account.debits().len(), 1);
    }
}
