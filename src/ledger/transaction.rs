use std::fmt;
use std::rc::Rc;

use crate::currency::Money;

use super::date::Date;

/// An immutable ledger entry. Two transactions with equal fields are indistinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Transaction {
    pub amount: Money,
    pub description: String,
    pub date: Date,
}

impl Transaction {
    pub fn new(amount: Money, description: impl Into<String>, date: Date) -> Self {
        Self {
            amount,
            description: description.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiableTransaction {
    pub transaction: Transaction,
    pub verified: bool,
}

impl VerifiableTransaction {
    pub fn unverified(transaction: Transaction) -> Self {
        Self {
            transaction,
            verified: false,
        }
    }

    pub fn verified(transaction: Transaction) -> Self {
        Self {
            transaction,
            verified: true,
        }
    }
}

/// Receives the life events of a single [`TransactionRecord`].
pub trait TransactionObserver {
    fn transaction_is(&self, transaction: &Transaction);
    fn verified(&self);
    fn will_be_removed(&self);
}

/// A transaction as held by an account.
///
/// Records are created empty, announced to the account observer (which may attach
/// itself here), and only then given their transaction, so an attached observer sees
/// the full history of the record.
#[derive(Default)]
pub struct TransactionRecord {
    entry: VerifiableTransaction,
    observer: Option<Rc<dyn TransactionObserver>>,
}

impl TransactionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previously attached observer.
    pub fn attach(&mut self, observer: Rc<dyn TransactionObserver>) {
        self.observer = Some(observer);
    }

    pub fn initialize(&mut self, transaction: Transaction) {
        self.entry.transaction = transaction;
        if let Some(observer) = &self.observer {
            observer.transaction_is(&self.entry.transaction);
        }
    }

    /// Populates the record from persisted data.
    pub fn ready(&mut self, loaded: VerifiableTransaction) {
        self.entry = loaded;
        if let Some(observer) = &self.observer {
            observer.transaction_is(&self.entry.transaction);
            if self.entry.verified {
                observer.verified();
            }
        }
    }

    /// Returns `true` only when this call flipped the record to verified.
    pub fn verify(&mut self) -> bool {
        if self.entry.verified {
            return false;
        }
        self.entry.verified = true;
        if let Some(observer) = &self.observer {
            observer.verified();
        }
        true
    }

    /// Verifies the record if it is unverified and holds `transaction`.
    pub fn verifies(&mut self, transaction: &Transaction) -> bool {
        !self.entry.verified && self.matches(transaction) && self.verify()
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.entry.transaction == *transaction
    }

    pub fn remove(&self) {
        if let Some(observer) = &self.observer {
            observer.will_be_removed();
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.entry.transaction
    }

    pub fn entry(&self) -> &VerifiableTransaction {
        &self.entry
    }

    pub fn amount(&self) -> Money {
        self.entry.transaction.amount
    }

    pub fn is_verified(&self) -> bool {
        self.entry.verified
    }
}

impl fmt::Debug for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionRecord")
            .field("entry", &self.entry)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::ledger::date::Month;

    #[derive(Default)]
    struct RecordingObserver {
        events: RefCell<Vec<String>>,
    }

    impl TransactionObserver for RecordingObserver {
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

    fn groceries() -> Transaction {
        Transaction::new(
            Money::from_cents(4000),
            "groceries",
            Date::new(2014, Month::January, 13),
        )
    }

    #[test]
    fn verify_only_reports_the_first_verification() {
        let mut record = TransactionRecord::new();
        record.initialize(groceries());
        assert!(record.verifies(&groceries()));
        assert!(!record.verifies(&groceries()));
        assert!(!record.verify());
        assert!(record.is_verified());
    }

    #[test]
    fn verify_requires_an_exact_match() {
        let mut record = TransactionRecord::new();
        record.initialize(groceries());
        let mut other = groceries();
        other.description = "Groceries".into();
        assert!(!record.verifies(&other));
        assert!(!record.is_verified());
    }

    #[test]
    fn observer_sees_initialization_verification_and_removal() {
        let observer = Rc::new(RecordingObserver::default());
        let mut record = TransactionRecord::new();
        record.attach(observer.clone());
        record.initialize(groceries());
        record.verify();
        record.remove();
        assert_eq!(
            *observer.events.borrow(),
            vec!["is groceries", "verified", "removed"]
        );
    }

    #[test]
    fn loading_a_verified_entry_notifies_both_facts() {
        let observer = Rc::new(RecordingObserver::default());
        let mut record = TransactionRecord::new();
        record.attach(observer.clone());
        record.ready(VerifiableTransaction::verified(groceries()));
        assert_eq!(*observer.events.borrow(), vec!["is groceries", "verified"]);
        assert!(record.is_verified());
    }
}
