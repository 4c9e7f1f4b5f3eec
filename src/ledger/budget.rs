use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::currency::Money;
use crate::errors::{LedgerError, Result};
use crate::storage::{
    AccountDeserialization, BudgetDeserialization, BudgetDeserializationObserver,
    BudgetSerialization,
};

use super::account::{Account, AccountFactory, InMemoryAccountFactory};
use super::date::Date;
use super::transaction::Transaction;

/// Name of the income account every budget owns.
pub const PRIMARY_ACCOUNT_NAME: &str = "master";

/// Receives budget-wide changes.
pub trait BudgetObserver {
    /// Called before the new account is stored, so the observer may attach to it.
    fn new_account_created(&self, account: &mut Account, name: &str);
    fn total_balance_changed(&self, total: Money);

    fn unsaved_changes(&self) {}
    fn saved(&self) {}
}

/// Secondary account names must be non-blank and fit on one line of the ledger file.
pub fn is_valid_account_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['\n', '\r'])
}

/// Why [`Budget::rename_account`] left the accounts unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameRefused {
    #[error("`{0}` is not a usable account name")]
    InvalidName(String),
    #[error("an account named `{0}` already exists")]
    NameInUse(String),
    #[error("no account named `{0}`")]
    MissingAccount(String),
}

/// The primary account plus the secondary accounts keyed by name.
///
/// Lookups of missing accounts are absorbed as no-ops everywhere except the
/// entry points that create accounts on demand (`debit`, `transfer_to`,
/// `create_account`).
pub struct Budget {
    primary: Account,
    secondaries: BTreeMap<String, Account>,
    factory: Box<dyn AccountFactory>,
    observer: Option<Rc<dyn BudgetObserver>>,
}

impl Default for Budget {
    fn default() -> Self {
        Self::new()
    }
}

impl Budget {
    pub fn new() -> Self {
        Self::with_factory(Box::new(InMemoryAccountFactory))
    }

    pub fn with_factory(factory: Box<dyn AccountFactory>) -> Self {
        let primary = factory.make(PRIMARY_ACCOUNT_NAME);
        Self {
            primary,
            secondaries: BTreeMap::new(),
            factory,
            observer: None,
        }
    }

    /// Replaces any previously attached observer.
    pub fn attach(&mut self, observer: Rc<dyn BudgetObserver>) {
        self.observer = Some(observer);
    }

    pub fn primary(&self) -> &Account {
        &self.primary
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.secondaries.get(name)
    }

    /// Secondary accounts in ascending name order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.secondaries.values()
    }

    pub fn total_balance(&self) -> Money {
        self.primary.balance() + self.secondaries.values().map(Account::balance).sum::<Money>()
    }

    pub fn credit(&mut self, transaction: Transaction) {
        debug!(amount = %transaction.amount, "credit");
        self.primary.credit(transaction);
        self.balance_changed();
    }

    pub fn debit(&mut self, name: &str, transaction: Transaction) {
        debug!(account = name, amount = %transaction.amount, "debit");
        let Some(account) = self.ensure_account(name) else {
            return;
        };
        account.debit(transaction);
        self.balance_changed();
    }

    pub fn remove_credit(&mut self, transaction: &Transaction) {
        if self.primary.remove_credit(transaction) {
            self.balance_changed();
        }
    }

    pub fn remove_debit(&mut self, name: &str, transaction: &Transaction) {
        let Some(account) = self.secondaries.get_mut(name) else {
            warn!(account = name, "cannot remove debit from missing account");
            return;
        };
        if account.remove_debit(transaction) {
            self.balance_changed();
        }
    }

    pub fn verify_credit(&mut self, transaction: &Transaction) {
        if self.primary.verify_credit(transaction) {
            self.notify_unsaved();
        }
    }

    /// Never creates `name`.
    pub fn verify_debit(&mut self, name: &str, transaction: &Transaction) {
        let verified = self
            .secondaries
            .get_mut(name)
            .is_some_and(|account| account.verify_debit(transaction));
        if verified {
            self.notify_unsaved();
        }
    }

    /// Moves `amount` from the primary account into `name`; both legs start verified.
    pub fn transfer_to(&mut self, name: &str, amount: Money, date: Date) {
        debug!(account = name, amount = %amount, "transfer");
        if self.ensure_account(name).is_none() {
            return;
        }
        self.primary
            .debit_verified(Transaction::new(amount, transfer_to_description(name), date));
        if let Some(account) = self.secondaries.get_mut(name) {
            account.credit_verified(Transaction::new(amount, TRANSFER_FROM_DESCRIPTION, date));
        }
        self.balance_changed();
    }

    pub fn remove_transfer(&mut self, name: &str, amount: Money, date: Date) {
        let Some(account) = self.secondaries.get_mut(name) else {
            warn!(account = name, "cannot remove transfer to missing account");
            return;
        };
        let credit_removed =
            account.remove_credit(&Transaction::new(amount, TRANSFER_FROM_DESCRIPTION, date));
        let debit_removed = self
            .primary
            .remove_debit(&Transaction::new(amount, transfer_to_description(name), date));
        if credit_removed || debit_removed {
            self.balance_changed();
        }
    }

    /// Re-keys `from` as `to`.
    ///
    /// A refused rename changes nothing; the error only says why.
    pub fn rename_account(
        &mut self,
        from: &str,
        to: &str,
    ) -> std::result::Result<(), RenameRefused> {
        if !self.secondaries.contains_key(from) {
            warn!(account = from, "cannot rename missing account");
            return Err(RenameRefused::MissingAccount(from.to_string()));
        }
        if from == to {
            return Ok(());
        }
        if !is_valid_account_name(to) {
            warn!(from, to, "refusing unusable account name");
            return Err(RenameRefused::InvalidName(to.to_string()));
        }
        if self.secondaries.contains_key(to) {
            warn!(from, to, "account name already in use");
            return Err(RenameRefused::NameInUse(to.to_string()));
        }
        if let Some(mut account) = self.secondaries.remove(from) {
            info!(from, to, "renaming account");
            account.rename(to);
            self.secondaries.insert(to.to_string(), account);
            self.notify_unsaved();
        }
        Ok(())
    }

    /// Idempotent: an existing account is left untouched.
    pub fn create_account(&mut self, name: &str) {
        self.ensure_account(name);
    }

    pub fn remove_account(&mut self, name: &str) {
        let Some(account) = self.secondaries.remove(name) else {
            return;
        };
        info!(account = name, "removing account");
        account.remove();
        self.balance_changed();
    }

    /// Settles the balance of `name` against the primary account and removes it.
    pub fn close_account(&mut self, name: &str, date: Date) {
        let Some(account) = self.secondaries.remove(name) else {
            return;
        };
        let balance = account.balance();
        info!(account = name, balance = %balance, "closing account");
        let transaction = Transaction::new(balance.abs(), format!("close {name}"), date);
        if balance.is_positive() {
            self.primary.credit_verified(transaction);
        } else if balance.is_negative() {
            self.primary.debit_verified(transaction);
        }
        account.remove();
        self.balance_changed();
    }

    pub fn reduce(&mut self, date: Date) {
        info!(date = %date, "reducing all accounts");
        self.primary.reduce(date);
        for account in self.secondaries.values_mut() {
            account.reduce(date);
        }
        self.balance_changed();
    }

    pub fn find_unverified_credits(&self, amount: Money) -> Vec<Transaction> {
        self.primary.find_unverified_credits(amount)
    }

    pub fn find_unverified_debits(&self, name: &str, amount: Money) -> Vec<Transaction> {
        self.secondaries
            .get(name)
            .map(|account| account.find_unverified_debits(amount))
            .unwrap_or_default()
    }

    pub fn save(&self, serialization: &mut dyn BudgetSerialization) -> Result<()> {
        let secondaries: Vec<&Account> = self.secondaries.values().collect();
        serialization.save(&self.primary, &secondaries)?;
        info!(accounts = secondaries.len() + 1, "budget saved");
        if let Some(observer) = &self.observer {
            observer.saved();
        }
        Ok(())
    }

    /// Replaces the current contents with whatever `deserialization` yields.
    ///
    /// On error the budget holds the accounts read before the failing line.
    pub fn load(&mut self, deserialization: &mut dyn BudgetDeserialization) -> Result<()> {
        for account in self.secondaries.values() {
            account.remove();
        }
        self.secondaries.clear();
        self.primary.clear();
        let outcome = deserialization.load(self);
        self.notify_total();
        match &outcome {
            Ok(()) => info!(accounts = self.secondaries.len() + 1, "budget loaded"),
            Err(error) => warn!(%error, "budget load aborted"),
        }
        outcome
    }

    /// `None` when `name` cannot name an account.
    fn ensure_account(&mut self, name: &str) -> Option<&mut Account> {
        if !is_valid_account_name(name) {
            warn!(account = name, "refusing unusable account name");
            return None;
        }
        let Self {
            secondaries,
            factory,
            observer,
            ..
        } = self;
        let account = secondaries.entry(name.to_string()).or_insert_with(|| {
            info!(account = name, "creating account");
            let mut account = factory.make(name);
            if let Some(observer) = observer {
                observer.new_account_created(&mut account, name);
            }
            account
        });
        Some(account)
    }

    fn balance_changed(&self) {
        self.notify_total();
        self.notify_unsaved();
    }

    fn notify_total(&self) {
        if let Some(observer) = &self.observer {
            observer.total_balance_changed(self.total_balance());
        }
    }

    fn notify_unsaved(&self) {
        if let Some(observer) = &self.observer {
            observer.unsaved_changes();
        }
    }
}

impl BudgetDeserializationObserver for Budget {
    fn primary_account_ready(
        &mut self,
        deserialization: &mut dyn AccountDeserialization,
        _name: &str,
    ) -> Result<()> {
        self.primary.load(deserialization)
    }

    fn secondary_account_ready(
        &mut self,
        deserialization: &mut dyn AccountDeserialization,
        name: &str,
    ) -> Result<()> {
        match self.ensure_account(name) {
            Some(account) => account.load(deserialization),
            None => Err(LedgerError::UnstorableText(name.to_string())),
        }
    }
}

impl fmt::Debug for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Budget")
            .field("primary", &self.primary)
            .field("secondaries", &self.secondaries)
            .finish()
    }
}

const TRANSFER_FROM_DESCRIPTION: &str = "transfer from master";

fn transfer_to_description(name: &str) -> String {
    format!("transfer to {name}")
}
