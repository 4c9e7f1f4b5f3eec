//! Serialization seams between the ledger and whatever persists it.
//!
//! The ledger drives serialization: a [`Budget`](crate::ledger::Budget) hands its
//! accounts to a [`BudgetSerialization`], and each account writes itself through an
//! [`AccountSerialization`]. Loading runs the other way, with the deserializer calling
//! back into the ledger as each account and transaction becomes available.

pub mod text_format;

use crate::errors::Result;
use crate::ledger::{Account, TransactionRecord, VerifiableTransaction};

pub use text_format::{ReadsBudgetFromStream, WritesBudgetToStream};

pub trait AccountSerialization {
    fn save(
        &mut self,
        name: &str,
        credits: &[TransactionRecord],
        debits: &[TransactionRecord],
    ) -> Result<()>;
}

/// Implemented by accounts to receive loaded transactions.
pub trait AccountDeserializationObserver {
    fn credit_ready(&mut self, loaded: VerifiableTransaction);
    fn debit_ready(&mut self, loaded: VerifiableTransaction);
}

pub trait AccountDeserialization {
    fn load(&mut self, observer: &mut dyn AccountDeserializationObserver) -> Result<()>;
}

pub trait BudgetSerialization {
    /// `secondaries` arrive in ascending name order.
    fn save(&mut self, primary: &Account, secondaries: &[&Account]) -> Result<()>;
}

/// Implemented by the budget to receive loaded accounts.
pub trait BudgetDeserializationObserver {
    fn primary_account_ready(
        &mut self,
        deserialization: &mut dyn AccountDeserialization,
        name: &str,
    ) -> Result<()>;

    fn secondary_account_ready(
        &mut self,
        deserialization: &mut dyn AccountDeserialization,
        name: &str,
    ) -> Result<()>;
}

pub trait BudgetDeserialization {
    fn load(&mut self, observer: &mut dyn BudgetDeserializationObserver) -> Result<()>;
}
