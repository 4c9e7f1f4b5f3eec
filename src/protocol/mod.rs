//! Browser-facing message vocabulary and its mapping onto [`Budget`] operations.
//!
//! Messages are JSON objects selected by their `"method"` field, e.g.
//! `{"method": "transfer", "name": "Groceries", "amount": "50", "date": "2021-06-03"}`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::currency::Money;
use crate::errors::{LedgerError, Result};
use crate::ledger::{Budget, Date, Transaction, PRIMARY_ACCOUNT_NAME};

/// Account, amount, date and description of a single entry.
///
/// Entries named after the primary account are credits; any other name is a debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFields {
    pub name: String,
    pub amount: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
}

impl TransactionFields {
    pub fn transaction(&self) -> Result<Transaction> {
        if self.description.contains(['\n', '\r']) {
            return Err(LedgerError::UnstorableText(self.description.clone()));
        }
        let amount: Money = self.amount.parse()?;
        let date: Date = self.date.parse()?;
        Ok(Transaction::new(amount, self.description.clone(), date))
    }

    fn is_credit(&self) -> bool {
        self.name == PRIMARY_ACCOUNT_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Request {
    #[serde(rename = "add transaction")]
    AddTransaction(TransactionFields),
    #[serde(rename = "remove transaction")]
    RemoveTransaction(TransactionFields),
    #[serde(rename = "verify transaction")]
    VerifyTransaction(TransactionFields),
    #[serde(rename = "transfer")]
    Transfer {
        name: String,
        amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
    #[serde(rename = "reduce")]
    Reduce {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
    #[serde(rename = "create account")]
    CreateAccount { name: String },
    #[serde(rename = "remove account")]
    RemoveAccount { name: String },
    #[serde(rename = "rename account")]
    RenameAccount { name: String, to: String },
    #[serde(rename = "close account")]
    CloseAccount {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
    #[serde(rename = "save")]
    Save,
}

/// What the caller still has to do after [`Request::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Done,
    /// Persisting is left to the caller, which owns the storage.
    SaveRequested,
}

impl Request {
    pub fn parse(text: &str) -> Result<Request> {
        Ok(serde_json::from_str(text)?)
    }

    /// Runs the request against `budget`; requests without a date use `today`.
    pub fn apply(&self, budget: &mut Budget, today: Date) -> Result<Applied> {
        debug!(request = ?self, "applying request");
        match self {
            Request::AddTransaction(fields) => {
                let transaction = fields.transaction()?;
                if fields.is_credit() {
                    budget.credit(transaction);
                } else {
                    budget.debit(&fields.name, transaction);
                }
            }
            Request::RemoveTransaction(fields) => {
                let transaction = fields.transaction()?;
                if fields.is_credit() {
                    budget.remove_credit(&transaction);
                } else {
                    budget.remove_debit(&fields.name, &transaction);
                }
            }
            Request::VerifyTransaction(fields) => {
                let transaction = fields.transaction()?;
                if fields.is_credit() {
                    budget.verify_credit(&transaction);
                } else {
                    budget.verify_debit(&fields.name, &transaction);
                }
            }
            Request::Transfer { name, amount, date } => {
                let amount: Money = amount.parse()?;
                budget.transfer_to(name, amount, date_or(date.as_deref(), today)?);
            }
            Request::Reduce { date } => budget.reduce(date_or(date.as_deref(), today)?),
            Request::CreateAccount { name } => budget.create_account(name),
            Request::RemoveAccount { name } => budget.remove_account(name),
            Request::RenameAccount { name, to } => {
                if let Err(refused) = budget.rename_account(name, to) {
                    debug!(%refused, "rename ignored");
                }
            }
            Request::CloseAccount { name, date } => {
                budget.close_account(name, date_or(date.as_deref(), today)?)
            }
            Request::Save => return Ok(Applied::SaveRequested),
        }
        Ok(Applied::Done)
    }
}

fn date_or(text: Option<&str>, today: Date) -> Result<Date> {
    match text {
        Some(text) if !text.trim().is_empty() => text.parse(),
        _ => Ok(today),
    }
}
