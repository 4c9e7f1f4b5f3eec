pub mod account;
pub mod budget;
pub mod date;
pub mod transaction;

pub use account::{Account, AccountFactory, AccountObserver, InMemoryAccountFactory};
pub use budget::{is_valid_account_name, Budget, BudgetObserver, RenameRefused, PRIMARY_ACCOUNT_NAME};
pub use date::{Date, Month};
pub use transaction::{Transaction, TransactionObserver, TransactionRecord, VerifiableTransaction};
