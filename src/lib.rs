#![doc(test(attr(deny(warnings))))]

//! Budget Ledger keeps a primary income account and named expense accounts,
//! records and reconciles their transactions, and stores them in a plain text file.

pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod protocol;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Budget Ledger tracing initialized.");
    });
}
