#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate ledger_test;

pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;

pub use config::LedgerConfig;
pub use error::{Error, Result};
pub use ledger::{CallContext, LedgerCall, LedgerState, Receipt, SharedLedger};
