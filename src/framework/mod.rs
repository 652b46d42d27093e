//! A framework that runs transactions, retrying transient failures until the max retry times is reached.

#![cfg(feature = "framework")]

mod state;
mod transaction;

pub use state::*;
pub use transaction::*;
