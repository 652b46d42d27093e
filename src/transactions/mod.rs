//! Pre-made transactions, one per teardown step.

#![cfg(feature = "teardown")]

mod check_existence;
mod deactivate_deployments;
mod remove_preview;

pub use check_existence::*;
pub use deactivate_deployments::*;
pub use remove_preview::*;
