use thiserror::Error;
use tracing::{error, warn};

/// The result of a transaction.
pub type StateResult<T> = Result<T, StateError>;

/// A failed transaction, telling the control flow how to proceed.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The failure is transient and the control flow should retry if possible.
    ///
    /// See: [`retry_if_possible`]
    #[error("transient failure: {0}")]
    Retry(String),
    /// The failure is fatal and the control flow should exit immediately.
    #[error("{0}")]
    Cancelled(String),
}

impl StateError {
    /// Creates a [`StateError::Retry`] from anything displayable.
    pub fn retry<D>(reason: D) -> Self
    where
        D: ToString,
    {
        Self::Retry(reason.to_string())
    }

    /// Creates a [`StateError::Cancelled`] from anything displayable.
    pub fn cancelled<D>(reason: D) -> Self
    where
        D: ToString,
    {
        Self::Cancelled(reason.to_string())
    }

    /// Returns `true` if the failure is worth retrying.
    pub const fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }
}

/// Decides whether retrying is allowed based on a provided retry times and a retry limit.
///
/// # Errors
///
/// Returns [`Err<()>`] if retrying is not allowed, otherwise [`Ok<()>`] is returned.
pub fn retry_if_possible(retry: &mut u8, max_retries: u8) -> Result<(), ()> {
    *retry = retry.saturating_add(1);
    if *retry > max_retries {
        error!("retried for too many times ({max_retries}), stopping!");
        Err(())
    } else {
        warn!("retrying… ({retry} / {max_retries})");
        Ok(())
    }
}
