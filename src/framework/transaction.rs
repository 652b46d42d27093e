use super::{StateError, StateResult, retry_if_possible};

use std::time::Duration;

use tracing::{debug, error, info};

use crate::env::MAX_RETRIES;

/// How a transaction reacts to [`StateError::Retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The maximum retry times before the transaction is cancelled.
    pub max_retries: u8,
    /// The delay before the first retry. The n-th retry waits n times as long.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a [`RetryPolicy`] limited by the [`MAX_RETRIES`] environment variable.
    pub fn from_env() -> Self {
        Self {
            max_retries: *MAX_RETRIES,
            backoff: Duration::from_secs(1),
        }
    }

    /// Creates a [`RetryPolicy`] that retries without waiting.
    pub const fn immediate(max_retries: u8) -> Self {
        Self {
            max_retries,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Runs a transaction until it succeeds, fails fatally, or the retry limit of the [`RetryPolicy`] is reached.
///
/// # Errors
///
/// Returns [`StateError::Cancelled`] if the transaction fails fatally or keeps failing transiently.
pub async fn run_transaction<T, F, Fut>(name: &str, policy: RetryPolicy, mut f: F) -> StateResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StateResult<T>>,
{
    debug!("starting transaction {name}…");
    let mut retry: u8 = 0;

    loop {
        match f().await {
            Ok(value) => {
                info!("transaction {name} succeed!");
                break Ok(value);
            }
            Err(StateError::Retry(reason)) => match retry_if_possible(&mut retry, policy.max_retries) {
                Ok(()) => tokio::time::sleep(policy.backoff * u32::from(retry)).await,
                Err(()) => {
                    error!("transaction {name} failed!");
                    break Err(StateError::Cancelled(format!(
                        "{name} still failing after {} retries: {reason}",
                        policy.max_retries
                    )));
                }
            },
            Err(err) => {
                error!("transaction {name} failed: {err}");
                break Err(err);
            }
        }
    }
}
