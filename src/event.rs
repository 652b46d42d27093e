//! The pull request event triggering a run.

#![cfg(feature = "teardown")]

use std::path::Path;

use anyhow::{Context as _, bail};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::env::{GITHUB_EVENT_PATH, PR_NUMBER, Settings};

/// Represents a pull request webhook payload.
#[derive(Debug, Deserialize, Clone)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
    pub pull_request: PullRequest,
}

/// Represents the pull request inside a [`PullRequestEvent`].
#[derive(Debug, Deserialize, Clone)]
pub struct PullRequest {
    pub number: u64,
    /// Whether the pull request was merged rather than just closed. Informational only.
    #[serde(default)]
    pub merged: bool,
}

impl PullRequestEvent {
    /// Parses an event from its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a pull request event.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse pull request event")
    }

    /// Reads and parses an event from a payload file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a pull request event.
    pub async fn from_path<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path> + Send + Sync,
    {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read event payload {}", path.display()))?;
        Self::from_json(&json)
    }

    /// The number of the pull request.
    pub fn pull_request_number(&self) -> u64 {
        self.number.unwrap_or(self.pull_request.number)
    }

    /// Whether this event closes the pull request. Events without an action are assumed to.
    pub fn is_closed(&self) -> bool {
        self.action.as_deref().is_none_or(|action| action == "closed")
    }
}

/// Resolves the pull request to tear down.
///
/// An explicit pull request number in the [`Settings`] wins over the event payload. Returns [`None`] if the event
/// does not close a pull request, in which case there is nothing to do.
///
/// # Errors
///
/// Returns an error if neither source is available, or the event payload cannot be read.
pub async fn resolve_pull_request(settings: &Settings) -> anyhow::Result<Option<u64>> {
    if let Some(number) = settings.pull_request {
        debug!("using pull request #{number} from {PR_NUMBER}");
        return Ok(Some(number));
    }

    let Some(path) = &settings.event_path else {
        bail!("neither {PR_NUMBER} nor {GITHUB_EVENT_PATH} is set in environment");
    };
    let event = PullRequestEvent::from_path(path).await?;
    let number = event.pull_request_number();

    if !event.is_closed() {
        warn!(
            "pull request #{number} was {}, not closed, skipping!",
            event.action.as_deref().unwrap_or_default()
        );
        return Ok(None);
    }

    debug!(
        "pull request #{number} was closed ({})",
        if event.pull_request.merged { "merged" } else { "not merged" }
    );
    Ok(Some(number))
}
