//! Data models of deployment records and the API tracking them.

#![cfg(feature = "deployments")]

use std::fmt::{self, Display};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::framework::StateResult;

mod github;
#[cfg(test)]
pub(crate) mod memory;

pub use github::*;

/// Represents a deployment from GitHub REST API.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub id: u64,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub task: String,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} ({})", self.task, self.environment, self.id)
    }
}

/// The state of a deployment status.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentState {
    Error,
    Failure,
    Inactive,
    InProgress,
    Queued,
    Pending,
    Success,
}

impl DeploymentState {
    /// The name GitHub REST API uses for the state.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Inactive => "inactive",
            Self::InProgress => "in_progress",
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }
}

impl Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeploymentState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Lists deployments and drives them through their lifecycle.
#[async_trait]
pub trait DeploymentTracker: Send + Sync {
    /// Lists every deployment matching both the environment and the task.
    ///
    /// # Errors
    ///
    /// Returns an error that instructs retrying or cancelling if listing fails.
    async fn list_deployments(&self, environment: &str, task: &str) -> StateResult<Vec<Deployment>>;

    /// Creates a status for a deployment.
    ///
    /// # Errors
    ///
    /// Returns an error that instructs retrying or cancelling if the status cannot be created.
    async fn create_status(&self, id: u64, state: DeploymentState) -> StateResult<()>;

    /// Deletes a deployment. Deleting a deployment that no longer exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error that instructs retrying or cancelling if the deployment cannot be deleted.
    async fn delete_deployment(&self, id: u64) -> StateResult<()>;
}
