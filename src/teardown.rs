//! Tears down the preview of one pull request.

#![cfg(feature = "teardown")]

use std::fmt::{self, Display};

use anyhow::Context as _;
use tracing::info;

use crate::{
    deployments::DeploymentTracker,
    env::Settings,
    framework::RetryPolicy,
    storage::{ObjectStore, StorageLocation},
    transactions::{check_existence, deactivate_deployments, remove_preview},
};

/// Everything a run acts on, derived from a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownTarget {
    /// The closed pull request.
    pub pull_request: u64,
    /// Where the preview build of the pull request lives.
    pub location: StorageLocation,
    /// The deployment environment previews are deployed to.
    pub environment: String,
    /// The task identifier correlating deployments with the pull request.
    pub task: String,
}

impl TeardownTarget {
    /// Derives the target of a pull request from the [`Settings`].
    pub fn new(settings: &Settings, pull_request: u64) -> Self {
        Self {
            pull_request,
            location: StorageLocation::for_pull_request(
                &settings.bucket,
                &settings.build_dir,
                pull_request,
            ),
            environment: settings.environment.clone(),
            task: format!("{}{pull_request}", settings.task_prefix),
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// The closed pull request.
    pub pull_request: u64,
    /// How many objects the existence check found.
    pub objects_found: usize,
    /// How many objects were deleted.
    pub objects_removed: usize,
    /// The ids of the deployments marked inactive and deleted, in order.
    pub deactivated: Vec<u64>,
}

impl Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pull request #{}: removed {} of {} objects, deactivated {} deployments",
            self.pull_request,
            self.objects_removed,
            self.objects_found,
            self.deactivated.len()
        )
    }
}

/// Removes the preview build of a pull request and deactivates its deployments.
///
/// See: [`Teardown::run`]
#[derive(Debug)]
pub struct Teardown<S, D> {
    store: S,
    tracker: D,
    policy: RetryPolicy,
}

impl<S, D> Teardown<S, D>
where
    S: ObjectStore,
    D: DeploymentTracker,
{
    /// Creates a [`Teardown`].
    pub const fn new(store: S, tracker: D, policy: RetryPolicy) -> Self {
        Self {
            store,
            tracker,
            policy,
        }
    }

    /// Runs the teardown of a target.
    ///
    /// 1. Counts the objects under the target location.
    /// 2. Deletes them, if any were found.
    /// 3. Marks every matching deployment inactive, then deletes it.
    ///
    /// Running it again once everything is gone changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails fatally or keeps failing transiently. Steps after it do not run.
    pub async fn run(&self, target: &TeardownTarget) -> anyhow::Result<TeardownReport> {
        info!("tearing down preview of pull request #{}…", target.pull_request);

        let objects_found = check_existence(&self.store, &target.location, self.policy)
            .await
            .with_context(|| format!("failed to check objects under {}", target.location))?;
        let objects_removed =
            remove_preview(&self.store, &target.location, objects_found, self.policy)
                .await
                .with_context(|| format!("failed to remove objects under {}", target.location))?;
        let deactivated =
            deactivate_deployments(&self.tracker, &target.environment, &target.task, self.policy)
                .await
                .with_context(|| {
                    format!(
                        "failed to deactivate deployments of {} in {}",
                        target.task, target.environment
                    )
                })?;

        let report = TeardownReport {
            pull_request: target.pull_request,
            objects_found,
            objects_removed,
            deactivated,
        };
        info!("tore down {report}");
        Ok(report)
    }
}
