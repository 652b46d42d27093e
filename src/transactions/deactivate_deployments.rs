use tracing::info;

use crate::{
    deployments::{DeploymentState, DeploymentTracker},
    framework::{RetryPolicy, StateResult, run_transaction},
};

/// Marks every deployment of a task in an environment inactive, then deletes it.
///
/// Each deployment gets its status before it is deleted. Stops at the first deployment that cannot be
/// deactivated or deleted; the ones before it stay deleted. Returns the ids of deleted deployments.
///
/// # Errors
///
/// Returns an error that cancels the run if any request keeps failing.
pub async fn deactivate_deployments<D>(
    tracker: &D,
    environment: &str,
    task: &str,
    policy: RetryPolicy,
) -> StateResult<Vec<u64>>
where
    D: DeploymentTracker + ?Sized,
{
    let deployments = run_transaction(&format!("list {task} in {environment}"), policy, || {
        tracker.list_deployments(environment, task)
    })
    .await?;

    let mut deactivated = Vec::with_capacity(deployments.len());
    for deployment in &deployments {
        let id = deployment.id;
        info!("deactivating deployment {deployment}…");

        run_transaction(&format!("deactivate deployment {id}"), policy, || {
            tracker.create_status(id, DeploymentState::Inactive)
        })
        .await?;
        run_transaction(&format!("delete deployment {id}"), policy, || {
            tracker.delete_deployment(id)
        })
        .await?;

        deactivated.push(id);
    }

    Ok(deactivated)
}
