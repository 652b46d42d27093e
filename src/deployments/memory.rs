use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    deployments::{Deployment, DeploymentState, DeploymentTracker},
    framework::{StateError, StateResult},
};

/// A call received by a [`MemoryTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrackerCall {
    List { environment: String, task: String },
    CreateStatus { id: u64, state: DeploymentState },
    Delete { id: u64 },
}

#[derive(Debug)]
struct Record {
    deployment: Deployment,
    state: DeploymentState,
}

/// An in-memory [`DeploymentTracker`] recording every call it receives.
///
/// Like GitHub, it refuses to delete a deployment that is not inactive.
#[derive(Debug, Default)]
pub(crate) struct MemoryTracker {
    records: Mutex<Vec<Record>>,
    calls: Mutex<Vec<TrackerCall>>,
    failures: Mutex<VecDeque<StateError>>,
    broken: Mutex<HashSet<u64>>,
}

impl MemoryTracker {
    pub(crate) fn deploy(&self, id: u64, environment: &str, task: &str) {
        self.records.lock().push(Record {
            deployment: Deployment {
                id,
                environment: environment.to_owned(),
                task: task.to_owned(),
                git_ref: None,
                sha: None,
                created_at: None,
            },
            state: DeploymentState::Success,
        });
    }

    /// Fails the next calls with the given errors, in order.
    pub(crate) fn fail_with<I>(&self, errors: I)
    where
        I: IntoIterator<Item = StateError>,
    {
        self.failures.lock().extend(errors);
    }

    /// Fails every status update of a deployment fatally.
    pub(crate) fn break_deployment(&self, id: u64) {
        self.broken.lock().insert(id);
    }

    pub(crate) fn ids(&self) -> Vec<u64> {
        self.records
            .lock()
            .iter()
            .map(|record| record.deployment.id)
            .collect()
    }

    pub(crate) fn calls(&self) -> Vec<TrackerCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: TrackerCall) -> StateResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeploymentTracker for MemoryTracker {
    async fn list_deployments(&self, environment: &str, task: &str) -> StateResult<Vec<Deployment>> {
        self.record(TrackerCall::List {
            environment: environment.to_owned(),
            task: task.to_owned(),
        })?;
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|record| {
                record.deployment.environment == environment && record.deployment.task == task
            })
            .map(|record| record.deployment.clone())
            .collect())
    }

    async fn create_status(&self, id: u64, state: DeploymentState) -> StateResult<()> {
        self.record(TrackerCall::CreateStatus { id, state })?;
        if self.broken.lock().contains(&id) {
            return Err(StateError::cancelled(format!("deployment {id} is broken")));
        }
        match self
            .records
            .lock()
            .iter_mut()
            .find(|record| record.deployment.id == id)
        {
            Some(record) => {
                record.state = state;
                Ok(())
            }
            None => Err(StateError::cancelled(format!("deployment {id} not found"))),
        }
    }

    async fn delete_deployment(&self, id: u64) -> StateResult<()> {
        self.record(TrackerCall::Delete { id })?;
        let mut records = self.records.lock();
        match records.iter().position(|record| record.deployment.id == id) {
            Some(index) if records[index].state != DeploymentState::Inactive => Err(
                StateError::cancelled(format!("cannot delete active deployment {id}")),
            ),
            Some(index) => {
                records.remove(index);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
