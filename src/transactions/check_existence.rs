use crate::{
    framework::{RetryPolicy, StateResult, run_transaction},
    storage::{ObjectStore, StorageLocation},
};

/// Counts the objects a preview build left under a location.
///
/// # Errors
///
/// Returns an error that cancels the run if listing keeps failing.
pub async fn check_existence<S>(
    store: &S,
    location: &StorageLocation,
    policy: RetryPolicy,
) -> StateResult<usize>
where
    S: ObjectStore + ?Sized,
{
    run_transaction(&format!("check {location}"), policy, || {
        store.count_objects(location)
    })
    .await
}
