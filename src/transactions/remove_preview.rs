use tracing::info;

use crate::{
    framework::{RetryPolicy, StateResult, run_transaction},
    storage::{ObjectStore, StorageLocation},
};

/// Deletes every object under a location, unless the existence check found none.
///
/// Returns how many objects were deleted. The store is not called at all when `found` is zero.
///
/// # Errors
///
/// Returns an error that cancels the run if deleting keeps failing.
pub async fn remove_preview<S>(
    store: &S,
    location: &StorageLocation,
    found: usize,
    policy: RetryPolicy,
) -> StateResult<usize>
where
    S: ObjectStore + ?Sized,
{
    if found == 0 {
        info!("nothing deployed under {location}, skipping removal");
        return Ok(0);
    }

    run_transaction(&format!("remove {location}"), policy, || {
        store.delete_objects(location)
    })
    .await
}
