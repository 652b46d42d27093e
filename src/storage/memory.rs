use std::collections::{BTreeSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    framework::{StateError, StateResult},
    storage::{ObjectStore, StorageLocation},
};

/// A call received by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreCall {
    Count(StorageLocation),
    Delete(StorageLocation),
}

/// An in-memory [`ObjectStore`] recording every call it receives.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeSet<(String, String)>>,
    calls: Mutex<Vec<StoreCall>>,
    failures: Mutex<VecDeque<StateError>>,
}

impl MemoryStore {
    pub(crate) fn with_objects<I>(bucket: &str, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let store = Self::default();
        store.put(bucket, keys);
        store
    }

    pub(crate) fn put<I>(&self, bucket: &str, keys: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.objects
            .lock()
            .extend(keys.into_iter().map(|key| (bucket.to_owned(), key.as_ref().to_owned())));
    }

    /// Fails the next calls with the given errors, in order.
    pub(crate) fn fail_with<I>(&self, errors: I)
    where
        I: IntoIterator<Item = StateError>,
    {
        self.failures.lock().extend(errors);
    }

    pub(crate) fn keys(&self) -> Vec<(String, String)> {
        self.objects.lock().iter().cloned().collect()
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    fn matching(&self, location: &StorageLocation) -> Vec<(String, String)> {
        self.objects
            .lock()
            .iter()
            .filter(|(bucket, key)| *bucket == location.bucket && location.contains(key))
            .cloned()
            .collect()
    }

    fn record(&self, call: StoreCall) -> StateResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn count_objects(&self, location: &StorageLocation) -> StateResult<usize> {
        self.record(StoreCall::Count(location.clone()))?;
        Ok(self.matching(location).len())
    }

    async fn delete_objects(&self, location: &StorageLocation) -> StateResult<usize> {
        self.record(StoreCall::Delete(location.clone()))?;
        let matching = self.matching(location);
        let mut objects = self.objects.lock();
        for object in &matching {
            objects.remove(object);
        }
        Ok(matching.len())
    }
}
