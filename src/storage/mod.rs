//! Object storage holding preview builds.

#![cfg(feature = "storage")]

use std::fmt::{self, Display};

use async_trait::async_trait;

use crate::framework::StateResult;

#[cfg(test)]
pub(crate) mod memory;
mod s3;

pub use s3::*;

/// A group of objects in a bucket sharing a key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocation {
    /// The bucket holding the objects.
    pub bucket: String,
    /// The key prefix shared by the objects. Ends with `/` unless empty.
    pub prefix: String,
}

impl StorageLocation {
    /// Locates the preview build of a pull request: `{build_dir}/{pull_request}/`.
    ///
    /// The trailing slash keeps the location of pull request 4 from covering pull request 42.
    pub fn for_pull_request(bucket: &str, build_dir: &str, pull_request: u64) -> Self {
        let prefix = match build_dir.trim_matches('/') {
            "" => format!("{pull_request}/"),
            build_dir => format!("{build_dir}/{pull_request}/"),
        };

        Self {
            bucket: bucket.to_owned(),
            prefix,
        }
    }

    /// Checks if a key lies under this location.
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

impl Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Lists and deletes objects by prefix.
///
/// Both operations must treat an empty location as a normal outcome rather than an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Counts the objects under a location.
    ///
    /// # Errors
    ///
    /// Returns an error that instructs retrying or cancelling if listing fails.
    async fn count_objects(&self, location: &StorageLocation) -> StateResult<usize>;

    /// Deletes every object under a location, returning how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns an error that instructs retrying or cancelling if listing or deleting fails.
    async fn delete_objects(&self, location: &StorageLocation) -> StateResult<usize>;
}
