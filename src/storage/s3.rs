use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::http::HttpResponse,
    error::{DisplayErrorContext, SdkError},
    types::{Delete, ObjectIdentifier},
};
use tracing::{debug, error, info};

use crate::{
    framework::{StateError, StateResult},
    storage::{ObjectStore, StorageLocation},
};

/// The most keys a single `DeleteObjects` request accepts.
const MAX_KEYS_PER_DELETE: usize = 1000;

/// An [`ObjectStore`] backed by Amazon S3.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Creates an [`S3Store`] from a configured client.
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates an [`S3Store`] configured from the environment: region, credentials and endpoint as the AWS CLI would resolve them.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }

    async fn list_keys(&self, location: &StorageLocation) -> StateResult<Vec<String>> {
        debug!("listing objects under {location}…");

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&location.bucket)
            .prefix(&location.prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| state_error("list", location, err))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(ToOwned::to_owned),
            );
        }

        Ok(keys)
    }

    async fn delete_batch(&self, location: &StorageLocation, keys: &[String]) -> StateResult<usize> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(StateError::cancelled)?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(StateError::cancelled)?;

        let output = self
            .client
            .delete_objects()
            .bucket(&location.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| state_error("delete objects under", location, err))?;

        match output.errors() {
            [] => Ok(keys.len()),
            errors => {
                for err in errors {
                    error!(
                        "failed to delete s3://{}/{}: {} {}",
                        location.bucket,
                        err.key().unwrap_or_default(),
                        err.code().unwrap_or_default(),
                        err.message().unwrap_or_default()
                    );
                }
                Err(StateError::cancelled(format!(
                    "failed to delete {} of {} objects under {location}",
                    errors.len(),
                    keys.len()
                )))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn count_objects(&self, location: &StorageLocation) -> StateResult<usize> {
        let count = self.list_keys(location).await?.len();
        match count {
            1 => info!("found 1 object under {location}"),
            count => info!("found {count} objects under {location}"),
        }
        Ok(count)
    }

    async fn delete_objects(&self, location: &StorageLocation) -> StateResult<usize> {
        let keys = self.list_keys(location).await?;

        let mut deleted = 0;
        for batch in keys.chunks(MAX_KEYS_PER_DELETE) {
            debug!("deleting {} objects under {location}…", batch.len());
            deleted += self.delete_batch(location, batch).await?;
        }

        info!("deleted {deleted} objects under {location}");
        Ok(deleted)
    }
}

/// Wraps an SDK error, retrying on network failures, throttling and server errors.
fn state_error<E>(action: &str, location: &StorageLocation, err: SdkError<E, HttpResponse>) -> StateError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let reason = format!("failed to {action} {location}: {}", DisplayErrorContext(&err));
    error!("{reason}");

    let transient = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        _ => err.raw_response().is_some_and(|response| {
            let status = response.status().as_u16();
            status == 429 || (500..600).contains(&status)
        }),
    };

    if transient {
        StateError::Retry(reason)
    } else {
        StateError::Cancelled(reason)
    }
}
