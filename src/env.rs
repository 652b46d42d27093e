//! Defines the environment variables to use.

#![cfg(feature = "env")]

use std::{
    fmt::{self, Debug, Display},
    path::PathBuf,
    str::FromStr,
};

use anyhow::{Context as _, anyhow, bail};

/// Parses an environment variable from [`String`] to something else, wrapping any error in [`anyhow::Error`].
#[macro_export]
macro_rules! parse_env {
    ($key:expr => |$var:ident| $expr:expr) => {
        std::env::var($key)
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|$var| $expr)
    };
    ($key:expr => |$var:ident| $expr:expr; anyhow) => {
        parse_env!($key => |$var| $expr.map_err(|e| anyhow::anyhow!(e)))
    };
}

pub use parse_env;

/// The bucket holding preview builds.
pub const AWS_S3_BUCKET: &str = "AWS_S3_BUCKET";
/// The key prefix under which preview builds live.
pub const BUILD_DIR: &str = "BUILD_DIR";
/// The `owner/name` of the repository owning the deployments.
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
/// The GitHub token.
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// The base URL of GitHub REST API.
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
/// The path to the payload of the triggering event.
pub const GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";
/// The deployment environment previews are deployed to.
pub const PREVIEW_ENVIRONMENT: &str = "PREVIEW_ENVIRONMENT";
/// The prefix of the deployment task identifier, followed by the pull request number.
pub const PREVIEW_TASK_PREFIX: &str = "PREVIEW_TASK_PREFIX";
/// Overrides the pull request number read from the event payload.
pub const PR_NUMBER: &str = "PR_NUMBER";

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_ENVIRONMENT: &str = "preview";
const DEFAULT_TASK_PREFIX: &str = "deploy:pr-";

#[cfg(feature = "env_max_retries")]
crate::static_lazy_lock! {
    /// The maximum retry limit for transactions.
    pub MAX_RETRIES: u8 = parse_env!("MAX_RETRIES" => |s| s.parse::<u8>(); anyhow).unwrap_or(5);
}

/// A GitHub repository in the `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// The account owning the repository.
    pub owner: String,
    /// The name of the repository.
    pub name: String,
}

impl FromStr for Repository {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                })
            }
            _ => bail!("invalid repository {s:?}: expected owner/name"),
        }
    }
}

impl Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Everything a run reads from its environment.
///
/// AWS region and credentials are not part of it: those are resolved by `aws-config` on its own.
#[derive(Clone)]
pub struct Settings {
    /// The bucket holding preview builds.
    pub bucket: String,
    /// The key prefix under which preview builds live, without surrounding slashes.
    pub build_dir: String,
    /// The repository owning the deployments.
    pub repository: Repository,
    /// The token used against GitHub REST API.
    pub github_token: String,
    /// The base URL of GitHub REST API, without a trailing slash.
    pub github_api_url: String,
    /// The deployment environment previews are deployed to.
    pub environment: String,
    /// The prefix of the deployment task identifier.
    pub task_prefix: String,
    /// The pull request number, if given explicitly.
    pub pull_request: Option<u64>,
    /// The path to the payload of the triggering event, if any.
    pub event_path: Option<PathBuf>,
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bucket", &self.bucket)
            .field("build_dir", &self.build_dir)
            .field("repository", &self.repository)
            .field("github_token", &"<redacted>")
            .field("github_api_url", &self.github_api_url)
            .field("environment", &self.environment)
            .field("task_prefix", &self.task_prefix)
            .field("pull_request", &self.pull_request)
            .field("event_path", &self.event_path)
            .finish()
    }
}

impl Settings {
    /// Loads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a variable fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the settings through a lookup function. Blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a variable fails to parse.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} not set in environment"));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_owned());

        let repository = required(GITHUB_REPOSITORY)?
            .parse::<Repository>()
            .with_context(|| format!("failed to parse {GITHUB_REPOSITORY}"))?;
        let pull_request = get(PR_NUMBER)
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("failed to parse {PR_NUMBER} {value:?}"))
            })
            .transpose()?;

        Ok(Self {
            bucket: required(AWS_S3_BUCKET)?,
            build_dir: required(BUILD_DIR)?.trim_matches('/').to_owned(),
            repository,
            github_token: required(GITHUB_TOKEN)?,
            github_api_url: or_default(GITHUB_API_URL, DEFAULT_GITHUB_API_URL)
                .trim_end_matches('/')
                .to_owned(),
            environment: or_default(PREVIEW_ENVIRONMENT, DEFAULT_ENVIRONMENT),
            task_prefix: or_default(PREVIEW_TASK_PREFIX, DEFAULT_TASK_PREFIX),
            pull_request,
            event_path: get(GITHUB_EVENT_PATH).map(PathBuf::from),
        })
    }
}
