use std::fmt::{self, Debug};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    deployments::{Deployment, DeploymentState, DeploymentTracker},
    env::{Repository, Settings},
    framework::{StateError, StateResult},
};

/// The page size used when listing deployments, which is also the maximum GitHub allows.
const PER_PAGE: usize = 100;

#[derive(Debug, Serialize)]
struct NewDeploymentStatus {
    state: DeploymentState,
    description: &'static str,
}

/// A [`DeploymentTracker`] backed by GitHub REST API.
#[derive(Clone)]
pub struct GitHubDeployments {
    client: reqwest::Client,
    api_url: String,
    repository: Repository,
    token: String,
}

impl Debug for GitHubDeployments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubDeployments")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl GitHubDeployments {
    /// Creates a [`GitHubDeployments`] for a repository.
    pub fn new(api_url: &str, repository: Repository, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            repository,
            token,
        }
    }

    /// Creates a [`GitHubDeployments`] from the loaded [`Settings`].
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.github_api_url,
            settings.repository.clone(),
            settings.github_token.clone(),
        )
    }

    /// Builds a request for GitHub REST API.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header(header::USER_AGENT, "preview-teardown/0.1")
    }

    fn deployments_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/deployments",
            self.api_url, self.repository.owner, self.repository.name
        )
    }

    async fn fetch_page(
        &self,
        url: &str,
        environment: &str,
        task: &str,
        page: usize,
    ) -> StateResult<Vec<Deployment>> {
        let per_page = PER_PAGE.to_string();
        let page = page.to_string();
        let request = self.request(Method::GET, url).query(&[
            ("environment", environment),
            ("task", task),
            ("per_page", per_page.as_str()),
            ("page", page.as_str()),
        ]);
        let response = check(send(request, url).await?, url).await?;

        response.json::<Vec<Deployment>>().await.map_err(|err| {
            error!("failed to parse data from {url}: {err}");
            StateError::retry(format!("failed to parse data from {url}: {err}"))
        })
    }
}

#[async_trait]
impl DeploymentTracker for GitHubDeployments {
    async fn list_deployments(&self, environment: &str, task: &str) -> StateResult<Vec<Deployment>> {
        let url = self.deployments_url();
        debug!("fetching deployments of {task} in {environment} from {url}…");

        let mut deployments = Vec::new();
        for page in 1.. {
            let fetched = self.fetch_page(&url, environment, task, page).await?;
            let last = fetched.len() < PER_PAGE;
            deployments.extend(fetched);
            if last {
                break;
            }
        }

        match deployments.len() {
            0 => info!("no deployments of {task} in {environment}"),
            1 => info!("fetched 1 deployment of {task} in {environment}"),
            count => info!("fetched {count} deployments of {task} in {environment}"),
        }
        Ok(deployments)
    }

    async fn create_status(&self, id: u64, state: DeploymentState) -> StateResult<()> {
        let url = format!("{}/{id}/statuses", self.deployments_url());
        debug!("marking deployment {id} {state}…");

        let request = self.request(Method::POST, &url).json(&NewDeploymentStatus {
            state,
            description: "Preview removed after the pull request was closed",
        });
        let response = send(request, &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("deployment {id} is already deleted, not marking it {state}");
            return Ok(());
        }
        check(response, &url).await?;

        info!("marked deployment {id} {state}");
        Ok(())
    }

    async fn delete_deployment(&self, id: u64) -> StateResult<()> {
        let url = format!("{}/{id}", self.deployments_url());
        debug!("deleting deployment {id}…");

        let response = send(self.request(Method::DELETE, &url), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("deployment {id} is already deleted");
            return Ok(());
        }
        check(response, &url).await?;

        info!("deleted deployment {id}");
        Ok(())
    }
}

async fn send(request: RequestBuilder, url: &str) -> StateResult<Response> {
    match request.send().await {
        Ok(response) => Ok(response),
        Err(err) => {
            error!("failed to request {url}: {err}");
            let reason = format!("failed to request {url}: {err}");
            if err.is_connect() || err.is_timeout() {
                Err(StateError::Retry(reason))
            } else {
                Err(StateError::Cancelled(reason))
            }
        }
    }
}

/// Passes successful responses through, retrying on throttling and server errors.
async fn check(response: Response, url: &str) -> StateResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    };
    let message = response.text().await.unwrap_or_default();
    let reason = match message.trim() {
        "" => format!("request to {url} failed: {reason}"),
        message => format!("request to {url} failed: {reason}: {message}"),
    };
    error!("{reason}");

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(StateError::Retry(reason)),
        status if status.is_server_error() => Err(StateError::Retry(reason)),
        _ => Err(StateError::Cancelled(reason)),
    }
}
