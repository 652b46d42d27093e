//! Tears down the preview website of the pull request closed by the triggering event.

use std::process::ExitCode;

use anyhow::Context as _;
use preview_teardown::{
    deployments::GitHubDeployments,
    env::Settings,
    event::resolve_pull_request,
    framework::RetryPolicy,
    storage::S3Store,
    teardown::{Teardown, TeardownTarget},
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("teardown failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("failed to load settings")?;
    let Some(pull_request) = resolve_pull_request(&settings).await? else {
        return Ok(());
    };

    let target = TeardownTarget::new(&settings, pull_request);
    info!(
        "tearing down {} and {} in {} of {}",
        target.location, target.task, target.environment, settings.repository
    );

    let teardown = Teardown::new(
        S3Store::from_env().await,
        GitHubDeployments::from_settings(&settings),
        RetryPolicy::from_env(),
    );
    teardown.run(&target).await?;
    Ok(())
}
