//! Loads a dataset and runs a pipeline over it.

use std::sync::Arc;

use compliance::{
    Capabilities, CheckContext, GithubRepositoryOracle, Pipeline, Report, RepositoryOracle, StaticRepositoryOracle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zarr_loader::DatasetLoader;

use crate::config::RuntimeConfig;

/// Repository oracle for a run. A client that cannot be built turns every
/// lookup into "unavailable", which checks report as warnings.
pub fn repository_oracle(config: &RuntimeConfig) -> Arc<dyn RepositoryOracle> {
    match GithubRepositoryOracle::new(&config.github_api, config.oracle_timeout()) {
        Ok(oracle) => Arc::new(oracle),
        Err(e) => {
            warn!(error = %e, "Repository lookups disabled");
            Arc::new(StaticRepositoryOracle::unreachable(e))
        }
    }
}

/// Open `location` and validate it. Load failures are returned as errors;
/// everything after loading ends up in the report.
pub async fn validate_location(
    location: &str,
    pipeline: &Pipeline,
    config: &RuntimeConfig,
    token: &CancellationToken,
) -> anyhow::Result<Report> {
    let dataset = DatasetLoader::new(config.loader_config()).open(location)?;
    for note in &dataset.load_notes {
        warn!(location, note = %note, "Load note");
    }

    let ctx = CheckContext::new(Capabilities::detect(), repository_oracle(config))
        .with_oracle_timeout(config.oracle_timeout());
    let pipeline = match config.check_timeout() {
        Some(timeout) => pipeline.clone().with_check_timeout(timeout),
        None => pipeline.clone(),
    };

    let report = if config.concurrent {
        pipeline.run_concurrent_until_cancelled(&dataset, &ctx, token).await
    } else {
        pipeline.run_until_cancelled(&dataset, &ctx, token).await
    };

    info!(
        pipeline = %pipeline.identity(),
        location,
        findings = report.len(),
        failed = report.summary().failed,
        "Validation finished"
    );
    Ok(report)
}
