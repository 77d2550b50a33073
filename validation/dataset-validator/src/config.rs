//! Runtime configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional YAML file,
//! environment variables, command-line flags. Requirement constants are not
//! configurable here; they belong to the published product specifications.

use std::path::Path;
use std::time::Duration;

use compliance::oracle::DEFAULT_GITHUB_API;
use serde::{Deserialize, Serialize};
use zarr_loader::{LoaderConfig, S3Options};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub s3: S3Options,
    /// Upper bound on a single check; unbounded when absent.
    pub check_timeout_secs: Option<u64>,
    /// HTTP timeout of repository lookups.
    pub oracle_timeout_secs: u64,
    pub github_api: String,
    /// Run checks concurrently.
    pub concurrent: bool,
    /// Longest coordinate whose values are read.
    pub max_coord_values: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            s3: S3Options::default(),
            check_timeout_secs: None,
            oracle_timeout_secs: 5,
            github_api: DEFAULT_GITHUB_API.to_string(),
            concurrent: false,
            max_coord_values: LoaderConfig::default().max_coord_values,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RuntimeConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`, which maps variable names to values.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let parse_bool = |v: String| v.to_lowercase() == "true" || v == "1";

        if let Some(endpoint) = lookup("S3_ENDPOINT") {
            self.s3.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("S3_ACCESS_KEY") {
            self.s3.access_key_id = Some(key);
        }
        if let Some(secret) = lookup("S3_SECRET_KEY") {
            self.s3.secret_access_key = Some(secret);
        }
        if let Some(region) = lookup("S3_REGION") {
            self.s3.region = Some(region);
        }
        if let Some(anon) = lookup("S3_ANON") {
            self.s3.anonymous = parse_bool(anon);
        }
        if let Some(secs) = lookup("MLCAST_CHECK_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.check_timeout_secs = Some(secs);
        }
        if let Some(api) = lookup("MLCAST_GITHUB_API") {
            self.github_api = api;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.check_timeout_secs == Some(0) {
            anyhow::bail!("check_timeout_secs must be > 0");
        }
        if self.oracle_timeout_secs == 0 {
            anyhow::bail!("oracle_timeout_secs must be > 0");
        }
        if self.github_api.trim().is_empty() {
            anyhow::bail!("github_api must not be empty");
        }
        Ok(())
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout_secs.map(Duration::from_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            max_coord_values: self.max_coord_values,
            s3: self.s3.clone(),
        }
    }
}
