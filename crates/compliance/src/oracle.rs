//! Repository and revision existence lookups.
//!
//! Lookups are tri-state: found, not found, or unavailable. Checks turn
//! "unavailable" into a warning, never a failure.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = "mlcast-dataset-validator";

/// Why a lookup could not give an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Outcome of an existence lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Unavailable(OracleError),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

impl<T: fmt::Display> fmt::Display for Lookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Found(v) => write!(f, "found ({v})"),
            Lookup::NotFound => f.write_str("not found"),
            Lookup::Unavailable(e) => write!(f, "unavailable ({e})"),
        }
    }
}

#[async_trait]
pub trait RepositoryOracle: Send + Sync {
    /// Does `org/repo` exist?
    async fn repository(&self, org: &str, repo: &str) -> Lookup<()>;

    /// Does `revision` exist in `org/repo` as a tag, branch or commit?
    /// Returns the API path it was found at.
    async fn revision(&self, org: &str, repo: &str, revision: &str) -> Lookup<String>;
}

/// Oracle backed by the GitHub REST API.
pub struct GithubRepositoryOracle {
    client: Client,
    api_base: String,
}

impl GithubRepositoryOracle {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, org: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}", self.api_base, org, repo)
    }

    async fn status(&self, url: &str) -> Result<StatusCode, OracleError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;
        debug!(url, status = %response.status(), "GitHub lookup");
        Ok(response.status())
    }
}

#[async_trait]
impl RepositoryOracle for GithubRepositoryOracle {
    #[instrument(skip(self))]
    async fn repository(&self, org: &str, repo: &str) -> Lookup<()> {
        match self.status(&self.repo_url(org, repo)).await {
            Ok(StatusCode::NOT_FOUND) => Lookup::NotFound,
            Ok(status) if status.is_success() => Lookup::Found(()),
            Ok(status) => Lookup::Unavailable(OracleError::UnexpectedResponse(format!(
                "GitHub repo check failed with status {}",
                status.as_u16()
            ))),
            Err(e) => Lookup::Unavailable(e),
        }
    }

    #[instrument(skip(self))]
    async fn revision(&self, org: &str, repo: &str, revision: &str) -> Lookup<String> {
        let base = self.repo_url(org, repo);
        for path in revision_paths(revision) {
            match self.status(&format!("{base}{path}")).await {
                Ok(StatusCode::NOT_FOUND) => continue,
                Ok(status) if status.is_success() => return Lookup::Found(path),
                Ok(status) => {
                    return Lookup::Unavailable(OracleError::UnexpectedResponse(format!(
                        "GitHub ref check failed with status {} for {}",
                        status.as_u16(),
                        path
                    )))
                }
                Err(e) => return Lookup::Unavailable(e),
            }
        }
        Lookup::NotFound
    }
}

/// API paths tried for a revision, in order: tag, branch, commit.
pub fn revision_paths(revision: &str) -> [String; 3] {
    [
        format!("/git/refs/tags/{revision}"),
        format!("/git/refs/heads/{revision}"),
        format!("/commits/{revision}"),
    ]
}

/// In-memory oracle with a fixed set of repositories and tags.
#[derive(Debug, Clone, Default)]
pub struct StaticRepositoryOracle {
    repositories: HashMap<(String, String), Vec<String>>,
    unavailable: Option<OracleError>,
}

impl StaticRepositoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `org/repo` with the given tags.
    pub fn with_repository(mut self, org: &str, repo: &str, tags: &[&str]) -> Self {
        self.repositories.insert(
            (org.to_string(), repo.to_string()),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// An oracle whose every lookup is unavailable.
    pub fn unreachable(error: OracleError) -> Self {
        Self {
            repositories: HashMap::new(),
            unavailable: Some(error),
        }
    }
}

#[async_trait]
impl RepositoryOracle for StaticRepositoryOracle {
    async fn repository(&self, org: &str, repo: &str) -> Lookup<()> {
        if let Some(e) = &self.unavailable {
            return Lookup::Unavailable(e.clone());
        }
        if self.repositories.contains_key(&(org.to_string(), repo.to_string())) {
            Lookup::Found(())
        } else {
            Lookup::NotFound
        }
    }

    async fn revision(&self, org: &str, repo: &str, revision: &str) -> Lookup<String> {
        if let Some(e) = &self.unavailable {
            return Lookup::Unavailable(e.clone());
        }
        match self.repositories.get(&(org.to_string(), repo.to_string())) {
            Some(tags) if tags.iter().any(|t| t == revision) => {
                let [tag_path, _, _] = revision_paths(revision);
                Lookup::Found(tag_path)
            }
            _ => Lookup::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_paths_order() {
        let paths = revision_paths("v1.0.0");
        assert_eq!(paths[0], "/git/refs/tags/v1.0.0");
        assert_eq!(paths[1], "/git/refs/heads/v1.0.0");
        assert_eq!(paths[2], "/commits/v1.0.0");
    }

    #[tokio::test]
    async fn test_static_oracle() {
        let oracle = StaticRepositoryOracle::new().with_repository("org", "repo", &["v1"]);
        assert_eq!(oracle.repository("org", "repo").await, Lookup::Found(()));
        assert_eq!(oracle.repository("org", "other").await, Lookup::NotFound);
        assert_eq!(
            oracle.revision("org", "repo", "v1").await,
            Lookup::Found("/git/refs/tags/v1".to_string())
        );
        assert_eq!(oracle.revision("org", "repo", "v2").await, Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_unreachable_oracle() {
        let oracle = StaticRepositoryOracle::unreachable(OracleError::Network("offline".into()));
        assert!(matches!(oracle.repository("a", "b").await, Lookup::Unavailable(_)));
        assert!(matches!(oracle.revision("a", "b", "c").await, Lookup::Unavailable(_)));
    }

    #[test]
    fn test_github_oracle_trims_base() {
        let oracle = GithubRepositoryOracle::new("https://api.github.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(oracle.repo_url("o", "r"), "https://api.github.com/repos/o/r");
    }
}
