//! MLCast provenance attributes (section 5.4).

use std::future::Future;

use async_trait::async_trait;
use mlcast_common::{parse_iso8601, AttributesExt, Dataset};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::{Check, CheckContext};
use crate::error::{Result, ValidatorError};
use crate::oracle::{Lookup, OracleError};
use crate::report::{Report, Status};

const SECTION: &str = "5.4";
const GITHUB_PREFIX: &str = "https://github.com/";
const EXPECTED_GITHUB_ORG: &str = "mlcast-community";
const REPO_PREFIX: &str = "mlcast-dataset-";
const REPOSITORY: &str = "Creator software GitHub repository";
const REVISION: &str = "Creator software GitHub revision";

/// PEP 440 public and local versions, which covers semver and calver.
const VERSION_PATTERN: &str = r"(?ix)^\s*
    v?
    (?:(?:[0-9]+)!)?
    [0-9]+(?:\.[0-9]+)*
    (?:[-_.]?(?:a|b|c|rc|alpha|beta|pre|preview)[-_.]?[0-9]*)?
    (?:-[0-9]+|[-_.]?(?:post|rev|r)[-_.]?[0-9]*)?
    (?:[-_.]?dev[-_.]?[0-9]*)?
    (?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?
    \s*$";

/// Why a provenance attribute value is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvenanceError {
    #[error("Does not match {0}")]
    Pattern(&'static str),

    #[error("Missing name")]
    MissingName,

    #[error("Missing or invalid email")]
    InvalidEmail,

    #[error("Email contains whitespace")]
    EmailWhitespace,

    #[error("Missing org, repo, or version")]
    MissingUrlPart,

    #[error("Contains whitespace in org/repo/version")]
    UrlWhitespace,

    #[error("GitHub organisation must be 'mlcast-community'")]
    Organisation,

    #[error("Repository must follow 'mlcast-dataset-{{organisation_id}}-{{dataset_name}}'")]
    RepositoryName,

    #[error("Country code must be 2 uppercase letters")]
    CountryLength,

    #[error("Country code must use uppercase alphabetic characters")]
    CountryCase,

    #[error("Missing institution identifier")]
    MissingInstitution,

    #[error("Institution identifier cannot start/end with '-' or '_'")]
    InstitutionEdge,

    #[error("Institution identifier contains invalid characters")]
    InstitutionCharacters,

    #[error("Invalid version: '{0}'")]
    Version(String),
}

/// `Name <email>` contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    pub email: String,
}

pub fn parse_created_by(value: &str) -> std::result::Result<Creator, ProvenanceError> {
    let (name, rest) = value
        .trim()
        .split_once(" <")
        .ok_or(ProvenanceError::Pattern("'Name <email>'"))?;
    let email = rest
        .strip_suffix('>')
        .ok_or(ProvenanceError::Pattern("'Name <email>'"))?;
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() {
        return Err(ProvenanceError::MissingName);
    }
    if !email.contains('@') {
        return Err(ProvenanceError::InvalidEmail);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ProvenanceError::EmailWhitespace);
    }
    Ok(Creator {
        name: name.to_string(),
        email: email.to_string(),
    })
}

/// Software reference `https://github.com/<org>/<repo>@<version>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareRef {
    pub org: String,
    pub repo: String,
    pub version: String,
}

pub fn parse_created_with(value: &str) -> std::result::Result<SoftwareRef, ProvenanceError> {
    const PATTERN: ProvenanceError = ProvenanceError::Pattern("https://github.com/{org}/{repo}@{version}");

    let path = value.trim().strip_prefix(GITHUB_PREFIX).ok_or(PATTERN)?;
    let (org, rest) = path.split_once('/').ok_or(PATTERN)?;
    let (repo, version) = rest.split_once('@').ok_or(PATTERN)?;
    let parts = [org.trim(), repo.trim(), version.trim()];
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ProvenanceError::MissingUrlPart);
    }
    if parts.iter().any(|p| p.chars().any(char::is_whitespace)) {
        return Err(ProvenanceError::UrlWhitespace);
    }
    let [org, repo, version] = parts;
    if org != EXPECTED_GITHUB_ORG {
        return Err(ProvenanceError::Organisation);
    }
    let valid_repo = repo
        .strip_prefix(REPO_PREFIX)
        .and_then(|r| r.split_once('-'))
        .is_some_and(|(org_id, name)| !org_id.is_empty() && !name.is_empty());
    if !valid_repo {
        return Err(ProvenanceError::RepositoryName);
    }
    Ok(SoftwareRef {
        org: org.to_string(),
        repo: repo.to_string(),
        version: version.to_string(),
    })
}

/// `<ISO-country-code>-<institution-identifier>`, e.g. `DK-DMI`.
pub fn parse_source_org_id(value: &str) -> std::result::Result<(String, String), ProvenanceError> {
    let (country, institution) = value
        .trim()
        .split_once('-')
        .filter(|(c, i)| !c.is_empty() && !i.is_empty())
        .ok_or(ProvenanceError::Pattern("'<ISO-country-code>-<institution-identifier>'"))?;
    if country.chars().count() != 2 {
        return Err(ProvenanceError::CountryLength);
    }
    if !country.chars().all(|c| c.is_alphabetic() && c.is_uppercase()) {
        return Err(ProvenanceError::CountryCase);
    }
    let institution = institution.trim();
    if institution.is_empty() {
        return Err(ProvenanceError::MissingInstitution);
    }
    if institution.starts_with(['-', '_']) || institution.ends_with(['-', '_']) {
        return Err(ProvenanceError::InstitutionEdge);
    }
    if !institution.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ProvenanceError::InstitutionCharacters);
    }
    Ok((country.to_string(), institution.to_string()))
}

/// Await an oracle lookup, bounded by the context timeout.
async fn bounded<T>(ctx: &CheckContext, lookup: impl Future<Output = Lookup<T>>) -> Lookup<T> {
    tokio::time::timeout(ctx.oracle_timeout, lookup)
        .await
        .unwrap_or(Lookup::Unavailable(OracleError::Timeout(ctx.oracle_timeout)))
}

fn unavailable_detail(subject: &str, error: &OracleError) -> String {
    match error {
        OracleError::Network(e) => format!("Could not verify {subject} due to network error: {e}"),
        OracleError::UnexpectedResponse(e) => {
            format!("GitHub {subject} check returned unexpected response: {e}")
        }
        OracleError::Timeout(after) => format!("Could not verify {subject}: lookup timed out after {after:?}"),
    }
}

pub struct MlcastMetadataCheck {
    version: Regex,
}

impl MlcastMetadataCheck {
    pub fn new() -> Result<Self> {
        let version = Regex::new(VERSION_PATTERN)
            .map_err(|e| ValidatorError::catalog(format!("invalid version pattern: {e}")))?;
        Ok(Self { version })
    }

    fn created_on(&self, dataset: &Dataset, report: &mut Report) {
        let requirement = "Global attribute 'mlcast_created_on'";
        match dataset.attrs.text("mlcast_created_on") {
            None => report.add(
                SECTION,
                requirement,
                Status::Fail,
                "Missing required creation timestamp in ISO 8601 format",
            ),
            Some(value) => match parse_iso8601(&value) {
                Ok(dt) => report.add(
                    SECTION,
                    requirement,
                    Status::Pass,
                    format!("Creation timestamp parsed ({})", dt.to_rfc3339()),
                ),
                Err(e) => report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!("Value '{value}' is not a valid ISO 8601 datetime string: {e}"),
                ),
            },
        }
    }

    fn created_by(&self, dataset: &Dataset, report: &mut Report) {
        let requirement = "Global attribute 'mlcast_created_by'";
        match dataset.attrs.text("mlcast_created_by") {
            None => report.add(
                SECTION,
                requirement,
                Status::Fail,
                "Missing required creator contact in 'Name <email>' format",
            ),
            Some(value) => match parse_created_by(&value) {
                Ok(c) => report.add(
                    SECTION,
                    requirement,
                    Status::Pass,
                    format!("Creator contact present ({} <{}>)", c.name, c.email),
                ),
                Err(e) => report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!("Creator contact '{value}' is not in 'Name <email>' format: {e}"),
                ),
            },
        }
    }

    async fn created_with(&self, dataset: &Dataset, ctx: &CheckContext, report: &mut Report) {
        let requirement = "Global attribute 'mlcast_created_with'";
        let Some(value) = dataset.attrs.text("mlcast_created_with") else {
            report.add(
                SECTION,
                requirement,
                Status::Fail,
                "Missing required creator software GitHub URL with version (e.g. https://github.com/org/repo@v0.1.0)",
            );
            return;
        };
        let software = match parse_created_with(&value) {
            Ok(software) => software,
            Err(e) => {
                report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!("Value '{value}' is not a GitHub URL with an @version suffix: {e}"),
                );
                return;
            }
        };
        report.add(
            SECTION,
            requirement,
            Status::Pass,
            format!(
                "Creator software GitHub URL parsed ({}/{}@{})",
                software.org, software.repo, software.version
            ),
        );

        match bounded(ctx, ctx.oracle.repository(&software.org, &software.repo)).await {
            Lookup::Found(()) => {
                report.add(SECTION, REPOSITORY, Status::Pass, "Repository exists on GitHub");
            }
            Lookup::NotFound => {
                report.add(SECTION, REPOSITORY, Status::Warning, "Repository not found on GitHub");
                return;
            }
            Lookup::Unavailable(e) => {
                debug!(error = %e, "Repository lookup unavailable");
                report.add(SECTION, REPOSITORY, Status::Warning, unavailable_detail("repository", &e));
                return;
            }
        }

        let revision = ctx
            .oracle
            .revision(&software.org, &software.repo, &software.version);
        match bounded(ctx, revision).await {
            Lookup::Found(path) => {
                report.add(SECTION, REVISION, Status::Pass, format!("Revision found at {path}"));
            }
            Lookup::NotFound => report.add(
                SECTION,
                REVISION,
                Status::Fail,
                "Revision not found as tag, branch, or commit",
            ),
            Lookup::Unavailable(e) => {
                debug!(error = %e, "Revision lookup unavailable");
                report.add(SECTION, REVISION, Status::Warning, unavailable_detail("revision", &e));
            }
        }
    }

    fn dataset_version(&self, dataset: &Dataset, report: &mut Report) {
        let requirement = "Global attribute 'mlcast_dataset_version'";
        let Some(value) = dataset.attrs.text("mlcast_dataset_version") else {
            report.add(
                SECTION,
                requirement,
                Status::Fail,
                "Missing required dataset specification version (semver or calver)",
            );
            return;
        };
        if self.version.is_match(&value) {
            report.add(
                SECTION,
                requirement,
                Status::Pass,
                format!("Dataset specification version parsed ({})", value.trim()),
            );
        } else {
            let e = ProvenanceError::Version(value.trim().to_string());
            report.add(
                SECTION,
                requirement,
                Status::Fail,
                format!("Version '{value}' is not valid semver or calver: {e}"),
            );
        }
    }

    fn source_org_id(&self, dataset: &Dataset, report: &mut Report) {
        let requirement = "Global attribute 'mlcast_source_org_id'";
        match dataset.attrs.text("mlcast_source_org_id") {
            None => report.add(
                SECTION,
                requirement,
                Status::Fail,
                "Missing required source organisation identifier '<ISO-country-code>-<institution-identifier>'",
            ),
            Some(value) => match parse_source_org_id(&value) {
                Ok((country, institution)) => report.add(
                    SECTION,
                    requirement,
                    Status::Pass,
                    format!("Source organisation identifier present with expected pattern ({country}-{institution})"),
                ),
                Err(e) => report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!(
                        "Identifier '{value}' does not match '<ISO-country-code>-<institution-identifier>': {e}"
                    ),
                ),
            },
        }
    }
}

#[async_trait]
impl Check for MlcastMetadataCheck {
    fn id(&self) -> &str {
        "mlcast_metadata"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        "MLCast provenance attributes (created_on, created_by, created_with, dataset_version, source_org_id)"
            .to_string()
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        self.created_on(dataset, &mut report);
        self.created_by(dataset, &mut report);
        self.created_with(dataset, ctx, &mut report).await;
        self.dataset_version(dataset, &mut report);
        self.source_org_id(dataset, &mut report);
        report
    }
}
