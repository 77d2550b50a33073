//! Requirement checks.
//!
//! Every check is a value implementing [`Check`]: its configuration is bound
//! at construction, the dataset and the collaborators (capabilities,
//! repository oracle, timestep cache) are passed to `evaluate`. A check never
//! returns an error for dataset content; problems become findings.

mod cartopy;
mod chunking;
mod compression;
mod conditional;
mod coordinates;
mod data_structure;
mod future;
mod gdal;
mod georeferencing;
mod licensing;
mod metadata;
mod naming;
mod raster;
mod spatial;
mod temporal;
mod variable_timestep;
mod zarr_format;

pub use cartopy::CartopyCheck;
pub use chunking::ChunkingCheck;
pub use compression::CompressionCheck;
pub use conditional::{ConditionalAttributesCheck, Trigger, TriggerFn, TriggerRegistry};
pub use coordinates::{CoordinateRequirements, CoordinatesCheck};
pub use data_structure::DataStructureCheck;
pub use future::FutureTimestepCheck;
pub use gdal::GdalCheck;
pub use georeferencing::GeoreferencingCheck;
pub use licensing::LicensingCheck;
pub use metadata::{MlcastMetadataCheck, ProvenanceError};
pub use naming::NamingCheck;
pub use raster::RasterRoundTripCheck;
pub use spatial::SpatialCheck;
pub use temporal::TemporalCheck;
pub use variable_timestep::VariableTimestepCheck;
pub use zarr_format::ZarrFormatCheck;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mlcast_common::{Dataset, Variable};

use crate::capabilities::Capabilities;
use crate::error::{Result, ValidatorError};
use crate::oracle::RepositoryOracle;
use crate::report::Report;
use crate::rules::RuleCatalog;
use crate::timestep::TimestepAnalyzer;

/// A single requirement evaluator.
#[async_trait]
pub trait Check: Send + Sync {
    /// Stable identifier, stamped on every finding this check produces.
    fn id(&self) -> &str;

    /// Section of the published specification this check implements.
    fn section(&self) -> &str;

    /// Requirement text, for listings.
    fn describe(&self) -> String;

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report;
}

/// Collaborators shared by all checks of a run.
#[derive(Clone)]
pub struct CheckContext {
    pub capabilities: Capabilities,
    pub oracle: Arc<dyn RepositoryOracle>,
    pub timesteps: Arc<TimestepAnalyzer>,
    /// Reference instant for "future" comparisons.
    pub now: DateTime<Utc>,
    /// Upper bound on a single oracle lookup.
    pub oracle_timeout: Duration,
}

impl CheckContext {
    pub fn new(capabilities: Capabilities, oracle: Arc<dyn RepositoryOracle>) -> Self {
        Self {
            capabilities,
            oracle,
            timesteps: Arc::new(TimestepAnalyzer::new()),
            now: Utc::now(),
            oracle_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn with_timestep_analyzer(mut self, analyzer: Arc<TimestepAnalyzer>) -> Self {
        self.timesteps = analyzer;
        self
    }
}

/// A check that reports nothing. Stands in for real checks in tests and
/// requirement listings.
#[derive(Debug, Clone)]
pub struct NoopCheck {
    id: String,
    section: String,
}

impl NoopCheck {
    pub fn new(id: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            section: section.into(),
        }
    }
}

#[async_trait]
impl Check for NoopCheck {
    fn id(&self) -> &str {
        &self.id
    }

    fn section(&self) -> &str {
        &self.section
    }

    fn describe(&self) -> String {
        "No-op placeholder".to_string()
    }

    async fn evaluate(&self, _dataset: &Dataset, _ctx: &CheckContext) -> Report {
        Report::new()
    }
}

/// Fail fast if `catalog` lacks any of `categories`.
pub(crate) fn require_categories(catalog: &RuleCatalog, categories: &[&str]) -> Result<()> {
    let missing: Vec<&str> = categories
        .iter()
        .copied()
        .filter(|c| catalog.rule(c).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidatorError::catalog(format!(
            "rule catalog has no rule for: {}",
            missing.join(", ")
        )))
    }
}

/// The first 1-D coordinate matching the `time` rule, whatever its name.
pub(crate) fn time_coordinate(dataset: &Dataset) -> Option<&Variable> {
    RuleCatalog::coordinates()
        .find_matches(dataset.coords(), "time")
        .ok()?
        .iter()
        .filter_map(|name| dataset.coord(name))
        .find(|v| v.dims.len() == 1)
}

/// Render names the way the report quotes them: `['a', 'b']`.
pub(crate) fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    let inner: Vec<String> = items.iter().map(|s| format!("'{}'", s.as_ref())).collect();
    format!("[{}]", inner.join(", "))
}

/// First qualifying data variable with at least two dimensions and a
/// `grid_mapping` attribute.
pub(crate) fn select_georeferenced_variable(dataset: &Dataset) -> Option<&Variable> {
    dataset
        .qualifying_data_vars()
        .into_iter()
        .find(|v| v.dims.len() >= 2 && v.attrs.contains_key("grid_mapping"))
}

/// The CRS variable and its `crs_wkt`, or the finding explaining why not.
pub(crate) enum CrsLookup<'a> {
    Found { grid_mapping: &'a str, wkt: &'a str },
    NoVariable,
    InvalidGridMapping(&'a str),
    MissingWkt(&'a str),
}

pub(crate) fn lookup_crs(dataset: &Dataset) -> CrsLookup<'_> {
    let Some(var) = select_georeferenced_variable(dataset) else {
        return CrsLookup::NoVariable;
    };
    let Some(grid_mapping) = var
        .grid_mapping()
        .filter(|gm| !gm.is_empty() && dataset.variable(gm).is_some())
    else {
        return CrsLookup::InvalidGridMapping(&var.name);
    };
    let wkt = dataset
        .variable(grid_mapping)
        .and_then(|crs| crs.attrs.get("crs_wkt"))
        .and_then(|w| w.as_str())
        .filter(|w| !w.trim().is_empty());
    match wkt {
        Some(wkt) => CrsLookup::Found { grid_mapping, wkt },
        None => CrsLookup::MissingWkt(grid_mapping),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(&["a", "b"]), "['a', 'b']");
        assert_eq!(quoted_list::<&str>(&[]), "[]");
    }

    #[test]
    fn test_require_categories() {
        assert!(require_categories(RuleCatalog::coordinates(), &["lat", "time"]).is_ok());
        let err = require_categories(RuleCatalog::coordinates(), &["lat", "height"]).unwrap_err();
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn test_time_coordinate_follows_the_rule() {
        use mlcast_common::VariableRole;
        use serde_json::json;

        let mut valid_time = Variable::new("valid_time", VariableRole::Coordinate);
        valid_time.dims = vec!["valid_time".into()];
        valid_time.attrs.insert("standard_name".into(), json!("time"));
        let mut ds = Dataset::new("mem://");
        ds.upsert(valid_time);
        assert_eq!(time_coordinate(&ds).map(|v| v.name.as_str()), Some("valid_time"));

        let mut scalar = Variable::new("time", VariableRole::Coordinate);
        scalar.attrs.insert("standard_name".into(), json!("time"));
        let mut ds = Dataset::new("mem://");
        ds.upsert(scalar);
        assert!(time_coordinate(&ds).is_none());
    }

    #[test]
    fn test_noop_check_reports_nothing() {
        let check = NoopCheck::new("noop", "0");
        let ctx = CheckContext::new(
            Capabilities::none(),
            Arc::new(crate::oracle::StaticRepositoryOracle::new()),
        );
        let report = tokio_test::block_on(check.evaluate(&Dataset::new("mem://"), &ctx));
        assert!(report.is_empty());
        assert_eq!(check.id(), "noop");
    }
}
