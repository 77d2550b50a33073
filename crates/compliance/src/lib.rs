//! Compliance validation engine for MLCast datasets.
//!
//! The engine evaluates a read-only [`mlcast_common::Dataset`] against a
//! published product specification and produces an ordered [`Report`] of
//! PASS / WARNING / FAIL findings.
//!
//! Building blocks, leaf first:
//! - [`report`]: findings, reports and their merge semantics
//! - [`rules`] and [`cf`]: rule tables resolving partial CF metadata
//! - [`checks`]: one evaluator per requirement
//! - [`pipeline`] and [`catalog`]: versioned, ordered check compositions
//!
//! External abilities (WKT parsing, raster round trips, repository lookups)
//! are injected through [`capabilities`] and [`oracle`].

pub mod capabilities;
pub mod catalog;
pub mod cf;
pub mod checks;
pub mod error;
pub mod export;
pub mod license;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod specs;
pub mod timestep;

pub use capabilities::{Capabilities, Capability};
pub use catalog::{Catalog, CatalogEntry};
pub use checks::{Check, CheckContext, NoopCheck};
pub use error::{Result, ValidatorError};
pub use export::ExportDocument;
pub use oracle::{GithubRepositoryOracle, Lookup, OracleError, RepositoryOracle, StaticRepositoryOracle};
pub use pipeline::{Pipeline, RequirementListing};
pub use report::{Finding, Report, Status, Summary};
pub use rules::RuleCatalog;
pub use timestep::TimestepAnalyzer;
