//! End-to-end pipeline tests against in-memory datasets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use compliance::checks::{Check, CheckContext, ConditionalAttributesCheck, TriggerRegistry};
use compliance::{
    Capabilities, Catalog, Pipeline, Report, StaticRepositoryOracle, Status, TimestepAnalyzer, ValidatorError,
};
use mlcast_common::Dataset;
use test_utils::{compliant_radar_dataset, provenance, regular_minutes, time_coordinate, DatasetBuilder};
use tokio_util::sync::CancellationToken;

fn context() -> CheckContext {
    let (org, repo) = provenance::REPOSITORY;
    let oracle = StaticRepositoryOracle::new().with_repository(org, repo, &[provenance::REVISION]);
    CheckContext::new(Capabilities::detect(), Arc::new(oracle))
        .with_now(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
}

fn default_pipeline() -> Pipeline {
    Catalog::standard()
        .resolve("source_data", "radar_precipitation", None)
        .unwrap()
}

// ============================================================================
// Published scenarios
// ============================================================================

#[tokio::test]
async fn test_missing_license_is_the_only_failure() {
    let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
        .without_attr("license")
        .build();
    let report = default_pipeline().run(&ds, &context()).await;

    let fails: Vec<_> = report.iter().filter(|f| f.status == Status::Fail).collect();
    assert_eq!(fails.len(), 1, "{fails:#?}");
    assert_eq!(fails[0].requirement, "License metadata");
    assert_eq!(fails[0].source_check.as_deref(), Some("licensing"));
    assert!(report.has_fails());
}

#[tokio::test]
async fn test_compliant_dataset_has_no_failures() {
    let report = default_pipeline().run(&compliant_radar_dataset(), &context()).await;
    let fails: Vec<_> = report.iter().filter(|f| f.status == Status::Fail).collect();
    assert!(fails.is_empty(), "{fails:#?}");
    assert!(report.ok());
    assert!(!report.interrupted());
}

#[tokio::test]
async fn test_older_version_also_passes() {
    let pipeline = Catalog::standard()
        .resolve("source_data", "radar_precipitation", Some("0.1.0"))
        .unwrap();
    let report = pipeline.run(&compliant_radar_dataset(), &context()).await;
    assert!(report.ok());
    assert!(report.iter().all(|f| f.source_check.as_deref() != Some("mlcast_metadata")));
}

#[tokio::test]
async fn test_summary_line() {
    let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
        .without_attr("license")
        .build();
    let report = default_pipeline().run(&ds, &context()).await;
    let summary = report.summary();
    assert_eq!(
        report.summarize(),
        format!(
            "Summary: 1 fail(s), {} warning(s), {} pass(es).",
            summary.warnings, summary.passed
        )
    );
}

// ============================================================================
// Ordering and provenance
// ============================================================================

#[tokio::test]
async fn test_concurrent_run_matches_sequential() {
    let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
        .without_attr("mlcast_source_org_id")
        .without_var_attr("rr", "units")
        .build();
    let pipeline = default_pipeline();
    let ctx = context();

    let sequential = pipeline.run(&ds, &ctx).await;
    let concurrent = pipeline.run_concurrent(&ds, &ctx).await;
    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn test_every_finding_is_stamped() {
    let pipeline = default_pipeline();
    let ids = pipeline.check_ids();
    let report = pipeline.run(&compliant_radar_dataset(), &context()).await;

    assert!(!report.is_empty());
    for finding in &report {
        let source = finding.source_check.as_deref().unwrap();
        assert!(ids.contains(&source), "unknown source {source}");
    }

    // Sources appear in pipeline order.
    let positions: Vec<usize> = report
        .iter()
        .filter_map(|f| ids.iter().position(|id| Some(*id) == f.source_check.as_deref()))
        .collect();
    assert_eq!(positions.len(), report.len());
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));
}

// ============================================================================
// Cancellation
// ============================================================================

/// Emits one finding and counts its evaluations; optionally cancels the run.
struct Marker {
    id: &'static str,
    runs: Arc<AtomicUsize>,
    cancel: Option<CancellationToken>,
}

#[async_trait]
impl Check for Marker {
    fn id(&self) -> &str {
        self.id
    }

    fn section(&self) -> &str {
        "0"
    }

    fn describe(&self) -> String {
        format!("Marker {}", self.id)
    }

    async fn evaluate(&self, _dataset: &Dataset, _ctx: &CheckContext) -> Report {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        let mut report = Report::new();
        report.add("0", self.id, Status::Pass, "");
        report
    }
}

#[tokio::test]
async fn test_cancellation_keeps_partial_report() {
    let token = CancellationToken::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let marker = |id, cancel| Marker {
        id,
        runs: runs.clone(),
        cancel,
    };
    let pipeline = Pipeline::new("test", "marker", "1")
        .with_check(marker("first", None))
        .with_check(marker("second", Some(token.clone())))
        .with_check(marker("third", None))
        .with_check(marker("fourth", None));

    let report = pipeline
        .run_until_cancelled(&Dataset::new("mem://"), &context(), &token)
        .await;

    let sources: Vec<_> = report.iter().filter_map(|f| f.source_check.clone()).collect();
    assert_eq!(sources, vec!["first", "second"]);
    assert!(report.interrupted());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_uncancelled_run_completes() {
    let token = CancellationToken::new();
    let pipeline = default_pipeline();
    let ds = compliant_radar_dataset();
    let full = pipeline.run(&ds, &context()).await;
    let raced = pipeline.run_until_cancelled(&ds, &context(), &token).await;
    assert_eq!(full, raced);
}

// ============================================================================
// Catalog consistency
// ============================================================================

#[test]
fn test_unregistered_conditional_attribute_is_catalog_error() {
    let err = ConditionalAttributesCheck::new(
        &["consistent_timestep_start", "radar_count"],
        &TriggerRegistry::standard(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ValidatorError::Catalog(_)));
    assert!(err.to_string().contains("radar_count"));
}

#[test]
fn test_print_spec_needs_no_dataset() {
    let listing = default_pipeline().describe();
    assert_eq!(listing.len(), 17);
    assert_eq!(listing[0].section, "3.1");
    assert_eq!(listing[0].check, "coordinates");
    assert_eq!(listing.last().unwrap().check, "cartopy");
}

// ============================================================================
// Timestep cache
// ============================================================================

#[tokio::test]
async fn test_timestep_cache_is_keyed_on_content() {
    let analyzer = Arc::new(TimestepAnalyzer::new());
    let ctx = context().with_timestep_analyzer(analyzer.clone());
    let pipeline = default_pipeline();

    // Two separately built datasets with the same time axis share an entry.
    pipeline.run(&compliant_radar_dataset(), &ctx).await;
    pipeline.run(&compliant_radar_dataset(), &ctx).await;
    assert_eq!(analyzer.cached_entries(), 1);

    let mut minutes = regular_minutes(10, 5.0);
    minutes.push(60.0);
    let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
        .variable(time_coordinate(&minutes))
        .build();
    pipeline.run(&ds, &ctx).await;
    assert_eq!(analyzer.cached_entries(), 2);
}
