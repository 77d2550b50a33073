//! Validation runs over small Zarr stores on disk.

use compliance::{Catalog, Pipeline, Status};
use dataset_validator::{exit, exit_code_for, validate_location, RuntimeConfig};
use test_utils::{temp_radar_zarr, RadarZarrLayout};
use tokio_util::sync::CancellationToken;

fn pipeline(version: &str) -> Pipeline {
    Catalog::standard()
        .resolve("source_data", "radar_precipitation", Some(version))
        .unwrap()
}

// ============================================================================
// Local stores
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_validate_local_v3_store() {
    let (_dir, path) = temp_radar_zarr(&RadarZarrLayout::default()).unwrap();
    let report = validate_location(
        path.to_str().unwrap(),
        &pipeline("0.1.0"),
        &RuntimeConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.iter().all(|f| f.source_check.is_some()));
    let license = report.by_requirement("License compliance").next().unwrap();
    assert_eq!(license.status, Status::Pass);
    let zarr = report.by_requirement("Zarr version compatibility").next().unwrap();
    assert_eq!(zarr.status, Status::Pass);

    // Six five-minute steps are far from three years of coverage.
    assert!(report.has_fails());
    assert!(report
        .iter()
        .any(|f| f.source_check.as_deref() == Some("temporal") && f.status == Status::Fail));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_matches_sequential_on_disk() {
    let (_dir, path) = temp_radar_zarr(&RadarZarrLayout {
        zarr_format: 2,
        ..Default::default()
    })
    .unwrap();
    let location = path.to_str().unwrap();
    let token = CancellationToken::new();

    let sequential = validate_location(location, &pipeline("0.1.0"), &RuntimeConfig::default(), &token)
        .await
        .unwrap();
    let concurrent_config = RuntimeConfig {
        concurrent: true,
        ..Default::default()
    };
    let concurrent = validate_location(location, &pipeline("0.1.0"), &concurrent_config, &token)
        .await
        .unwrap();
    assert_eq!(sequential, concurrent);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_store_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.zarr");
    let err = validate_location(
        missing.to_str().unwrap(),
        &pipeline("0.1.0"),
        &RuntimeConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(exit_code_for(&err), exit::LOAD);
}

#[test]
fn test_unknown_product_is_usage_error() {
    let err = Catalog::standard()
        .resolve("source_data", "satellite_precipitation", None)
        .map_err(anyhow::Error::from)
        .unwrap_err();
    assert_eq!(exit_code_for(&err), exit::USAGE);
}
