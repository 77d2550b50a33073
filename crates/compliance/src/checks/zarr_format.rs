//! Zarr format version and consolidated metadata (section 5.3).

use async_trait::async_trait;
use mlcast_common::Dataset;

use super::{Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "5.3";

pub struct ZarrFormatCheck {
    allowed_versions: Vec<u8>,
    require_consolidated_v2: bool,
}

impl ZarrFormatCheck {
    pub fn new(allowed_versions: &[u8], require_consolidated_v2: bool) -> Self {
        Self {
            allowed_versions: allowed_versions.to_vec(),
            require_consolidated_v2,
        }
    }
}

#[async_trait]
impl Check for ZarrFormatCheck {
    fn id(&self) -> &str {
        "zarr_format"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        let versions: Vec<String> = self.allowed_versions.iter().map(|v| format!("v{v}")).collect();
        format!("Zarr format {}", versions.join(" or "))
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(version) = dataset.store.zarr_format else {
            report.add(
                SECTION,
                "Zarr version compatibility",
                Status::Fail,
                "Could not determine the Zarr format version of the store",
            );
            return report;
        };

        if self.allowed_versions.contains(&version) {
            report.add(
                SECTION,
                "Zarr version compatibility",
                Status::Pass,
                format!("Using supported Zarr v{version} format"),
            );
        } else {
            report.add(
                SECTION,
                "Zarr version compatibility",
                Status::Fail,
                format!("Unsupported Zarr version: v{version}"),
            );
        }

        if version == 2 && self.require_consolidated_v2 {
            if dataset.store.consolidated {
                report.add(
                    SECTION,
                    "Consolidated metadata presence",
                    Status::Pass,
                    "Zarr v2 dataset has consolidated metadata",
                );
            } else {
                report.add(
                    SECTION,
                    "Consolidated metadata presence",
                    Status::Fail,
                    "Zarr v2 dataset is missing consolidated metadata",
                );
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::oracle::StaticRepositoryOracle;
    use std::sync::Arc;
    use test_utils::DatasetBuilder;

    fn ctx() -> CheckContext {
        CheckContext::new(Capabilities::none(), Arc::new(StaticRepositoryOracle::new()))
    }

    async fn run(version: Option<u8>, consolidated: bool) -> Report {
        let ds = DatasetBuilder::new("mem://").zarr_format(version, consolidated).build();
        ZarrFormatCheck::new(&[2, 3], true).evaluate(&ds, &ctx()).await
    }

    #[tokio::test]
    async fn test_v3_passes() {
        let report = run(Some(3), false).await;
        assert_eq!(report.len(), 1);
        assert_eq!(report.findings()[0].detail, "Using supported Zarr v3 format");
    }

    #[tokio::test]
    async fn test_v2_needs_consolidated_metadata() {
        assert!(run(Some(2), true).await.ok());
        let report = run(Some(2), false).await;
        assert_eq!(
            report.by_requirement("Consolidated metadata presence").next().unwrap().status,
            Status::Fail
        );
    }

    #[tokio::test]
    async fn test_unsupported_or_unknown_version() {
        assert_eq!(run(Some(1), true).await.findings()[0].detail, "Unsupported Zarr version: v1");
        assert!(run(None, true).await.has_fails());
    }
}
