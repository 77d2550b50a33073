//! Grid mapping and CRS attributes (section 4.5).

use async_trait::async_trait;
use mlcast_common::{AttributesExt, Dataset};

use super::{quoted_list, Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "4.5";

pub struct GeoreferencingCheck {
    require_grid_mapping: bool,
    crs_attrs: Vec<String>,
}

impl GeoreferencingCheck {
    pub fn new(require_grid_mapping: bool, crs_attrs: &[&str]) -> Self {
        Self {
            require_grid_mapping,
            crs_attrs: crs_attrs.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Check for GeoreferencingCheck {
    fn id(&self) -> &str {
        "georeferencing"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!("grid_mapping variable carrying {}", quoted_list(&self.crs_attrs))
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        for var in dataset.qualifying_data_vars() {
            let Some(grid_mapping) = var.grid_mapping() else {
                if self.require_grid_mapping {
                    report.add(
                        SECTION,
                        format!("Grid mapping for {}", var.name),
                        Status::Fail,
                        format!("Data variable '{}' is missing 'grid_mapping' attribute", var.name),
                    );
                }
                continue;
            };

            let Some(crs) = dataset.variable(grid_mapping).filter(|_| !grid_mapping.is_empty()) else {
                report.add(
                    SECTION,
                    format!("Grid mapping for {}", var.name),
                    Status::Fail,
                    format!("Data variable '{}' references a non-existent grid mapping variable", var.name),
                );
                continue;
            };

            let missing: Vec<&String> = self.crs_attrs.iter().filter(|a| !crs.attrs.has(a)).collect();
            if missing.is_empty() {
                report.add(
                    SECTION,
                    format!("CRS attributes for {}", var.name),
                    Status::Pass,
                    format!("CRS variable '{grid_mapping}' has all required attributes"),
                );
            } else {
                report.add(
                    SECTION,
                    format!("CRS attributes for {}", var.name),
                    Status::Fail,
                    format!(
                        "CRS variable '{grid_mapping}' is missing attributes: {}",
                        quoted_list(&missing)
                    ),
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
    use serde_json::json;
    use std::sync::Arc;
    use test_utils::{compliant_radar_dataset, DatasetBuilder};

    fn ctx() -> CheckContext {
        CheckContext::new(Capabilities::none(), Arc::new(StaticRepositoryOracle::new()))
    }

    fn check() -> GeoreferencingCheck {
        GeoreferencingCheck::new(true, &["spatial_ref", "crs_wkt"])
    }

    #[tokio::test]
    async fn test_complete_georeferencing() {
        let report = check().evaluate(&compliant_radar_dataset(), &ctx()).await;
        assert!(report.ok());
        assert_eq!(report.findings()[0].detail, "CRS variable 'crs' has all required attributes");
    }

    #[tokio::test]
    async fn test_missing_crs_attribute() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .without_var_attr("crs", "spatial_ref")
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        assert_eq!(
            report.findings()[0].detail,
            "CRS variable 'crs' is missing attributes: ['spatial_ref']"
        );
    }

    #[tokio::test]
    async fn test_dangling_grid_mapping() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .var_attr("rr", "grid_mapping", json!("lambert"))
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        // `crs` is no longer referenced, so it is checked as a data variable too.
        let dangling = report.by_requirement("Grid mapping for rr").next().unwrap();
        assert_eq!(
            dangling.detail,
            "Data variable 'rr' references a non-existent grid mapping variable"
        );
    }

    #[tokio::test]
    async fn test_missing_grid_mapping_optional() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .without_var_attr("rr", "grid_mapping")
            .build();
        let strict = check().evaluate(&ds, &ctx()).await;
        assert!(strict.has_fails());
        let lenient = GeoreferencingCheck::new(false, &["crs_wkt"]).evaluate(&ds, &ctx()).await;
        assert!(lenient.is_empty());
    }
}
