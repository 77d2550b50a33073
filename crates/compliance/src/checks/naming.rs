//! CF naming and units of data variables (section 4.4).

use async_trait::async_trait;
use mlcast_common::{AttributesExt, Dataset, Variable};

use super::{Check, CheckContext};
use crate::cf;
use crate::error::{Result, ValidatorError};
use crate::report::{Report, Status};

const SECTION: &str = "4.4";
const REQUIRED_ATTRS: &[&str] = &["long_name", "standard_name", "units"];

pub struct NamingCheck {
    allowed_standard_names: Vec<String>,
}

impl NamingCheck {
    /// Fails if an allowed standard name has no entry in the CF table.
    pub fn new(allowed_standard_names: &[&str]) -> Result<Self> {
        let allowed: Vec<String> = allowed_standard_names
            .iter()
            .map(|n| n.trim().to_lowercase())
            .collect();
        if let Some(unknown) = allowed.iter().find(|n| cf::lookup(n).is_none()) {
            return Err(ValidatorError::catalog(format!(
                "no naming rule implemented for standard_name '{unknown}'"
            )));
        }
        Ok(Self {
            allowed_standard_names: allowed,
        })
    }

    fn evaluate_variable(&self, var: &Variable, report: &mut Report) {
        if let Some(missing) = REQUIRED_ATTRS.iter().find(|a| !var.attrs.has(a)) {
            report.add(
                SECTION,
                format!("Required attribute '{missing}'"),
                Status::Fail,
                format!("'{missing}' attribute is missing on data variable '{}'.", var.name),
            );
            return;
        }

        let standard_name = var.attr_text("standard_name").unwrap_or_default().trim().to_lowercase();
        let units = var.attr_text("units").unwrap_or_default().trim().to_string();

        if !self.allowed_standard_names.contains(&standard_name) {
            report.add(
                SECTION,
                "Standard name validation",
                Status::Fail,
                format!("Standard name '{standard_name}' is not permitted for this specification."),
            );
            return;
        }
        let Some(spec) = cf::lookup(&standard_name) else {
            report.add(
                SECTION,
                "Standard name validation",
                Status::Fail,
                format!("Standard name '{standard_name}' is not recognized for supported physical variables."),
            );
            return;
        };

        if spec.allows_name(&var.name) {
            report.add(
                SECTION,
                "Variable name validation",
                Status::Pass,
                format!("Variable name '{}' matches the expected CF/ECMWF list.", var.name),
            );
        } else {
            report.add(
                SECTION,
                "Variable name validation",
                Status::Fail,
                format!(
                    "Variable name '{}' is not allowed for standard_name '{standard_name}'. Allowed names: {}.",
                    var.name,
                    spec.aliases.join(", ")
                ),
            );
        }

        if !spec.allows_unit(&units) {
            report.add(
                SECTION,
                "Units validation",
                Status::Fail,
                format!(
                    "Units '{units}' are not allowed for standard_name '{standard_name}'. \
                     Allowed units: {} (canonical: {}).",
                    spec.units.join(", "),
                    spec.canonical_unit
                ),
            );
        } else if !spec.is_canonical_unit(&units) {
            report.add(
                SECTION,
                "Units validation",
                Status::Warning,
                format!(
                    "Units '{units}' are permitted but the CF canonical unit is '{}'.",
                    spec.canonical_unit
                ),
            );
        } else {
            report.add(
                SECTION,
                "Units validation",
                Status::Pass,
                format!("Units '{units}' match the CF canonical unit."),
            );
        }
    }
}

#[async_trait]
impl Check for NamingCheck {
    fn id(&self) -> &str {
        "naming"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!(
            "CF long_name, standard_name and units; standard_name one of {}",
            self.allowed_standard_names.join(", ")
        )
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        for var in dataset.qualifying_data_vars() {
            self.evaluate_variable(var, &mut report);
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

    fn check() -> NamingCheck {
        NamingCheck::new(&["rainfall_flux", "precipitation_flux", "equivalent_reflectivity_factor"]).unwrap()
    }

    async fn run_with_units(units: &str) -> Report {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .var_attr("rr", "units", json!(units))
            .build();
        check().evaluate(&ds, &ctx()).await
    }

    #[tokio::test]
    async fn test_canonical_units_pass() {
        let report = run_with_units("kg m-2 h-1").await;
        assert!(report.ok());
        assert_eq!(report.summary().passed, 2);
    }

    #[tokio::test]
    async fn test_non_canonical_units_warn() {
        let report = run_with_units("mm/h").await;
        assert_eq!(report.by_requirement("Variable name validation").next().unwrap().status, Status::Pass);
        let units = report.by_requirement("Units validation").next().unwrap();
        assert_eq!(units.status, Status::Warning);
        assert_eq!(
            units.detail,
            "Units 'mm/h' are permitted but the CF canonical unit is 'kg m-2 h-1'."
        );
    }

    #[tokio::test]
    async fn test_unknown_units_fail() {
        let report = run_with_units("in/h").await;
        let units = report.by_requirement("Units validation").next().unwrap();
        assert_eq!(units.status, Status::Fail);
        assert!(units.detail.contains("(canonical: kg m-2 h-1)"));
    }

    #[tokio::test]
    async fn test_first_missing_attribute_stops() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .without_var_attr("rr", "standard_name")
            .without_var_attr("rr", "units")
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        assert_eq!(report.len(), 1);
        assert_eq!(report.findings()[0].requirement, "Required attribute 'standard_name'");
    }

    #[tokio::test]
    async fn test_disallowed_standard_name_and_alias() {
        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .var_attr("rr", "standard_name", json!("air_temperature"))
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        assert_eq!(
            report.findings()[0].detail,
            "Standard name 'air_temperature' is not permitted for this specification."
        );

        let ds = DatasetBuilder::from_dataset(compliant_radar_dataset())
            .var_attr("rr", "standard_name", json!("precipitation_flux"))
            .build();
        let report = check().evaluate(&ds, &ctx()).await;
        assert_eq!(
            report.by_requirement("Variable name validation").next().unwrap().status,
            Status::Fail
        );
    }

    #[test]
    fn test_unsupported_allowed_name_is_a_catalog_error() {
        let err = NamingCheck::new(&["rainfall_flux", "snowfall_flux"]).err().unwrap();
        assert!(matches!(err, ValidatorError::Catalog(_)));
    }
}
