//! Lookup of published pipelines by `stage/product@version`.

use tracing::debug;

use crate::error::{Result, ValidatorError};
use crate::pipeline::Pipeline;
use crate::specs::{radar_precipitation, ProductSpec};

/// One `stage/product` with its published versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub stage: &'static str,
    pub product: &'static str,
    pub versions: Vec<&'static str>,
    pub default_version: &'static str,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<ProductSpec>,
}

impl Catalog {
    /// Every product specification this validator ships.
    pub fn standard() -> Self {
        Self::from_specs(vec![radar_precipitation::SPEC])
    }

    pub fn from_specs(products: Vec<ProductSpec>) -> Self {
        Self { products }
    }

    pub fn list(&self) -> Vec<CatalogEntry> {
        self.products
            .iter()
            .map(|p| CatalogEntry {
                stage: p.stage,
                product: p.product,
                versions: p.version_ids(),
                default_version: p.default_version,
            })
            .collect()
    }

    /// Build the pipeline for `stage/product`, at `version` or the product's
    /// default version.
    ///
    /// Unknown names are usage errors. A pipeline whose checks cannot be
    /// constructed is a catalog error.
    pub fn resolve(&self, stage: &str, product: &str, version: Option<&str>) -> Result<Pipeline> {
        if !self.products.iter().any(|p| p.stage == stage) {
            return Err(ValidatorError::UnknownStage(stage.to_string()));
        }
        let spec = self
            .products
            .iter()
            .find(|p| p.stage == stage && p.product == product)
            .ok_or_else(|| ValidatorError::UnknownProduct {
                stage: stage.to_string(),
                product: product.to_string(),
            })?;

        let version = version.unwrap_or(spec.default_version);
        let build = spec.builder(version).ok_or_else(|| ValidatorError::UnknownVersion {
            stage: stage.to_string(),
            product: product.to_string(),
            version: version.to_string(),
            available: spec.version_ids().join(", "),
        })?;

        debug!(stage, product, version, "Resolved pipeline");
        build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{ConditionalAttributesCheck, TriggerRegistry};

    #[test]
    fn test_list() {
        let entries = Catalog::standard().list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, "source_data");
        assert_eq!(entries[0].product, "radar_precipitation");
        assert_eq!(entries[0].versions, vec!["0.1.0", "0.2.0"]);
        assert_eq!(entries[0].default_version, "0.2.0");
    }

    #[test]
    fn test_resolve_default_and_explicit() {
        let catalog = Catalog::standard();
        let default = catalog.resolve("source_data", "radar_precipitation", None).unwrap();
        assert_eq!(default.version(), "0.2.0");
        let old = catalog
            .resolve("source_data", "radar_precipitation", Some("0.1.0"))
            .unwrap();
        assert_eq!(old.version(), "0.1.0");
    }

    #[test]
    fn test_usage_errors() {
        let catalog = Catalog::standard();
        let err = catalog.resolve("derived", "radar_precipitation", None).unwrap_err();
        assert!(matches!(err, ValidatorError::UnknownStage(_)));
        assert!(err.is_usage());

        let err = catalog.resolve("source_data", "satellite", None).unwrap_err();
        assert!(matches!(err, ValidatorError::UnknownProduct { .. }));

        let err = catalog
            .resolve("source_data", "radar_precipitation", Some("9.9.9"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown version '9.9.9' of source_data/radar_precipitation (available: 0.1.0, 0.2.0)"
        );
    }

    fn inconsistent() -> Result<Pipeline> {
        Ok(Pipeline::new("source_data", "broken", "1.0.0").with_check(ConditionalAttributesCheck::new(
            &["undefined_attribute"],
            &TriggerRegistry::standard(),
        )?))
    }

    const BROKEN: ProductSpec = ProductSpec {
        stage: "source_data",
        product: "broken",
        default_version: "1.0.0",
        versions: &[("1.0.0", inconsistent)],
    };

    #[test]
    fn test_inconsistent_spec_is_catalog_error() {
        let catalog = Catalog::from_specs(vec![BROKEN]);
        let err = catalog.resolve("source_data", "broken", None).unwrap_err();
        assert!(matches!(err, ValidatorError::Catalog(_)));
        assert!(!err.is_usage());
    }
}
