//! Compression of data and coordinate arrays (section 4.2).

use async_trait::async_trait;
use mlcast_common::{Dataset, Encoding};

use super::{Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "4.2";
const COMPRESSOR_FAMILIES: &[&str] = &["zlib", "gzip", "bz2", "blosc", "zstd", "lz4", "snappy"];

/// Canonical compressor name of an encoding.
///
/// A native compressor wins. Otherwise the last filter belonging to a known
/// compressor family is taken, as in HDF5-style pipelines (`shuffle`, `zlib`).
pub fn compressor_name(encoding: &Encoding) -> Option<String> {
    if let Some(codec) = encoding.compressors.first() {
        return Some(codec.name());
    }
    encoding
        .filters
        .iter()
        .map(|f| f.name())
        .filter(|name| COMPRESSOR_FAMILIES.iter().any(|family| name.contains(family)))
        .last()
}

pub struct CompressionCheck {
    require: bool,
    recommended: String,
    /// Extra algorithms tolerated on coordinate arrays.
    allow_coord_algs: Vec<String>,
}

impl CompressionCheck {
    pub fn new(require: bool, recommended: &str, allow_coord_algs: &[&str]) -> Self {
        Self {
            require,
            recommended: recommended.to_lowercase(),
            allow_coord_algs: allow_coord_algs.iter().map(|a| a.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Check for CompressionCheck {
    fn id(&self) -> &str {
        "compression"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        if self.require {
            format!("Compression required, {} recommended", self.recommended)
        } else {
            format!("{} compression recommended", self.recommended)
        }
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();

        for var in dataset.qualifying_data_vars() {
            let requirement = format!("DataArray compression {}", var.name);
            match compressor_name(&var.encoding) {
                None if self.require => report.add(
                    SECTION,
                    requirement,
                    Status::Fail,
                    format!("{} DataArray does not use compression", var.name),
                ),
                None => {}
                Some(name) if name == self.recommended => report.add(
                    SECTION,
                    requirement,
                    Status::Pass,
                    format!("{} DataArray uses recommended compression: {}", var.name, self.recommended),
                ),
                Some(name) => report.add(
                    SECTION,
                    requirement,
                    Status::Warning,
                    format!(
                        "{} DataArrays uses compression: {name}, recommended is {}",
                        var.name, self.recommended
                    ),
                ),
            }
        }

        for coord in dataset.coords() {
            let Some(name) = compressor_name(&coord.encoding) else { continue };
            if name != self.recommended && !self.allow_coord_algs.contains(&name) {
                report.add(
                    SECTION,
                    format!("Coordinate compression {}", coord.name),
                    Status::Warning,
                    format!(
                        "Coordinate '{}' uses compression: {name}, allowed are {} and {}",
                        coord.name,
                        self.recommended,
                        self.allow_coord_algs.join(", ")
                    ),
                );
            }
        }
        report
    }
}
