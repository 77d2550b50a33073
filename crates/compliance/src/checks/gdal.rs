//! GDAL-equivalent CRS compatibility (section 6.1).

use async_trait::async_trait;
use mlcast_common::Dataset;

use super::{lookup_crs, Check, CheckContext, CrsLookup};
use crate::capabilities::{self, Capability, CrsKind};
use crate::report::{Report, Status};

const SECTION: &str = "6.1";
const PARSING: &str = "GDAL WKT parsing";
const PROJECTION: &str = "Projection type check";

/// Parses the CRS WKT of the first georeferenced data variable and
/// classifies it.
#[derive(Debug, Default)]
pub struct GdalCheck;

impl GdalCheck {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Check for GdalCheck {
    fn id(&self) -> &str {
        "gdal"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        "CRS WKT parseable by GDAL-compatible tooling".to_string()
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(parser) = ctx.capabilities.wkt.as_ref() else {
            report.push(capabilities::skipped(SECTION, PARSING, Capability::WktParsing));
            return report;
        };

        let (grid_mapping, wkt) = match lookup_crs(dataset) {
            CrsLookup::Found { grid_mapping, wkt } => (grid_mapping, wkt),
            CrsLookup::NoVariable => {
                report.add(
                    SECTION,
                    "Data variable selection",
                    Status::Fail,
                    "No data variable with a 'grid_mapping' attribute is available for GDAL checks.",
                );
                return report;
            }
            CrsLookup::InvalidGridMapping(var) => {
                report.add(
                    SECTION,
                    "CRS metadata",
                    Status::Fail,
                    format!("Data variable '{var}' lacks a valid 'grid_mapping' attribute."),
                );
                return report;
            }
            CrsLookup::MissingWkt(grid_mapping) => {
                report.add(
                    SECTION,
                    PARSING,
                    Status::Fail,
                    format!("CRS variable '{grid_mapping}' is missing 'crs_wkt' metadata."),
                );
                return report;
            }
        };

        let info = match parser.parse(wkt) {
            Ok(info) => info,
            Err(e) => {
                report.add(SECTION, PARSING, Status::Fail, format!("GDAL failed to parse CRS WKT: {e}"));
                return report;
            }
        };

        let identity = info
            .authority
            .clone()
            .or_else(|| info.name.clone())
            .unwrap_or_else(|| "no authority code".to_string());
        report.add(
            SECTION,
            PARSING,
            Status::Pass,
            format!("CRS WKT of '{grid_mapping}' parsed ({identity})."),
        );

        match info.kind {
            CrsKind::Projected => report.add(
                SECTION,
                PROJECTION,
                Status::Pass,
                format!(
                    "Projected CRS detected ({}).",
                    info.projection.as_deref().unwrap_or("unknown projection")
                ),
            ),
            CrsKind::Geographic => report.add(
                SECTION,
                PROJECTION,
                Status::Pass,
                "Geographic CRS detected (latitude/longitude).",
            ),
            CrsKind::Other => report.add(
                SECTION,
                PROJECTION,
                Status::Warning,
                "CRS parsed but type is ambiguous (neither projected nor geographic).",
            ),
        }
        report
    }
}
