//! Cartopy-equivalent plotting compatibility (section 6.2).

use async_trait::async_trait;
use mlcast_common::Dataset;

use super::{lookup_crs, Check, CheckContext, CrsLookup};
use crate::capabilities::{self, Capability, CrsInfo, CrsKind};
use crate::report::{Report, Status};

const SECTION: &str = "6.2";
const CREATION: &str = "Cartopy CRS creation";
const BBOX: &str = "Cartopy BBOX check";
const TRANSFORM: &str = "Cartopy coordinate transform";
/// Samples per axis for the transform sample.
const SAMPLES: usize = 5;

#[derive(Debug, Default)]
pub struct CartopyCheck;

impl CartopyCheck {
    pub fn new() -> Self {
        Self
    }
}

/// Every `len / 5`-th value, at most five of them.
fn sample_axis(values: &[f64]) -> Vec<f64> {
    let step = (values.len() / SAMPLES).max(1);
    values.iter().step_by(step).take(SAMPLES).copied().collect()
}

fn crs_class(info: &CrsInfo) -> &'static str {
    match info.kind {
        CrsKind::Projected => "Projected",
        CrsKind::Geographic => "Geographic",
        CrsKind::Other => "CRS",
    }
}

impl CartopyCheck {
    fn transform(&self, dataset: &Dataset, ctx: &CheckContext, info: &CrsInfo, wkt: &str, report: &mut Report) {
        let (Some(x), Some(y)) = (dataset.coord("x"), dataset.coord("y")) else {
            report.add(
                SECTION,
                TRANSFORM,
                Status::Warning,
                "Dataset lacks 'x' and 'y' coordinates; skipping transform test.",
            );
            return;
        };
        let Some(transform) = ctx.capabilities.transform.as_ref() else {
            report.push(capabilities::skipped(SECTION, TRANSFORM, Capability::CoordinateTransform));
            return;
        };

        let points = match (x.values.as_deref(), y.values.as_deref()) {
            (Some(xs), Some(ys)) if !xs.is_empty() && !ys.is_empty() => {
                let xs = sample_axis(xs);
                let ys = sample_axis(ys);
                ys.iter()
                    .flat_map(|&yv| xs.iter().map(move |&xv| (xv, yv)))
                    .collect::<Vec<_>>()
            }
            (Some(_), Some(_)) => {
                report.add(
                    SECTION,
                    TRANSFORM,
                    Status::Fail,
                    "Failed to transform coordinates for cartopy plotting: Empty coordinate arrays.",
                );
                return;
            }
            _ => {
                report.add(
                    SECTION,
                    TRANSFORM,
                    Status::Fail,
                    "Failed to transform coordinates for cartopy plotting: coordinate values were not loaded.",
                );
                return;
            }
        };

        match transform.to_lon_lat(info, wkt, &points) {
            Ok(lon_lat) if lon_lat.iter().any(|(lon, lat)| !lon.is_finite() || !lat.is_finite()) => {
                report.add(
                    SECTION,
                    TRANSFORM,
                    Status::Warning,
                    "Coordinate transformation produced NaN values.",
                );
            }
            Ok(lon_lat) => report.add(
                SECTION,
                TRANSFORM,
                Status::Pass,
                format!("Successfully transformed {} coordinate pairs to PlateCarree.", lon_lat.len()),
            ),
            Err(e) => report.add(
                SECTION,
                TRANSFORM,
                Status::Fail,
                format!("Failed to transform coordinates for cartopy plotting: {e}"),
            ),
        }
    }
}

#[async_trait]
impl Check for CartopyCheck {
    fn id(&self) -> &str {
        "cartopy"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        "CRS usable for cartopy plotting".to_string()
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(parser) = ctx.capabilities.wkt.as_ref() else {
            report.push(capabilities::skipped(SECTION, CREATION, Capability::WktParsing));
            return report;
        };

        let wkt = match lookup_crs(dataset) {
            CrsLookup::Found { wkt, .. } => wkt,
            CrsLookup::NoVariable => {
                report.add(
                    SECTION,
                    "Data variable selection",
                    Status::Fail,
                    "No data variable with a 'grid_mapping' attribute is available for cartopy checks.",
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
                    CREATION,
                    Status::Fail,
                    format!("CRS variable '{grid_mapping}' is missing 'crs_wkt' metadata."),
                );
                return report;
            }
        };

        let info = match parser.parse(wkt) {
            Ok(info) => info,
            Err(e) => {
                report.add(SECTION, CREATION, Status::Fail, format!("Cartopy failed to parse CRS WKT: {e}"));
                return report;
            }
        };
        report.add(
            SECTION,
            CREATION,
            Status::Pass,
            format!("Successfully created cartopy CRS instance ({}).", crs_class(&info)),
        );

        if info.has_bbox {
            report.add(SECTION, BBOX, Status::Pass, "WKT definition includes a BBOX, aiding cartopy plotting.");
        } else {
            report.add(
                SECTION,
                BBOX,
                Status::Warning,
                "WKT lacks a BBOX definition; cartopy plots may require manual extents.",
            );
        }

        self.transform(dataset, ctx, &info, wkt, &mut report);
        report
    }
}
