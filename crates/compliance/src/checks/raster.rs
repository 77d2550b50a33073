//! Raster export round-trip (section 6.1).

use async_trait::async_trait;
use mlcast_common::Dataset;
use tracing::debug;

use super::{lookup_crs, select_georeferenced_variable, Check, CheckContext, CrsLookup};
use crate::capabilities::{self, Capability, RasterSample};
use crate::report::{Report, Status};

const SECTION: &str = "6.1";
const ROUNDTRIP: &str = "GDAL roundtrip";

/// Exports a 2-D slice through the raster capability and checks that the
/// georeferencing survives the re-read.
#[derive(Debug, Default)]
pub struct RasterRoundTripCheck;

impl RasterRoundTripCheck {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Check for RasterRoundTripCheck {
    fn id(&self) -> &str {
        "raster_roundtrip"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        "GeoTIFF export keeps geotransform and projection".to_string()
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(oracle) = ctx.capabilities.raster.as_ref() else {
            report.push(capabilities::skipped(SECTION, ROUNDTRIP, Capability::RasterRoundTrip));
            return report;
        };

        let (CrsLookup::Found { wkt, .. }, Some(variable)) =
            (lookup_crs(dataset), select_georeferenced_variable(dataset))
        else {
            report.add(
                SECTION,
                ROUNDTRIP,
                Status::Warning,
                "Roundtrip not attempted: no georeferenced data variable with 'crs_wkt' metadata.",
            );
            return report;
        };

        // The last two dimensions are exported as (y, x).
        let axis_values = |offset: usize| {
            variable
                .dims
                .len()
                .checked_sub(offset)
                .and_then(|i| variable.dims.get(i))
                .and_then(|dim| dataset.coord(dim))
                .and_then(|c| c.values.as_deref())
        };
        let sample = RasterSample {
            variable,
            wkt,
            x: axis_values(1),
            y: axis_values(2),
        };
        debug!(variable = %variable.name, "Raster round-trip");

        match oracle.round_trip(&sample) {
            Ok(outcome) if outcome.geotransform && outcome.projection => report.add(
                SECTION,
                ROUNDTRIP,
                Status::Pass,
                "GeoTIFF export can be read back with geotransform/projection metadata.",
            ),
            Ok(_) => report.add(
                SECTION,
                ROUNDTRIP,
                Status::Fail,
                "Roundtrip succeeded but the reader reported missing geotransform or projection metadata.",
            ),
            Err(e) => report.add(
                SECTION,
                ROUNDTRIP,
                Status::Fail,
                format!("GeoTIFF export/read failed: {e}"),
            ),
        }
        report
    }
}
