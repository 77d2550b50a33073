//! CF coordinate identification (section 3.1).

use async_trait::async_trait;
use mlcast_common::Dataset;
use tracing::debug;

use super::{require_categories, Check, CheckContext};
use crate::error::Result;
use crate::report::{Report, Status};
use crate::rules::RuleCatalog;

const SECTION: &str = "3.1";
const CATEGORIES: &[&str] = &["time", "lat", "lon", "x", "y"];

/// Which coordinate groups a product requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateRequirements {
    pub time: bool,
    pub projected: bool,
    pub latlon: bool,
}

impl Default for CoordinateRequirements {
    fn default() -> Self {
        Self {
            time: true,
            projected: false,
            latlon: false,
        }
    }
}

pub struct CoordinatesCheck {
    requirements: CoordinateRequirements,
    catalog: &'static RuleCatalog,
}

impl CoordinatesCheck {
    pub fn new(requirements: CoordinateRequirements) -> Result<Self> {
        Self::with_catalog(requirements, RuleCatalog::coordinates())
    }

    /// Use a custom rule catalog. Fails if it lacks any coordinate category.
    pub fn with_catalog(requirements: CoordinateRequirements, catalog: &'static RuleCatalog) -> Result<Self> {
        require_categories(catalog, CATEGORIES)?;
        Ok(Self { requirements, catalog })
    }

    fn find(&self, dataset: &Dataset, category: &str) -> Vec<String> {
        // Categories were checked at construction.
        self.catalog.find_matches(dataset.coords(), category).unwrap_or_default()
    }
}

fn format_coord_list(names: &[String]) -> String {
    if names.is_empty() {
        return "none".to_string();
    }
    names.iter().map(|n| format!("'{n}'")).collect::<Vec<_>>().join(", ")
}

/// Sub-roles of a pair with no matching coordinate.
fn missing_roles<'a>(pair: &[(&'a str, &[String])]) -> Vec<&'a str> {
    pair.iter()
        .filter(|(_, found)| found.is_empty())
        .map(|(role, _)| *role)
        .collect()
}

#[async_trait]
impl Check for CoordinatesCheck {
    fn id(&self) -> &str {
        "coordinates"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.requirements.time {
            parts.push("a time coordinate");
        }
        if self.requirements.latlon {
            parts.push("latitude/longitude coordinates");
        }
        if self.requirements.projected {
            parts.push("projected x/y coordinates");
        }
        if parts.is_empty() {
            "CF-compliant geographic or projected coordinates".to_string()
        } else {
            format!("CF-compliant {}", parts.join(" and "))
        }
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();

        let time = self.find(dataset, "time");
        if !time.is_empty() {
            report.add(
                SECTION,
                "Time coordinate presence",
                Status::Pass,
                format!("CF-compliant time coordinate(s) found: {}", format_coord_list(&time)),
            );
        } else if self.requirements.time {
            report.add(
                SECTION,
                "Time coordinate presence",
                Status::Fail,
                "Dataset is missing a CF-compliant time coordinate (requires `standard_name=time`, `axis=T`, or a 'time' coordinate).",
            );
        }

        let lat = self.find(dataset, "lat");
        let lon = self.find(dataset, "lon");
        let x = self.find(dataset, "x");
        let y = self.find(dataset, "y");
        debug!(?lat, ?lon, ?x, ?y, "Matched coordinates");

        let geographic_ok = !lat.is_empty() && !lon.is_empty();
        let projected_ok = !x.is_empty() && !y.is_empty();

        if geographic_ok {
            report.add(
                SECTION,
                "Latitude/longitude coordinates",
                Status::Pass,
                format!(
                    "CF-compliant latitude ({}) and longitude ({}) coordinates detected.",
                    format_coord_list(&lat),
                    format_coord_list(&lon)
                ),
            );
        }
        if projected_ok {
            report.add(
                SECTION,
                "Projected coordinates",
                Status::Pass,
                format!(
                    "CF-compliant projected x ({}) and y ({}) coordinates detected.",
                    format_coord_list(&x),
                    format_coord_list(&y)
                ),
            );
        }

        let missing_geo = missing_roles(&[("latitude", lat.as_slice()), ("longitude", lon.as_slice())]);
        let missing_proj = missing_roles(&[
            ("projection_x_coordinate", x.as_slice()),
            ("projection_y_coordinate", y.as_slice()),
        ]);

        let mut failures = Vec::new();
        if self.requirements.latlon && !geographic_ok {
            failures.push(format!(
                "Latitude/longitude coordinates are required but no CF-compliant pair was found \
                 (missing CF-compliant {} coordinate).",
                missing_geo.join(", ")
            ));
        }
        if self.requirements.projected && !projected_ok {
            failures.push(format!(
                "Projected x/y coordinates are required but no CF-compliant pair was found \
                 (missing CF-compliant {} coordinate).",
                missing_proj.join(", ")
            ));
        }
        if !geographic_ok && !projected_ok {
            failures.push(format!(
                "Dataset must include CF-compliant latitude/longitude or projected coordinates. \
                 Latitude/longitude pair incomplete (missing CF-compliant {} coordinate). \
                 Projected x/y pair incomplete (missing CF-compliant {} coordinate).",
                missing_geo.join(", "),
                missing_proj.join(", ")
            ));
        }

        if !failures.is_empty() {
            report.add(SECTION, "Coordinate reference compliance", Status::Fail, failures.join(" "));
        }

        report
    }
}
