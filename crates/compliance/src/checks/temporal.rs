//! Temporal coverage (section 3.4).

use async_trait::async_trait;
use mlcast_common::{decode_time_variable, Dataset, TimeDecodeError};

use super::{time_coordinate, Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "3.4";
const DAYS_PER_YEAR: f64 = 365.25;

pub struct TemporalCheck {
    min_years: u32,
}

impl TemporalCheck {
    pub fn new(min_years: u32) -> Self {
        Self { min_years }
    }
}

/// Whole days between the first and last timestep, in years.
fn coverage_years(time: &mlcast_common::Variable) -> Result<f64, TimeDecodeError> {
    let times = decode_time_variable(time)?;
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return Ok(0.0);
    };
    Ok((*last - *first).num_days() as f64 / DAYS_PER_YEAR)
}

#[async_trait]
impl Check for TemporalCheck {
    fn id(&self) -> &str {
        "temporal"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!("At least {} years of temporal coverage", self.min_years)
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(time) = time_coordinate(dataset) else {
            report.add(SECTION, "Time coordinate presence", Status::Fail, "Missing 'time' coordinate");
            return report;
        };

        let requirement = format!("Minimum {}-year coverage", self.min_years);
        match coverage_years(time) {
            Ok(years) if years >= f64::from(self.min_years) => report.add(
                SECTION,
                requirement,
                Status::Pass,
                format!("Temporal coverage: {years:.1} years (≥{} years)", self.min_years),
            ),
            Ok(years) => report.add(
                SECTION,
                requirement,
                Status::Fail,
                format!("Temporal coverage: {years:.1} years (<{} years required)", self.min_years),
            ),
            Err(e) => report.add(
                SECTION,
                "Temporal coverage analysis",
                Status::Fail,
                format!("Failed to analyze temporal coverage: {e}"),
            ),
        }
        report
    }
}
