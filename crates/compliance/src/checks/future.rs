//! Future timestep extension (section 3.2).

use async_trait::async_trait;
use chrono::Datelike;
use mlcast_common::{decode_time_variable, Dataset};

use super::{time_coordinate, Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "3.2";

pub struct FutureTimestepCheck {
    max_year: i32,
}

impl FutureTimestepCheck {
    pub fn new(max_year: i32) -> Self {
        Self { max_year }
    }
}

#[async_trait]
impl Check for FutureTimestepCheck {
    fn id(&self) -> &str {
        "future_timesteps"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!("Future timesteps, if any, must not extend beyond {}", self.max_year)
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(time) = time_coordinate(dataset) else {
            report.add(SECTION, "Time coordinate presence", Status::Fail, "Missing 'time' coordinate");
            return report;
        };

        let times = match decode_time_variable(time) {
            Ok(times) => times,
            Err(e) => {
                report.add(
                    SECTION,
                    "Future timestep analysis",
                    Status::Fail,
                    format!("Failed to analyze future timesteps: {e}"),
                );
                return report;
            }
        };

        let Some(max_time) = times.iter().max().copied() else {
            return report;
        };
        if max_time > ctx.now {
            report.add(
                SECTION,
                "Future timesteps detected",
                Status::Pass,
                format!(
                    "Dataset includes future timesteps up to {}",
                    max_time.format("%Y-%m-%d %H:%M:%S")
                ),
            );
            if max_time.year() > self.max_year {
                report.add(
                    SECTION,
                    "Future timestep limit",
                    Status::Fail,
                    format!("Future timesteps extend beyond {}: {}", self.max_year, max_time.year()),
                );
            }
        }
        report
    }
}
