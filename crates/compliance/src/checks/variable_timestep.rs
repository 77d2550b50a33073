//! Variable timestep handling (section 3.5).

use async_trait::async_trait;
use mlcast_common::Dataset;

use super::{time_coordinate, Check, CheckContext};
use crate::report::{Report, Status};

const SECTION: &str = "3.5";
const CONSISTENT_START_ATTR: &str = "consistent_timestep_start";

pub struct VariableTimestepCheck {
    allow_variable: bool,
}

impl VariableTimestepCheck {
    pub fn new(allow_variable: bool) -> Self {
        Self { allow_variable }
    }
}

#[async_trait]
impl Check for VariableTimestepCheck {
    fn id(&self) -> &str {
        "variable_timestep"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        if self.allow_variable {
            "Variable timesteps are allowed and should be documented".to_string()
        } else {
            "Timesteps must be regular".to_string()
        }
    }

    async fn evaluate(&self, dataset: &Dataset, ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(time) = time_coordinate(dataset) else {
            report.add(SECTION, "Time coordinate presence", Status::Fail, "Missing 'time' coordinate");
            return report;
        };

        let analysis = match ctx.timesteps.analyze(time) {
            Ok(analysis) => analysis,
            Err(e) => {
                report.add(
                    SECTION,
                    "Variable timestep analysis",
                    Status::Fail,
                    format!("Failed to analyze variable timesteps: {e}"),
                );
                return report;
            }
        };

        if !analysis.is_variable {
            report.add(
                SECTION,
                "Timestep consistency",
                Status::Pass,
                "Timestep is consistent throughout the dataset",
            );
            return report;
        }

        if self.allow_variable {
            report.add(
                SECTION,
                "Variable timestep handling",
                Status::Pass,
                format!(
                    "Variable timesteps detected with {} unique intervals",
                    analysis.unique_intervals
                ),
            );
        } else {
            report.add(
                SECTION,
                "Variable timestep handling",
                Status::Fail,
                "Variable timesteps detected but not allowed",
            );
        }

        if dataset.attrs.contains_key(CONSISTENT_START_ATTR) {
            report.add(
                SECTION,
                "Consistent timestep start metadata",
                Status::Pass,
                "Dataset includes 'consistent_timestep_start' metadata",
            );
        } else {
            report.add(
                SECTION,
                "Consistent timestep start metadata",
                Status::Warning,
                "Dataset has variable timesteps but is missing 'consistent_timestep_start' metadata",
            );
        }
        report
    }
}
