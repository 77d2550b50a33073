//! Machine-readable report export.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::report::{Report, Status, Summary};

pub const TOOL_NAME: &str = "mlcast-dataset-validator";

/// `mlcast-dataset-validator v<crate version>`
pub fn validator_identity() -> String {
    format!("{TOOL_NAME} v{}", env!("CARGO_PKG_VERSION"))
}

/// JSON document written by `--output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub dataset: String,
    pub validator: String,
    /// `stage/product@version` the dataset was validated against.
    pub specification: String,
    pub timestamp: String,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
    pub tests: Vec<ExportTest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTest {
    pub name: String,
    pub description: String,
    pub result: Status,
    pub details: String,
    pub error: Option<String>,
}

impl ExportDocument {
    pub fn new(dataset: &str, specification: &str, report: &Report, timestamp: DateTime<Utc>) -> Self {
        let tests = report
            .iter()
            .map(|f| ExportTest {
                name: f.requirement.clone(),
                description: match &f.source_check {
                    Some(check) => format!("{} ({check})", f.section),
                    None => f.section.clone(),
                },
                result: f.status,
                details: f.detail.clone(),
                error: None,
            })
            .collect();
        Self {
            dataset: dataset.to_string(),
            validator: validator_identity(),
            specification: specification.to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            summary: report.summary(),
            interrupted: report.interrupted(),
            tests,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Finding;
    use chrono::TimeZone;

    fn sample() -> Report {
        let mut report = Report::new();
        let mut stamped = Report::new();
        stamped.add("5.2", "License metadata", Status::Fail, "Missing required 'license' attribute");
        stamped.stamp_source("licensing");
        report += stamped;
        report.push(Finding::new("6.1", "GDAL roundtrip", Status::Warning, "skipped"));
        report
    }

    #[test]
    fn test_export_mapping() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let doc = ExportDocument::new("s3://bucket/radar.zarr", "source_data/radar_precipitation@0.2.0", &sample(), at);

        assert_eq!(doc.timestamp, "2025-03-01T12:00:00Z");
        assert!(doc.validator.starts_with("mlcast-dataset-validator v"));
        assert_eq!(doc.summary.failed, 1);
        assert_eq!(doc.summary.warnings, 1);
        assert_eq!(doc.tests[0].name, "License metadata");
        assert_eq!(doc.tests[0].description, "5.2 (licensing)");
        assert_eq!(doc.tests[1].description, "6.1");
    }

    #[test]
    fn test_export_json_shape() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let doc = ExportDocument::new("radar.zarr", "x/y@1", &sample(), at);
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value["tests"][0]["result"], "FAIL");
        assert!(value["tests"][0]["error"].is_null());
        assert_eq!(value["summary"]["skipped"], 0);
        assert!(value.get("interrupted").is_none());
    }
}
