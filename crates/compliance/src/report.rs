//! Findings and the reports that collect them.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;

/// Outcome of a single requirement evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warning,
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warning => "WARNING",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(Status::Pass),
            "WARNING" => Ok(Status::Warning),
            "FAIL" => Ok(Status::Fail),
            other => Err(ValidatorError::InvalidStatus(other.to_string())),
        }
    }
}

/// One evaluated requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub section: String,
    pub requirement: String,
    pub status: Status,
    #[serde(default)]
    pub detail: String,
    /// Identifier of the check that produced this finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_check: Option<String>,
    /// Set when the requirement was skipped for lack of a capability.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl Finding {
    pub fn new(
        section: impl Into<String>,
        requirement: impl Into<String>,
        status: Status,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            requirement: requirement.into(),
            status,
            detail: detail.into(),
            source_check: None,
            skipped: false,
        }
    }

    /// Build a finding from a textual status, rejecting anything but
    /// `PASS`, `WARNING` and `FAIL`.
    pub fn try_new(
        section: impl Into<String>,
        requirement: impl Into<String>,
        status: &str,
        detail: impl Into<String>,
    ) -> Result<Self, ValidatorError> {
        Ok(Self::new(section, requirement, status.parse()?, detail))
    }
}

/// Counts of findings per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    /// Findings that were skipped for lack of a capability (also counted as warnings).
    pub skipped: usize,
}

/// Ordered, append-only collection of findings.
///
/// `ok()` is derived from the findings, so it can never disagree with them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    findings: Vec<Finding>,
    /// Set when the run producing this report was cancelled part way.
    #[serde(default)]
    interrupted: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding.
    pub fn add(
        &mut self,
        section: impl Into<String>,
        requirement: impl Into<String>,
        status: Status,
        detail: impl Into<String>,
    ) {
        self.findings.push(Finding::new(section, requirement, status, detail));
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.findings.iter()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn ok(&self) -> bool {
        !self.has_fails()
    }

    pub fn has_fails(&self) -> bool {
        self.findings.iter().any(|f| f.status == Status::Fail)
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Append all findings of `other`, after the existing ones.
    pub fn merge(&mut self, other: Report) {
        self.findings.extend(other.findings);
        self.interrupted |= other.interrupted;
    }

    /// Combine two reports into a new one, `self` first.
    pub fn merged(mut self, other: Report) -> Report {
        self.merge(other);
        self
    }

    /// Tag every finding with the check that produced it.
    pub fn stamp_source(&mut self, check_id: &str) {
        for finding in &mut self.findings {
            finding.source_check = Some(check_id.to_string());
        }
    }

    pub fn summary(&self) -> Summary {
        self.findings.iter().fold(Summary::default(), |mut acc, f| {
            match f.status {
                Status::Pass => acc.passed += 1,
                Status::Warning => acc.warnings += 1,
                Status::Fail => acc.failed += 1,
            }
            if f.skipped {
                acc.skipped += 1;
            }
            acc
        })
    }

    /// One-line summary of the report.
    pub fn summarize(&self) -> String {
        let s = self.summary();
        format!(
            "Summary: {} fail(s), {} warning(s), {} pass(es).",
            s.failed, s.warnings, s.passed
        )
    }

    /// Findings with the given requirement title, in report order.
    pub fn by_requirement<'a>(&'a self, requirement: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.requirement == requirement)
    }
}

impl AddAssign for Report {
    fn add_assign(&mut self, rhs: Report) {
        self.merge(rhs);
    }
}

impl Add for Report {
    type Output = Report;

    fn add(self, rhs: Report) -> Report {
        self.merged(rhs)
    }
}

impl Extend<Finding> for Report {
    fn extend<T: IntoIterator<Item = Finding>>(&mut self, iter: T) {
        self.findings.extend(iter);
    }
}

impl FromIterator<Finding> for Report {
    fn from_iter<T: IntoIterator<Item = Finding>>(iter: T) -> Self {
        Self {
            findings: iter.into_iter().collect(),
            interrupted: false,
        }
    }
}

impl IntoIterator for Report {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a Finding;
    type IntoIter = std::slice::Iter<'a, Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(statuses: &[Status]) -> Report {
        let mut r = Report::new();
        for (i, status) in statuses.iter().enumerate() {
            Report::add(&mut r, "1", format!("req {i}"), *status, "");
        }
        r
    }

    #[test]
    fn test_status_parsing_is_closed() {
        assert_eq!("PASS".parse::<Status>().unwrap(), Status::Pass);
        assert_eq!("WARNING".parse::<Status>().unwrap(), Status::Warning);
        assert_eq!("FAIL".parse::<Status>().unwrap(), Status::Fail);
        for bad in ["INFO", "pass", "", " FAIL", "ERROR"] {
            assert!(matches!(bad.parse::<Status>(), Err(ValidatorError::InvalidStatus(_))));
        }
    }

    #[test]
    fn test_try_new_rejects_unknown_status() {
        assert!(Finding::try_new("1", "r", "INFO", "").is_err());
        let f = Finding::try_new("1", "r", "WARNING", "d").unwrap();
        assert_eq!(f.status, Status::Warning);
    }

    #[test]
    fn test_empty_report_is_ok() {
        let r = Report::new();
        assert!(r.ok());
        assert!(!r.has_fails());
        assert_eq!(r.summarize(), "Summary: 0 fail(s), 0 warning(s), 0 pass(es).");
    }

    #[test]
    fn test_ok_tracks_fails() {
        assert!(report(&[Status::Pass, Status::Warning]).ok());
        assert!(!report(&[Status::Pass, Status::Fail]).ok());
    }

    #[test]
    fn test_merge_preserves_order_and_ok() {
        let left = report(&[Status::Pass, Status::Warning]);
        let right = report(&[Status::Fail]);

        let merged = left.clone() + right.clone();
        assert_eq!(merged.len(), 3);
        assert_eq!(&merged.findings()[..2], left.findings());
        assert_eq!(&merged.findings()[2..], right.findings());
        assert_eq!(merged.ok(), left.ok() && right.ok());

        let mut in_place = left.clone();
        in_place += right;
        assert_eq!(in_place, merged);
    }

    #[test]
    fn test_summary_counts() {
        let mut r = report(&[Status::Pass, Status::Pass, Status::Warning, Status::Fail]);
        let mut skipped = Finding::new("6.1", "GDAL roundtrip", Status::Warning, "skipped");
        skipped.skipped = true;
        r.push(skipped);

        let s = r.summary();
        assert_eq!((s.failed, s.warnings, s.passed, s.skipped), (1, 2, 2, 1));
        assert_eq!(r.summarize(), "Summary: 1 fail(s), 2 warning(s), 2 pass(es).");
    }

    #[test]
    fn test_stamp_source() {
        let mut r = report(&[Status::Pass, Status::Fail]);
        r.stamp_source("licensing");
        assert!(r.iter().all(|f| f.source_check.as_deref() == Some("licensing")));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let f = Finding::new("5.2", "License metadata", Status::Fail, "missing");
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert!(json.get("skipped").is_none());
    }
}
