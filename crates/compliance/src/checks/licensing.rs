//! Dataset licence (section 5.2).

use async_trait::async_trait;
use mlcast_common::{AttributesExt, Dataset};
use tracing::debug;

use super::{Check, CheckContext};
use crate::license;
use crate::report::{Report, Status};

const SECTION: &str = "5.2";
const MAX_SUGGESTIONS: usize = 3;
const SUGGESTION_CUTOFF: f64 = 0.6;

pub struct LicensingCheck {
    require_spdx: bool,
    recommended: Vec<String>,
    warn_on_restricted: Vec<String>,
}

impl LicensingCheck {
    pub fn new(require_spdx: bool, recommended: &[&str], warn_on_restricted: &[&str]) -> Self {
        Self {
            require_spdx,
            recommended: recommended.iter().map(|r| r.to_string()).collect(),
            warn_on_restricted: warn_on_restricted.iter().map(|t| t.to_uppercase()).collect(),
        }
    }
}

fn with_suggestions(message: String, value: &str) -> String {
    let suggestions = license::suggest(value, MAX_SUGGESTIONS, SUGGESTION_CUTOFF);
    if suggestions.is_empty() {
        message
    } else {
        format!("{message}. Did you mean: {}?", suggestions.join(", "))
    }
}

#[async_trait]
impl Check for LicensingCheck {
    fn id(&self) -> &str {
        "licensing"
    }

    fn section(&self) -> &str {
        SECTION
    }

    fn describe(&self) -> String {
        format!(
            "SPDX licence{}, recommended: {}",
            if self.require_spdx { " (required)" } else { "" },
            self.recommended.join(", ")
        )
    }

    async fn evaluate(&self, dataset: &Dataset, _ctx: &CheckContext) -> Report {
        let mut report = Report::new();
        let Some(license_id) = dataset.attrs.text("license") else {
            report.add(
                SECTION,
                "License metadata",
                Status::Fail,
                "Missing required 'license' global attribute",
            );
            return report;
        };
        let license_id = license_id.trim();

        let normalized = match license::normalize(license_id) {
            Ok(normalized) => normalized,
            Err(e) => {
                debug!(license = license_id, error = %e, "License did not parse");
                let status = if self.require_spdx { Status::Fail } else { Status::Warning };
                report.add(
                    SECTION,
                    "License compliance",
                    status,
                    with_suggestions(
                        format!("License '{license_id}' is not a valid SPDX expression: {e}"),
                        license_id,
                    ),
                );
                return report;
            }
        };
        debug!(license = license_id, normalized = %normalized, "License parsed");

        let mut recommended = Vec::new();
        for value in &self.recommended {
            match license::normalize(value) {
                Ok(n) => recommended.push(n),
                Err(e) => report.add(
                    SECTION,
                    "License compliance",
                    Status::Warning,
                    with_suggestions(format!("Recommended license '{value}' is not valid SPDX: {e}"), value),
                ),
            }
        }

        let upper = normalized.to_uppercase();
        if recommended.contains(&normalized) {
            report.add(
                SECTION,
                "License compliance",
                Status::Pass,
                format!("License '{normalized}' is recommended and accepted"),
            );
        } else if self.warn_on_restricted.iter().any(|token| upper.contains(token.as_str())) {
            report.add(
                SECTION,
                "License compliance",
                Status::Warning,
                format!("License '{normalized}' has restrictions (NC/ND)"),
            );
        } else {
            report.add(
                SECTION,
                "License compliance",
                Status::Warning,
                format!("License '{normalized}' requires case-by-case review"),
            );
        }
        report
    }
}
