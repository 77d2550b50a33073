//! Console rendering of reports and listings.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use compliance::{CatalogEntry, Report, RequirementListing, Status};

/// Formats reports for the terminal.
pub struct ReportRenderer;

impl ReportRenderer {
    /// Findings as a table followed by the summary line.
    pub fn format_table(title: &str, report: &Report) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Section", "Requirement", "Status", "Detail", "Check"]);

        for finding in report {
            table.add_row(vec![
                Cell::new(&finding.section),
                Cell::new(&finding.requirement),
                Cell::new(finding.status.as_str()).fg(status_color(finding.status)),
                Cell::new(&finding.detail),
                Cell::new(finding.source_check.as_deref().unwrap_or("")),
            ]);
        }

        let mut out = format!("{title}\n{table}\n{}", report.summarize());
        if report.interrupted() {
            out.push_str("\nValidation was interrupted; the report is partial.");
        }
        out
    }

    /// `--list` output.
    pub fn format_catalog(entries: &[CatalogEntry]) -> String {
        let mut lines = vec!["Implemented specifications:".to_string()];
        for entry in entries {
            lines.push(format!(
                "  - {}: {}@{} (default {})",
                entry.stage,
                entry.product,
                entry.versions.join(", "),
                entry.default_version
            ));
        }
        lines.join("\n")
    }

    /// `--print-spec` output.
    pub fn format_requirements(identity: &str, listing: &[RequirementListing]) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Section", "Check", "Requirement"]);
        for item in listing {
            table.add_row(vec![&item.section, &item.check, &item.description]);
        }
        format!("Requirements of {identity}\n{table}")
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Pass => Color::Green,
        Status::Warning => Color::Yellow,
        Status::Fail => Color::Red,
    }
}
