//! Table rendering for benchmark reports.
//!
//! This module provides [`ReportTable`], which renders a collection of
//! [`BenchReport`]s as a formatted ASCII table using the `tabled` crate.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! contesa = { version = "0.2", features = ["table"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use contesa::report::{ReportTable, ReportStyle};
//!
//! let table = ReportTable::new().with_style(ReportStyle::Rounded);
//! println!("{}", table.render(&reports));
//! // ╭───────────────────┬──────────┬────────┬──────┬────────┬────────┬─────────╮
//! // │ Strategy          │ Expected │ Actual │ Lost │ Loss % │ Failed │ Elapsed │
//! // ├───────────────────┼──────────┼────────┼──────┼────────┼────────┼─────────┤
//! // │ read-modify-write │ 100000   │ 63412  │ ...  │        │        │         │
//! // ╰───────────────────┴──────────┴────────┴──────┴────────┴────────┴─────────╯
//! ```

use tabled::{settings::Style, Table, Tabled};

use crate::harness::BenchReport;

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// GitHub-flavored Markdown table
    Markdown,
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Expected")]
    expected: u64,
    #[tabled(rename = "Actual")]
    actual: u64,
    #[tabled(rename = "Lost")]
    lost: i64,
    #[tabled(rename = "Loss %")]
    loss_pct: String,
    #[tabled(rename = "Failed")]
    failed: u64,
    #[tabled(rename = "Elapsed")]
    elapsed: String,
}

impl From<&BenchReport> for ReportRow {
    fn from(report: &BenchReport) -> Self {
        ReportRow {
            strategy: report.strategy.clone(),
            expected: report.expected,
            actual: report.actual,
            lost: report.lost,
            loss_pct: format!("{:.2}", report.loss_percentage()),
            failed: report.failed_iterations,
            elapsed: format!("{:.2?}", report.elapsed),
        }
    }
}

/// Renders benchmark reports as a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportTable {
    style: ReportStyle,
}

impl ReportTable {
    /// Creates a renderer with the default rounded style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table style, returning `self` for method chaining.
    pub fn with_style(self, style: ReportStyle) -> Self {
        ReportTable { style }
    }

    /// Renders `reports` as a table, one row per report.
    pub fn render(&self, reports: &[BenchReport]) -> String {
        let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from).collect();
        let mut table = Table::new(rows);
        match self.style {
            ReportStyle::Ascii => table.with(Style::ascii()),
            ReportStyle::Rounded => table.with(Style::rounded()),
            ReportStyle::Markdown => table.with(Style::markdown()),
        };
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_report() -> BenchReport {
        BenchReport {
            strategy: "read-modify-write".into(),
            expected: 1000,
            actual: 750,
            lost: 250,
            failed_iterations: 0,
            elapsed: Duration::from_millis(1234),
        }
    }

    #[test]
    fn test_render_contains_fields() {
        let rendered = ReportTable::new().render(&[sample_report()]);
        assert!(rendered.contains("read-modify-write"));
        assert!(rendered.contains("1000"));
        assert!(rendered.contains("750"));
        assert!(rendered.contains("250"));
        assert!(rendered.contains("25.00"));
    }

    #[test]
    fn test_render_empty_slice() {
        let rendered = ReportTable::new().render(&[]);
        // Headers only; must not panic.
        assert!(rendered.contains("Strategy") || rendered.is_empty());
    }

    #[test]
    fn test_markdown_style() {
        let rendered = ReportTable::new()
            .with_style(ReportStyle::Markdown)
            .render(&[sample_report()]);
        assert!(rendered.contains('|'));
    }
}
