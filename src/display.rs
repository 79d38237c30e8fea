//! Output Formatting and Display Management
//!
//! Renders a projected [`UsageReport`] either as aligned text tables or as a
//! single JSON document.
//!
//! ## Text layout
//!
//! Each selected report gets a boxed heading followed by a table. Counts and
//! hours are printed as whole numbers with thousands separators, per-row
//! hours rounded to the nearest hour, percentages to one decimal place.
//! Every table ends with a `TOTALS` row covering all entries, including
//! rows cut by the user limit.
//!
//! ## JSON layout
//!
//! ```json
//! {
//!   "report": { "header": {...}, "totals": {...}, "owners": {...}, ... },
//!   "warnings": [ { "job_id": "1234.1", "job_name": "run.sh", ... } ]
//! }
//! ```

use crate::core_hours::DataQualityWarning;
use crate::report::{UsageFigures, UsageReport, UserTable};
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use colored::Colorize;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_json(&self, report: &UsageReport, warnings: &[DataQualityWarning]) -> Result<()> {
        let output = serde_json::json!({ "report": report, "warnings": warnings });
        let json_str = serde_json::to_string_pretty(&output).context("Error serializing report to JSON")?;
        println!("{}", json_str);
        Ok(())
    }

    pub fn display_report(&self, report: &UsageReport) {
        print!("{}", self.render(report));
    }

    /// The text form of `report`, as printed by [`display_report`](Self::display_report).
    pub fn render(&self, report: &UsageReport) -> String {
        let mut out = String::new();

        if let Some(header) = &report.header {
            out.push_str("Accounting summary, reporting on jobs ending in the range:\n");
            out.push_str(&format!(" Start: {}\n", format_epoch(header.start)));
            out.push_str(&format!(" End: {}\n", format_epoch(header.end)));
            out.push_str(&format!(
                " Duration: {} hours Cores: {}\n\n",
                header.duration_hours, header.cores
            ));
        }

        if let Some(totals) = &report.totals {
            out.push_str(&heading("Totals:"));
            let mut table = Table::new(&["Owners", "Uniq Usrs", "Jobs", "Core Hrs", "%Utl", "Adj Core Hrs", "%Utl"]);
            table.row(vec![
                thousands(totals.owners as f64),
                thousands(totals.unique_users as f64),
                thousands(totals.figures.jobs as f64),
                thousands(totals.figures.core_hours),
                percent(totals.figures.utilization_pct),
                thousands(totals.figures.adjusted_core_hours),
                percent(totals.figures.adjusted_utilization_pct),
            ]);
            out.push_str(&table.render());
        }

        if let Some(owners) = &report.owners {
            out.push_str(&heading("Top owners:"));
            let mut table = Table::new(&[
                "Owner", "Parent", "Uniq Usrs", "Jobs", "Core Hrs", "%Utl", "Adj Core Hrs", "%Utl", "%Usg",
            ]);
            for row in &owners.rows {
                let mut cells = vec![row.owner.clone(), row.parent.clone(), thousands(row.users as f64)];
                cells.extend(figure_cells(&row.figures, true));
                table.row(cells);
            }
            let mut cells = vec![
                "TOTALS".to_string(),
                "-".to_string(),
                thousands(owners.totals.unique_users as f64),
            ];
            cells.extend(figure_cells(&owners.totals.figures, false));
            table.row(cells);
            out.push_str(&table.render());
        }

        if let Some(users) = &report.users {
            out.push_str(&heading("Top users:"));
            out.push_str(&format!("{} active users.\n", users.active_users));
            out.push_str(&user_table(users, true).render());
        }

        if let Some(by_owner) = &report.users_by_owner {
            out.push_str(&heading("Top users by owner:"));
            for owner in by_owner {
                out.push_str(&format!("Owner: {}\n", owner.owner.bold()));
                out.push_str(&format!("{} active users.\n", owner.table.active_users));
                out.push_str(&user_table(&owner.table, false).render());
            }
        }

        if report.warnings > 0 {
            out.push_str(&format!(
                "{} {} jobs had no usable memory information and were counted unadjusted\n",
                "⚠".yellow(),
                report.warnings.to_string().yellow().bold()
            ));
        }

        out
    }
}

fn heading(title: &str) -> String {
    let rule = "=".repeat(title.chars().count());
    format!(
        "{}\n{}\n{}\n\n",
        rule.bright_cyan(),
        title.bright_white().bold(),
        rule.bright_cyan()
    )
}

fn user_table(users: &UserTable, with_owners: bool) -> Table {
    let mut headers = vec!["Usr"];
    if with_owners {
        headers.push("Owner(s)");
    }
    headers.extend(["Jobs", "Core Hrs", "%Utl", "Adj Core Hrs", "%Utl", "%Usg"]);

    let mut table = Table::new(&headers);
    for row in &users.rows {
        let mut cells = vec![row.user.clone()];
        if with_owners {
            cells.push(row.owners.join(","));
        }
        cells.extend(figure_cells(&row.figures, true));
        table.row(cells);
    }

    let mut cells = vec!["TOTALS".to_string()];
    if with_owners {
        cells.push("-".to_string());
    }
    cells.extend(figure_cells(&users.totals, false));
    table.row(cells);
    table
}

/// Jobs, hours, %util, adjusted hours, %util, %usage.
fn figure_cells(figures: &UsageFigures, round_hours: bool) -> Vec<String> {
    let hours = |h: f64| if round_hours { h.round() } else { h };
    vec![
        thousands(figures.jobs as f64),
        thousands(hours(figures.core_hours)),
        percent(figures.utilization_pct),
        thousands(hours(figures.adjusted_core_hours)),
        percent(figures.adjusted_utilization_pct),
        percent(figures.usage_pct),
    ]
}

fn format_epoch(epoch: i64) -> String {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

/// Whole number with `,` thousands separators.
pub fn thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Plain text table; first column left aligned, the rest right aligned.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, width))| {
                    if i == 0 {
                        format!("{:<width$}", cell, width = *width)
                    } else {
                        format!("{:>width$}", cell, width = *width)
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&self.headers));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Header, TotalsRow};

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.4), "999");
        assert_eq!(thousands(1234.0), "1,234");
        assert_eq!(thousands(1234567.6), "1,234,568");
        assert_eq!(thousands(-4321.0), "-4,321");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(12.345), "12.3%");
        assert_eq!(percent(0.0), "0.0%");
    }

    #[test]
    fn test_render_header_and_totals() {
        colored::control::set_override(false);
        let figures = UsageFigures {
            jobs: 1200,
            core_hours: 5000.0,
            utilization_pct: 50.0,
            adjusted_core_hours: 7500.0,
            adjusted_utilization_pct: 75.0,
            usage_pct: 100.0,
        };
        let report = UsageReport {
            header: Some(Header {
                start: 1514764800,
                end: 1546300800,
                duration_hours: 8760,
                cores: 10,
            }),
            totals: Some(TotalsRow {
                owners: 3,
                unique_users: 40,
                figures,
            }),
            ..UsageReport::default()
        };

        let text = DisplayManager::new().render(&report);
        assert!(text.contains("Start: Mon, 01 Jan 2018 00:00:00 UTC"));
        assert!(text.contains("Duration: 8760 hours Cores: 10"));
        assert!(text.contains("Totals:"));
        assert!(text.contains("1,200"));
        assert!(text.contains("7,500"));
        assert!(text.contains("75.0%"));
        assert!(!text.contains("Top owners:"));
    }

    #[test]
    fn test_table_alignment() {
        let mut table = Table::new(&["Usr", "Jobs"]);
        table.row(vec!["alice".to_string(), "5".to_string()]);
        table.row(vec!["TOTALS".to_string(), "12,345".to_string()]);
        let text = table.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Usr       Jobs");
        assert_eq!(lines[2], "alice        5");
        assert_eq!(lines[3], "TOTALS  12,345");
    }
}
