//! Scenario report output: a prettytable summary or a JSON document

use crate::app::error::AppError;
use crate::app::scenarios::ScenarioReport;
use crate::core::styles::StyleRole;
use prettytable::{format, Cell, Row, Table};

fn cell(text: &str, role: StyleRole, use_color: bool) -> Cell {
    let cell = Cell::new(text);
    match role.to_prettytable_spec() {
        Some(spec) if use_color => cell.style_spec(&spec),
        _ => cell,
    }
}

fn row(label: &str, value: String, role: StyleRole, use_color: bool) -> Row {
    Row::new(vec![
        cell(label, StyleRole::Key, use_color),
        cell(&value, role, use_color),
    ])
}

/// Build the summary table for `report`
pub fn report_table(report: &ScenarioReport, use_color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(Row::new(vec![
        cell("Scenario", StyleRole::Header, use_color),
        cell(&report.scenario, StyleRole::Header, use_color),
    ]));

    let within_limit = report.peak_concurrency <= report.limit;
    let failures_role = if report.failures > 0 {
        StyleRole::Bad
    } else {
        StyleRole::Value
    };

    table.add_row(row("Operations", report.operations.to_string(), StyleRole::Value, use_color));
    table.add_row(row("Succeeded", report.successes.to_string(), StyleRole::Good, use_color));
    table.add_row(row("Failed", report.failures.to_string(), failures_role, use_color));
    table.add_row(row("Cancelled", report.cancelled.to_string(), StyleRole::Dim, use_color));
    table.add_row(row(
        "Peak concurrency",
        format!("{} / {}", report.peak_concurrency, report.limit),
        if within_limit { StyleRole::Good } else { StyleRole::Bad },
        use_color,
    ));
    for lane in &report.lanes {
        table.add_row(row(
            &format!("  {} lane", lane.priority),
            format!("{} / {}", lane.peak_concurrency, lane.capacity),
            StyleRole::Value,
            use_color,
        ));
    }
    if let Some(spacing) = report.min_spacing_ms {
        table.add_row(row("Min spacing", format!("{} ms", spacing), StyleRole::Value, use_color));
    }
    table.add_row(row("Started", report.started_at.clone(), StyleRole::Dim, use_color));
    table.add_row(row("Elapsed", format!("{} ms", report.elapsed_ms), StyleRole::Dim, use_color));

    table
}

pub fn render_json(report: &ScenarioReport) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write `report` to stdout
pub fn print_report(report: &ScenarioReport, json: bool, use_color: bool) -> Result<(), AppError> {
    if json {
        println!("{}", render_json(report)?);
    } else if use_color {
        report_table(report, true).printstd();
    } else {
        print!("{}", report_table(report, false));
    }
    Ok(())
}
