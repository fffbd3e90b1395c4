use std::fmt::Write;

use comfy_table::Cell;

use crate::insights::{CycleInsights, MilestoneMetrics};

use super::styling::{bright, bright_yellow, cyan, dim};
use super::tables::{color_coded_days_cell, create_table, cyan_header};

/// Prints a per-milestone overview of the report to stderr.
///
/// Cycle times are color coded: green up to 3 days, yellow up to a week,
/// red beyond that.
pub fn print_summary(insights: &CycleInsights) {
    eprintln!("{}", render_summary(insights));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

/// Median and maximum of the known cycle times in a milestone.
fn cycle_time_stats(milestone: &MilestoneMetrics) -> (Option<i64>, Option<i64>) {
    let mut days: Vec<i64> = milestone
        .records
        .iter()
        .filter_map(|record| record.cycle_time_days)
        .collect();
    days.sort_unstable();

    let median = days.get(days.len() / 2).copied();
    (median, days.last().copied())
}

fn total_points(milestone: &MilestoneMetrics) -> u32 {
    milestone
        .records
        .iter()
        .filter_map(|record| record.delivery.as_ref())
        .map(|delivery| delivery.points)
        .sum()
}

fn render_summary(insights: &CycleInsights) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Repository:"),
        cyan(&insights.repository),
        dim("Issues reported:"),
        bright_yellow(insights.total_issues),
        dim("Issues skipped:"),
        bright_yellow(insights.skipped_issues),
        dim("Collected at:"),
        dim(insights.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if insights.milestones.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No milestones found."));
        return output;
    }

    add_section_header(&mut output, "🏁", "Milestones");

    let mut table = create_table();
    if insights.include_lead_time {
        table.set_header(cyan_header(&[
            "Milestone",
            "Issues",
            "Median Cycle",
            "Max Cycle",
            "Points",
        ]));
    } else {
        table.set_header(cyan_header(&["Milestone", "Issues", "Median Cycle", "Max Cycle"]));
    }

    for milestone in &insights.milestones {
        let (median, max) = cycle_time_stats(milestone);
        let mut row = vec![
            Cell::new(&milestone.title),
            Cell::new(milestone.records.len()),
            color_coded_days_cell(median),
            color_coded_days_cell(max),
        ];
        if insights.include_lead_time {
            row.push(Cell::new(total_points(milestone)));
        }
        table.add_row(row);
    }

    let _ = writeln!(output, "{table}");
    output
}
