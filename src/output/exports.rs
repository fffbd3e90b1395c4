use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::insights::{CycleInsights, MetricRecord};

const CYCLE_TIME_HEADER: [&str; 6] = [
    "Title",
    "Url",
    "Doing At",
    "Done At",
    "Circle Time (days)",
    "Milestone",
];

const LEAD_TIME_HEADER: [&str; 10] = [
    "Title",
    "Url",
    "Doing At",
    "Done At",
    "Commited At",
    "Deployed At",
    "Circle Time (days)",
    "Lead Time (days)",
    "Points",
    "Milestone",
];

/// Writes the CSV report to `path`, replacing any existing file.
///
/// Rows go to a temporary file next to `path` which is renamed over the
/// destination only once everything has been flushed, so a failed run never
/// leaves a partial report behind.
pub fn write_csv_report(insights: &CycleInsights, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    export_csv(insights, file.as_file_mut())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    info!("Report written to: {}", path.display());
    Ok(())
}

/// Serializes every record, milestone by milestone, as CSV.
pub fn export_csv(insights: &CycleInsights, output: impl Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);

    if insights.include_lead_time {
        writer.write_record(LEAD_TIME_HEADER)?;
    } else {
        writer.write_record(CYCLE_TIME_HEADER)?;
    }

    for milestone in &insights.milestones {
        for record in &milestone.records {
            writer.write_record(csv_row(record, &milestone.title, insights.include_lead_time))?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn csv_row(record: &MetricRecord, milestone: &str, include_lead_time: bool) -> Vec<String> {
    let mut row = vec![
        record.title.clone(),
        record.url.clone(),
        format_date(record.doing_at),
        format_date(record.done_at),
    ];

    match (&record.delivery, include_lead_time) {
        (Some(delivery), true) => row.extend([
            format_date(delivery.committed_at),
            format_date(delivery.deployed_at),
            format_days(record.cycle_time_days),
            format_days(delivery.lead_time_days),
            delivery.points.to_string(),
        ]),
        (None, true) => row.extend([
            String::new(),
            String::new(),
            format_days(record.cycle_time_days),
            String::new(),
            "0".to_string(),
        ]),
        (_, false) => row.push(format_days(record.cycle_time_days)),
    }

    row.push(milestone.to_string());
    row
}

fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn format_days(days: Option<i64>) -> String {
    days.map(|days| days.to_string()).unwrap_or_default()
}

/// Dumps the full result set as JSON.
pub fn export_json(insights: &CycleInsights, pretty: bool, mut output: impl Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(insights)?
    } else {
        serde_json::to_string(insights)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}
