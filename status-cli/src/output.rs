use anyhow::Result;
use serde::Serialize;
use source_status::coordinator::CoordinatorState;
use source_status::{SourceStatus, StatusEvent, StatusRecord};

use crate::cli::OutputFormat;

/// Final result of `srcstat run`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Whether every id reached a terminal status before the wait expired.
    pub settled: bool,
    pub state: CoordinatorState,
    pub statuses: Vec<StatusRecord>,
}

impl RunReport {
    pub fn count(&self, status: SourceStatus) -> usize {
        self.statuses.iter().filter(|r| r.status == status).count()
    }
}

pub fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Pretty => {
            for record in &report.statuses {
                println!("{}", format_record(record));
            }
            println!();
            let summary: Vec<String> = SourceStatus::ALL
                .iter()
                .map(|status| (status, report.count(*status)))
                .filter(|(_, count)| *count > 0)
                .map(|(status, count)| format!("{status}: {count}"))
                .collect();
            println!("{}", summary.join(", "));
            println!(
                "{} cycle(s), {} failed, phase {:?}{}",
                report.state.total_cycles,
                report.state.failed_cycles,
                report.state.phase,
                if report.settled { "" } else { " (not settled)" }
            );
        }
    }
    Ok(())
}

pub fn print_event(event: &StatusEvent, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Pretty => println!("event: {}", event.description()),
    }
    Ok(())
}

fn format_record(record: &StatusRecord) -> String {
    let mut line = format!("{:>8}  {:<11}", record.resource_id, record.status.as_str());
    if let Some(resource_type) = &record.resource_type {
        line.push_str(&format!("  {resource_type:<8}"));
    }
    if let Some(message) = &record.error_message {
        match &record.error_code {
            Some(code) => line.push_str(&format!("  [{code}] {message}")),
            None => line.push_str(&format!("  {message}")),
        }
    }
    line.trim_end().to_string()
}
