use crate::infra::{InMemoryNotifier, InMemorySubmissionRepository};
use chrono::FixedOffset;
use clap::Args;
use er_wait::config::{parse_trend_offset, AppConfig, ModerationConfig};
use er_wait::error::AppError;
use er_wait::waittimes::{
    read_reports, read_reports_from_path, ImportError, ImportedReport, ModerationService,
    ReviewerNotifier, SubmissionRepository, SubmissionStatus, TrendDay, WaitTimeSubmission,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// CSV of historical reports (hospital_name,wait_time,timestamp,status).
    /// Defaults to a built-in sample week.
    #[arg(long)]
    pub(crate) reports_csv: Option<PathBuf>,
    /// Evaluate weekdays at this offset from UTC, in minutes. Falls back to
    /// TREND_UTC_OFFSET_MINUTES.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) utc_offset_minutes: Option<i32>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        reports_csv,
        utc_offset_minutes,
    } = args;

    let mut moderation = AppConfig::load()?.moderation;
    if let Some(minutes) = utc_offset_minutes {
        moderation.trend_offset = parse_trend_offset(&minutes.to_string())?;
    }

    let (reports, source) = match reports_csv {
        Some(path) => {
            let reports = read_reports_from_path(&path)?;
            (reports, format!("CSV import ({})", path.display()))
        }
        None => (sample_reports()?, "built-in sample week".to_string()),
    };

    let service = ModerationService::new(
        Arc::new(InMemorySubmissionRepository::default()),
        Arc::new(InMemoryNotifier::default()),
        ModerationConfig {
            notify_on_submit: false,
            ..moderation.clone()
        },
    );

    let imported = seed(&service, reports)?;

    println!("ER wait time demo");
    println!("Data source: {source}");
    println!(
        "Reports loaded: {} ({} approved, {} pending, {} rejected)",
        imported.len(),
        count_status(&imported, SubmissionStatus::Approved),
        count_status(&imported, SubmissionStatus::Pending),
        count_status(&imported, SubmissionStatus::Rejected),
    );
    println!("Trend offset: UTC{}", moderation.trend_offset);

    render_views(&service, moderation.trend_offset);
    Ok(())
}

/// Replays the reports into the store; a failed import leaves nothing behind and ends the run.
fn seed<R, N>(
    service: &ModerationService<R, N>,
    reports: Vec<ImportedReport>,
) -> Result<Vec<WaitTimeSubmission>, AppError>
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    Ok(service.import(reports)?)
}

fn render_views(
    service: &ModerationService<InMemorySubmissionRepository, InMemoryNotifier>,
    offset: FixedOffset,
) {
    match service.current_wait_times() {
        Ok(current) if current.is_empty() => println!("\nCurrent wait times: no approved reports"),
        Ok(current) => {
            println!("\nCurrent wait times");
            for (hospital, report) in &current {
                println!(
                    "- {hospital}: {} min (reported {})",
                    report.wait_time,
                    report.timestamp.with_timezone(&offset).format("%a %Y-%m-%d %H:%M")
                );
            }
        }
        Err(err) => println!("\nCurrent wait times unavailable: {err}"),
    }

    match service.approved_history() {
        Ok(history) => {
            println!("\nApproved history ({} reports)", history.len());
            for report in &history {
                println!(
                    "  {}  {:<24} {:>4} min",
                    report.timestamp.with_timezone(&offset).format("%Y-%m-%d %H:%M"),
                    report.hospital_name,
                    report.wait_time
                );
            }
        }
        Err(err) => println!("\nApproved history unavailable: {err}"),
    }

    match service.trends_by_weekday() {
        Ok(trends) if trends.is_empty() => println!("\nWeekday trends: none"),
        Ok(trends) => {
            println!("\nWeekday trends (mean minutes)");
            for (hospital, days) in &trends {
                let row = days
                    .iter()
                    .map(|(day, mean)| format!("{}={mean}", short_label(*day)))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("- {hospital}: {row}");
            }
        }
        Err(err) => println!("\nWeekday trends unavailable: {err}"),
    }

    match service.list_pending() {
        Ok(pending) if pending.is_empty() => println!("\nModeration queue: empty"),
        Ok(pending) => {
            println!("\nModeration queue ({} pending)", pending.len());
            for report in &pending {
                println!(
                    "- {} {}: {} min",
                    report.id, report.hospital_name, report.wait_time
                );
            }
        }
        Err(err) => println!("\nModeration queue unavailable: {err}"),
    }
}

fn short_label(day: TrendDay) -> &'static str {
    &day.label()[..3]
}

fn count_status(reports: &[WaitTimeSubmission], status: SubmissionStatus) -> usize {
    reports
        .iter()
        .filter(|report| report.status == status)
        .count()
}

/// One week of reports starting Monday 2025-03-03.
const SAMPLE_WEEK: &str = "\
hospital_name,wait_time,timestamp,status
County General,45,2025-03-03T08:00:00Z,approved
County General,70,2025-03-03T19:00:00Z,approved
County General,35,2025-03-04T09:00:00Z,approved
County General,300,2025-03-04T13:00:00Z,rejected
County General,55,2025-03-06T21:00:00Z,approved
Lakeside Medical,20,2025-03-03T10:00:00Z,approved
Lakeside Medical,25,2025-03-05T11:00:00Z,approved
Lakeside Medical,30,2025-03-05T18:00:00Z,approved
Lakeside Medical,15,2025-03-07T07:00:00Z,pending
St. Anne's,90,2025-03-08T15:00:00Z,approved
St. Anne's,110,2025-03-09T16:00:00Z,approved
St. Anne's,60,2025-03-09T22:00:00Z,pending
";

fn sample_reports() -> Result<Vec<ImportedReport>, ImportError> {
    read_reports(SAMPLE_WEEK.as_bytes())
}
