//! CSV loader for historical wait-time reports.
//!
//! Expected header: `hospital_name,wait_time,timestamp,status`. `status` may be blank, in which
//! case the report enters the review queue as `pending`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

use super::domain::{parse_wait_time, NewSubmission, SubmissionStatus, ValidationError};

/// A validated CSV row plus the moderation decision to replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedReport {
    pub submission: NewSubmission,
    pub status: SubmissionStatus,
}

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow {
        line: u64,
        source: ValidationError,
    },
    InvalidTimestamp {
        line: u64,
        value: String,
    },
    InvalidStatus {
        line: u64,
        value: String,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read report export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid report CSV data: {}", err),
            ImportError::InvalidRow { line, source } => {
                write!(f, "line {}: {}", line, source)
            }
            ImportError::InvalidTimestamp { line, value } => write!(
                f,
                "line {}: timestamp '{}' is not RFC 3339 or YYYY-MM-DD",
                line, value
            ),
            ImportError::InvalidStatus { line, value } => write!(
                f,
                "line {}: status '{}' is not pending, approved or rejected",
                line, value
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { source, .. } => Some(source),
            ImportError::InvalidTimestamp { .. } | ImportError::InvalidStatus { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub fn read_reports_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ImportedReport>, ImportError> {
    let file = std::fs::File::open(path)?;
    read_reports(file)
}

pub fn read_reports<R: Read>(reader: R) -> Result<Vec<ImportedReport>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut reports = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let row: ReportRow = record.deserialize(Some(&headers))?;
        reports.push(row.into_report(line)?);
    }

    Ok(reports)
}

#[derive(Debug, Deserialize)]
struct ReportRow {
    hospital_name: String,
    wait_time: String,
    timestamp: String,
    #[serde(default)]
    status: Option<String>,
}

impl ReportRow {
    fn into_report(self, line: u64) -> Result<ImportedReport, ImportError> {
        let wait_time = parse_wait_time(&Value::String(self.wait_time))
            .map_err(|source| ImportError::InvalidRow { line, source })?;
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or_else(|| ImportError::InvalidTimestamp {
                line,
                value: self.timestamp.clone(),
            })?;
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => SubmissionStatus::Pending,
            Some(raw) => SubmissionStatus::parse(raw).ok_or_else(|| ImportError::InvalidStatus {
                line,
                value: raw.to_string(),
            })?,
        };
        let submission = NewSubmission::new(&self.hospital_name, wait_time, timestamp)
            .map_err(|source| ImportError::InvalidRow { line, source })?;

        Ok(ImportedReport { submission, status })
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
