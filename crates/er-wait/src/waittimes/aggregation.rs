//! Read views derived from approved reports.
//!
//! Every function here is a pure reducer over a snapshot fetched at request time. Pending and
//! rejected entries are filtered out even if a caller passes them in.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, FixedOffset, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::{SubmissionStatus, WaitTimeSubmission};

/// Latest approved report per hospital.
pub type CurrentWaitTimes = BTreeMap<String, WaitTimeSubmission>;

/// Rounded average minutes per hospital, then per weekday.
pub type WeekdayTrends = BTreeMap<String, BTreeMap<TrendDay, u32>>;

/// Locale-independent weekday label used as the trend bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrendDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl TrendDay {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for TrendDay {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

fn approved(submissions: &[WaitTimeSubmission]) -> impl Iterator<Item = &WaitTimeSubmission> {
    submissions
        .iter()
        .filter(|submission| submission.status == SubmissionStatus::Approved)
}

/// One entry per hospital: the approved report with the greatest timestamp.
///
/// Ties on identical timestamps resolve to whichever the sort leaves first.
pub fn current_wait_times(submissions: &[WaitTimeSubmission]) -> CurrentWaitTimes {
    let mut newest_first: Vec<&WaitTimeSubmission> = approved(submissions).collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut seen = HashSet::new();
    let mut latest = BTreeMap::new();
    for submission in newest_first {
        if seen.insert(submission.hospital_name.as_str()) {
            latest.insert(submission.hospital_name.clone(), submission.clone());
        }
    }
    latest
}

/// Every approved report, oldest first, without deduplication.
pub fn approved_history(submissions: &[WaitTimeSubmission]) -> Vec<WaitTimeSubmission> {
    let mut history: Vec<WaitTimeSubmission> = approved(submissions).cloned().collect();
    history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    history
}

/// Weekday averages with the day taken in UTC.
pub fn trends_by_weekday(submissions: &[WaitTimeSubmission]) -> WeekdayTrends {
    trends_by_weekday_in(submissions, Utc.fix())
}

/// Weekday averages with the day taken in `offset`. Empty buckets are absent, never zero.
pub fn trends_by_weekday_in(
    submissions: &[WaitTimeSubmission],
    offset: FixedOffset,
) -> WeekdayTrends {
    let mut buckets: BTreeMap<&str, BTreeMap<TrendDay, (u64, u64)>> = BTreeMap::new();
    for submission in approved(submissions) {
        let day = TrendDay::from(submission.timestamp.with_timezone(&offset).weekday());
        let (sum, count) = buckets
            .entry(submission.hospital_name.as_str())
            .or_default()
            .entry(day)
            .or_insert((0, 0));
        *sum += u64::from(submission.wait_time);
        *count += 1;
    }

    buckets
        .into_iter()
        .map(|(hospital, days)| {
            let averages = days
                .into_iter()
                .map(|(day, (sum, count))| (day, rounded_mean(sum, count)))
                .collect();
            (hospital.to_string(), averages)
        })
        .collect()
}

/// Round-half-up integer mean. `count` is never zero for a populated bucket.
fn rounded_mean(sum: u64, count: u64) -> u32 {
    let mean = (2 * sum + count) / (2 * count);
    u32::try_from(mean).unwrap_or(u32::MAX)
}
