use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store-assigned identifier for a wait-time report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Moderation state of a report. Deletion is record removal, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single crowd-reported wait time as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitTimeSubmission {
    pub id: SubmissionId,
    pub hospital_name: String,
    pub wait_time: u32,
    pub status: SubmissionStatus,
    pub timestamp: DateTime<Utc>,
}

/// Untrusted public payload. Fields stay raw until [`SubmissionIntake::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionIntake {
    #[serde(default)]
    pub hospital_name: Option<Value>,
    #[serde(default)]
    pub wait_time: Option<Value>,
}

impl SubmissionIntake {
    pub fn new(hospital_name: impl Into<String>, wait_time: u32) -> Self {
        Self {
            hospital_name: Some(Value::String(hospital_name.into())),
            wait_time: Some(Value::from(wait_time)),
        }
    }

    pub fn validate(&self, timestamp: DateTime<Utc>) -> Result<NewSubmission, ValidationError> {
        let (hospital_name, wait_time) = checked_fields(&self.hospital_name, &self.wait_time)?;
        NewSubmission::new(&hospital_name, wait_time, timestamp)
    }
}

fn checked_fields(
    hospital_name: &Option<Value>,
    wait_time: &Option<Value>,
) -> Result<(String, u32), ValidationError> {
    let hospital_name = match hospital_name {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => return Err(ValidationError::InvalidHospitalName),
        None => return Err(ValidationError::MissingHospitalName),
    };
    let wait_time = match wait_time {
        Some(raw) => parse_wait_time(raw)?,
        None => return Err(ValidationError::MissingWaitTime),
    };
    Ok((hospital_name, wait_time))
}

/// Validated report awaiting insertion. Always lands in the store as `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    hospital_name: String,
    wait_time: u32,
    timestamp: DateTime<Utc>,
}

impl NewSubmission {
    pub fn new(
        hospital_name: &str,
        wait_time: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let hospital_name = hospital_name.trim();
        if hospital_name.is_empty() {
            return Err(ValidationError::InvalidHospitalName);
        }
        Ok(Self {
            hospital_name: hospital_name.to_string(),
            wait_time,
            timestamp,
        })
    }

    pub fn hospital_name(&self) -> &str {
        &self.hospital_name
    }

    pub fn wait_time(&self) -> u32 {
        self.wait_time
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn into_submission(self, id: SubmissionId) -> WaitTimeSubmission {
        WaitTimeSubmission {
            id,
            hospital_name: self.hospital_name,
            wait_time: self.wait_time,
            status: SubmissionStatus::Pending,
            timestamp: self.timestamp,
        }
    }
}

/// Public request asking a reviewer to look at a newly reported wait time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub hospital_name: Option<Value>,
    #[serde(default)]
    pub new_wait_time: Option<Value>,
}

impl ReviewRequest {
    /// Returns the trimmed hospital name and the reported minutes.
    pub fn validate(&self) -> Result<(String, u32), ValidationError> {
        checked_fields(&self.hospital_name, &self.new_wait_time)
    }
}

/// Accepts whole non-negative minutes as a JSON number or a digit string.
pub fn parse_wait_time(raw: &Value) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidWaitTime(raw.to_string());
    match raw {
        Value::Number(number) => {
            if let Some(value) = number.as_u64() {
                return u32::try_from(value).map_err(|_| invalid());
            }
            match number.as_f64() {
                Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
                    Ok(value as u32)
                }
                _ => Err(invalid()),
            }
        }
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(invalid());
            }
            text.parse::<u32>().map_err(|_| invalid())
        }
        Value::Null => Err(ValidationError::MissingWaitTime),
        _ => Err(invalid()),
    }
}

/// Rejection raised at intake; nothing is stored when this fires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("hospitalName is required")]
    MissingHospitalName,
    #[error("hospitalName must be non-empty text")]
    InvalidHospitalName,
    #[error("waitTime is required")]
    MissingWaitTime,
    #[error("waitTime must be a non-negative whole number of minutes, got {0}")]
    InvalidWaitTime(String),
}
