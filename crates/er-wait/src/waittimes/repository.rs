use serde::{Deserialize, Serialize};

use super::domain::{NewSubmission, SubmissionId, SubmissionStatus, WaitTimeSubmission};

/// Storage abstraction so moderation and aggregation can be exercised in isolation.
///
/// Each call is expected to be atomic for the record it touches. Nothing beyond that is
/// coordinated: concurrent status updates on one id race and the last write wins.
pub trait SubmissionRepository: Send + Sync {
    /// Persist a validated report as `pending`, assigning its id.
    fn insert(&self, submission: NewSubmission) -> Result<WaitTimeSubmission, RepositoryError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<WaitTimeSubmission>, RepositoryError>;
    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<WaitTimeSubmission, RepositoryError>;
    /// Remove the record outright. There is no archive.
    fn delete(&self, id: &SubmissionId) -> Result<(), RepositoryError>;
    /// Unordered; callers sort.
    fn by_status(&self, status: SubmissionStatus)
        -> Result<Vec<WaitTimeSubmission>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook asking a human reviewer to look at a report (e-mail or similar).
pub trait ReviewerNotifier: Send + Sync {
    fn notify(&self, notification: ReviewerNotification) -> Result<(), NotificationError>;
}

/// Message handed to a [`ReviewerNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerNotification {
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub subject: String,
    pub body: String,
    pub hospital_name: String,
    pub wait_time: u32,
}

impl ReviewerNotification {
    pub fn wait_time_update(
        recipient: impl Into<String>,
        sender: Option<String>,
        hospital_name: &str,
        wait_time: u32,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            sender,
            subject: format!("Wait Time Update Request: {hospital_name}"),
            body: format!(
                "A user has submitted a new wait time for {hospital_name}:\n\n{wait_time}\n\nPlease review and verify."
            ),
            hospital_name: hospital_name.to_string(),
            wait_time,
        }
    }
}

/// Notification dispatch error. Never affects store state.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("no reviewer address configured")]
    NoRecipient,
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
