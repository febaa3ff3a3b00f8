use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::aggregation::{self, CurrentWaitTimes, WeekdayTrends};
use super::domain::{
    ReviewRequest, SubmissionId, SubmissionIntake, SubmissionStatus, ValidationError,
    WaitTimeSubmission,
};
use super::import::ImportedReport;
use super::repository::{
    NotificationError, RepositoryError, ReviewerNotification, ReviewerNotifier,
    SubmissionRepository,
};
use crate::config::ModerationConfig;

/// Service composing the submission store, reviewer notifier, and aggregation views.
pub struct ModerationService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    config: ModerationConfig,
}

/// Result of a public submission: the stored record plus what happened to the reviewer ping.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub submission: WaitTimeSubmission,
    pub notification: NotificationOutcome,
}

/// Best-effort notification result. A failure here never undoes the stored submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Skipped,
    Failed { reason: String },
}

impl<R, N> ModerationService<R, N>
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: ModerationConfig) -> Self {
        Self {
            repository,
            notifier,
            config,
        }
    }

    /// Validate and store a public report as `pending`, timestamped now.
    pub fn submit(&self, intake: SubmissionIntake) -> Result<SubmissionReceipt, ModerationError> {
        self.submit_at(intake, Utc::now())
    }

    pub fn submit_at(
        &self,
        intake: SubmissionIntake,
        timestamp: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, ModerationError> {
        let new_submission = intake.validate(timestamp)?;
        let submission = self.repository.insert(new_submission)?;
        info!(
            submission_id = %submission.id,
            hospital = %submission.hospital_name,
            wait_time = submission.wait_time,
            "wait time submitted for review"
        );

        let notification = if self.config.notify_on_submit {
            match self.dispatch(&submission.hospital_name, submission.wait_time) {
                Ok(_) => NotificationOutcome::Sent,
                Err(error) => {
                    warn!(submission_id = %submission.id, %error, "reviewer notification failed");
                    NotificationOutcome::Failed {
                        reason: error.to_string(),
                    }
                }
            }
        } else {
            NotificationOutcome::Skipped
        };

        Ok(SubmissionReceipt {
            submission,
            notification,
        })
    }

    pub fn approve(&self, id: &SubmissionId) -> Result<WaitTimeSubmission, ModerationError> {
        self.transition(id, SubmissionStatus::Approved)
    }

    pub fn reject(&self, id: &SubmissionId) -> Result<WaitTimeSubmission, ModerationError> {
        self.transition(id, SubmissionStatus::Rejected)
    }

    /// Permanently delete a report. It vanishes from every list and view.
    pub fn remove(&self, id: &SubmissionId) -> Result<(), ModerationError> {
        self.repository.delete(id).map_err(targeted(id))?;
        info!(submission_id = %id, "submission deleted");
        Ok(())
    }

    pub fn get(&self, id: &SubmissionId) -> Result<WaitTimeSubmission, ModerationError> {
        self.repository
            .fetch(id)
            .map_err(targeted(id))?
            .ok_or_else(|| ModerationError::NotFound(id.clone()))
    }

    /// Review queue, oldest first.
    pub fn list_pending(&self) -> Result<Vec<WaitTimeSubmission>, ModerationError> {
        let mut pending = self.repository.by_status(SubmissionStatus::Pending)?;
        pending.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(pending)
    }

    /// Approved reports, newest first.
    pub fn list_approved(&self) -> Result<Vec<WaitTimeSubmission>, ModerationError> {
        let mut approved = self.approved()?;
        approved.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(approved)
    }

    pub fn current_wait_times(&self) -> Result<CurrentWaitTimes, ModerationError> {
        Ok(aggregation::current_wait_times(&self.approved()?))
    }

    pub fn approved_history(&self) -> Result<Vec<WaitTimeSubmission>, ModerationError> {
        Ok(aggregation::approved_history(&self.approved()?))
    }

    pub fn trends_by_weekday(&self) -> Result<WeekdayTrends, ModerationError> {
        Ok(aggregation::trends_by_weekday_in(
            &self.approved()?,
            self.config.trend_offset,
        ))
    }

    /// Explicit reviewer ping. Failure is reported to the caller; the store is untouched.
    pub fn notify_reviewer(
        &self,
        request: &ReviewRequest,
    ) -> Result<ReviewerNotification, ModerationError> {
        let (hospital_name, wait_time) = request.validate()?;
        let notification = self.dispatch(&hospital_name, wait_time)?;
        info!(hospital = %hospital_name, wait_time, "reviewer notified");
        Ok(notification)
    }

    /// Load previously collected reports, replaying their moderation decisions.
    ///
    /// All or nothing: if any insert or transition fails, every record written by this call is
    /// deleted again before the error is returned.
    pub fn import(
        &self,
        reports: Vec<ImportedReport>,
    ) -> Result<Vec<WaitTimeSubmission>, ModerationError> {
        let mut imported = Vec::with_capacity(reports.len());
        let mut written = Vec::with_capacity(reports.len());
        for report in reports {
            match self.replay(report, &mut written) {
                Ok(stored) => imported.push(stored),
                Err(err) => {
                    self.roll_back(&written);
                    return Err(err);
                }
            }
        }
        info!(count = imported.len(), "imported wait time reports");
        Ok(imported)
    }

    fn replay(
        &self,
        report: ImportedReport,
        written: &mut Vec<SubmissionId>,
    ) -> Result<WaitTimeSubmission, ModerationError> {
        let stored = self.repository.insert(report.submission)?;
        written.push(stored.id.clone());
        match report.status {
            SubmissionStatus::Pending => Ok(stored),
            status => self.transition(&stored.id, status),
        }
    }

    fn roll_back(&self, written: &[SubmissionId]) {
        for id in written {
            if let Err(err) = self.repository.delete(id) {
                warn!(submission_id = %id, error = %err, "import rollback left a record behind");
            }
        }
        warn!(count = written.len(), "import aborted; written records rolled back");
    }

    fn transition(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<WaitTimeSubmission, ModerationError> {
        let updated = self
            .repository
            .update_status(id, status)
            .map_err(targeted(id))?;
        info!(submission_id = %id, status = %updated.status, "submission moderated");
        Ok(updated)
    }

    fn approved(&self) -> Result<Vec<WaitTimeSubmission>, ModerationError> {
        Ok(self.repository.by_status(SubmissionStatus::Approved)?)
    }

    fn dispatch(
        &self,
        hospital_name: &str,
        wait_time: u32,
    ) -> Result<ReviewerNotification, NotificationError> {
        let recipient = self
            .config
            .reviewer_email
            .clone()
            .ok_or(NotificationError::NoRecipient)?;
        let notification = ReviewerNotification::wait_time_update(
            recipient,
            self.config.sender_email.clone(),
            hospital_name,
            wait_time,
        );
        self.notifier.notify(notification.clone())?;
        Ok(notification)
    }
}

/// Error raised by the moderation service.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("submission {0} not found")]
    NotFound(SubmissionId),
    #[error("submission store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl From<RepositoryError> for ModerationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::StoreUnavailable("record vanished mid-query".to_string()),
            RepositoryError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}

fn targeted(id: &SubmissionId) -> impl FnOnce(RepositoryError) -> ModerationError + '_ {
    move |error| match error {
        RepositoryError::NotFound => ModerationError::NotFound(id.clone()),
        other => ModerationError::from(other),
    }
}
