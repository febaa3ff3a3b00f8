//! Crowd-reported emergency room wait times: intake, moderation, and aggregate read views.
//!
//! Reports enter as `pending`, an administrator approves or rejects them (and may flip that
//! decision later), and only approved reports feed the snapshot, history, and trend views.

pub mod aggregation;
pub mod auth;
pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregation::{
    approved_history, current_wait_times, trends_by_weekday, trends_by_weekday_in,
    CurrentWaitTimes, TrendDay, WeekdayTrends,
};
pub use auth::{
    AdminAuthorizer, AuthorizationError, SharedSecretAuthorizer, ADMIN_CREDENTIAL_HEADER,
};
pub use domain::{
    NewSubmission, ReviewRequest, SubmissionId, SubmissionIntake, SubmissionStatus,
    ValidationError, WaitTimeSubmission,
};
pub use import::{read_reports, read_reports_from_path, ImportError, ImportedReport};
pub use repository::{
    NotificationError, RepositoryError, ReviewerNotification, ReviewerNotifier,
    SubmissionRepository,
};
pub use router::{submission_router, SubmissionApi};
pub use service::{ModerationError, ModerationService, NotificationOutcome, SubmissionReceipt};
