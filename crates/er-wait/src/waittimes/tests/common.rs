use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::ModerationConfig;
use crate::waittimes::auth::{AdminAuthorizer, SharedSecretAuthorizer};
use crate::waittimes::domain::{
    NewSubmission, SubmissionId, SubmissionIntake, SubmissionStatus, WaitTimeSubmission,
};
use crate::waittimes::repository::{
    NotificationError, RepositoryError, ReviewerNotification, ReviewerNotifier,
    SubmissionRepository,
};
use crate::waittimes::{submission_router, ModerationService};

pub(super) const ADMIN_SECRET: &str = "triage-desk";

/// 2025-03-04 is a Tuesday.
pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn intake(hospital: &str, wait_time: u32) -> SubmissionIntake {
    SubmissionIntake::new(hospital, wait_time)
}

pub(super) fn moderation_config() -> ModerationConfig {
    ModerationConfig {
        reviewer_email: Some("reviewer@example.org".to_string()),
        sender_email: Some("noreply@example.org".to_string()),
        ..ModerationConfig::default()
    }
}

pub(super) fn build_service() -> (
    ModerationService<MemoryRepository, MemoryNotifier>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    build_service_with(moderation_config())
}

pub(super) fn build_service_with(
    config: ModerationConfig,
) -> (
    ModerationService<MemoryRepository, MemoryNotifier>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    crate::telemetry::init_for_tests();
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = ModerationService::new(repository.clone(), notifier.clone(), config);
    (service, repository, notifier)
}

pub(super) fn authorizer() -> Arc<dyn AdminAuthorizer> {
    Arc::new(SharedSecretAuthorizer::new(Some(ADMIN_SECRET.to_string())))
}

pub(super) fn router_with_service<R, N>(service: ModerationService<R, N>) -> axum::Router
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    submission_router(Arc::new(service), authorizer())
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<SubmissionId, WaitTimeSubmission>>,
    sequence: AtomicU64,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl SubmissionRepository for MemoryRepository {
    fn insert(&self, submission: NewSubmission) -> Result<WaitTimeSubmission, RepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = submission.into_submission(SubmissionId(format!("wt-{next:06}")));
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<WaitTimeSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<WaitTimeSubmission, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.status = status;
        Ok(record.clone())
    }

    fn delete(&self, id: &SubmissionId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn by_status(
        &self,
        status: SubmissionStatus,
    ) -> Result<Vec<WaitTimeSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.status == status)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl SubmissionRepository for UnavailableRepository {
    fn insert(&self, _submission: NewSubmission) -> Result<WaitTimeSubmission, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<WaitTimeSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_status(
        &self,
        _id: &SubmissionId,
        _status: SubmissionStatus,
    ) -> Result<WaitTimeSubmission, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &SubmissionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_status(
        &self,
        _status: SubmissionStatus,
    ) -> Result<Vec<WaitTimeSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Stores and deletes normally but cannot change a record's status.
#[derive(Default)]
pub(super) struct StatusLockedRepository {
    pub(super) inner: MemoryRepository,
}

impl SubmissionRepository for StatusLockedRepository {
    fn insert(&self, submission: NewSubmission) -> Result<WaitTimeSubmission, RepositoryError> {
        self.inner.insert(submission)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<WaitTimeSubmission>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update_status(
        &self,
        _id: &SubmissionId,
        _status: SubmissionStatus,
    ) -> Result<WaitTimeSubmission, RepositoryError> {
        Err(RepositoryError::Unavailable("status column locked".to_string()))
    }

    fn delete(&self, id: &SubmissionId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }

    fn by_status(
        &self,
        status: SubmissionStatus,
    ) -> Result<Vec<WaitTimeSubmission>, RepositoryError> {
        self.inner.by_status(status)
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<ReviewerNotification>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<ReviewerNotification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ReviewerNotifier for MemoryNotifier {
    fn notify(&self, notification: ReviewerNotification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl ReviewerNotifier for FailingNotifier {
    fn notify(&self, _notification: ReviewerNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay refused".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
