use er_wait::config::SmtpConfig;
use er_wait::waittimes::{
    NewSubmission, NotificationError, RepositoryError, ReviewerNotification, ReviewerNotifier,
    SubmissionId, SubmissionRepository, SubmissionStatus, WaitTimeSubmission,
};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store. Status writes overwrite in place, so concurrent moderators race
/// and the last write wins.
#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionRepository {
    records: Arc<Mutex<HashMap<SubmissionId, WaitTimeSubmission>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemorySubmissionRepository {
    fn next_id(&self) -> SubmissionId {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        SubmissionId(format!("wt-{next:06}"))
    }
}

impl SubmissionRepository for InMemorySubmissionRepository {
    fn insert(&self, submission: NewSubmission) -> Result<WaitTimeSubmission, RepositoryError> {
        let record = submission.into_submission(self.next_id());
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record.clone());
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

/// Writes reviewer messages to the structured log in place of a mail relay.
#[derive(Default, Clone, Copy)]
pub(crate) struct LogNotifier;

impl ReviewerNotifier for LogNotifier {
    fn notify(&self, notification: ReviewerNotification) -> Result<(), NotificationError> {
        info!(
            target: "er_wait::outbox",
            recipient = %notification.recipient,
            sender = notification.sender.as_deref().unwrap_or("unset"),
            subject = %notification.subject,
            hospital = %notification.hospital_name,
            wait_time = notification.wait_time,
            "reviewer notification queued"
        );
        Ok(())
    }
}

/// Delivers reviewer messages through an authenticated SMTP relay.
#[derive(Clone)]
pub(crate) struct SmtpNotifier {
    transport: SmtpTransport,
    default_sender: String,
}

impl SmtpNotifier {
    pub(crate) fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let transport = SmtpTransport::relay(&config.host)
            .map_err(transport_error)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            default_sender: config.username.clone(),
        })
    }

    fn message(&self, notification: &ReviewerNotification) -> Result<Message, NotificationError> {
        let sender = notification
            .sender
            .as_deref()
            .unwrap_or(&self.default_sender);
        Message::builder()
            .from(sender.parse().map_err(transport_error)?)
            .to(notification.recipient.parse().map_err(transport_error)?)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(transport_error)
    }
}

impl ReviewerNotifier for SmtpNotifier {
    fn notify(&self, notification: ReviewerNotification) -> Result<(), NotificationError> {
        let message = self.message(&notification)?;
        self.transport.send(&message).map_err(transport_error)?;
        info!(
            recipient = %notification.recipient,
            hospital = %notification.hospital_name,
            "reviewer email sent"
        );
        Ok(())
    }
}

fn transport_error(err: impl std::fmt::Display) -> NotificationError {
    NotificationError::Transport(err.to_string())
}

/// Notifier picked at startup: SMTP when credentials are configured, the log outbox otherwise.
#[derive(Clone)]
pub(crate) enum ReviewerOutbox {
    Smtp(SmtpNotifier),
    Log(LogNotifier),
}

impl ReviewerOutbox {
    pub(crate) fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, NotificationError> {
        match smtp {
            Some(config) => Ok(Self::Smtp(SmtpNotifier::new(config)?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl ReviewerNotifier for ReviewerOutbox {
    fn notify(&self, notification: ReviewerNotification) -> Result<(), NotificationError> {
        match self {
            Self::Smtp(notifier) => notifier.notify(notification),
            Self::Log(notifier) => notifier.notify(notification),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    events: Arc<Mutex<Vec<ReviewerNotification>>>,
}

impl ReviewerNotifier for InMemoryNotifier {
    fn notify(&self, notification: ReviewerNotification) -> Result<(), NotificationError> {
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn events(&self) -> Vec<ReviewerNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}
