//! Asynchronous reviewer notification
//!
//! Notices are queued after the assignment has committed and delivered by a
//! background tokio task. Delivery failures are logged and counted; they
//! never undo the assignment.

use crate::AssuranceMetrics;
use ratchet_domain::{ActorRef, ClaimId, ReviewId, ReviewKind};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A reviewer has been assigned to a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewNotice {
    /// The new review
    pub review_id: ReviewId,
    /// Claim under review
    pub claim_id: ClaimId,
    /// Who should review
    pub reviewer: ActorRef,
    /// Kind of review requested
    pub kind: ReviewKind,
    /// Review round of the claim
    pub round: u32,
}

/// Errors that can occur while notifying reviewers
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The notifier could not deliver the notice
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The queue is at capacity and the notice was dropped
    #[error("Notification queue is full")]
    QueueFull,

    /// The worker has stopped
    #[error("Notification worker has stopped")]
    Closed,
}

/// Delivers review notices to reviewers
///
/// Implemented by whatever messaging the deployment uses.
pub trait ReviewNotifier: Send + Sync + 'static {
    /// Deliver one notice
    fn notify(&self, notice: ReviewNotice) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Notifier that only writes a log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ReviewNotifier for LogNotifier {
    async fn notify(&self, notice: ReviewNotice) -> Result<(), NotifyError> {
        info!(
            reviewer = %notice.reviewer,
            claim = %notice.claim_id,
            review = %notice.review_id,
            kind = notice.kind.as_str(),
            round = notice.round,
            "Review assigned"
        );
        Ok(())
    }
}

/// Sending side of the notification queue
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    tx: mpsc::Sender<ReviewNotice>,
    metrics: Arc<AssuranceMetrics>,
}

impl NotificationHandle {
    /// Queue a notice without waiting
    ///
    /// A full queue drops the notice and counts it as failed.
    pub fn enqueue(&self, notice: ReviewNotice) -> Result<(), NotifyError> {
        match self.tx.try_send(notice) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(notice)) => {
                self.metrics.record_notification_failed();
                warn!(review = %notice.review_id, "Notification queue full, notice dropped");
                Err(NotifyError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.record_notification_failed();
                Err(NotifyError::Closed)
            }
        }
    }
}

/// Background worker delivering queued notices
///
/// # Examples
///
/// ```no_run
/// use ratchet_assurance::{AssuranceMetrics, LogNotifier, NotificationDispatcher};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let metrics = Arc::new(AssuranceMetrics::new());
///     let (handle, worker) = NotificationDispatcher::spawn(LogNotifier, 64, metrics);
///
///     // Hand `handle` to the engine; the worker stops once every handle is dropped
///     drop(handle);
///     worker.await.unwrap();
/// }
/// ```
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn<N: ReviewNotifier>(
        notifier: N,
        capacity: usize,
        metrics: Arc<AssuranceMetrics>,
    ) -> (NotificationHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = NotificationHandle {
            tx,
            metrics: Arc::clone(&metrics),
        };
        let worker = tokio::spawn(Self::run(notifier, rx, metrics));
        (handle, worker)
    }

    async fn run<N: ReviewNotifier>(
        notifier: N,
        mut rx: mpsc::Receiver<ReviewNotice>,
        metrics: Arc<AssuranceMetrics>,
    ) {
        debug!("Notification worker started");

        while let Some(notice) = rx.recv().await {
            let review_id = notice.review_id;
            match notifier.notify(notice).await {
                Ok(()) => metrics.record_notification_sent(),
                Err(e) => {
                    metrics.record_notification_failed();
                    warn!(review = %review_id, error = %e, "Reviewer notification failed");
                }
            }
        }

        info!("Notification worker stopped");
    }
}
