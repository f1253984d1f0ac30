//! Bounded mail queue with a fixed worker pool.

use super::{Email, Mailer};
use crate::observability::metrics::record_mail_dispatch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delivery counters, shared by the queue and its workers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        record_mail_dispatch("sent");
    }

    fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        record_mail_dispatch("failed");
    }

    fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        record_mail_dispatch("dropped");
    }
}

#[derive(Clone)]
pub struct MailDispatcher {
    tx: mpsc::Sender<Email>,
    stats: Arc<DispatchStats>,
}

impl MailDispatcher {
    /// Start `workers` tasks draining a queue of `capacity` messages.
    ///
    /// Workers stop once every dispatcher clone is dropped, or once `cancel`
    /// has fired and the queue is empty.
    pub fn spawn(
        mailer: Arc<dyn Mailer>,
        capacity: usize,
        workers: usize,
        cancel: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(DispatchStats::default());

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    rx.clone(),
                    mailer.clone(),
                    stats.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        (Self { tx, stats }, handles)
    }

    /// Queue `email` without waiting. Returns false if it was dropped.
    pub fn enqueue(&self, email: Email) -> bool {
        match self.tx.try_send(email) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(email)) => {
                self.stats.record_dropped();
                warn!(
                    target: "auth.notifier",
                    subject = %email.subject,
                    "Mail queue full, message dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                self.stats.record_dropped();
                warn!(
                    target: "auth.notifier",
                    subject = %email.subject,
                    "Mail workers stopped, message dropped"
                );
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Email>>>,
    mailer: Arc<dyn Mailer>,
    stats: Arc<DispatchStats>,
    cancel: CancellationToken,
) {
    debug!(target: "auth.notifier", worker_id, "Mail worker started");

    loop {
        let next = {
            let mut rx = rx.lock().await;
            // Queued mail is delivered even after cancellation.
            tokio::select! {
                biased;
                email = rx.recv() => email,
                _ = cancel.cancelled() => None,
            }
        };

        let Some(email) = next else {
            break;
        };

        match mailer.send(&email).await {
            Ok(()) => {
                stats.record_sent();
                debug!(target: "auth.notifier", worker_id, subject = %email.subject, "Mail sent");
            }
            Err(e) => {
                stats.record_failed();
                warn!(
                    target: "auth.notifier",
                    worker_id,
                    subject = %email.subject,
                    error = %e,
                    "Mail delivery failed"
                );
            }
        }
    }

    info!(target: "auth.notifier", worker_id, "Mail worker stopped");
}
