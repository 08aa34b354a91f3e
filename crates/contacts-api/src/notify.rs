use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use contacts_store::VerificationToken;

/// Delivers a verification token to the address being registered.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, email: &str, token: &VerificationToken) -> anyhow::Result<()>;
}

/// Writes the verification token to the log instead of sending mail.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &str, token: &VerificationToken) -> anyhow::Result<()> {
        info!(email, token = token.as_str(), "Verification email sent");
        Ok(())
    }
}

struct Notification {
    email: String,
    token: VerificationToken,
}

/// Fire-and-forget front of a background delivery worker.
///
/// `dispatch` only enqueues. Each delivery runs in its own task, and a failed
/// delivery is logged and dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationDispatcher {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_delivery_loop(notifier, rx));
        Self { tx }
    }

    pub fn dispatch(&self, email: &str, token: VerificationToken) {
        let job = Notification {
            email: email.to_owned(),
            token,
        };
        if self.tx.send(job).is_err() {
            warn!(email, "Notification worker stopped, verification email dropped");
        }
    }
}

async fn run_delivery_loop(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::UnboundedReceiver<Notification>,
) {
    while let Some(job) = rx.recv().await {
        let notifier = notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&job.email, &job.token).await {
                warn!("Verification email to {} failed: {:#}", job.email, e);
            }
        });
    }
    debug!("Notification worker exiting");
}
