use std::sync::Arc;

use contacts_store::{MemoryCooldownGate, MemoryIdentityRegistry, MemoryRequestThrottle};

use crate::contacts::{ContactWorkflow, GatePolicy};
use crate::media::MediaStore;
use crate::notify::{NotificationDispatcher, Notifier};
use crate::verification::VerificationWorkflow;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub verification: VerificationWorkflow,
    pub contacts: ContactWorkflow,
}

impl AppStateInner {
    /// Wire both workflows over fresh in-memory stores. The registry is
    /// shared between them. Must be called inside a tokio runtime, since it
    /// starts the notification worker.
    pub fn in_memory(
        notifier: Arc<dyn Notifier>,
        media: Arc<dyn MediaStore>,
        policy: GatePolicy,
    ) -> AppState {
        let registry = Arc::new(MemoryIdentityRegistry::new());
        let dispatcher = NotificationDispatcher::spawn(notifier);

        let verification = VerificationWorkflow::new(registry.clone(), dispatcher);
        let contacts = ContactWorkflow::new(
            Arc::new(MemoryRequestThrottle::new()),
            registry,
            Arc::new(MemoryCooldownGate::new()),
            media,
            policy,
        );

        Arc::new(AppStateInner {
            verification,
            contacts,
        })
    }
}
