//! Store notifications and the listener registry.
//!
//! Presentation code subscribes to hear about recorded interactions (to
//! play a stinger on a stage change, refresh a contact card, and so on).
//! Each callback is isolated: an `Err` or a panic from one listener is
//! logged and counted, and delivery continues with the next.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use crate::types::{EventType, Interaction, NpcId};

/// Error a listener may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of a listener callback.
pub type ListenerResult = Result<(), ListenerError>;

type Callback = Arc<dyn Fn(&MemoryEvent) -> ListenerResult + Send + Sync>;

/// Something the store tells its listeners about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
    /// An interaction was recorded.
    Interaction {
        /// Whose ledger changed.
        npc_id: NpcId,
        /// What happened.
        event_type: EventType,
        /// The recorded entry.
        interaction: Interaction,
    },
}

impl MemoryEvent {
    /// Event name of [`MemoryEvent::Interaction`].
    pub const INTERACTION: &'static str = "interaction";

    /// Event name, as seen by string-keyed listeners.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Interaction { .. } => Self::INTERACTION,
        }
    }
}

/// Opaque id of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: Vec<(ListenerId, Callback)>,
}

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Listeners that returned `Ok`.
    pub delivered: usize,
    /// Listeners that returned `Err` or panicked.
    pub failed: usize,
}

/// Observer registry. Clones share the same listener list.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. Keep the returned [`Subscription`] to deregister.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MemoryEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Whether nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener registered at the time of the call.
    ///
    /// The registry lock is released before callbacks run, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &MemoryEvent) -> Delivery {
        let listeners: Vec<(ListenerId, Callback)> = self.inner.lock().listeners.clone();
        let mut delivery = Delivery::default();

        for (id, callback) in listeners {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(e)) => {
                    delivery.failed += 1;
                    warn!(listener = id.0, event = event.name(), error = %e, "Listener failed");
                }
                Err(payload) => {
                    delivery.failed += 1;
                    warn!(
                        listener = id.0,
                        event = event.name(),
                        panic = panic_message(payload.as_ref()),
                        "Listener panicked"
                    );
                }
            }
        }
        delivery
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
///
/// Dropping it leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
#[must_use = "dropping a Subscription does not unsubscribe; keep it to deregister later"]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    /// The listener's id.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Returns `false` if it was already gone (or the
    /// registry no longer exists).
    #[allow(clippy::must_use_candidate)]
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut inner = registry.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(id, _)| *id != self.id);
        inner.listeners.len() != before
    }
}
