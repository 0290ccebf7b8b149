//! In-process stand-in for the host's cross-context messaging.
//!
//! Contexts share nothing but this bus and the durable store. Runtime messages
//! travel to the router as JSON values so the receiver decodes them exactly as
//! it would a message from another process. Delivery is at-most-once: a send to
//! a tab without a live listener is dropped and reported as [`Delivery::Missed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use comfort_types::{RuntimeMessage, RuntimeReply, TabId, TabMessage};

use crate::menu::MenuClick;

/// Outcome of a fire-and-forget send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No live receiver. Never retried.
    Missed,
}

impl Delivery {
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Why the host fired the install hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
}

/// Host events addressed to the background coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundEvent {
    Installed { reason: InstallReason },
    MenuClicked(MenuClick),
    /// Stop accepting messages once in-flight requests settle.
    Shutdown,
}

#[derive(Debug)]
pub enum Inbound {
    /// An encoded [`RuntimeMessage`], or anything else a context chose to send.
    Runtime(Value),
    Event(BackgroundEvent),
}

#[derive(Debug)]
pub struct Envelope {
    pub sender_tab: Option<TabId>,
    pub payload: Inbound,
    pub reply: Option<oneshot::Sender<RuntimeReply>>,
}

/// Receiving half of the router's inbox. Owned by the coordinator.
#[derive(Debug)]
pub struct RouterInbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl RouterInbox {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

struct TabSlot {
    generation: u64,
    tx: mpsc::UnboundedSender<TabMessage>,
}

pub struct MessageBus {
    router: mpsc::UnboundedSender<Envelope>,
    tabs: Mutex<HashMap<TabId, TabSlot>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("tabs", &self.tabs().len())
            .finish_non_exhaustive()
    }
}

impl MessageBus {
    #[must_use]
    pub fn new() -> (Arc<Self>, RouterInbox) {
        let (router, rx) = mpsc::unbounded_channel();
        let bus = Arc::new(Self {
            router,
            tabs: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        });
        (bus, RouterInbox { rx })
    }

    fn tabs(&self) -> MutexGuard<'_, HashMap<TabId, TabSlot>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start listening for messages addressed to `tab`. Replaces any earlier
    /// listener for the same tab; dropping the returned listener unregisters it.
    pub fn register_tab(self: &Arc<Self>, tab: TabId) -> TabListener {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        if self.tabs().insert(tab, TabSlot { generation, tx }).is_some() {
            tracing::debug!(%tab, "Replaced existing tab listener");
        }
        TabListener {
            tab,
            generation,
            rx,
            bus: Arc::downgrade(self),
        }
    }

    #[must_use]
    pub fn is_listening(&self, tab: TabId) -> bool {
        self.tabs().get(&tab).is_some_and(|slot| !slot.tx.is_closed())
    }

    pub fn send_to_tab(&self, tab: TabId, message: TabMessage) -> Delivery {
        let sent = self
            .tabs()
            .get(&tab)
            .is_some_and(|slot| slot.tx.send(message).is_ok());
        if sent {
            Delivery::Delivered
        } else {
            tracing::debug!(%tab, "No listener for tab; message dropped");
            Delivery::Missed
        }
    }

    /// Fire-and-forget runtime message. Any reply the router computes is discarded.
    pub fn send_to_router(&self, sender_tab: Option<TabId>, message: &RuntimeMessage) -> Delivery {
        match serde_json::to_value(message) {
            Ok(value) => self.send_raw(sender_tab, value),
            Err(e) => {
                tracing::warn!(action = message.action(), "Failed to encode runtime message: {e}");
                Delivery::Missed
            }
        }
    }

    /// Send an arbitrary JSON payload as a runtime message.
    pub fn send_raw(&self, sender_tab: Option<TabId>, value: Value) -> Delivery {
        self.push(Envelope {
            sender_tab,
            payload: Inbound::Runtime(value),
            reply: None,
        })
    }

    /// Runtime message with a reply slot. Resolves to `None` when the router is
    /// gone or drops the slot without answering.
    pub async fn request(
        &self,
        sender_tab: Option<TabId>,
        message: &RuntimeMessage,
    ) -> Option<RuntimeReply> {
        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(action = message.action(), "Failed to encode runtime message: {e}");
                return None;
            }
        };
        self.request_raw(sender_tab, value).await
    }

    pub async fn request_raw(
        &self,
        sender_tab: Option<TabId>,
        value: Value,
    ) -> Option<RuntimeReply> {
        let (reply, rx) = oneshot::channel();
        let envelope = Envelope {
            sender_tab,
            payload: Inbound::Runtime(value),
            reply: Some(reply),
        };
        if !self.push(envelope).is_delivered() {
            return None;
        }
        rx.await.ok()
    }

    pub fn emit(&self, event: BackgroundEvent) -> Delivery {
        self.push(Envelope {
            sender_tab: None,
            payload: Inbound::Event(event),
            reply: None,
        })
    }

    fn push(&self, envelope: Envelope) -> Delivery {
        if self.router.send(envelope).is_ok() {
            Delivery::Delivered
        } else {
            tracing::debug!("Router inbox closed; message dropped");
            Delivery::Missed
        }
    }

    fn unregister(&self, tab: TabId, generation: u64) {
        let mut tabs = self.tabs();
        if tabs.get(&tab).is_some_and(|slot| slot.generation == generation) {
            tabs.remove(&tab);
        }
    }
}

/// Inbound side of a tab. Unregisters itself on drop unless it has already been
/// replaced by a newer registration for the same tab.
#[derive(Debug)]
pub struct TabListener {
    tab: TabId,
    generation: u64,
    rx: mpsc::UnboundedReceiver<TabMessage>,
    bus: Weak<MessageBus>,
}

impl TabListener {
    #[must_use]
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Next message for this tab. `None` once the listener has been replaced or
    /// the bus is gone.
    pub async fn recv(&mut self) -> Option<TabMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<TabMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for TabListener {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unregister(self.tab, self.generation);
        }
    }
}
