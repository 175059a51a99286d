use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use snapparse_types::{
    ChangeTextPayload, OcrCaptureOpened, OptimizePendingUpdated, SelectionTextPayload,
    StreamChunk, StreamDone, StreamError,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Host to UI notifications, `{"event": "<kebab-case name>", "payload": {...}}` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum HostEvent {
    SelectionTextChanged(SelectionTextPayload),
    ChangeText(ChangeTextPayload),
    /// Raw document, validated by whoever consumes it
    SettingsChanged(Value),
    OcrCaptureOpened(OcrCaptureOpened),
    OptimizePendingUpdated(OptimizePendingUpdated),
    StreamChunk(StreamChunk),
    StreamDone(StreamDone),
    StreamError(StreamError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    SelectionTextChanged,
    ChangeText,
    SettingsChanged,
    OcrCaptureOpened,
    OptimizePendingUpdated,
    StreamChunk,
    StreamDone,
    StreamError,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::SelectionTextChanged => "selection-text-changed",
            EventName::ChangeText => "change-text",
            EventName::SettingsChanged => "settings-changed",
            EventName::OcrCaptureOpened => "ocr-capture-opened",
            EventName::OptimizePendingUpdated => "optimize-pending-updated",
            EventName::StreamChunk => "stream-chunk",
            EventName::StreamDone => "stream-done",
            EventName::StreamError => "stream-error",
        }
    }
}

impl HostEvent {
    pub fn name(&self) -> EventName {
        match self {
            HostEvent::SelectionTextChanged(_) => EventName::SelectionTextChanged,
            HostEvent::ChangeText(_) => EventName::ChangeText,
            HostEvent::SettingsChanged(_) => EventName::SettingsChanged,
            HostEvent::OcrCaptureOpened(_) => EventName::OcrCaptureOpened,
            HostEvent::OptimizePendingUpdated(_) => EventName::OptimizePendingUpdated,
            HostEvent::StreamChunk(_) => EventName::StreamChunk,
            HostEvent::StreamDone(_) => EventName::StreamDone,
            HostEvent::StreamError(_) => EventName::StreamError,
        }
    }

    /// Decode an event from its wire name and payload
    pub fn from_wire(name: &str, payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json!({ "event": name, "payload": payload }))
    }
}

struct Registration {
    id: u64,
    names: Vec<EventName>,
    tx: UnboundedSender<HostEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Registration>,
}

/// Process-local pub/sub for host events
///
/// Every subscription is a [`Listener`] that unregisters itself when dropped,
/// so a window that goes away stops receiving events without extra teardown.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a set of event names
    ///
    /// Events matching any of `names` are queued in arrival order on a single
    /// channel, so interleaving between different names is preserved. The
    /// queue is a tokio mpsc so [`Listener::recv`] can sit in a `select!`.
    pub fn listen(&self, names: &[EventName]) -> Listener {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push(Registration {
            id,
            names: names.to_vec(),
            tx,
        });

        Listener {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every matching listener, returning how many got it
    pub fn emit(&self, event: HostEvent) -> usize {
        let name = event.name();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;

        registry.listeners.retain(|listener| {
            if !listener.names.contains(&name) {
                return true;
            }
            match listener.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });

        tracing::trace!("[BUS] {} -> {delivered} listener(s)", name.as_str());
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

/// Scoped event subscription; dropping it is the disposer
pub struct Listener {
    id: u64,
    rx: UnboundedReceiver<HostEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl Listener {
    /// Next event, or `None` once the bus is gone
    ///
    /// Cancel safe: an event is never consumed by a dropped call.
    pub async fn recv(&mut self) -> Option<HostEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<HostEvent> {
        self.rx.try_recv().ok()
    }

    /// Explicit teardown, same as dropping
    pub fn dispose(self) {}
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .retain(|listener| listener.id != self.id);
        }
    }
}
