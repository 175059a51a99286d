use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use snapparse_host::{EventBus, EventName, Host, HostCommands, HostError, HostEvent, Listener};
use snapparse_types::{StreamId, TaskKind};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Reaction, StreamEvent, StreamReconciler, StreamView};
use crate::timer::TimerSlot;

const STREAM_EVENTS: [EventName; 3] = [
    EventName::StreamChunk,
    EventName::StreamDone,
    EventName::StreamError,
];

#[derive(Debug)]
pub struct Started {
    ticket: u64,
    result: Result<StreamId, HostError>,
}

/// Something the owning actor has to feed back through [`StreamSession::handle`]
#[derive(Debug)]
pub enum SessionWake {
    Event(HostEvent),
    Started(Started),
    Flush,
}

/// One window's stream: subscription, start call and flush timer
///
/// The owning actor polls [`next`](Self::next) in its `select!` and hands
/// the result back to [`handle`](Self::handle).
pub struct StreamSession {
    host: Arc<dyn Host>,
    bus: EventBus,
    reconciler: StreamReconciler,
    listener: Option<Listener>,
    flush: TimerSlot,
    flush_interval: Duration,
    started_tx: UnboundedSender<Started>,
    started_rx: UnboundedReceiver<Started>,
}

impl StreamSession {
    pub fn new(
        host: Arc<dyn Host>,
        bus: EventBus,
        error_label: impl Into<String>,
        flush_interval: Duration,
    ) -> Self {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        Self {
            host,
            bus,
            reconciler: StreamReconciler::new(error_label),
            listener: None,
            flush: TimerSlot::new(),
            flush_interval,
            started_tx,
            started_rx,
        }
    }

    pub fn view(&self) -> &StreamView {
        self.reconciler.view()
    }

    /// Drop the subscription and every piece of visible state
    pub fn reset(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.dispose();
        }
        self.flush.cancel();
        self.reconciler.reset();
    }

    pub fn start(&mut self, kind: TaskKind, text: String, options: Value) {
        self.reset();
        // subscribe before the start call so no early fragment is missed
        self.listener = Some(self.bus.listen(&STREAM_EVENTS));
        let ticket = self.reconciler.begin();

        tracing::info!("[STREAM] starting {kind:?} ({} chars)", text.chars().count());
        let host = self.host.clone();
        let tx = self.started_tx.clone();
        tokio::spawn(async move {
            let result = host.stream_process_text(kind, text, options).await;
            let _ = tx.send(Started { ticket, result });
        });
    }

    /// Next thing that needs handling; pending forever while idle
    pub async fn next(&mut self) -> SessionWake {
        let listener = self.listener.as_mut();
        tokio::select! {
            Some(event) = async {
                match listener {
                    Some(listener) => listener.recv().await,
                    None => None,
                }
            } => SessionWake::Event(event),
            Some(started) = self.started_rx.recv() => SessionWake::Started(started),
            _ = self.flush.fired() => SessionWake::Flush,
            else => std::future::pending().await,
        }
    }

    /// Apply a wake-up; returns whether the view changed
    pub fn handle(&mut self, wake: SessionWake) -> bool {
        let before = self.reconciler.view().clone();
        match wake {
            SessionWake::Event(event) => {
                if let Some(event) = StreamEvent::from_host(event) {
                    let reaction = self.reconciler.on_event(event);
                    self.react(reaction);
                }
            }
            SessionWake::Started(Started { ticket, result }) => match result {
                Ok(stream_id) => {
                    let reaction = self.reconciler.started(ticket, stream_id);
                    self.react(reaction);
                }
                Err(e) => {
                    tracing::warn!("[STREAM] start failed: {e}");
                    self.reconciler.start_failed(ticket, &e.user_message());
                }
            },
            SessionWake::Flush => {
                self.reconciler.flush();
            }
        }
        *self.reconciler.view() != before
    }

    fn react(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::ArmFlush => {
                self.flush.schedule_if_idle(self.flush_interval);
            }
            Reaction::CancelFlush => self.flush.cancel(),
            Reaction::Nothing => {}
        }
    }
}
