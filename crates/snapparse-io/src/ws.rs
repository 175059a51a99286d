use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use kanal::{AsyncReceiver, AsyncSender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snapparse_host::{Command, EventBus, Host, HostError, HostEvent, ScreenMetrics, SharedScreen};
use snapparse_types::{WindowInput, WindowKind};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum OutgoingFrame<'a> {
    Invoke {
        id: Uuid,
        #[serde(flatten)]
        command: &'a Command,
    },
    Render {
        window: WindowKind,
        view: &'a Value,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseFrame {
    id: Uuid,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
    /// `"unsupported"` when the host does not know the command
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventFrame {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum IncomingFrame {
    Response(ResponseFrame),
    Event(EventFrame),
    Input(WindowInput),
    Screen(ScreenMetrics),
}

struct PendingCall {
    command: &'static str,
    tx: oneshot::Sender<Result<Value, HostError>>,
}

type PendingMap = Arc<Mutex<HashMap<Uuid, PendingCall>>>;

/// `Host` over a single WebSocket connection
///
/// Requests are correlated with responses by a per-call uuid; replies may
/// arrive in any order.
pub struct WsHost {
    out_tx: AsyncSender<Message>,
    pending: PendingMap,
}

impl WsHost {
    async fn send_frame(&self, frame: &OutgoingFrame<'_>) -> Result<(), HostError> {
        let text =
            serde_json::to_string(frame).map_err(|e| HostError::Transport(e.to_string()))?;
        self.out_tx
            .send(Message::text(text))
            .await
            .map_err(|_| HostError::Closed)
    }

    /// Publish a window's view model to the renderer
    pub async fn render(&self, window: WindowKind, view: &Value) -> Result<(), HostError> {
        self.send_frame(&OutgoingFrame::Render { window, view })
            .await
    }

    pub fn pending_calls(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Host for WsHost {
    async fn invoke(&self, command: Command) -> Result<Value, HostError> {
        let id = Uuid::new_v4();
        let name = command.name();
        let (tx, rx) = oneshot::channel();

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, PendingCall { command: name, tx });

        tracing::debug!("[WS] -> {name} ({id})");
        if let Err(e) = self
            .send_frame(&OutgoingFrame::Invoke {
                id,
                command: &command,
            })
            .await
        {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            return Err(e);
        }

        rx.await.map_err(|_| HostError::Closed)?
    }
}

/// A live host connection and the tasks that pump it
pub struct WsConnection {
    pub host: Arc<WsHost>,
    /// Renderer input addressed to window controllers
    pub inputs: AsyncReceiver<WindowInput>,
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

fn resolve(pending: &PendingMap, response: ResponseFrame) {
    let Some(call) = pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&response.id)
    else {
        tracing::debug!("[WS] response for unknown call {}", response.id);
        return;
    };

    let result = if response.ok {
        Ok(response.value)
    } else if response.code.as_deref() == Some("unsupported") {
        Err(HostError::Unsupported(call.command))
    } else {
        Err(HostError::Rejected {
            command: call.command,
            message: response.error.unwrap_or_default(),
        })
    };

    tracing::debug!("[WS] <- {} ({}) ok={}", call.command, response.id, response.ok);
    let _ = call.tx.send(result);
}

fn fail_all(pending: &PendingMap) {
    let drained: Vec<_> = pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain()
        .collect();
    for (_, call) in drained {
        let _ = call.tx.send(Err(HostError::Closed));
    }
}

fn route(
    text: &str,
    pending: &PendingMap,
    bus: &EventBus,
    screen: &SharedScreen,
    input_tx: &AsyncSender<WindowInput>,
) {
    let frame: IncomingFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("[WS] dropping malformed frame: {e}");
            return;
        }
    };

    match frame {
        IncomingFrame::Response(response) => resolve(pending, response),
        IncomingFrame::Event(EventFrame { event, payload }) => {
            match HostEvent::from_wire(&event, payload) {
                Ok(event) => {
                    bus.emit(event);
                }
                Err(e) => tracing::debug!("[WS] ignoring event {event}: {e}"),
            }
        }
        IncomingFrame::Input(input) => {
            if input_tx.try_send(input).is_err() {
                tracing::warn!("[WS] input channel closed");
            }
        }
        IncomingFrame::Screen(metrics) => screen.update(metrics),
    }
}

/// Connect to the host and start the reader and writer tasks
pub async fn connect(
    url: &str,
    bus: EventBus,
    screen: SharedScreen,
    cancel: CancellationToken,
) -> anyhow::Result<WsConnection> {
    let parsed = url::Url::parse(url)?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        anyhow::bail!("host url must use ws:// or wss://, got {url}");
    }

    let (ws_stream, _) = connect_async(parsed.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();
    tracing::info!("[WS] connected to {url}");

    let (out_tx, out_rx) = kanal::unbounded_async::<Message>();
    let (input_tx, input_rx) = kanal::unbounded_async::<WindowInput>();
    let pending: PendingMap = Arc::default();

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_cancel.cancelled() => break,
                msg = out_rx.recv() => {
                    let Ok(msg) = msg else { break };
                    if let Err(e) = write.send(msg).await {
                        tracing::error!("[WS] write failed: {e}");
                        break;
                    }
                }
            }
        }
        let _ = write.close().await;
        tracing::info!("[WS] writer stopping");
    });

    let reader_pending = pending.clone();
    let reader = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) if msg.is_text() => {
                            if let Ok(text) = msg.to_text() {
                                route(text, &reader_pending, &bus, &screen, &input_tx);
                            }
                        }
                        Some(Ok(msg)) if msg.is_close() => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("[WS] read failed: {e}");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
        fail_all(&reader_pending);
        tracing::info!("[WS] reader stopping");
    });

    Ok(WsConnection {
        host: Arc::new(WsHost { out_tx, pending }),
        inputs: input_rx,
        reader,
        writer,
    })
}
