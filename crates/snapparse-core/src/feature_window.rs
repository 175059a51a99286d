//! Result windows for translate, summarize, explain and optimize
//!
//! A feature window accepts work through `change-text` payloads (fenced on
//! `requestId`), manual submissions from its own input box and, for the
//! optimize window, the pending-request slot kept by the host.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use snapparse_config::{Settings, SettingsStore};
use snapparse_config::timing::TimingConfig;
use snapparse_host::{
    EventBus, EventName, Host, HostCommands, HostError, HostEvent, Listener, LocalStore,
    OPTIMIZE_REQUEST_KEY, SELECTED_TEXT_KEY,
};
use snapparse_types::{ChangeTextPayload, FeatureInput, TaskKind, WindowKind};
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::fence::{Admission, RequestFence, now_millis};
use crate::streaming::{StreamSession, StreamView};

pub const LANGUAGES: [&str; 5] = ["auto", "zh-CN", "en", "ja", "ko"];
pub const DEFAULT_FROM_LANGUAGE: &str = "auto";
pub const DEFAULT_TO_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureView {
    pub window: WindowKind,
    pub title: String,
    pub source_text: String,
    pub from_language: String,
    pub to_language: String,
    pub font_size: u32,
    #[serde(flatten)]
    pub stream: StreamView,
}

/// A `change-text` payload after trimming and id stamping
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    pub request_id: u64,
    pub text: String,
    pub title: Option<String>,
    pub custom_prompt: Option<String>,
    pub custom_model: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check a payload against the receiving window
///
/// Payloads addressed to another window or carrying no text are rejected.
/// A payload without a `requestId` is stamped with the current time.
pub fn normalize_payload(window: WindowKind, payload: ChangeTextPayload) -> Option<FeatureRequest> {
    if let Some(target) = payload.target
        && target != window
    {
        return None;
    }
    let text = payload.text.trim();
    if text.is_empty() {
        return None;
    }

    Some(FeatureRequest {
        request_id: payload.request_id.unwrap_or_else(now_millis),
        text: text.to_string(),
        title: trimmed(payload.title),
        custom_prompt: trimmed(payload.custom_prompt),
        custom_model: trimmed(payload.custom_model),
    })
}

pub fn is_source_language(code: &str) -> bool {
    LANGUAGES.contains(&code)
}

pub fn is_target_language(code: &str) -> bool {
    code != "auto" && LANGUAGES.contains(&code)
}

type Taken = Result<Option<ChangeTextPayload>, HostError>;

pub struct FeatureWindow {
    kind: WindowKind,
    task: TaskKind,
    host: Arc<dyn Host>,
    store: Arc<dyn LocalStore>,
    events: Listener,
    settings_rx: watch::Receiver<Arc<Settings>>,
    fence: RequestFence,
    session: StreamSession,
    title: String,
    source_text: String,
    from_language: String,
    to_language: String,
    custom_prompt: Option<String>,
    custom_model: Option<String>,
    font_size: u32,
    pending_tx: UnboundedSender<Taken>,
    pending_rx: UnboundedReceiver<Taken>,
    view_tx: watch::Sender<FeatureView>,
}

impl FeatureWindow {
    /// `None` unless `kind` is one of the four result windows
    ///
    /// Subscribes to `change-text` right away, so payloads emitted before
    /// `run` is first polled are still delivered.
    pub fn new(
        kind: WindowKind,
        host: Arc<dyn Host>,
        bus: &EventBus,
        store: Arc<dyn LocalStore>,
        settings: &SettingsStore,
        timing: &TimingConfig,
    ) -> Option<Self> {
        let task = kind.task_kind()?;
        let names: &[EventName] = if kind == WindowKind::Optimize {
            &[EventName::ChangeText, EventName::OptimizePendingUpdated]
        } else {
            &[EventName::ChangeText]
        };
        let font_size = settings.snapshot().window.font_size;
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let session = StreamSession::new(
            host.clone(),
            bus.clone(),
            kind.error_label(),
            timing.flush_interval(),
        );

        let mut window = Self {
            kind,
            task,
            host,
            store,
            events: bus.listen(names),
            settings_rx: settings.subscribe(),
            fence: RequestFence::new(),
            session,
            title: kind.title().to_string(),
            source_text: String::new(),
            from_language: DEFAULT_FROM_LANGUAGE.to_string(),
            to_language: DEFAULT_TO_LANGUAGE.to_string(),
            custom_prompt: None,
            custom_model: None,
            font_size,
            pending_tx,
            pending_rx,
            view_tx: watch::channel(FeatureView {
                window: kind,
                title: kind.title().to_string(),
                source_text: String::new(),
                from_language: DEFAULT_FROM_LANGUAGE.to_string(),
                to_language: DEFAULT_TO_LANGUAGE.to_string(),
                font_size,
                stream: StreamView::default(),
            })
            .0,
        };
        window.prefill();
        Some(window)
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn view(&self) -> watch::Receiver<FeatureView> {
        self.view_tx.subscribe()
    }

    pub async fn run(mut self, mut inputs: Receiver<FeatureInput>, cancel: CancellationToken) {
        tracing::info!("[FEATURE] {} window mounted", self.kind.label());
        if self.kind == WindowKind::Optimize {
            self.take_pending();
        }
        self.publish();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.handle_input(input);
                }
                event = self.events.recv() => {
                    match event {
                        Some(HostEvent::ChangeText(payload)) => self.apply_payload(payload),
                        Some(HostEvent::OptimizePendingUpdated(update)) => {
                            tracing::debug!("[FEATURE] pending optimize request {:?}", update.request_id);
                            self.take_pending();
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                wake = self.session.next() => {
                    self.session.handle(wake);
                }
                Some(taken) = self.pending_rx.recv() => self.pending_taken(taken),
                Ok(()) = self.settings_rx.changed() => {
                    self.font_size = self.settings_rx.borrow_and_update().window.font_size;
                }
            }
            self.publish();
        }

        self.session.reset();
        tracing::info!("[FEATURE] {} window unmounted", self.kind.label());
    }

    fn publish(&self) {
        let next = FeatureView {
            window: self.kind,
            title: self.title.clone(),
            source_text: self.source_text.clone(),
            from_language: self.from_language.clone(),
            to_language: self.to_language.clone(),
            font_size: self.font_size,
            stream: self.session.view().clone(),
        };
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    /// Show the last persisted selection until a real request shows up
    fn prefill(&mut self) {
        if let Some(text) = self.store.get(SELECTED_TEXT_KEY)
            && !text.trim().is_empty()
        {
            self.source_text = text.trim().to_string();
        }
    }

    fn handle_input(&mut self, input: FeatureInput) {
        match input {
            FeatureInput::Submit { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                self.source_text = text.to_string();
                self.start_stream();
            }
            FeatureInput::Languages { from, to } => {
                if self.task != TaskKind::Translate {
                    return;
                }
                if !is_source_language(&from) || !is_target_language(&to) {
                    tracing::warn!("[FEATURE] rejected language pair {from} -> {to}");
                    return;
                }
                if from == self.from_language && to == self.to_language {
                    return;
                }
                self.from_language = from;
                self.to_language = to;
                if !self.source_text.is_empty() {
                    self.start_stream();
                }
            }
        }
    }

    fn apply_payload(&mut self, payload: ChangeTextPayload) {
        let Some(request) = normalize_payload(self.kind, payload) else {
            return;
        };

        match self.fence.admit(request.request_id) {
            Admission::Accepted => {}
            Admission::Duplicate => return,
            Admission::Stale => {
                tracing::debug!(
                    "[FEATURE] {} dropping stale request {}",
                    self.kind.label(),
                    request.request_id
                );
                return;
            }
        }

        tracing::info!("[FEATURE] {} accepted request {}", self.kind.label(), request.request_id);
        self.source_text = request.text;
        self.title = request
            .title
            .unwrap_or_else(|| self.kind.title().to_string());
        if self.kind == WindowKind::Optimize {
            self.custom_prompt = request.custom_prompt;
            self.custom_model = request.custom_model;
        }
        self.start_stream();
    }

    fn take_pending(&self) {
        let host = self.host.clone();
        let tx = self.pending_tx.clone();
        tokio::spawn(async move {
            let result = host.take_pending_optimize_request().await;
            let _ = tx.send(result);
        });
    }

    fn pending_taken(&mut self, result: Taken) {
        match result {
            Ok(Some(payload)) => self.apply_payload(payload),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("[FEATURE] take_pending_optimize_request failed, trying local copy: {e}");
                let stored = self
                    .store
                    .get(OPTIMIZE_REQUEST_KEY)
                    .and_then(|json| serde_json::from_str::<ChangeTextPayload>(&json).ok());
                if let Some(payload) = stored {
                    self.apply_payload(payload);
                }
            }
        }
    }

    fn stream_options(&self) -> Value {
        match self.task {
            TaskKind::Translate => json!({
                "fromLanguage": self.from_language,
                "toLanguage": self.to_language,
            }),
            TaskKind::Optimize => json!({
                "customPrompt": self.custom_prompt,
                "customModel": self.custom_model,
            }),
            TaskKind::Summarize | TaskKind::Explain => Value::Null,
        }
    }

    fn start_stream(&mut self) {
        let options = self.stream_options();
        self.session
            .start(self.task, self.source_text.clone(), options);
    }
}
