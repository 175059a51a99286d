use std::sync::Arc;

use serde::Serialize;
use snapparse_config::settings::toolbar::ThemeMode;
use snapparse_config::{Settings, SettingsStore};
use snapparse_host::{EventBus, EventName, Host, HostCommands, HostEvent, Listener};
use snapparse_types::{ActionBarAction, ActionBarInput, LogicalRect, SelectionTextPayload, WindowKind};
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::actions::resolve_actions;
use crate::dispatch::{DispatchOutcome, DispatchRequest, Dispatcher};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBarView {
    pub actions: Vec<ActionBarAction>,
    pub selected_text: String,
    pub busy: bool,
    pub theme_mode: ThemeMode,
}

/// Selection arriving from OCR with a follow-up action to run unattended
#[derive(Debug, Clone, PartialEq)]
struct AutoAction {
    action_id: String,
    text: String,
}

pub struct ActionBarController {
    dispatcher: Dispatcher,
    host: Arc<dyn Host>,
    events: Listener,
    settings_rx: watch::Receiver<Arc<Settings>>,
    actions: Vec<ActionBarAction>,
    theme_mode: ThemeMode,
    selected_text: String,
    bar: Option<LogicalRect>,
    busy: bool,
    queued: Option<AutoAction>,
    done_tx: UnboundedSender<DispatchOutcome>,
    done_rx: UnboundedReceiver<DispatchOutcome>,
    view_tx: watch::Sender<ActionBarView>,
}

impl ActionBarController {
    pub fn new(
        dispatcher: Dispatcher,
        host: Arc<dyn Host>,
        bus: &EventBus,
        settings: &SettingsStore,
    ) -> Self {
        let snapshot = settings.snapshot();
        let actions = resolve_actions(&snapshot);
        let theme_mode = snapshot.toolbar.theme_mode;
        let (view_tx, _) = watch::channel(ActionBarView {
            actions: actions.clone(),
            selected_text: String::new(),
            busy: false,
            theme_mode,
        });
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        Self {
            dispatcher,
            host,
            events: bus.listen(&[EventName::SelectionTextChanged]),
            settings_rx: settings.subscribe(),
            actions,
            theme_mode,
            selected_text: String::new(),
            bar: None,
            busy: false,
            queued: None,
            done_tx,
            done_rx,
            view_tx,
        }
    }

    pub fn view(&self) -> watch::Receiver<ActionBarView> {
        self.view_tx.subscribe()
    }

    pub async fn run(mut self, mut inputs: Receiver<ActionBarInput>, cancel: CancellationToken) {
        tracing::info!("[ACTION_BAR] controller started with {} actions", self.actions.len());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.handle_input(input);
                }
                event = self.events.recv() => {
                    match event {
                        Some(HostEvent::SelectionTextChanged(selection)) => self.selection_changed(selection),
                        Some(_) => {}
                        None => break,
                    }
                }
                Some(outcome) = self.done_rx.recv() => {
                    tracing::debug!("[ACTION_BAR] dispatch finished: {outcome:?}");
                    self.busy = false;
                    self.drain_queue();
                }
                Ok(()) = self.settings_rx.changed() => {
                    let settings = self.settings_rx.borrow_and_update().clone();
                    self.actions = resolve_actions(&settings);
                    self.theme_mode = settings.toolbar.theme_mode;
                    self.drain_queue();
                }
            }
            self.publish();
        }

        tracing::info!("[ACTION_BAR] controller stopping");
    }

    fn publish(&self) {
        let next = ActionBarView {
            actions: self.actions.clone(),
            selected_text: self.selected_text.clone(),
            busy: self.busy,
            theme_mode: self.theme_mode,
        };
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    fn handle_input(&mut self, input: ActionBarInput) {
        match input {
            ActionBarInput::Click { action_id } => {
                if self.busy {
                    tracing::debug!("[ACTION_BAR] busy, ignoring {action_id}");
                    return;
                }
                let Some(action) = self.find(&action_id) else {
                    tracing::warn!("[ACTION_BAR] unknown action {action_id}");
                    return;
                };
                self.start(action, None);
            }
            ActionBarInput::Geometry { bounds } => {
                self.bar = Some(bounds);
                let host = self.host.clone();
                tokio::spawn(async move {
                    let (width, height) = (bounds.width.ceil(), bounds.height.ceil());
                    if let Err(e) = host.resize_window(WindowKind::ActionBar, width, height).await {
                        tracing::debug!("[ACTION_BAR] resize to content failed: {e}");
                    }
                });
            }
        }
    }

    fn selection_changed(&mut self, selection: SelectionTextPayload) {
        if selection.is_from_ocr()
            && let Some(action_id) = selection.auto_action_id.clone()
        {
            tracing::info!("[ACTION_BAR] queued {action_id} from OCR");
            self.queued = Some(AutoAction {
                action_id,
                text: selection.text.clone(),
            });
        }
        self.selected_text = selection.text;
        self.drain_queue();
    }

    fn find(&self, action_id: &str) -> Option<ActionBarAction> {
        self.actions.iter().find(|a| a.id == action_id).cloned()
    }

    /// Fire the queued auto action once it resolves and nothing is running
    fn drain_queue(&mut self) {
        if self.busy {
            return;
        }
        let Some(queued) = &self.queued else {
            return;
        };
        let Some(action) = self.find(&queued.action_id) else {
            return;
        };
        let Some(queued) = self.queued.take() else {
            return;
        };
        self.start(action, Some(queued.text));
    }

    fn start(&mut self, action: ActionBarAction, override_text: Option<String>) {
        self.busy = true;
        let request = DispatchRequest {
            action,
            override_text,
            selected_text: self.selected_text.clone(),
            bar: self.bar,
        };
        let dispatcher = self.dispatcher.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(request).await;
            let _ = tx.send(outcome);
        });
    }
}
