use std::sync::Arc;
use std::time::Duration;

use snapparse_config::{Settings, SettingsStore};
use snapparse_config::timing::TimingConfig;
use snapparse_host::{
    EventBus, EventName, Host, HostCommands, HostError, HostEvent, Listener, Screen,
};
use snapparse_types::{
    CapturedPreview, LogicalRect, OverlayInput, TerminalAction, WindowKind,
};
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{OverlayEffect, OverlayMachine, OverlayView};
use crate::timer::TimerSlot;

enum Completion {
    Preview {
        epoch: u64,
        scale_factor: f64,
        result: Result<CapturedPreview, HostError>,
    },
    Hint {
        seq: u64,
        result: Result<Option<LogicalRect>, HostError>,
    },
    Terminal {
        epoch: u64,
        action: TerminalAction,
        result: Result<(), HostError>,
    },
}

/// Drives an [`OverlayMachine`] from renderer input and host completions
pub struct OverlayController {
    machine: OverlayMachine,
    host: Arc<dyn Host>,
    screen: Arc<dyn Screen>,
    events: Listener,
    _settings: SettingsStore,
    settings_rx: watch::Receiver<Arc<Settings>>,
    hint_timer: TimerSlot,
    hint_debounce: Duration,
    done_tx: UnboundedSender<Completion>,
    done_rx: UnboundedReceiver<Completion>,
    view_tx: watch::Sender<OverlayView>,
}

impl OverlayController {
    /// Subscribes to `ocr-capture-opened` immediately, before `run` is polled
    pub fn new(
        host: Arc<dyn Host>,
        screen: Arc<dyn Screen>,
        bus: &EventBus,
        settings: SettingsStore,
        timing: &TimingConfig,
    ) -> Self {
        let settings_rx = settings.subscribe();
        let machine = OverlayMachine::new(&settings.snapshot().ocr);
        let (view_tx, _) = watch::channel(machine.view());
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        Self {
            machine,
            host,
            screen,
            events: bus.listen(&[EventName::OcrCaptureOpened]),
            _settings: settings,
            settings_rx,
            hint_timer: TimerSlot::new(),
            hint_debounce: timing.hint_debounce(),
            done_tx,
            done_rx,
            view_tx,
        }
    }

    pub fn view(&self) -> watch::Receiver<OverlayView> {
        self.view_tx.subscribe()
    }

    pub async fn run(mut self, mut inputs: Receiver<OverlayInput>, cancel: CancellationToken) {
        tracing::info!("[OVERLAY] controller started in {}", self.machine.state_name());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    let scale_factor = self.screen.scale_factor();
                    let effects = self.machine.handle(&input, scale_factor);
                    self.apply(effects, scale_factor);
                }
                event = self.events.recv() => {
                    match event {
                        Some(HostEvent::OcrCaptureOpened(opened)) => {
                            let effects = self.machine.opened(opened);
                            self.apply(effects, self.screen.scale_factor());
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                Some(done) = self.done_rx.recv() => self.complete(done),
                Ok(()) = self.settings_rx.changed() => {
                    let ocr = self.settings_rx.borrow_and_update().ocr.clone();
                    self.machine.apply_settings(&ocr);
                }
                _ = self.hint_timer.fired() => self.request_hint(),
            }
            self.publish();
        }

        tracing::info!("[OVERLAY] controller stopping");
    }

    fn publish(&self) {
        let next = self.machine.view();
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    fn apply(&mut self, effects: Vec<OverlayEffect>, scale_factor: f64) {
        for effect in effects {
            match effect {
                OverlayEffect::DebounceHint => self.hint_timer.schedule(self.hint_debounce),
                OverlayEffect::CancelHint => self.hint_timer.cancel(),
                OverlayEffect::CapturePreview { epoch, request } => {
                    tracing::info!("[OVERLAY] capturing {} preview", request.mode.as_str());
                    let host = self.host.clone();
                    let tx = self.done_tx.clone();
                    tokio::spawn(async move {
                        let result = host.capture_screenshot_preview(request).await;
                        let _ = tx.send(Completion::Preview {
                            epoch,
                            scale_factor,
                            result,
                        });
                    });
                }
                OverlayEffect::RunTerminal {
                    epoch,
                    action,
                    region,
                    image_data,
                } => {
                    tracing::info!("[OVERLAY] running {action:?} on preview");
                    let host = self.host.clone();
                    let tx = self.done_tx.clone();
                    tokio::spawn(async move {
                        let result = match action {
                            TerminalAction::Ocr => host.run_ocr_capture(region).await,
                            TerminalAction::Copy => host.copy_screenshot_preview(image_data).await,
                            TerminalAction::Save => host.save_screenshot_preview(image_data).await,
                        };
                        let _ = tx.send(Completion::Terminal {
                            epoch,
                            action,
                            result,
                        });
                    });
                }
                OverlayEffect::CloseWindow => {
                    let host = self.host.clone();
                    tokio::spawn(async move {
                        if let Err(e) = host.close_window(WindowKind::OcrCapture).await {
                            tracing::warn!("[OVERLAY] close_window failed: {e}");
                        }
                    });
                }
            }
        }
    }

    fn request_hint(&mut self) {
        let Some((seq, point)) = self.machine.hint_due(self.screen.scale_factor()) else {
            return;
        };

        let host = self.host.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = host.resolve_window_capture_hint(point).await;
            let _ = tx.send(Completion::Hint { seq, result });
        });
    }

    fn complete(&mut self, done: Completion) {
        match done {
            Completion::Preview {
                epoch,
                scale_factor,
                result,
            } => {
                let preview = result
                    .inspect_err(|e| tracing::warn!("[OVERLAY] preview capture failed: {e}"))
                    .ok();
                let effects = self.machine.preview_ready(epoch, preview, scale_factor);
                self.apply(effects, scale_factor);
            }
            Completion::Hint { seq, result } => match result {
                Ok(rect) => {
                    self.machine.hint_resolved(seq, rect);
                }
                Err(e) => tracing::debug!("[OVERLAY] hint lookup failed: {e}"),
            },
            Completion::Terminal {
                epoch,
                action,
                result,
            } => {
                if let Err(e) = result {
                    tracing::warn!("[OVERLAY] {action:?} failed: {e}");
                }
                let effects = self.machine.terminal_finished(epoch);
                self.apply(effects, self.screen.scale_factor());
            }
        }
    }
}
