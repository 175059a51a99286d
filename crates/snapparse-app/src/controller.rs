use std::sync::Arc;

use kanal::AsyncReceiver;
use serde::Serialize;
use snapparse_config::{Config, SettingsStore};
use snapparse_core::{
    ActionBarController, Dispatcher, FeatureWindow, OverlayController, SettingsSync,
};
use snapparse_host::{ClipboardSink, EventBus, Host, LocalStore, SharedScreen};
use snapparse_io::WsHost;
use snapparse_types::{ActionBarInput, FeatureInput, OverlayInput, WindowInput, WindowKind};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Per-window input queues drained by the window controllers
pub struct ChannelSet {
    pub action_bar: Receiver<ActionBarInput>,
    pub overlay: Receiver<OverlayInput>,
    pub translate: Receiver<FeatureInput>,
    pub summary: Receiver<FeatureInput>,
    pub explain: Receiver<FeatureInput>,
    pub optimize: Receiver<FeatureInput>,
}

impl ChannelSet {
    /// Queues plus the router's sending half
    pub fn open() -> (Routes, Self) {
        let (action_bar_tx, action_bar) = mpsc::channel(64);
        let (overlay_tx, overlay) = mpsc::channel(256); // pointer move bursts
        let (translate_tx, translate) = mpsc::channel(16);
        let (summary_tx, summary) = mpsc::channel(16);
        let (explain_tx, explain) = mpsc::channel(16);
        let (optimize_tx, optimize) = mpsc::channel(16);

        let routes = Routes {
            action_bar: action_bar_tx,
            overlay: overlay_tx,
            translate: translate_tx,
            summary: summary_tx,
            explain: explain_tx,
            optimize: optimize_tx,
        };
        let channels = Self {
            action_bar,
            overlay,
            translate,
            summary,
            explain,
            optimize,
        };
        (routes, channels)
    }
}

#[derive(Clone)]
pub struct Routes {
    action_bar: Sender<ActionBarInput>,
    overlay: Sender<OverlayInput>,
    translate: Sender<FeatureInput>,
    summary: Sender<FeatureInput>,
    explain: Sender<FeatureInput>,
    optimize: Sender<FeatureInput>,
}

impl Routes {
    async fn deliver(&self, input: WindowInput) -> anyhow::Result<()> {
        match input {
            WindowInput::ActionBar(input) => self.action_bar.send(input).await?,
            WindowInput::OcrCapture(input) => self.overlay.send(input).await?,
            WindowInput::Translate(input) => self.translate.send(input).await?,
            WindowInput::Summary(input) => self.summary.send(input).await?,
            WindowInput::Explain(input) => self.explain.send(input).await?,
            WindowInput::Optimize(input) => self.optimize.send(input).await?,
        }
        Ok(())
    }
}

/// Everything the window controllers share
pub struct Services {
    pub config: Config,
    pub host: Arc<WsHost>,
    pub bus: EventBus,
    pub store: Arc<dyn LocalStore>,
    pub clipboard: Arc<dyn ClipboardSink>,
    pub screen: SharedScreen,
    pub settings: SettingsStore,
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    services: Services,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(services: Services, cancel_token: CancellationToken) -> Self {
        Self {
            services,
            cancel_token,
        }
    }

    pub fn spawn_tasks(
        &self,
        sync: SettingsSync,
        inputs: AsyncReceiver<WindowInput>,
    ) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();
        let (routes, channels) = ChannelSet::open();
        let s = &self.services;
        let host: Arc<dyn Host> = s.host.clone();

        // Settings
        let cancel = self.cancel_token.child_token();
        tasks.spawn(async move {
            sync.run(cancel).await;
            Ok(())
        });

        // Capture overlay
        let overlay = OverlayController::new(
            host.clone(),
            Arc::new(s.screen.clone()),
            &s.bus,
            s.settings.clone(),
            &s.config.timing,
        );
        self.spawn_view(&mut tasks, WindowKind::OcrCapture, overlay.view());
        let cancel = self.cancel_token.child_token();
        let rx = channels.overlay;
        tasks.spawn(async move {
            overlay.run(rx, cancel).await;
            Ok(())
        });

        // Action bar
        let dispatcher = Dispatcher::new(
            host.clone(),
            s.bus.clone(),
            s.store.clone(),
            s.clipboard.clone(),
            Arc::new(s.screen.clone()),
            s.settings.clone(),
            s.config.timing.redelivery_delays(),
        );
        let action_bar = ActionBarController::new(dispatcher, host.clone(), &s.bus, &s.settings);
        self.spawn_view(&mut tasks, WindowKind::ActionBar, action_bar.view());
        let cancel = self.cancel_token.child_token();
        let rx = channels.action_bar;
        tasks.spawn(async move {
            action_bar.run(rx, cancel).await;
            Ok(())
        });

        // Feature windows
        let features = [
            (WindowKind::Translate, channels.translate),
            (WindowKind::Summary, channels.summary),
            (WindowKind::Explain, channels.explain),
            (WindowKind::Optimize, channels.optimize),
        ];
        for (kind, rx) in features {
            let Some(window) = FeatureWindow::new(
                kind,
                host.clone(),
                &s.bus,
                s.store.clone(),
                &s.settings,
                &s.config.timing,
            ) else {
                continue;
            };
            self.spawn_view(&mut tasks, kind, window.view());
            let cancel = self.cancel_token.child_token();
            tasks.spawn(async move {
                window.run(rx, cancel).await;
                Ok(())
            });
        }

        // Renderer input
        tasks.spawn(route_inputs(
            inputs,
            routes,
            self.cancel_token.child_token(),
        ));

        tasks
    }

    fn spawn_view<V>(
        &self,
        tasks: &mut JoinSet<anyhow::Result<()>>,
        window: WindowKind,
        view: watch::Receiver<V>,
    ) where
        V: Serialize + Send + Sync + 'static,
    {
        tasks.spawn(forward_view(
            self.services.host.clone(),
            window,
            view,
            self.cancel_token.child_token(),
        ));
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// Forward renderer input to its window until shutdown or disconnect
///
/// Only cancellation races the receive here, so an input dropped with the
/// pending receive is one that arrived during shutdown.
pub(crate) async fn route_inputs(
    inputs: AsyncReceiver<WindowInput>,
    routes: Routes,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            input = inputs.recv() => {
                let Ok(input) = input else { break };
                routes.deliver(input).await?;
            }
        }
    }
    Ok(())
}

/// Push every view change to the renderer as a `render` frame
async fn forward_view<V>(
    host: Arc<WsHost>,
    window: WindowKind,
    mut view: watch::Receiver<V>,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    V: Serialize + Send + Sync,
{
    loop {
        let value = serde_json::to_value(&*view.borrow_and_update())?;
        if let Err(e) = host.render(window, &value).await {
            tracing::warn!("render {} failed: {e}", window.label());
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
