//! Action dispatch and feature-window choreography
//!
//! A dispatch resolves the text to act on, places the target window under
//! the action bar and hands it a `change-text` payload. The payload is
//! emitted several times at staggered delays because the target window may
//! not be listening yet when the first copy goes out; receivers fence on
//! `requestId`, so the repeats are no-ops once one copy has landed.
//! TODO: replace the staggered repeats with a readiness handshake from the
//! target window once the host exposes a window-ready event.

use std::sync::Arc;
use std::time::Duration;

use snapparse_config::settings::window::WindowSize;
use snapparse_config::{Settings, SettingsStore};
use snapparse_host::{
    ClipboardSink, EventBus, Host, HostCommands, HostEvent, LocalStore, OPTIMIZE_REQUEST_KEY,
    SELECTED_TEXT_KEY, Screen,
};
use snapparse_types::{
    ActionBarAction, BuiltinActionId, ChangeTextPayload, LogicalRect, Point, WindowKind,
};
use tokio::time::{Instant, sleep_until};

use crate::fence::RequestIds;

pub const FEATURE_WINDOW_GAP: f64 = 12.0;
pub const FEATURE_WINDOW_PADDING: f64 = 8.0;
/// Bar size assumed until the renderer reports real geometry
pub const DEFAULT_BAR_WIDTH: f64 = 402.0;
pub const DEFAULT_BAR_HEIGHT: f64 = 48.0;

const SEARCH_ENDPOINT: &str = "https://www.google.com/search";
const PAYLOAD_SOURCE: &str = "action-bar";

/// Top-left corner for a feature window opened from the bar
///
/// Horizontally centered under the bar, `FEATURE_WINDOW_GAP` below it, then
/// clamped into the work area minus padding. When the window is larger than
/// the work area the top-left edge wins.
pub fn feature_window_anchor(bar: LogicalRect, size: WindowSize, work_area: LogicalRect) -> Point {
    let raw_x = (bar.x + bar.width / 2.0 - size.width / 2.0).round();
    let raw_y = (bar.y + bar.height + FEATURE_WINDOW_GAP).round();

    let min_x = work_area.x + FEATURE_WINDOW_PADDING;
    let max_x = work_area.x + work_area.width - size.width - FEATURE_WINDOW_PADDING;
    let min_y = work_area.y + FEATURE_WINDOW_PADDING;
    let max_y = work_area.y + work_area.height - size.height - FEATURE_WINDOW_PADDING;

    Point::new(
        raw_x.max(min_x).min(min_x.max(max_x)),
        raw_y.max(min_y).min(min_y.max(max_y)),
    )
}

/// First non-blank candidate: override, live selection, persisted selection
pub fn resolve_text(
    override_text: Option<&str>,
    selected_text: &str,
    persisted: Option<String>,
) -> Option<String> {
    if let Some(text) = override_text
        && !text.trim().is_empty()
    {
        return Some(text.to_string());
    }
    if !selected_text.trim().is_empty() {
        return Some(selected_text.to_string());
    }
    persisted.filter(|text| !text.trim().is_empty())
}

pub fn search_url(text: &str) -> Option<String> {
    url::Url::parse_with_params(SEARCH_ENDPOINT, &[("q", text)])
        .ok()
        .map(String::from)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub action: ActionBarAction,
    pub override_text: Option<String>,
    pub selected_text: String,
    /// Bar bounds sampled before the bar closes
    pub bar: Option<LogicalRect>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Opened {
        target: WindowKind,
        request_id: u64,
        anchor: Point,
    },
    Searched,
    Copied,
    /// Nothing to act on; only the bar was closed
    Aborted,
}

/// Everything an action needs to reach its target
#[derive(Clone)]
pub struct Dispatcher {
    host: Arc<dyn Host>,
    bus: EventBus,
    store: Arc<dyn LocalStore>,
    clipboard: Arc<dyn ClipboardSink>,
    screen: Arc<dyn Screen>,
    settings: SettingsStore,
    redelivery: Arc<[Duration]>,
    request_ids: Arc<RequestIds>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: Arc<dyn Host>,
        bus: EventBus,
        store: Arc<dyn LocalStore>,
        clipboard: Arc<dyn ClipboardSink>,
        screen: Arc<dyn Screen>,
        settings: SettingsStore,
        redelivery: Vec<Duration>,
    ) -> Self {
        Self {
            host,
            bus,
            store,
            clipboard,
            screen,
            settings,
            redelivery: redelivery.into(),
            request_ids: Arc::new(RequestIds::new()),
        }
    }

    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchOutcome {
        let text = resolve_text(
            request.override_text.as_deref(),
            &request.selected_text,
            self.store.get(SELECTED_TEXT_KEY),
        );

        if let Some(target) = request.action.command_window {
            let Some(text) = text else {
                tracing::info!("[ACTION_BAR] {} has no text, closing", request.action.id);
                self.close_bar().await;
                return DispatchOutcome::Aborted;
            };
            return self.open_feature_window(&request, target, text).await;
        }

        match request.action.builtin_id {
            Some(BuiltinActionId::Search) => {
                if let Some(text) = text {
                    self.search(&text).await;
                }
                self.close_bar().await;
                DispatchOutcome::Searched
            }
            Some(BuiltinActionId::Copy) => {
                if let Some(text) = text {
                    self.copy(&text).await;
                }
                self.close_bar().await;
                DispatchOutcome::Copied
            }
            _ => {
                tracing::warn!("[ACTION_BAR] {} has no target", request.action.id);
                self.close_bar().await;
                DispatchOutcome::Aborted
            }
        }
    }

    /// Latest size preset, straight from the host when it answers
    async fn fresh_settings(&self) -> Arc<Settings> {
        match self.host.get_settings().await {
            Ok(value) => Arc::new(Settings::from_value_or_default(value)),
            Err(e) => {
                tracing::warn!("[ACTION_BAR] get_settings failed, using cached: {e}");
                self.settings.snapshot()
            }
        }
    }

    async fn open_feature_window(
        &self,
        request: &DispatchRequest,
        target: WindowKind,
        text: String,
    ) -> DispatchOutcome {
        let settings = self.fresh_settings().await;
        let size = settings.window.window_size.size();
        let bar = request.bar.unwrap_or_else(|| {
            let area = self.screen.work_area();
            LogicalRect::new(area.x, area.y, DEFAULT_BAR_WIDTH, DEFAULT_BAR_HEIGHT)
        });
        let anchor = feature_window_anchor(bar, size, self.screen.work_area());

        let request_id = self.request_ids.next();
        let payload = ChangeTextPayload {
            text: text.clone(),
            source: Some(PAYLOAD_SOURCE.to_string()),
            target: Some(target),
            title: Some(request.action.label.clone()),
            custom_prompt: request.action.prompt.clone(),
            custom_model: request.action.model.clone(),
            request_id: Some(request_id),
        };

        if let Err(e) = self.store.set(SELECTED_TEXT_KEY, &text) {
            tracing::warn!("[ACTION_BAR] failed to persist selection: {e}");
        }
        if target == WindowKind::Optimize {
            self.hand_off_optimize(&payload).await;
        }

        tracing::info!(
            "[ACTION_BAR] {} -> {} (request {request_id})",
            request.action.id,
            target.label()
        );
        self.deliver(payload);
        self.close_bar().await;

        if let Err(e) = self.host.open_window(target).await {
            tracing::warn!("[ACTION_BAR] open_window({}) failed: {e}", target.label());
        }
        if let Err(e) = self.host.resize_window(target, size.width, size.height).await {
            tracing::warn!("[ACTION_BAR] resize_window({}) failed: {e}", target.label());
        }
        if let Err(e) = self.host.move_window(target, anchor.x, anchor.y).await {
            tracing::warn!("[ACTION_BAR] move_window({}) failed: {e}", target.label());
        }

        DispatchOutcome::Opened {
            target,
            request_id,
            anchor,
        }
    }

    async fn hand_off_optimize(&self, payload: &ChangeTextPayload) {
        match serde_json::to_string(payload) {
            Ok(json) => {
                if let Err(e) = self.store.set(OPTIMIZE_REQUEST_KEY, &json) {
                    tracing::warn!("[ACTION_BAR] failed to persist optimize request: {e}");
                }
            }
            Err(e) => tracing::warn!("[ACTION_BAR] optimize request not serializable: {e}"),
        }
        if let Err(e) = self.host.set_pending_optimize_request(payload.clone()).await {
            tracing::warn!("[ACTION_BAR] set_pending_optimize_request failed: {e}");
        }
    }

    /// Emit the payload now for every zero delay, the rest in the background
    fn deliver(&self, payload: ChangeTextPayload) {
        let start = Instant::now();
        let (now, later): (Vec<_>, Vec<_>) =
            self.redelivery.iter().copied().partition(|d| d.is_zero());

        for _ in &now {
            self.bus.emit(HostEvent::ChangeText(payload.clone()));
        }
        if later.is_empty() {
            return;
        }

        let bus = self.bus.clone();
        tokio::spawn(async move {
            for delay in later {
                sleep_until(start + delay).await;
                bus.emit(HostEvent::ChangeText(payload.clone()));
            }
        });
    }

    async fn close_bar(&self) {
        if let Err(e) = self.host.close_window(WindowKind::ActionBar).await {
            tracing::warn!("[ACTION_BAR] close_window failed: {e}");
        }
    }

    async fn search(&self, text: &str) {
        let Some(url) = search_url(text) else {
            return;
        };

        match self.host.open_external_url(url.clone()).await {
            Ok(()) => {}
            Err(e) => {
                tracing::debug!("[ACTION_BAR] open_external_url unavailable ({e}), using system opener");
                let opened = tokio::task::spawn_blocking(move || open::that(url)).await;
                match opened {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("[ACTION_BAR] failed to open browser: {e}"),
                    Err(e) => tracing::warn!("[ACTION_BAR] browser task failed: {e}"),
                }
            }
        }
    }

    async fn copy(&self, text: &str) {
        let clipboard = self.clipboard.clone();
        let text = text.to_string();
        match tokio::task::spawn_blocking(move || clipboard.write_text(&text)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("[ACTION_BAR] copy failed: {e}"),
            Err(e) => tracing::warn!("[ACTION_BAR] copy task failed: {e}"),
        }
    }
}
