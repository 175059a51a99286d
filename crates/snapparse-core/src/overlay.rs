//! Capture overlay state machine
//!
//! The machine is synchronous and never touches the host. Every transition
//! returns the effects the controller has to perform; host completions come
//! back in through `preview_ready`, `hint_resolved` and `terminal_finished`,
//! tagged with the epoch or sequence number they were issued under so that
//! anything resolved after a reset is dropped.

use serde::Serialize;
use snapparse_config::settings::ocr::{ModeHotkeys, OcrSettings};
use snapparse_hotkey::{matches_chord, normalize_key};
use snapparse_types::{
    CaptureEntryKind, CaptureMode, CapturePoint, CaptureRegion, CapturedPreview, KeyEvent,
    LogicalRect, OcrCaptureOpened, OverlayInput, Point, ScreenshotRequest, TerminalAction,
};

pub mod controller;

/// Drags smaller than this on either side count as a click
pub const MIN_CAPTURE_SIZE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Dragging {
        start: Point,
        end: Point,
    },
    Processing,
    Captured {
        preview: CapturedPreview,
        scale_factor: f64,
        busy: Option<TerminalAction>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEffect {
    /// Restart the hover debounce
    DebounceHint,
    CancelHint,
    CapturePreview {
        epoch: u64,
        request: ScreenshotRequest,
    },
    RunTerminal {
        epoch: u64,
        action: TerminalAction,
        region: CaptureRegion,
        image_data: String,
    },
    CloseWindow,
}

/// Render model for the overlay window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayView {
    pub state: &'static str,
    pub mode: CaptureMode,
    /// The one rectangle to draw: preview, drag or window hint
    pub active_rect: Option<LogicalRect>,
    pub preview_image: Option<String>,
    pub busy_action: Option<TerminalAction>,
    pub show_shortcut_hints: bool,
    pub mode_hotkeys: ModeHotkeys,
}

#[derive(Debug)]
pub struct OverlayMachine {
    default_mode: CaptureMode,
    mode: CaptureMode,
    phase: Phase,
    hint: Option<LogicalRect>,
    hover: Option<Point>,
    hint_seq: u64,
    epoch: u64,
    mode_hotkeys: ModeHotkeys,
    show_shortcut_hints: bool,
}

impl OverlayMachine {
    pub fn new(ocr: &OcrSettings) -> Self {
        Self {
            default_mode: ocr.capture_default_mode,
            mode: ocr.capture_default_mode,
            phase: Phase::Idle,
            hint: None,
            hover: None,
            hint_seq: 0,
            epoch: 0,
            mode_hotkeys: ocr.mode_hotkeys.clone(),
            show_shortcut_hints: ocr.show_shortcut_hints,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn hint(&self) -> Option<LogicalRect> {
        self.hint
    }

    pub fn state_name(&self) -> &'static str {
        match (&self.phase, self.mode) {
            (Phase::Idle, CaptureMode::Region) => "idle-region",
            (Phase::Idle, CaptureMode::Fullscreen) => "idle-fullscreen",
            (Phase::Idle, CaptureMode::Window) => "idle-window",
            (Phase::Dragging { .. }, _) => "dragging",
            (Phase::Processing, _) => "processing",
            (Phase::Captured { .. }, _) => "captured",
        }
    }

    /// New default mode and chords; the active mode is left alone
    pub fn apply_settings(&mut self, ocr: &OcrSettings) {
        self.default_mode = ocr.capture_default_mode;
        self.mode_hotkeys = ocr.mode_hotkeys.clone();
        self.show_shortcut_hints = ocr.show_shortcut_hints;
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.hint = None;
        self.hover = None;
        self.mode = self.default_mode;
        self.epoch += 1;
    }

    fn has_preview(&self) -> bool {
        matches!(self.phase, Phase::Processing | Phase::Captured { .. })
    }

    fn terminal_busy(&self) -> bool {
        matches!(self.phase, Phase::Captured { busy: Some(_), .. })
    }

    /// Host opened the overlay window
    pub fn opened(&mut self, event: OcrCaptureOpened) -> Vec<OverlayEffect> {
        self.reset();
        self.mode = match event.entry_kind {
            CaptureEntryKind::Ocr => CaptureMode::Region,
            CaptureEntryKind::Screenshot => event.initial_mode.unwrap_or(self.default_mode),
        };
        tracing::debug!("[OVERLAY] opened for {:?} in {}", event.entry_kind, self.mode.as_str());
        vec![OverlayEffect::CancelHint]
    }

    pub fn handle(&mut self, input: &OverlayInput, scale_factor: f64) -> Vec<OverlayEffect> {
        match input {
            OverlayInput::PointerDown { x, y } => self.pointer_down(Point::new(*x, *y), scale_factor),
            OverlayInput::PointerMove { x, y } => self.pointer_move(Point::new(*x, *y)),
            OverlayInput::PointerUp { x, y } => self.pointer_up(Point::new(*x, *y), scale_factor),
            OverlayInput::KeyDown(event) => self.key_down(event),
            OverlayInput::Action { action } => self.terminal(*action),
            OverlayInput::Cancel => {
                self.reset();
                vec![OverlayEffect::CancelHint]
            }
        }
    }

    fn begin_capture(&mut self, request: ScreenshotRequest) -> Vec<OverlayEffect> {
        self.phase = Phase::Processing;
        self.hint = None;
        self.hover = None;
        vec![
            OverlayEffect::CancelHint,
            OverlayEffect::CapturePreview {
                epoch: self.epoch,
                request,
            },
        ]
    }

    fn capture_fullscreen(&mut self, point: Option<CapturePoint>) -> Vec<OverlayEffect> {
        self.begin_capture(ScreenshotRequest {
            mode: CaptureMode::Fullscreen,
            region: None,
            point,
        })
    }

    fn pointer_down(&mut self, point: Point, scale_factor: f64) -> Vec<OverlayEffect> {
        if self.phase != Phase::Idle {
            return Vec::new();
        }

        match self.mode {
            CaptureMode::Region => {
                self.phase = Phase::Dragging {
                    start: point,
                    end: point,
                };
                Vec::new()
            }
            CaptureMode::Fullscreen => {
                self.capture_fullscreen(Some(CapturePoint::at(point, scale_factor)))
            }
            CaptureMode::Window => {
                let Some(hint) = self.hint else {
                    return Vec::new();
                };
                self.begin_capture(ScreenshotRequest {
                    mode: CaptureMode::Window,
                    region: Some(hint.with_scale(scale_factor)),
                    point: Some(CapturePoint::at(point, scale_factor)),
                })
            }
        }
    }

    fn pointer_move(&mut self, point: Point) -> Vec<OverlayEffect> {
        match &mut self.phase {
            Phase::Dragging { end, .. } => {
                *end = point;
                Vec::new()
            }
            Phase::Idle if self.mode == CaptureMode::Window => {
                self.hover = Some(point);
                vec![OverlayEffect::DebounceHint]
            }
            _ => Vec::new(),
        }
    }

    fn pointer_up(&mut self, point: Point, scale_factor: f64) -> Vec<OverlayEffect> {
        let Phase::Dragging { start, .. } = self.phase else {
            return Vec::new();
        };

        let rect = LogicalRect::from_points(start, point);
        if !rect.fits(MIN_CAPTURE_SIZE) {
            tracing::debug!("[OVERLAY] drag {}x{} too small, ignored", rect.width, rect.height);
            self.phase = Phase::Idle;
            return Vec::new();
        }

        self.begin_capture(ScreenshotRequest {
            mode: CaptureMode::Region,
            region: Some(rect.with_scale(scale_factor)),
            point: None,
        })
    }

    fn key_down(&mut self, event: &KeyEvent) -> Vec<OverlayEffect> {
        if normalize_key(&event.key).as_deref() == Some("Esc") {
            if self.phase == Phase::Processing || self.terminal_busy() {
                return Vec::new();
            }
            self.reset();
            return vec![OverlayEffect::CancelHint, OverlayEffect::CloseWindow];
        }

        if self.has_preview() {
            return Vec::new();
        }

        let modes = [CaptureMode::Region, CaptureMode::Fullscreen, CaptureMode::Window];
        let Some(mode) = modes
            .into_iter()
            .find(|mode| matches_chord(event, self.mode_hotkeys.chord_for(*mode)))
        else {
            return Vec::new();
        };

        tracing::debug!("[OVERLAY] mode hotkey -> {}", mode.as_str());
        self.phase = Phase::Idle;
        self.hint = None;
        self.hover = None;
        self.mode = mode;

        let mut effects = vec![OverlayEffect::CancelHint];
        if mode == CaptureMode::Fullscreen {
            effects.extend(self.capture_fullscreen(None));
        }
        effects
    }

    fn terminal(&mut self, action: TerminalAction) -> Vec<OverlayEffect> {
        let Phase::Captured {
            preview,
            scale_factor,
            busy,
        } = &mut self.phase
        else {
            return Vec::new();
        };
        if busy.is_some() {
            return Vec::new();
        }

        *busy = Some(action);
        vec![OverlayEffect::RunTerminal {
            epoch: self.epoch,
            action,
            region: preview.logical_rect.with_scale(*scale_factor),
            image_data: preview.image_data.clone(),
        }]
    }

    /// Sample the hover point once the debounce settles
    ///
    /// Returns the lookup to issue, or `None` when the overlay is no longer
    /// in a state that wants a hint.
    pub fn hint_due(&mut self, scale_factor: f64) -> Option<(u64, CapturePoint)> {
        if self.mode != CaptureMode::Window || self.phase != Phase::Idle {
            return None;
        }
        let point = self.hover?;
        self.hint_seq += 1;
        Some((self.hint_seq, CapturePoint::at(point, scale_factor)))
    }

    /// Apply a hint lookup unless a newer lookup or a state change superseded it
    pub fn hint_resolved(&mut self, seq: u64, rect: Option<LogicalRect>) -> bool {
        if seq != self.hint_seq || self.mode != CaptureMode::Window || self.phase != Phase::Idle {
            return false;
        }
        self.hint = rect;
        true
    }

    pub fn preview_ready(
        &mut self,
        epoch: u64,
        result: Option<CapturedPreview>,
        scale_factor: f64,
    ) -> Vec<OverlayEffect> {
        if epoch != self.epoch || self.phase != Phase::Processing {
            return Vec::new();
        }

        match result {
            Some(preview) => {
                self.phase = Phase::Captured {
                    preview,
                    scale_factor,
                    busy: None,
                };
            }
            None => self.reset(),
        }
        Vec::new()
    }

    /// A terminal action ended, successfully or not
    pub fn terminal_finished(&mut self, epoch: u64) -> Vec<OverlayEffect> {
        if epoch != self.epoch || !self.terminal_busy() {
            return Vec::new();
        }
        self.reset();
        vec![OverlayEffect::CloseWindow]
    }

    pub fn view(&self) -> OverlayView {
        let (active_rect, preview_image, busy_action) = match &self.phase {
            Phase::Captured { preview, busy, .. } => (
                Some(preview.logical_rect),
                Some(preview.image_data.clone()),
                *busy,
            ),
            Phase::Dragging { start, end } => {
                (Some(LogicalRect::from_points(*start, *end)), None, None)
            }
            Phase::Idle if self.mode == CaptureMode::Window => (self.hint, None, None),
            _ => (None, None, None),
        };

        OverlayView {
            state: self.state_name(),
            mode: self.mode,
            active_rect,
            preview_image,
            busy_action,
            show_shortcut_hints: self.show_shortcut_hints,
            mode_hotkeys: self.mode_hotkeys.clone(),
        }
    }
}
