//! Streaming result reconciliation
//!
//! A [`StreamReconciler`] folds generation-tagged stream events into the
//! visible result of one feature window. Only the generation returned by the
//! most recent start is applied; everything else is dropped on arrival.

use serde::Serialize;
use snapparse_host::HostEvent;
use snapparse_types::StreamId;

pub mod session;

pub use session::{SessionWake, StreamSession};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub result_text: String,
    /// Waiting for the first fragment
    pub loading: bool,
    pub streaming: bool,
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk { stream_id: StreamId, chunk: String },
    Done { stream_id: StreamId, full_text: String },
    Error { stream_id: StreamId, error: String },
}

impl StreamEvent {
    pub fn from_host(event: HostEvent) -> Option<Self> {
        match event {
            HostEvent::StreamChunk(e) => Some(StreamEvent::Chunk {
                stream_id: e.stream_id,
                chunk: e.chunk,
            }),
            HostEvent::StreamDone(e) => Some(StreamEvent::Done {
                stream_id: e.stream_id,
                full_text: e.full_text,
            }),
            HostEvent::StreamError(e) => Some(StreamEvent::Error {
                stream_id: e.stream_id,
                error: e.error,
            }),
            _ => None,
        }
    }

    pub fn stream_id(&self) -> &str {
        match self {
            StreamEvent::Chunk { stream_id, .. }
            | StreamEvent::Done { stream_id, .. }
            | StreamEvent::Error { stream_id, .. } => stream_id,
        }
    }
}

/// What the owner has to do with its flush timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Fragments are buffered; arm the flush unless one is already pending
    ArmFlush,
    CancelFlush,
    Nothing,
}

#[derive(Debug)]
pub struct StreamReconciler {
    label: String,
    ticket: u64,
    awaiting_start: bool,
    active: Option<StreamId>,
    /// Events that raced ahead of the start response
    early: Vec<StreamEvent>,
    buffer: String,
    finished: bool,
    view: StreamView,
}

impl StreamReconciler {
    /// `label` prefixes user-facing errors, e.g. `翻译失败`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ticket: 0,
            awaiting_start: false,
            active: None,
            early: Vec::new(),
            buffer: String::new(),
            finished: false,
            view: StreamView::default(),
        }
    }

    pub fn view(&self) -> &StreamView {
        &self.view
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Clear everything and invalidate any start still in flight
    pub fn reset(&mut self) {
        self.ticket += 1;
        self.awaiting_start = false;
        self.active = None;
        self.early.clear();
        self.buffer.clear();
        self.finished = false;
        self.view = StreamView::default();
    }

    /// Reset and wait for a new generation; returns the start ticket
    pub fn begin(&mut self) -> u64 {
        self.reset();
        self.awaiting_start = true;
        self.view.loading = true;
        self.view.streaming = true;
        self.ticket
    }

    /// The start issued under `ticket` resolved with generation `stream_id`
    pub fn started(&mut self, ticket: u64, stream_id: StreamId) -> Reaction {
        if ticket != self.ticket || !self.awaiting_start {
            tracing::debug!("[STREAM] dropping superseded start {stream_id}");
            return Reaction::Nothing;
        }
        tracing::debug!("[STREAM] generation {stream_id} active");
        self.awaiting_start = false;
        self.active = Some(stream_id);

        let mut reaction = Reaction::Nothing;
        for event in std::mem::take(&mut self.early) {
            match self.on_event(event) {
                Reaction::Nothing => {}
                other => reaction = other,
            }
        }
        reaction
    }

    pub fn start_failed(&mut self, ticket: u64, message: &str) {
        if ticket != self.ticket || !self.awaiting_start {
            return;
        }
        self.awaiting_start = false;
        self.early.clear();
        self.fail(message);
    }

    pub fn on_event(&mut self, event: StreamEvent) -> Reaction {
        let Some(active) = self.active.as_deref() else {
            if self.awaiting_start {
                self.early.push(event);
            }
            return Reaction::Nothing;
        };
        if event.stream_id() != active || self.finished {
            return Reaction::Nothing;
        }

        match event {
            StreamEvent::Chunk { chunk, .. } => {
                self.buffer.push_str(&chunk);
                Reaction::ArmFlush
            }
            StreamEvent::Done { full_text, .. } => {
                self.buffer.clear();
                self.finished = true;
                self.view.result_text = full_text;
                self.view.loading = false;
                self.view.streaming = false;
                Reaction::CancelFlush
            }
            StreamEvent::Error { error, .. } => {
                self.buffer.clear();
                self.fail(&error);
                Reaction::CancelFlush
            }
        }
    }

    /// Move buffered fragments into the visible text; returns whether it changed
    pub fn flush(&mut self) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        self.view.result_text.push_str(&self.buffer);
        self.buffer.clear();
        self.view.loading = false;
        true
    }

    fn fail(&mut self, message: &str) {
        self.finished = true;
        self.view.error_text = Some(format!("{}：{}", self.label, message));
        self.view.loading = false;
        self.view.streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> StreamEvent {
        StreamEvent::Chunk {
            stream_id: id.into(),
            chunk: text.into(),
        }
    }

    fn done(id: &str, text: &str) -> StreamEvent {
        StreamEvent::Done {
            stream_id: id.into(),
            full_text: text.into(),
        }
    }

    fn started(label: &str, id: &str) -> StreamReconciler {
        let mut r = StreamReconciler::new(label);
        let ticket = r.begin();
        r.started(ticket, id.into());
        r
    }

    #[test]
    fn chunks_are_buffered_until_flushed() {
        let mut r = started("翻译失败", "g1");
        assert_eq!(r.on_event(chunk("g1", "A")), Reaction::ArmFlush);
        assert_eq!(r.on_event(chunk("g1", "B")), Reaction::ArmFlush);
        assert_eq!(r.view().result_text, "");
        assert!(r.view().loading);

        assert!(r.flush());
        assert_eq!(r.view().result_text, "AB");
        assert!(!r.view().loading);
        assert!(r.view().streaming);
        assert!(!r.flush());
    }

    #[test]
    fn done_replaces_text_with_the_authoritative_copy() {
        let mut r = started("总结失败", "g1");
        r.on_event(chunk("g1", "A"));
        r.flush();
        r.on_event(chunk("g1", "Bx"));

        assert_eq!(r.on_event(done("g1", "ABC")), Reaction::CancelFlush);
        assert_eq!(r.view().result_text, "ABC");
        assert!(!r.view().streaming);
        assert!(!r.has_buffered());

        // late fragments of a finished generation are ignored
        assert_eq!(r.on_event(chunk("g1", "Z")), Reaction::Nothing);
        assert_eq!(r.view().result_text, "ABC");
    }

    #[test]
    fn error_is_prefixed_and_discards_the_buffer() {
        let mut r = started("翻译失败", "g1");
        r.on_event(chunk("g1", "partial"));
        let reaction = r.on_event(StreamEvent::Error {
            stream_id: "g1".into(),
            error: "timeout".into(),
        });

        assert_eq!(reaction, Reaction::CancelFlush);
        assert_eq!(r.view().error_text.as_deref(), Some("翻译失败：timeout"));
        assert_eq!(r.view().result_text, "");
        assert!(!r.flush());
    }

    #[test]
    fn superseded_generation_never_touches_the_view() {
        let mut r = started("解释失败", "g1");
        r.on_event(chunk("g1", "old"));
        r.flush();

        let ticket = r.begin();
        r.started(ticket, "g2".into());
        r.on_event(chunk("g2", "new"));
        r.flush();

        assert_eq!(r.on_event(chunk("g1", "stale")), Reaction::Nothing);
        assert_eq!(r.on_event(done("g1", "stale done")), Reaction::Nothing);
        let err = StreamEvent::Error {
            stream_id: "g1".into(),
            error: "boom".into(),
        };
        assert_eq!(r.on_event(err), Reaction::Nothing);

        assert_eq!(r.view().result_text, "new");
        assert_eq!(r.view().error_text, None);
        assert!(r.view().streaming);
    }

    #[test]
    fn events_racing_the_start_response_are_replayed() {
        let mut r = StreamReconciler::new("优化失败");
        let ticket = r.begin();
        r.on_event(chunk("g7", "early"));
        r.on_event(chunk("g6", "someone else"));

        assert_eq!(r.started(ticket, "g7".into()), Reaction::ArmFlush);
        r.flush();
        assert_eq!(r.view().result_text, "early");
    }

    #[test]
    fn start_resolving_after_a_newer_begin_is_dropped() {
        let mut r = StreamReconciler::new("翻译失败");
        let first = r.begin();
        let second = r.begin();

        assert_eq!(r.started(first, "g1".into()), Reaction::Nothing);
        assert_eq!(r.active(), None);
        r.started(second, "g2".into());
        assert_eq!(r.active(), Some("g2"));

        r.start_failed(first, "ignored");
        assert_eq!(r.view().error_text, None);
    }

    #[test]
    fn failed_start_surfaces_an_error() {
        let mut r = StreamReconciler::new("总结失败");
        let ticket = r.begin();
        r.start_failed(ticket, "no api key");
        assert_eq!(r.view().error_text.as_deref(), Some("总结失败：no api key"));
        assert!(!r.view().loading);
        assert!(!r.view().streaming);
    }

    #[test]
    fn reset_clears_everything() {
        let mut r = started("翻译失败", "g1");
        r.on_event(chunk("g1", "A"));
        r.reset();

        assert_eq!(r.view(), &StreamView::default());
        assert_eq!(r.active(), None);
        assert!(!r.has_buffered());
        assert_eq!(r.on_event(chunk("g1", "B")), Reaction::Nothing);
    }
}
