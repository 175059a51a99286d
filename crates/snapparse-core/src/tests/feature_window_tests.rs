use std::sync::Arc;

use serde_json::json;
use snapparse_config::SettingsStore;
use snapparse_config::timing::TimingConfig;
use snapparse_host::{
    Command, EventBus, HostEvent, LocalStore, MemoryStore, OPTIMIZE_REQUEST_KEY,
    SELECTED_TEXT_KEY,
};
use snapparse_types::{
    ChangeTextPayload, FeatureInput, OptimizePendingUpdated, StreamChunk, StreamDone, StreamError,
    TaskKind, WindowKind,
};
use tokio::sync::mpsc::{self, Sender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::fake_host::FakeHost;
use super::{eventually, settle};
use crate::feature_window::{FeatureView, FeatureWindow};

struct Harness {
    host: Arc<FakeHost>,
    bus: EventBus,
    inputs: Sender<FeatureInput>,
    view: watch::Receiver<FeatureView>,
    cancel: CancellationToken,
}

impl Harness {
    fn start(kind: WindowKind) -> Self {
        Self::start_with(kind, FakeHost::new(), Arc::new(MemoryStore::new()))
    }

    fn start_with(kind: WindowKind, host: Arc<FakeHost>, store: Arc<MemoryStore>) -> Self {
        let bus = EventBus::new();
        let window = FeatureWindow::new(
            kind,
            host.clone(),
            &bus,
            store,
            &SettingsStore::default(),
            &TimingConfig::default(),
        )
        .unwrap();
        let view = window.view();
        let (inputs, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        tokio::spawn(window.run(rx, cancel.clone()));

        Self {
            host,
            bus,
            inputs,
            view,
            cancel,
        }
    }

    async fn change_text(&self, payload: ChangeTextPayload) {
        self.bus.emit(HostEvent::ChangeText(payload));
        settle(1).await;
    }

    async fn input(&self, input: FeatureInput) {
        self.inputs.send(input).await.unwrap();
        settle(1).await;
    }

    fn chunk(&self, stream_id: &str, chunk: &str) {
        self.bus.emit(HostEvent::StreamChunk(StreamChunk {
            stream_id: stream_id.to_string(),
            chunk: chunk.to_string(),
        }));
    }

    fn done(&self, stream_id: &str, full_text: &str) {
        self.bus.emit(HostEvent::StreamDone(StreamDone {
            stream_id: stream_id.to_string(),
            full_text: full_text.to_string(),
            elapsed_ms: 12,
        }));
    }

    fn streams(&self) -> Vec<(TaskKind, String, serde_json::Value)> {
        self.host
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Command::StreamProcessText {
                    task_kind,
                    text,
                    options,
                } => Some((task_kind, text, options)),
                _ => None,
            })
            .collect()
    }

    fn result_text(&self) -> String {
        self.view.borrow().stream.result_text.clone()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn request(target: WindowKind, text: &str, request_id: u64) -> ChangeTextPayload {
    ChangeTextPayload {
        text: text.to_string(),
        source: Some("action-bar".to_string()),
        target: Some(target),
        request_id: Some(request_id),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_chunks_inside_one_flush_window_land_with_done() {
    let window = Harness::start(WindowKind::Translate);
    window
        .change_text(request(WindowKind::Translate, "hello world", 10))
        .await;

    assert_eq!(
        window.streams(),
        [(
            TaskKind::Translate,
            "hello world".to_string(),
            json!({ "fromLanguage": "auto", "toLanguage": "en" })
        )]
    );
    assert!(window.view.borrow().stream.streaming);

    window.chunk("gen-1", "A");
    window.chunk("gen-1", "B");
    window.chunk("gen-1", "C");
    settle(1).await;
    assert_eq!(window.result_text(), "");

    window.done("gen-1", "ABC");
    settle(1).await;
    assert_eq!(window.result_text(), "ABC");
    assert!(!window.view.borrow().stream.streaming);

    settle(50).await;
    assert_eq!(window.result_text(), "ABC");
}

#[tokio::test(start_paused = true)]
async fn test_buffered_chunks_flush_on_the_timer() {
    let window = Harness::start(WindowKind::Explain);
    window
        .change_text(request(WindowKind::Explain, "what is rust", 1))
        .await;

    window.chunk("gen-1", "Rust ");
    settle(1).await;
    window.chunk("gen-1", "is");
    settle(10).await;
    assert_eq!(window.result_text(), "");

    settle(20).await;
    assert_eq!(window.result_text(), "Rust is");
    assert!(!window.view.borrow().stream.loading);
    assert!(window.view.borrow().stream.streaming);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_generation_is_fenced_out() {
    let window = Harness::start(WindowKind::Summary);
    window.change_text(request(WindowKind::Summary, "first", 1)).await;
    window.change_text(request(WindowKind::Summary, "second", 2)).await;
    assert_eq!(window.streams().len(), 2);

    window.chunk("gen-1", "old");
    window.done("gen-1", "old result");
    window.bus.emit(HostEvent::StreamError(StreamError {
        stream_id: "gen-1".to_string(),
        error: "late failure".to_string(),
    }));
    window.chunk("gen-2", "new");
    settle(30).await;

    assert_eq!(window.result_text(), "new");
    assert_eq!(window.view.borrow().stream.error_text, None);
}

#[tokio::test(start_paused = true)]
async fn test_late_older_request_has_no_effect() {
    let window = Harness::start(WindowKind::Translate);
    window.change_text(request(WindowKind::Translate, "newer", 20)).await;
    window.change_text(request(WindowKind::Translate, "older", 10)).await;

    assert_eq!(window.streams().len(), 1);
    assert_eq!(window.view.borrow().source_text, "newer");
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_payload_is_applied_once() {
    let window = Harness::start(WindowKind::Translate);
    let payload = request(WindowKind::Translate, "hello", 7);
    window.change_text(payload.clone()).await;
    window.chunk("gen-1", "你好");
    settle(30).await;
    let once = window.view.borrow().clone();

    window.change_text(payload.clone()).await;
    window.change_text(payload).await;
    settle(30).await;

    assert_eq!(window.streams().len(), 1);
    assert_eq!(*window.view.borrow(), once);
}

#[tokio::test(start_paused = true)]
async fn test_payload_for_another_window_is_ignored() {
    let window = Harness::start(WindowKind::Translate);
    window.change_text(request(WindowKind::Summary, "not mine", 1)).await;
    window
        .change_text(ChangeTextPayload {
            text: "   ".to_string(),
            request_id: Some(2),
            ..Default::default()
        })
        .await;

    assert!(window.streams().is_empty());
    assert_eq!(window.view.borrow().source_text, "");
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_is_prefixed_for_the_window() {
    let window = Harness::start(WindowKind::Translate);
    window.change_text(request(WindowKind::Translate, "hi", 1)).await;
    window.chunk("gen-1", "partial");
    window.bus.emit(HostEvent::StreamError(StreamError {
        stream_id: "gen-1".to_string(),
        error: "timeout".to_string(),
    }));
    settle(30).await;

    let view = window.view.borrow().clone();
    assert_eq!(view.stream.error_text.as_deref(), Some("翻译失败：timeout"));
    assert_eq!(view.stream.result_text, "");
    assert!(!view.stream.streaming);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_start_shows_the_host_message() {
    let host = FakeHost::new();
    host.reject("stream_process_text", "missing api key");
    let window = Harness::start_with(WindowKind::Summary, host, Arc::new(MemoryStore::new()));
    window.change_text(request(WindowKind::Summary, "doc", 1)).await;

    eventually("error", || window.view.borrow().stream.error_text.is_some()).await;
    assert_eq!(
        window.view.borrow().stream.error_text.as_deref(),
        Some("总结失败：missing api key")
    );
}

#[tokio::test(start_paused = true)]
async fn test_language_change_restarts_translation() {
    let window = Harness::start(WindowKind::Translate);
    window.change_text(request(WindowKind::Translate, "hello", 1)).await;

    window
        .input(FeatureInput::Languages {
            from: "en".to_string(),
            to: "auto".to_string(),
        })
        .await;
    assert_eq!(window.streams().len(), 1);

    window
        .input(FeatureInput::Languages {
            from: "en".to_string(),
            to: "ja".to_string(),
        })
        .await;
    let streams = window.streams();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[1].2, json!({ "fromLanguage": "en", "toLanguage": "ja" }));
    assert_eq!(window.view.borrow().to_language, "ja");
}

#[tokio::test(start_paused = true)]
async fn test_manual_submit_starts_a_stream() {
    let window = Harness::start(WindowKind::Explain);
    window
        .input(FeatureInput::Submit {
            text: "  borrow checker  ".to_string(),
        })
        .await;

    assert_eq!(
        window.streams(),
        [(
            TaskKind::Explain,
            "borrow checker".to_string(),
            serde_json::Value::Null
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cached_selection_prefills_without_streaming() {
    let store = Arc::new(MemoryStore::new());
    store.set(SELECTED_TEXT_KEY, "cached text").unwrap();
    let window = Harness::start_with(WindowKind::Translate, FakeHost::new(), store);
    settle(5).await;

    assert_eq!(window.view.borrow().source_text, "cached text");
    assert!(window.streams().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_optimize_takes_the_pending_request_on_mount() {
    let host = FakeHost::new();
    let mut pending = request(WindowKind::Optimize, "draft email", 5);
    pending.custom_prompt = Some(" be concise ".to_string());
    pending.title = Some("商务润色".to_string());
    host.reply(
        "take_pending_optimize_request",
        Ok(serde_json::to_value(&pending).unwrap()),
    );

    let window = Harness::start_with(WindowKind::Optimize, host, Arc::new(MemoryStore::new()));
    eventually("stream", || !window.streams().is_empty()).await;

    let streams = window.streams();
    assert_eq!(streams[0].0, TaskKind::Optimize);
    assert_eq!(
        streams[0].2,
        json!({ "customPrompt": "be concise", "customModel": null })
    );
    assert_eq!(window.view.borrow().title, "商务润色");

    // the same request redelivered as change-text is a duplicate
    window.change_text(pending).await;
    window
        .bus
        .emit(HostEvent::OptimizePendingUpdated(OptimizePendingUpdated {
            request_id: Some(5),
        }));
    settle(5).await;

    assert_eq!(window.host.count("take_pending_optimize_request"), 2);
    assert_eq!(window.streams().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_optimize_falls_back_to_the_stored_request() {
    let host = FakeHost::new();
    host.reject("take_pending_optimize_request", "not ready");
    let store = Arc::new(MemoryStore::new());
    let stored = request(WindowKind::Optimize, "stored draft", 3);
    store
        .set(OPTIMIZE_REQUEST_KEY, &serde_json::to_string(&stored).unwrap())
        .unwrap();

    let window = Harness::start_with(WindowKind::Optimize, host, store);
    eventually("stream", || !window.streams().is_empty()).await;
    assert_eq!(window.streams()[0].1, "stored draft");
}

#[tokio::test(start_paused = true)]
async fn test_unmount_releases_every_subscription() {
    let window = Harness::start(WindowKind::Translate);
    window.change_text(request(WindowKind::Translate, "hi", 1)).await;
    assert_eq!(window.bus.listener_count(), 2);

    window.cancel.cancel();
    settle(1).await;
    assert_eq!(window.bus.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_numeric_generation_ids_are_followed() {
    let host = FakeHost::new();
    host.reply("stream_process_text", Ok(json!(7)));
    let window = Harness::start_with(WindowKind::Summary, host, Arc::new(MemoryStore::new()));
    window.change_text(request(WindowKind::Summary, "report", 1)).await;

    for (event, payload) in [
        ("stream-chunk", json!({ "streamId": 7, "chunk": "Sho" })),
        ("stream-chunk", json!({ "streamId": 8, "chunk": "stale" })),
        ("stream-done", json!({ "streamId": 7, "fullText": "Short", "elapsedMs": 30 })),
    ] {
        window.bus.emit(HostEvent::from_wire(event, payload).unwrap());
    }
    settle(1).await;

    assert_eq!(window.result_text(), "Short");
    assert!(!window.view.borrow().stream.streaming);
}
