#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("clipboard command failed: {0}")]
    Command(#[from] std::io::Error),
}

pub trait ClipboardSink: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Try the primary sink, then the fallback
pub struct FallbackClipboard {
    primary: Box<dyn ClipboardSink>,
    fallback: Box<dyn ClipboardSink>,
}

impl FallbackClipboard {
    pub fn new(primary: Box<dyn ClipboardSink>, fallback: Box<dyn ClipboardSink>) -> Self {
        Self { primary, fallback }
    }
}

impl ClipboardSink for FallbackClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        match self.primary.write_text(text) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!("[CLIPBOARD] primary failed ({e}), using fallback");
                self.fallback.write_text(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Failing;

    impl ClipboardSink for Failing {
        fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable("no display".into()))
        }
    }

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<String>>>);

    impl ClipboardSink for Recording {
        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn falls_back_when_primary_fails() {
        let recording = Recording::default();
        let sink = FallbackClipboard::new(Box::new(Failing), Box::new(recording.clone()));
        sink.write_text("hello").unwrap();
        assert_eq!(*recording.0.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn primary_success_skips_fallback() {
        let primary = Recording::default();
        let fallback = Recording::default();
        let sink = FallbackClipboard::new(Box::new(primary.clone()), Box::new(fallback.clone()));
        sink.write_text("x").unwrap();
        assert_eq!(primary.0.lock().unwrap().len(), 1);
        assert!(fallback.0.lock().unwrap().is_empty());
    }
}
