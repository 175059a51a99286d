use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds, used to stamp new requests
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Monotonic request id generator
///
/// Ids are wall-clock derived but never repeat or go backwards, even when
/// two requests land in the same millisecond.
#[derive(Debug, Default)]
pub struct RequestIds {
    last: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next_after(now_millis())
    }

    fn next_after(&self, now: u64) -> u64 {
        let step = |last: u64| now.max(last + 1);
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(step(last)))
        {
            Ok(prev) | Err(prev) => step(prev),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Newer than anything seen so far
    Accepted,
    /// Same id as the last accepted request
    Duplicate,
    /// Older than the last accepted request
    Stale,
}

/// Remembers the newest request id a window has applied
#[derive(Debug, Default)]
pub struct RequestFence {
    latest: Option<u64>,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<u64> {
        self.latest
    }

    pub fn admit(&mut self, request_id: u64) -> Admission {
        match self.latest {
            Some(latest) if request_id < latest => Admission::Stale,
            Some(latest) if request_id == latest => Admission::Duplicate,
            _ => {
                self.latest = Some(request_id);
                Admission::Accepted
            }
        }
    }
}
