use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Sleep, sleep};

/// A single pending deadline owned by an actor loop
///
/// Poll `fired()` from a `select!` arm. Scheduling while a deadline is
/// pending replaces it, so at most one callback can ever be due.
#[derive(Debug, Default)]
pub struct TimerSlot {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is pending and arm a fresh deadline
    pub fn schedule(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(sleep(delay)));
    }

    /// Arm only when nothing is pending; returns whether it armed
    pub fn schedule_if_idle(&mut self, delay: Duration) -> bool {
        if self.sleep.is_some() {
            return false;
        }
        self.schedule(delay);
        true
    }

    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Resolves once the pending deadline passes, then disarms
    ///
    /// Never resolves while idle. Cancel safe: dropping the future keeps the
    /// deadline armed.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => std::future::pending().await,
        }
    }
}
