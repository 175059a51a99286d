use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use snapparse_types::LogicalRect;

/// Display metrics reported by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenMetrics {
    pub scale_factor: f64,
    /// Usable area excluding task bars, in logical pixels
    pub work_area: LogicalRect,
}

impl Default for ScreenMetrics {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            work_area: LogicalRect::new(0.0, 0.0, 1920.0, 1080.0),
        }
    }
}

pub trait Screen: Send + Sync {
    /// Device pixel ratio, sampled at the moment of the call
    fn scale_factor(&self) -> f64;
    fn work_area(&self) -> LogicalRect;
}

/// Last metrics pushed by the renderer
#[derive(Debug, Clone, Default)]
pub struct SharedScreen {
    metrics: Arc<RwLock<ScreenMetrics>>,
}

impl SharedScreen {
    pub fn new(metrics: ScreenMetrics) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(metrics)),
        }
    }

    pub fn update(&self, metrics: ScreenMetrics) {
        *self.metrics.write().unwrap_or_else(PoisonError::into_inner) = metrics;
    }

    fn read(&self) -> ScreenMetrics {
        *self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Screen for SharedScreen {
    fn scale_factor(&self) -> f64 {
        let scale = self.read().scale_factor;
        if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
    }

    fn work_area(&self) -> LogicalRect {
        self.read().work_area
    }
}
