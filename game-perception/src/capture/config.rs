//! Configuration for frame capture

use super::types::WindowFallback;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// How long a captured frame is reused by `grab(true)` (40ms = 1 frame at 25fps)
    pub cache_duration_ms: u64,
    /// Minimum time between two window lookups
    pub window_check_interval_ms: u64,
    /// Strategy when the target window is missing
    pub fallback: WindowFallback,
}

impl CaptureConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration_ms)
    }

    pub fn window_check_interval(&self) -> Duration {
        Duration::from_millis(self.window_check_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cache_duration_ms: 40,
            window_check_interval_ms: 1000,
            fallback: WindowFallback::PrimaryDisplay,
        }
    }
}

/// Preset for one-shot tools: every grab is fresh and a missing window is not
/// silently replaced by the desktop.
pub fn create_strict_capture_config() -> CaptureConfig {
    CaptureConfig {
        cache_duration_ms: 0,
        window_check_interval_ms: 0,
        fallback: WindowFallback::EmptyFrame,
    }
}
