//! Top-level configuration, loaded from JSON

use crate::capture::CaptureConfig;
use crate::error::{PerceptionError, PerceptionResult};
use crate::game_state::ClassifierConfig;
use crate::resource::{GaugeConfig, Resolution};
use crate::template_matching::MatchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_WINDOW_TITLE: &str = "Diablo II: Resurrected";
pub const DEFAULT_TEMPLATE_ROOT: &str = "assets/templates";

/// Everything needed to build a [`crate::PerceptionEngine`].
///
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Exact title of the window to capture
    pub window_title: String,
    /// Root of the `<category>/<name>.png` template tree
    pub template_root: PathBuf,
    /// Resolution the game renders at; HUD regions are scaled to it
    pub resolution: Resolution,
    pub capture: CaptureConfig,
    pub matching: MatchConfig,
    pub gauges: GaugeConfig,
    pub classifier: ClassifierConfig,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            template_root: PathBuf::from(DEFAULT_TEMPLATE_ROOT),
            resolution: Resolution::default(),
            capture: CaptureConfig::default(),
            matching: MatchConfig::default(),
            gauges: GaugeConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl PerceptionConfig {
    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> PerceptionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            PerceptionError::ConfigReadFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let config: Self =
            serde_json::from_str(&text).map_err(|source| PerceptionError::ConfigParseFailed {
                path: path.to_path_buf(),
                source,
            })?;

        log::info!(
            "Loaded config {:?} (window '{}', {}x{})",
            path,
            config.window_title,
            config.resolution.width,
            config.resolution.height
        );
        Ok(config)
    }
}
