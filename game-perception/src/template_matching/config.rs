//! Configuration for template matching operations

use super::types::MatchMethod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Scoring method for the correlation surface
    pub method: MatchMethod,
    /// Confidence threshold used when a call does not pass its own (0.0 to 1.0)
    pub default_threshold: f32,
    /// Minimum distance in pixels between the centers of two reported matches
    pub min_distance: u32,
    /// Maximum number of matches `find_all` returns
    pub max_matches: usize,
    /// Match on the grayscale derivative unless a call asks for color
    pub grayscale: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            method: MatchMethod::CorrelationCoefficientNormalized,
            default_threshold: 0.8,
            min_distance: 10,
            max_matches: 100,
            grayscale: true,
        }
    }
}

/// Configuration preset for repeated world objects (item labels, health bars)
pub fn create_game_object_config() -> MatchConfig {
    MatchConfig {
        default_threshold: 0.7,
        min_distance: 20,
        max_matches: 20,
        ..MatchConfig::default()
    }
}
