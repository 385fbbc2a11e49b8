/// Template matching module for locating UI landmarks in frames
///
/// This module provides:
/// - A lazily loaded, process-lifetime template cache keyed by category-qualified names
/// - Zero-mean normalized cross-correlation (plus two alternative metrics)
/// - Best-match, all-matches with near-duplicate suppression, and region-limited search
pub mod config;
pub mod library;
pub mod matcher;
pub mod types;

pub use config::{MatchConfig, create_game_object_config};
pub use library::{Template, TemplateLibrary, TemplateProvider};
pub use matcher::{MatchEngine, ScoreMap, correlation_surface, suppress_non_maxima};
pub use types::{Match, MatchMethod};
