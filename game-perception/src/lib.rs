pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod game_state;
pub mod resource;
pub mod template_matching;

pub use capture::{Frame, FrameProvider, FrameSource};
pub use config::PerceptionConfig;
pub use engine::PerceptionEngine;
pub use error::{PerceptionError, PerceptionResult};
pub use game_state::{GameState, StateClassifier};
pub use resource::{ResourceGauge, ResourceReading};
pub use template_matching::{Match, MatchEngine, TemplateLibrary};
