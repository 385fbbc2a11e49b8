// Game state module - maps template evidence in a frame onto one situational
// state, with a fixed priority order for ambiguous frames.

pub mod classifier;
pub mod config;
pub mod types;


pub use classifier::StateClassifier;
pub use config::ClassifierConfig;
pub use types::GameState;
