// Capture module - turns the target window (or the primary display when the
// window is gone) into RGB frames, with a short-lived frame cache shared by
// every caller.

pub mod config;
pub mod source;
pub mod types;
pub mod xcap_backend;

#[cfg(test)]
mod tests;

// Re-export the main types for easy access
pub use config::{CaptureConfig, create_strict_capture_config};
pub use source::FrameSource;
pub use types::{CaptureBackend, Frame, FrameProvider, ScreenRect, WindowFallback};
pub use xcap_backend::XcapBackend;
