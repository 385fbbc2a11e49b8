use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for perception operations.
pub type PerceptionResult<T> = Result<T, PerceptionError>;

/// The error type for fallible steps inside the perception engine.
///
/// Most of these never reach callers of the perception API: a missing template,
/// a failed capture or an out-of-bounds region are turned into "no match",
/// an empty frame or a safe gauge reading after being logged. Configuration
/// loading and file output are the exceptions.
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("Template not found at {path:?}")]
    TemplateNotFound { path: PathBuf },

    #[error("Failed to decode template {path:?}: {source}")]
    TemplateDecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Template {name} has zero size")]
    EmptyTemplate { name: String },

    #[error("No display available for capture")]
    NoDisplay,

    #[error("Capture rectangle has zero area: {width}x{height}")]
    EmptyCaptureRect { width: u32, height: u32 },

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error(
        "Region [{x},{y},{width},{height}] exceeds frame bounds ({frame_width}x{frame_height})"
    )]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Failed to read config {path:?}: {source}")]
    ConfigReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    ConfigParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode frame: {source}")]
    EncodeFailed {
        #[from]
        source: image::ImageError,
    },
}
