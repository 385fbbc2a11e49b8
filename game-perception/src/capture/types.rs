// Core capture types and traits
use crate::error::{PerceptionError, PerceptionResult};
use crate::resource::PixelRect;
use image::{GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// A rectangle in desktop coordinates. The origin may be negative on
/// multi-monitor setups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Shift by an offset, e.g. to turn window-relative into absolute coordinates.
    pub fn offset(&self, dx: i32, dy: i32) -> ScreenRect {
        ScreenRect::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }
}

/// A single captured snapshot: RGB pixels, when and where they came from.
///
/// Frames are immutable. The grayscale derivative used by the matcher is
/// computed on first use and shared by every later caller.
#[derive(Clone)]
pub struct Frame {
    image: RgbImage,
    captured_at: Instant,
    source: ScreenRect,
    gray: OnceLock<GrayImage>,
}

impl Frame {
    pub fn new(image: RgbImage, source: ScreenRect) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
            source,
            gray: OnceLock::new(),
        }
    }

    /// Drop the alpha channel of a raw capture.
    pub fn from_rgba(image: RgbaImage, source: ScreenRect) -> Self {
        Self::new(image::DynamicImage::ImageRgba8(image).to_rgb8(), source)
    }

    /// Wrap an image that did not come from the screen (files, synthetic frames).
    pub fn from_image(image: RgbImage) -> Self {
        let source = ScreenRect::new(0, 0, image.width(), image.height());
        Self::new(image, source)
    }

    /// The frame handed out when nothing could be captured.
    pub fn empty(source: ScreenRect) -> Self {
        Self::new(RgbImage::new(0, 0), source)
    }

    /// False for the zero-sized frame produced by a failed capture.
    pub fn is_valid(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn gray(&self) -> &GrayImage {
        self.gray
            .get_or_init(|| image::imageops::grayscale(&self.image))
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub fn source(&self) -> ScreenRect {
        self.source
    }

    /// Copy out a sub-rectangle. Out-of-bounds rectangles are an error, not a clip.
    pub fn crop(&self, rect: PixelRect) -> PerceptionResult<RgbImage> {
        if !rect.fits_within(self.width(), self.height()) {
            return Err(PerceptionError::RegionOutOfBounds {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                frame_width: self.width(),
                frame_height: self.height(),
            });
        }
        Ok(image::imageops::crop_imm(&self.image, rect.x, rect.y, rect.width, rect.height).to_image())
    }

    /// Encode as PNG bytes
    pub fn encode_png(&self) -> PerceptionResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("source", &self.source)
            .field("age", &self.age())
            .finish()
    }
}

/// What to capture when the target window cannot be found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFallback {
    /// Capture the whole primary display instead
    #[default]
    PrimaryDisplay,
    /// Hand out an empty frame
    EmptyFrame,
}

// Trait for the platform side of capturing (window lookup + pixel grab)
pub trait CaptureBackend: Send + Sync {
    /// Desktop rectangle of the first visible window whose title matches exactly.
    fn locate_window(&self, title: &str) -> Option<ScreenRect>;

    /// Desktop rectangle of the primary display.
    fn primary_display(&self) -> Option<ScreenRect>;

    /// Grab the pixels of a desktop rectangle.
    fn capture(&self, rect: ScreenRect) -> PerceptionResult<RgbaImage>;
}

// Capability consumed by anything that needs "the current frame"
pub trait FrameProvider: Send + Sync {
    fn grab(&self, use_cache: bool) -> Arc<Frame>;
    fn grab_region(&self, rect: ScreenRect) -> Frame;
    fn invalidate_cache(&self);

    /// Where the target window currently is, if known
    fn window_rect(&self) -> Option<ScreenRect> {
        None
    }

    fn is_target_running(&self) -> bool {
        self.window_rect().is_some()
    }
}
