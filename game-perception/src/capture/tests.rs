//! Tests for frame capture and caching

use super::*;
use crate::error::{PerceptionError, PerceptionResult};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Backend with a fixed desktop, counting every call
struct ScriptedBackend {
    window: Option<ScreenRect>,
    display: Option<ScreenRect>,
    fail_capture: bool,
    captures: AtomicUsize,
    lookups: AtomicUsize,
}

impl ScriptedBackend {
    fn with_window(window: ScreenRect) -> Self {
        Self {
            window: Some(window),
            display: Some(ScreenRect::new(0, 0, 64, 48)),
            fail_capture: false,
            captures: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
        }
    }

    fn without_window() -> Self {
        Self {
            window: None,
            ..Self::with_window(ScreenRect::default())
        }
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for ScriptedBackend {
    fn locate_window(&self, _title: &str) -> Option<ScreenRect> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.window
    }

    fn primary_display(&self) -> Option<ScreenRect> {
        self.display
    }

    fn capture(&self, rect: ScreenRect) -> PerceptionResult<RgbaImage> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail_capture {
            return Err(PerceptionError::CaptureFailed {
                description: "scripted failure".to_string(),
            });
        }
        Ok(RgbaImage::from_pixel(
            rect.width,
            rect.height,
            Rgba([n as u8, 10, 20, 255]),
        ))
    }
}

fn source_with(backend: Arc<ScriptedBackend>, cache_ms: u64) -> FrameSource {
    let config = CaptureConfig {
        cache_duration_ms: cache_ms,
        ..CaptureConfig::default()
    };
    FrameSource::new(backend, "Test Window", config)
}

#[test]
fn test_grab_within_cache_window_returns_same_frame() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(10, 20, 32, 24)));
    let source = source_with(backend.clone(), 500);

    let first = source.grab(true);
    let second = source.grab(true);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.captured_at(), second.captured_at());
    assert_eq!(backend.captures(), 1);
}

#[test]
fn test_grab_after_cache_window_captures_again() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(10, 20, 32, 24)));
    let source = source_with(backend.clone(), 30);

    let first = source.grab(true);
    thread::sleep(Duration::from_millis(60));
    let second = source.grab(true);

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(backend.captures(), 2);
}

#[test]
fn test_grab_without_cache_always_captures() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(10, 20, 32, 24)));
    let source = source_with(backend.clone(), 10_000);

    let first = source.grab(true);
    let fresh = source.grab(false);
    assert!(!Arc::ptr_eq(&first, &fresh));

    // The uncached grab refreshed the cache slot
    let cached = source.grab(true);
    assert!(Arc::ptr_eq(&fresh, &cached));
    assert_eq!(backend.captures(), 2);
}

#[test]
fn test_invalidate_cache_forces_capture() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(0, 0, 16, 16)));
    let source = source_with(backend.clone(), 10_000);

    let first = source.grab(true);
    source.invalidate_cache();
    let second = source.grab(true);

    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_grab_region_bypasses_cache() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(0, 0, 16, 16)));
    let source = source_with(backend.clone(), 10_000);

    let cached = source.grab(true);
    let region = source.grab_region(ScreenRect::new(2, 2, 4, 3));
    assert_eq!(region.dimensions(), (4, 3));

    // The whole-frame slot is untouched by the region grab
    assert!(Arc::ptr_eq(&cached, &source.grab(true)));
    assert_eq!(backend.captures(), 2);
}

#[test]
fn test_window_region_is_relative_to_window() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(100, 50, 64, 64)));
    let source = source_with(backend, 40);

    let frame = source.grab_window_region(5, 6, 8, 9);
    assert_eq!(frame.source(), ScreenRect::new(105, 56, 8, 9));
}

#[test]
fn test_frame_uses_window_rect() {
    let window = ScreenRect::new(10, 20, 32, 24);
    let backend = Arc::new(ScriptedBackend::with_window(window));
    let source = source_with(backend, 40);

    let frame = source.grab(true);
    assert!(frame.is_valid());
    assert_eq!(frame.source(), window);
    assert_eq!(frame.dimensions(), (32, 24));
    assert_eq!(frame.image().get_pixel(0, 0).0, [0, 10, 20]);
}

#[test]
fn test_missing_window_falls_back_to_display() {
    let backend = Arc::new(ScriptedBackend::without_window());
    let source = source_with(backend, 40);

    let frame = source.grab(true);
    assert_eq!(frame.dimensions(), (64, 48));
    assert!(source.window_rect().is_none());
}

#[test]
fn test_missing_window_with_empty_fallback() {
    let backend = Arc::new(ScriptedBackend::without_window());
    let source = FrameSource::new(backend.clone(), "Test Window", create_strict_capture_config());

    let frame = source.grab(true);
    assert!(!frame.is_valid());
    assert_eq!(backend.captures(), 0);
}

#[test]
fn test_zero_sized_window_yields_empty_frame() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(0, 0, 0, 0)));
    let source = source_with(backend.clone(), 40);

    let frame = source.grab_region(ScreenRect::new(0, 0, 0, 10));
    assert!(!frame.is_valid());
    assert_eq!(backend.captures(), 0);
}

#[test]
fn test_capture_failure_yields_empty_frame() {
    let backend = Arc::new(ScriptedBackend {
        fail_capture: true,
        ..ScriptedBackend::with_window(ScreenRect::new(0, 0, 16, 16))
    });
    let source = source_with(backend, 40);

    let frame = source.grab(false);
    assert!(!frame.is_valid());
    assert_eq!(frame.dimensions(), (0, 0));
}

#[test]
fn test_window_lookup_is_rate_limited() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(0, 0, 16, 16)));
    let source = source_with(backend.clone(), 0);

    for _ in 0..5 {
        source.grab(false);
    }
    assert_eq!(backend.lookups(), 1);

    // A direct liveness check always asks the backend
    assert!(source.is_target_running());
    assert_eq!(backend.lookups(), 2);
}

#[test]
fn test_concurrent_grabs_share_cached_frame() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(0, 0, 16, 16)));
    let source = Arc::new(source_with(backend.clone(), 10_000));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let source = Arc::clone(&source);
            thread::spawn(move || source.grab(true))
        })
        .collect();
    let frames: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(frames.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(backend.captures(), 1);
}

#[test]
fn test_frame_crop_bounds() {
    let frame = Frame::from_image(image::RgbImage::new(20, 10));
    assert!(frame.crop(crate::resource::PixelRect::new(5, 5, 10, 5)).is_ok());
    assert!(matches!(
        frame.crop(crate::resource::PixelRect::new(15, 5, 10, 5)),
        Err(PerceptionError::RegionOutOfBounds { .. })
    ));
}

#[test]
fn test_frame_dimensions_follow_target() {
    let backend = Arc::new(ScriptedBackend::with_window(ScreenRect::new(10, 20, 32, 24)));
    let source = source_with(backend.clone(), 10_000);
    assert_eq!(source.frame_dimensions(), (32, 24));
    // Served from the cached frame
    assert_eq!(source.frame_dimensions(), (32, 24));
    assert_eq!(backend.captures(), 1);

    let source = source_with(Arc::new(ScriptedBackend::without_window()), 10_000);
    assert_eq!(source.frame_dimensions(), (64, 48));
}
