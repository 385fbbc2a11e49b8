//! Cached window capture

use super::config::CaptureConfig;
use super::types::{CaptureBackend, Frame, FrameProvider, ScreenRect, WindowFallback};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

struct CachedFrame {
    frame: Arc<Frame>,
    cached_at: Instant,
}

#[derive(Default)]
struct WindowTracker {
    rect: Option<ScreenRect>,
    last_check: Option<Instant>,
}

/// Captures the target window into [`Frame`]s.
///
/// Safe to share between the background gauge poller and the foreground
/// decision loop: the cached frame and its timestamp are swapped together
/// under one lock, and the window position under another.
pub struct FrameSource {
    backend: Arc<dyn CaptureBackend>,
    window_title: String,
    config: CaptureConfig,
    cache: Mutex<Option<CachedFrame>>,
    window: Mutex<WindowTracker>,
}

impl FrameSource {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        window_title: impl Into<String>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            backend,
            window_title: window_title.into(),
            config,
            cache: Mutex::new(None),
            window: Mutex::new(WindowTracker::default()),
        }
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Capture the target, or hand back the cached frame if it is younger
    /// than the cache duration and `use_cache` is set.
    pub fn grab(&self, use_cache: bool) -> Arc<Frame> {
        let now = Instant::now();
        let mut cache = self.lock_cache();

        if use_cache
            && let Some(cached) = cache.as_ref()
            && now.duration_since(cached.cached_at) < self.config.cache_duration()
        {
            return Arc::clone(&cached.frame);
        }

        let frame = Arc::new(self.capture_target());
        *cache = Some(CachedFrame {
            frame: Arc::clone(&frame),
            cached_at: now,
        });
        frame
    }

    /// Capture an absolute desktop rectangle. Never touches the frame cache.
    pub fn grab_region(&self, rect: ScreenRect) -> Frame {
        self.capture_rect(rect)
    }

    /// Capture a rectangle given relative to the target window's origin.
    /// Without a known window the coordinates are taken as absolute.
    pub fn grab_window_region(&self, x: i32, y: i32, width: u32, height: u32) -> Frame {
        let rect = ScreenRect::new(x, y, width, height);
        match self.window_rect() {
            Some(window) => self.grab_region(rect.offset(window.x, window.y)),
            None => self.grab_region(rect),
        }
    }

    /// Force the next `grab()` to capture a new frame.
    pub fn invalidate_cache(&self) {
        *self.lock_cache() = None;
    }

    /// Window position, looked up at most once per re-check interval.
    pub fn window_rect(&self) -> Option<ScreenRect> {
        let now = Instant::now();
        let mut tracker = self
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let stale = tracker
            .last_check
            .is_none_or(|checked| now.duration_since(checked) > self.config.window_check_interval());
        if stale {
            let rect = self.backend.locate_window(&self.window_title);
            if rect != tracker.rect {
                match rect {
                    Some(r) => log::debug!(
                        "Window '{}' at ({},{}) {}x{}",
                        self.window_title,
                        r.x,
                        r.y,
                        r.width,
                        r.height
                    ),
                    None => log::debug!("Window '{}' not found", self.window_title),
                }
            }
            tracker.rect = rect;
            tracker.last_check = Some(now);
        }

        tracker.rect
    }

    /// Fresh lookup, bypassing the re-check interval.
    pub fn is_target_running(&self) -> bool {
        self.backend.locate_window(&self.window_title).is_some()
    }

    /// Dimensions of the current (possibly cached) frame.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        self.grab(true).dimensions()
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedFrame>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn capture_target(&self) -> Frame {
        if let Some(window) = self.window_rect() {
            return self.capture_rect(window);
        }

        match self.config.fallback {
            WindowFallback::PrimaryDisplay => match self.backend.primary_display() {
                Some(display) => self.capture_rect(display),
                None => {
                    log::warn!("No window and no primary display to capture");
                    Frame::empty(ScreenRect::default())
                }
            },
            WindowFallback::EmptyFrame => Frame::empty(ScreenRect::default()),
        }
    }

    fn capture_rect(&self, rect: ScreenRect) -> Frame {
        if !rect.is_valid() {
            log::warn!(
                "Refusing to capture zero-sized rectangle {}x{}",
                rect.width,
                rect.height
            );
            return Frame::empty(rect);
        }

        match self.backend.capture(rect) {
            Ok(image) if image.width() > 0 && image.height() > 0 => Frame::from_rgba(image, rect),
            Ok(_) => {
                log::warn!("Capture of ({},{}) returned no pixels", rect.x, rect.y);
                Frame::empty(rect)
            }
            Err(e) => {
                log::warn!("Capture failed: {e}");
                Frame::empty(rect)
            }
        }
    }
}

impl FrameProvider for FrameSource {
    fn grab(&self, use_cache: bool) -> Arc<Frame> {
        FrameSource::grab(self, use_cache)
    }

    fn grab_region(&self, rect: ScreenRect) -> Frame {
        FrameSource::grab_region(self, rect)
    }

    fn invalidate_cache(&self) {
        FrameSource::invalidate_cache(self)
    }

    fn window_rect(&self) -> Option<ScreenRect> {
        FrameSource::window_rect(self)
    }

    fn is_target_running(&self) -> bool {
        FrameSource::is_target_running(self)
    }
}
