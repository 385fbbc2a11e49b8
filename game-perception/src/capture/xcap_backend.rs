//! Desktop capture through `xcap`

use super::types::{CaptureBackend, ScreenRect};
use crate::error::{PerceptionError, PerceptionResult};
use crate::resource::PixelRect;
use image::RgbaImage;

/// Real capture backend: windows are located by exact title, pixels are
/// grabbed from the monitor that contains the rectangle's origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapBackend;

impl XcapBackend {
    pub fn new() -> Self {
        Self
    }
}

fn window_rect(window: &xcap::Window) -> Option<ScreenRect> {
    Some(ScreenRect::new(
        window.x().ok()?,
        window.y().ok()?,
        window.width().ok()?,
        window.height().ok()?,
    ))
}

fn monitor_rect(monitor: &xcap::Monitor) -> Option<ScreenRect> {
    Some(ScreenRect::new(
        monitor.x().ok()?,
        monitor.y().ok()?,
        monitor.width().ok()?,
        monitor.height().ok()?,
    ))
}

impl CaptureBackend for XcapBackend {
    fn locate_window(&self, title: &str) -> Option<ScreenRect> {
        let windows = match xcap::Window::all() {
            Ok(windows) => windows,
            Err(e) => {
                log::warn!("Error enumerating windows: {e}");
                return None;
            }
        };

        windows
            .into_iter()
            .filter(|window| !window.is_minimized().unwrap_or(false))
            .find(|window| window.title().ok().as_deref() == Some(title))
            .and_then(|window| window_rect(&window))
            .filter(ScreenRect::is_valid)
    }

    fn primary_display(&self) -> Option<ScreenRect> {
        let monitors = xcap::Monitor::all().ok()?;
        monitors
            .iter()
            .find(|monitor| monitor.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .and_then(monitor_rect)
    }

    fn capture(&self, rect: ScreenRect) -> PerceptionResult<RgbaImage> {
        let monitor = xcap::Monitor::from_point(rect.x, rect.y).map_err(|e| {
            PerceptionError::CaptureFailed {
                description: format!("no monitor at ({},{}): {e}", rect.x, rect.y),
            }
        })?;
        let origin = monitor_rect(&monitor).ok_or(PerceptionError::NoDisplay)?;

        let screenshot = monitor
            .capture_image()
            .map_err(|e| PerceptionError::CaptureFailed {
                description: e.to_string(),
            })?;

        // Monitor-local coordinates, clipped to what the monitor actually shows
        let local = PixelRect::new(
            rect.x.saturating_sub(origin.x).max(0) as u32,
            rect.y.saturating_sub(origin.y).max(0) as u32,
            rect.width,
            rect.height,
        )
        .clip_to(screenshot.width(), screenshot.height());

        if !local.is_valid() {
            return Err(PerceptionError::EmptyCaptureRect {
                width: local.width,
                height: local.height,
            });
        }

        if local == PixelRect::new(0, 0, screenshot.width(), screenshot.height()) {
            return Ok(screenshot);
        }

        Ok(
            image::imageops::crop_imm(&screenshot, local.x, local.y, local.width, local.height)
                .to_image(),
        )
    }
}
