//! Resolution-relative screen regions

use serde::{Deserialize, Serialize};

/// A display resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Every built-in region is authored against this resolution.
    pub const REFERENCE: Resolution = Resolution::new(1920, 1080);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Per-axis factors that map reference coordinates onto this resolution.
    pub fn scale_from_reference(&self) -> (f64, f64) {
        (
            self.width as f64 / Self::REFERENCE.width as f64,
            self.height as f64 / Self::REFERENCE.height as f64,
        )
    }

    pub fn center(&self) -> (u32, u32) {
        (self.width / 2, self.height / 2)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// A rectangle authored at [`Resolution::REFERENCE`].
///
/// Use [`Region::scaled`] to get the pixel rectangle for the active resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scale each coordinate by `active / reference` on its own axis, rounding
    /// to the nearest pixel.
    pub fn scaled(&self, active: Resolution) -> PixelRect {
        if active == Resolution::REFERENCE {
            return PixelRect::new(self.x, self.y, self.width, self.height);
        }

        let (sx, sy) = active.scale_from_reference();
        PixelRect::new(
            scale_axis(self.x, sx),
            scale_axis(self.y, sy),
            scale_axis(self.width, sx),
            scale_axis(self.height, sy),
        )
    }
}

fn scale_axis(value: u32, factor: f64) -> u32 {
    (value as f64 * factor).round() as u32
}

/// A rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if this rectangle has a non-zero area
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when the whole rectangle lies inside a `frame_width` x `frame_height` buffer.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.is_valid()
            && self.x as u64 + self.width as u64 <= frame_width as u64
            && self.y as u64 + self.height as u64 <= frame_height as u64
    }

    /// Clip to the buffer bounds. The result may be empty.
    pub fn clip_to(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        PixelRect {
            x,
            y,
            width: self.width.min(frame_width - x),
            height: self.height.min(frame_height - y),
        }
    }

    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && (x as u64) < self.x as u64 + self.width as u64
            && y >= self.y
            && (y as u64) < self.y as u64 + self.height as u64
    }

    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Fixed HUD landmarks of the target game, authored at 1920x1080.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudLayout {
    /// Health orb, bottom-left
    pub health_orb: Region,
    /// Mana orb, bottom-right
    pub mana_orb: Region,
    /// Potion belt, bottom centre
    pub belt: Region,
    /// Minimap, top-right
    pub minimap: Region,
}

impl Default for HudLayout {
    fn default() -> Self {
        Self {
            health_orb: Region::new(30, 885, 150, 150),
            mana_orb: Region::new(1742, 885, 150, 150),
            belt: Region::new(800, 970, 320, 50),
            minimap: Region::new(1650, 10, 260, 260),
        }
    }
}
