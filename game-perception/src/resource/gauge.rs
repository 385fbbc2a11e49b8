//! Color-band fill estimation for the health and mana orbs

use super::region::{HudLayout, PixelRect, Region, Resolution};
use crate::capture::Frame;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Inclusive per-channel RGB bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorBand {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, pixel: &Rgb<u8>) -> bool {
        pixel
            .0
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(value, (lower, upper))| (lower..=upper).contains(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    pub layout: HudLayout,
    /// Red liquid in the health orb
    pub health_band: ColorBand,
    /// Blue liquid in the mana orb
    pub mana_band: ColorBand,
    /// Green tint the health orb takes on while poisoned
    pub poison_band: ColorBand,
    /// Share of a full orb's pixels that fall inside its band (the orb is round,
    /// the region is not)
    pub calibration: f32,
    /// Poison-band share of the health region above which the player counts as poisoned
    pub poison_coverage: f32,
    pub low_health_threshold: f32,
    pub low_mana_threshold: f32,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            layout: HudLayout::default(),
            health_band: ColorBand::new([120, 0, 0], [255, 80, 80]),
            mana_band: ColorBand::new([0, 0, 120], [80, 80, 255]),
            poison_band: ColorBand::new([0, 100, 0], [80, 255, 80]),
            calibration: 0.65,
            poison_coverage: 0.10,
            low_health_threshold: 0.30,
            low_mana_threshold: 0.15,
        }
    }
}

/// Snapshot of the player's resources.
///
/// The low-resource flags are derived from the thresholds at construction and
/// cannot be set on their own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceReading {
    health_percent: f32,
    mana_percent: f32,
    poisoned: bool,
    low_health: bool,
    low_mana: bool,
}

impl ResourceReading {
    pub fn new(health_percent: f32, mana_percent: f32, poisoned: bool, config: &GaugeConfig) -> Self {
        Self {
            health_percent,
            mana_percent,
            poisoned,
            low_health: health_percent < config.low_health_threshold,
            low_mana: mana_percent < config.low_mana_threshold,
        }
    }

    pub fn health_percent(&self) -> f32 {
        self.health_percent
    }

    pub fn mana_percent(&self) -> f32 {
        self.mana_percent
    }

    pub fn poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn is_low_health(&self) -> bool {
        self.low_health
    }

    pub fn is_low_mana(&self) -> bool {
        self.low_mana
    }
}

/// Reads orb fill levels from frames.
///
/// Readings err on the side of "full": when a region cannot be measured
/// (outside the frame, empty frame) or contains no band pixels at all, the
/// fraction is 1.0 so that a perception failure never triggers an emergency
/// reaction. [`ResourceGauge::measure`] exposes the unbiased value.
pub struct ResourceGauge {
    config: GaugeConfig,
    resolution: Resolution,
    last_reading: Mutex<Option<ResourceReading>>,
}

impl ResourceGauge {
    pub fn new(config: GaugeConfig, resolution: Resolution) -> Self {
        Self {
            config,
            resolution,
            last_reading: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    /// Resolution regions are scaled to
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Calibrated fill fraction of `band` inside `region`, or `None` when the
    /// region cannot be measured on this frame.
    pub fn measure(&self, frame: &Frame, region: Region, band: ColorBand) -> Option<f32> {
        let coverage = self.coverage(frame, region.scaled(self.resolution), band)?;
        let calibration = self.config.calibration.max(f32::EPSILON);
        Some((coverage / calibration).clamp(0.0, 1.0))
    }

    /// Fill fraction in [0, 1], 1.0 when nothing could be measured.
    pub fn read_fraction(&self, frame: &Frame, region: Region, band: ColorBand) -> f32 {
        match self.measure(frame, region, band) {
            Some(fraction) if fraction > 0.0 => fraction,
            _ => 1.0,
        }
    }

    pub fn read_health(&self, frame: &Frame) -> f32 {
        self.read_fraction(frame, self.config.layout.health_orb, self.config.health_band)
    }

    pub fn read_mana(&self, frame: &Frame) -> f32 {
        self.read_fraction(frame, self.config.layout.mana_orb, self.config.mana_band)
    }

    /// Health without the "assume full" bias, `None` when unmeasurable
    pub fn measure_health(&self, frame: &Frame) -> Option<f32> {
        self.measure(frame, self.config.layout.health_orb, self.config.health_band)
    }

    pub fn is_poisoned(&self, frame: &Frame) -> bool {
        let rect = self.config.layout.health_orb.scaled(self.resolution);
        self.coverage(frame, rect, self.config.poison_band)
            .is_some_and(|coverage| coverage > self.config.poison_coverage)
    }

    /// Health, mana and poison in one pass. The reading is also kept as
    /// [`ResourceGauge::last_reading`].
    pub fn read_full_status(&self, frame: &Frame) -> ResourceReading {
        let reading = ResourceReading::new(
            self.read_health(frame),
            self.read_mana(frame),
            self.is_poisoned(frame),
            &self.config,
        );
        log::debug!(
            "Resources: health {:.0}% mana {:.0}%{}",
            reading.health_percent() * 100.0,
            reading.mana_percent() * 100.0,
            if reading.poisoned() { " (poisoned)" } else { "" }
        );

        *self
            .last_reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reading);
        reading
    }

    pub fn last_reading(&self) -> Option<ResourceReading> {
        *self
            .last_reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw share of pixels inside the band
    fn coverage(&self, frame: &Frame, rect: PixelRect, band: ColorBand) -> Option<f32> {
        if !frame.is_valid() {
            return None;
        }

        let pixels = match frame.crop(rect) {
            Ok(pixels) => pixels,
            Err(e) => {
                log::debug!("Gauge region unreadable: {e}");
                return None;
            }
        };

        let inside = pixels.pixels().filter(|p| band.contains(p)).count();
        Some(inside as f32 / rect.area() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const RED: Rgb<u8> = Rgb([200, 20, 20]);
    const BLUE: Rgb<u8> = Rgb([10, 20, 220]);
    const GREEN: Rgb<u8> = Rgb([20, 200, 20]);

    /// Fill the bottom `fraction` of a rectangle, like liquid in an orb
    fn fill(image: &mut RgbImage, rect: PixelRect, fraction: f32, color: Rgb<u8>) {
        let rows = (rect.height as f32 * fraction).round() as u32;
        for y in rect.y + rect.height - rows..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                image.put_pixel(x, y, color);
            }
        }
    }

    fn gauge() -> ResourceGauge {
        ResourceGauge::new(GaugeConfig::default(), Resolution::REFERENCE)
    }

    #[test]
    fn test_color_band_is_inclusive() {
        let band = ColorBand::new([120, 0, 0], [255, 80, 80]);
        assert!(band.contains(&Rgb([120, 0, 0])));
        assert!(band.contains(&Rgb([255, 80, 80])));
        assert!(!band.contains(&Rgb([119, 0, 0])));
        assert!(!band.contains(&Rgb([200, 81, 0])));
    }

    #[test]
    fn test_fraction_follows_fill_level() {
        let gauge = gauge();
        let region = Region::new(0, 0, 20, 10);
        let band = gauge.config().health_band;

        let read = |fraction| {
            let mut image = RgbImage::new(40, 40);
            fill(&mut image, PixelRect::new(0, 0, 20, 10), fraction, RED);
            gauge.read_fraction(&Frame::from_image(image), region, band)
        };

        let low = read(0.2);
        let half = read(0.5);
        let full = read(1.0);

        assert!((low - 0.2 / 0.65).abs() < 1e-4, "low = {low}");
        assert!(low < half && half < full);
        assert_eq!(full, 1.0);
    }

    #[test]
    fn test_out_of_bounds_reads_full() {
        let gauge = gauge();
        let frame = Frame::from_image(RgbImage::new(100, 100));

        assert_eq!(gauge.read_health(&frame), 1.0);
        assert_eq!(gauge.read_mana(&frame), 1.0);
        assert!(gauge.measure_health(&frame).is_none());
        assert!(!gauge.is_poisoned(&frame));
    }

    #[test]
    fn test_zero_coverage_reads_full() {
        let gauge = gauge();
        let frame = Frame::from_image(RgbImage::new(1920, 1080));

        assert_eq!(gauge.read_health(&frame), 1.0);
        assert_eq!(gauge.measure_health(&frame), Some(0.0));
    }

    #[test]
    fn test_empty_frame_reads_full() {
        let gauge = gauge();
        let frame = Frame::empty(crate::capture::ScreenRect::default());

        assert_eq!(gauge.read_health(&frame), 1.0);
        assert_eq!(gauge.read_full_status(&frame).mana_percent(), 1.0);
    }

    #[test]
    fn test_full_status() {
        let gauge = gauge();
        let layout = gauge.config().layout;
        let health = layout.health_orb.scaled(Resolution::REFERENCE);
        let mana = layout.mana_orb.scaled(Resolution::REFERENCE);

        let mut image = RgbImage::new(1920, 1080);
        fill(&mut image, health, 0.4, RED);
        fill(&mut image, mana, 0.06, BLUE);
        // Poison tint on the top rows of the health orb
        fill(
            &mut image,
            PixelRect::new(health.x, health.y, health.width, 30),
            1.0,
            GREEN,
        );

        assert!(gauge.last_reading().is_none());
        let reading = gauge.read_full_status(&Frame::from_image(image));

        assert!((reading.health_percent() - 0.4 / 0.65).abs() < 0.01);
        assert!(!reading.is_low_health());
        assert!(reading.mana_percent() < 0.15);
        assert!(reading.is_low_mana());
        assert!(reading.poisoned());
        assert_eq!(gauge.last_reading(), Some(reading));
    }

    #[test]
    fn test_low_flags_follow_thresholds() {
        let config = GaugeConfig::default();
        let reading = ResourceReading::new(0.29, 0.15, false, &config);

        assert!(reading.is_low_health());
        assert!(!reading.is_low_mana());
    }

    #[test]
    fn test_regions_scale_to_resolution() {
        let resolution = Resolution::new(2560, 1440);
        let gauge = ResourceGauge::new(GaugeConfig::default(), resolution);
        let health = gauge.config().layout.health_orb.scaled(resolution);
        assert_eq!(health, PixelRect::new(40, 1180, 200, 200));

        let mut image = RgbImage::new(2560, 1440);
        fill(&mut image, health, 0.5, RED);
        let frame = Frame::from_image(image);

        assert!((gauge.read_health(&frame) - 0.5 / 0.65).abs() < 1e-4);
        assert_eq!(gauge.resolution(), resolution);
    }
}
