// Resource module - resolution-relative HUD regions and color-band gauges
// for the health and mana orbs.

pub mod gauge;
pub mod region;

pub use gauge::{ColorBand, GaugeConfig, ResourceGauge, ResourceReading};
pub use region::{HudLayout, PixelRect, Region, Resolution};
