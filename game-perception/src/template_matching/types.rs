/// Template matching data types
use serde::{Deserialize, Serialize};

/// A located occurrence of a template in a frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// X coordinate of the top-left corner in the frame
    pub x: u32,
    /// Y coordinate of the top-left corner in the frame
    pub y: u32,
    /// Width of the matched template
    pub width: u32,
    /// Height of the matched template
    pub height: u32,
    /// Confidence score (0.0-1.0, higher is better for every method)
    pub confidence: f32,
}

impl Match {
    pub fn new(x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Center point of the match
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Bottom center point (where ground items are clicked)
    pub fn bottom_center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height)
    }

    /// (x, y, width, height)
    pub fn region(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }

    /// (x1, y1, x2, y2)
    pub fn rect(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Euclidean distance between the centers of two matches
    pub fn center_distance(&self, other: &Match) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        let dx = ax as f64 - bx as f64;
        let dy = ay as f64 - by as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move into another coordinate space, e.g. from a search region into the frame
    pub fn translated(mut self, dx: u32, dy: u32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }

    /// Format match with the template name and confidence percentage
    pub fn describe(&self, name: &str) -> String {
        let confidence_pct = (self.confidence * 100.0) as u32;
        format!(
            "{} at ({},{}) {}x{} - {}%",
            name, self.x, self.y, self.width, self.height, confidence_pct
        )
    }
}

/// Template matching method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Zero-mean normalized cross-correlation (robust to brightness offsets)
    #[default]
    CorrelationCoefficientNormalized,
    /// Normalized cross-correlation
    CrossCorrelationNormalized,
    /// Normalized squared difference (inverted: lower is better)
    SquaredDifferenceNormalized,
}

impl MatchMethod {
    /// Methods whose raw score is "lower is better"; their scores are
    /// inverted before they become a confidence.
    pub fn is_inverted(&self) -> bool {
        matches!(self, MatchMethod::SquaredDifferenceNormalized)
    }
}
