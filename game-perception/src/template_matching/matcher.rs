/// Template matching implementation
///
/// Normalized correlation over the whole frame (or a sub-rectangle of it).
/// Raw cross-correlation comes from imageproc (rows spread over the rayon
/// pool), window statistics from integral images, so every placement costs
/// O(1) on top of the correlation. Full-HD scans are still expensive; restrict
/// hot lookups with `find_in_region`.
use super::config::MatchConfig;
use super::library::{Template, TemplateProvider};
use super::types::{Match, MatchMethod};
use crate::capture::Frame;
use crate::resource::PixelRect;
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::rect::Rect;
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template_parallel};
use std::borrow::Cow;
use std::sync::Arc;

/// Per-placement confidence, `(W - w + 1) x (H - h + 1)`, values in [0, 1]
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

type IntegralImage = ImageBuffer<Luma<u64>, Vec<u64>>;

const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Score every placement of `template` over `image`.
///
/// Both slices hold one buffer per channel (one for grayscale, three for
/// color) and must have the same length. Returns `None` when the template
/// does not fit inside the image.
pub fn correlation_surface(
    image: &[&GrayImage],
    template: &[&GrayImage],
    method: MatchMethod,
) -> Option<ScoreMap> {
    let (image_width, image_height) = image.first()?.dimensions();
    let (template_width, template_height) = template.first()?.dimensions();

    if image.len() != template.len()
        || template_width == 0
        || template_height == 0
        || template_width > image_width
        || template_height > image_height
    {
        return None;
    }

    let channels: Vec<ChannelTerms> = image
        .iter()
        .zip(template)
        .map(|(image, template)| ChannelTerms::new(image, template))
        .collect();

    let mut surface = ScoreMap::new(
        image_width - template_width + 1,
        image_height - template_height + 1,
    );
    for (x, y, pixel) in surface.enumerate_pixels_mut() {
        let terms = channels
            .iter()
            .map(|channel| channel.window(x, y, template_width, template_height))
            .fold(WindowTerms::default(), WindowTerms::combine);
        pixel[0] = terms.confidence(method);
    }

    Some(surface)
}

/// Greedy non-maximum suppression.
///
/// Candidates are taken in descending confidence order; one is kept only if
/// its center is at least `min_distance` pixels from every center already
/// kept. At most `max_matches` survive.
pub fn suppress_non_maxima(
    mut candidates: Vec<Match>,
    min_distance: u32,
    max_matches: usize,
) -> Vec<Match> {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    let mut accepted: Vec<Match> = Vec::new();
    for candidate in candidates {
        if accepted.len() >= max_matches {
            break;
        }
        if accepted
            .iter()
            .all(|kept| kept.center_distance(&candidate) >= min_distance as f64)
        {
            accepted.push(candidate);
        }
    }
    accepted
}

/// Split an RGB buffer into one grayscale plane per channel
fn split_channels(image: &RgbImage) -> [GrayImage; 3] {
    [0, 1, 2].map(|channel| {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([image.get_pixel(x, y)[channel]])
        })
    })
}

/// Precomputed terms for one channel of one image/template pair
struct ChannelTerms {
    cross: ScoreMap,
    sum: IntegralImage,
    sum_sq: IntegralImage,
    template_sum: u64,
    template_sum_sq: u64,
    template_var: f64,
    pixels: u64,
}

impl ChannelTerms {
    fn new(image: &GrayImage, template: &GrayImage) -> Self {
        let pixels = template.width() as u64 * template.height() as u64;
        let template_sum: u64 = template.pixels().map(|p| p[0] as u64).sum();
        let template_sum_sq: u64 = template.pixels().map(|p| (p[0] as u64).pow(2)).sum();

        Self {
            cross: match_template_parallel(image, template, MatchTemplateMethod::CrossCorrelation),
            sum: integral_image::<_, u64>(image),
            sum_sq: integral_squared_image::<_, u64>(image),
            template_sum,
            template_sum_sq,
            template_var: scaled_variance(template_sum, template_sum_sq, pixels),
            pixels,
        }
    }

    fn window(&self, x: u32, y: u32, width: u32, height: u32) -> WindowTerms {
        let sum = window_sum(&self.sum, x, y, width, height);
        let sum_sq = window_sum(&self.sum_sq, x, y, width, height);
        let cross = self.cross.get_pixel(x, y)[0] as f64;

        WindowTerms {
            cross,
            centered_cross: cross
                - sum as f64 * self.template_sum as f64 / self.pixels as f64,
            template_sq: self.template_sum_sq as f64,
            window_sq: sum_sq as f64,
            template_var: self.template_var,
            window_var: scaled_variance(sum, sum_sq, self.pixels),
        }
    }
}

/// `sum_sq - sum^2 / n`, exact in integers before the final division.
fn scaled_variance(sum: u64, sum_sq: u64, n: u64) -> f64 {
    let n = n as u128;
    let spread = (n * sum_sq as u128).saturating_sub((sum as u128).pow(2));
    spread as f64 / n as f64
}

/// Sum over `[x, x + width) x [y, y + height)` from a zero-padded integral image
fn window_sum(integral: &IntegralImage, x: u32, y: u32, width: u32, height: u32) -> u64 {
    let top_left = integral.get_pixel(x, y)[0];
    let top_right = integral.get_pixel(x + width, y)[0];
    let bottom_left = integral.get_pixel(x, y + height)[0];
    let bottom_right = integral.get_pixel(x + width, y + height)[0];
    (bottom_right + top_left) - (top_right + bottom_left)
}

#[derive(Debug, Default, Clone, Copy)]
struct WindowTerms {
    cross: f64,
    centered_cross: f64,
    template_sq: f64,
    window_sq: f64,
    template_var: f64,
    window_var: f64,
}

impl WindowTerms {
    fn combine(self, other: WindowTerms) -> WindowTerms {
        WindowTerms {
            cross: self.cross + other.cross,
            centered_cross: self.centered_cross + other.centered_cross,
            template_sq: self.template_sq + other.template_sq,
            window_sq: self.window_sq + other.window_sq,
            template_var: self.template_var + other.template_var,
            window_var: self.window_var + other.window_var,
        }
    }

    fn confidence(&self, method: MatchMethod) -> f32 {
        let score = match method {
            MatchMethod::CorrelationCoefficientNormalized => {
                // Flat window or flat template: correlation is undefined
                if self.template_var <= 0.0 || self.window_var <= 0.0 {
                    0.0
                } else {
                    self.centered_cross / (self.template_var * self.window_var).sqrt()
                }
            }
            MatchMethod::CrossCorrelationNormalized => {
                let norm = (self.template_sq * self.window_sq).sqrt();
                if norm > 0.0 { self.cross / norm } else { 0.0 }
            }
            MatchMethod::SquaredDifferenceNormalized => self.squared_difference(),
        };

        let score = score.clamp(0.0, 1.0);
        if method.is_inverted() {
            (1.0 - score) as f32
        } else {
            score as f32
        }
    }

    /// Normalized squared difference, 0 for identical pixels
    fn squared_difference(&self) -> f64 {
        let sq_diff = (self.window_sq - 2.0 * self.cross + self.template_sq).max(0.0);
        let norm = (self.template_sq * self.window_sq).sqrt();
        if norm > 0.0 {
            sq_diff / norm
        } else if sq_diff < 0.5 {
            // Both all black
            0.0
        } else {
            1.0
        }
    }
}

/// Locates templates in frames.
///
/// Every lookup failure (missing template, empty frame, template larger than
/// the search area) is reported as "no match".
pub struct MatchEngine {
    templates: Arc<dyn TemplateProvider>,
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(templates: Arc<dyn TemplateProvider>, config: MatchConfig) -> Self {
        Self { templates, config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn templates(&self) -> &Arc<dyn TemplateProvider> {
        &self.templates
    }

    /// Best placement of a template, if its confidence reaches the threshold.
    ///
    /// `threshold` and `grayscale` fall back to the configured defaults.
    pub fn find(
        &self,
        frame: &Frame,
        name: &str,
        threshold: Option<f32>,
        grayscale: Option<bool>,
    ) -> Option<Match> {
        let template = self.templates.template(name)?;
        let grayscale = grayscale.unwrap_or(self.config.grayscale);
        let surface = self.surface(frame, None, &template, grayscale)?;
        let best = best_match(&surface, &template, self.threshold(threshold))?;

        log::debug!("Found {}", best.describe(name));
        Some(best)
    }

    /// Every placement above the threshold, near-duplicates suppressed,
    /// sorted by descending confidence.
    pub fn find_all(
        &self,
        frame: &Frame,
        name: &str,
        threshold: Option<f32>,
        min_distance: Option<u32>,
        max_matches: Option<usize>,
    ) -> Vec<Match> {
        let Some(template) = self.templates.template(name) else {
            return Vec::new();
        };
        let Some(surface) = self.surface(frame, None, &template, self.config.grayscale) else {
            return Vec::new();
        };

        let threshold = self.threshold(threshold);
        let candidates: Vec<Match> = surface
            .enumerate_pixels()
            .filter(|(_, _, score)| score[0] >= threshold)
            .map(|(x, y, score)| Match::new(x, y, template.width(), template.height(), score[0]))
            .collect();

        let matches = suppress_non_maxima(
            candidates,
            min_distance.unwrap_or(self.config.min_distance),
            max_matches.unwrap_or(self.config.max_matches),
        );
        log::debug!("Found {} matches for {}", matches.len(), name);
        matches
    }

    /// Search only inside `region` (clipped to the frame); the match is
    /// reported in frame coordinates.
    pub fn find_in_region(
        &self,
        frame: &Frame,
        name: &str,
        region: PixelRect,
        threshold: Option<f32>,
    ) -> Option<Match> {
        let area = region.clip_to(frame.width(), frame.height());
        if !area.is_valid() {
            return None;
        }

        let template = self.templates.template(name)?;
        let surface = self.surface(frame, Some(area), &template, self.config.grayscale)?;
        let best = best_match(&surface, &template, self.threshold(threshold))?
            .translated(area.x, area.y);

        log::debug!("Found {} in region", best.describe(name));
        Some(best)
    }

    /// First template in list order that matches.
    pub fn find_any<S: AsRef<str>>(
        &self,
        frame: &Frame,
        names: &[S],
        threshold: Option<f32>,
    ) -> Option<(String, Match)> {
        names.iter().find_map(|name| {
            let name = name.as_ref();
            self.find(frame, name, threshold, None)
                .map(|found| (name.to_string(), found))
        })
    }

    /// Highest-confidence match across all the templates.
    pub fn find_best<S: AsRef<str>>(
        &self,
        frame: &Frame,
        names: &[S],
        threshold: Option<f32>,
    ) -> Option<(String, Match)> {
        names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.find(frame, name, threshold, None)
                    .map(|found| (name.to_string(), found))
            })
            .max_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence))
    }

    pub fn preload(&self, names: &[&str]) -> usize {
        self.templates.preload(names)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.templates.is_loaded(name)
    }

    /// Copy of the frame with a hollow rectangle around every match
    pub fn annotate(frame: &Frame, matches: &[Match]) -> RgbImage {
        let mut canvas = frame.image().clone();
        for m in matches.iter().filter(|m| m.width > 0 && m.height > 0) {
            let rect = Rect::at(m.x as i32, m.y as i32).of_size(m.width, m.height);
            draw_hollow_rect_mut(&mut canvas, rect, ANNOTATION_COLOR);
        }
        canvas
    }

    fn threshold(&self, threshold: Option<f32>) -> f32 {
        threshold.unwrap_or(self.config.default_threshold)
    }

    fn surface(
        &self,
        frame: &Frame,
        area: Option<PixelRect>,
        template: &Template,
        grayscale: bool,
    ) -> Option<ScoreMap> {
        if !frame.is_valid() {
            return None;
        }

        if grayscale {
            let gray = match area {
                Some(r) => Cow::Owned(
                    image::imageops::crop_imm(frame.gray(), r.x, r.y, r.width, r.height)
                        .to_image(),
                ),
                None => Cow::Borrowed(frame.gray()),
            };
            correlation_surface(&[&*gray], &[template.gray()], self.config.method)
        } else {
            let color = match area {
                Some(r) => Cow::Owned(
                    image::imageops::crop_imm(frame.image(), r.x, r.y, r.width, r.height)
                        .to_image(),
                ),
                None => Cow::Borrowed(frame.image()),
            };
            let image_planes = split_channels(&color);
            let template_planes = split_channels(template.color());
            correlation_surface(
                &image_planes.each_ref(),
                &template_planes.each_ref(),
                self.config.method,
            )
        }
    }
}

fn best_match(surface: &ScoreMap, template: &Template, threshold: f32) -> Option<Match> {
    let extremes = find_extremes(surface);
    if extremes.max_value < threshold {
        return None;
    }
    let (x, y) = extremes.max_value_location;
    Some(Match::new(
        x,
        y,
        template.width(),
        template.height(),
        extremes.max_value,
    ))
}
