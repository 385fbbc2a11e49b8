//! Wiring of capture, matching, gauges and classification from one config

use crate::capture::{CaptureBackend, Frame, FrameProvider, FrameSource, XcapBackend};
use crate::config::PerceptionConfig;
use crate::game_state::{GameState, StateClassifier};
use crate::resource::{ResourceGauge, ResourceReading};
use crate::template_matching::{Match, MatchEngine, TemplateLibrary, TemplateProvider};
use std::sync::Arc;

/// Shared perception components.
///
/// Every part is `Send + Sync`; clone the `Arc`s out to hand them to a
/// background poller and a foreground loop at the same time.
pub struct PerceptionEngine {
    config: PerceptionConfig,
    frames: Arc<dyn FrameProvider>,
    library: Arc<TemplateLibrary>,
    matcher: Arc<MatchEngine>,
    gauge: Arc<ResourceGauge>,
    classifier: Arc<StateClassifier>,
}

impl PerceptionEngine {
    /// Capture the real desktop through xcap
    pub fn from_config(config: PerceptionConfig) -> Self {
        Self::with_backend(config, Arc::new(XcapBackend::new()))
    }

    pub fn with_backend(config: PerceptionConfig, backend: Arc<dyn CaptureBackend>) -> Self {
        let source = FrameSource::new(backend, config.window_title.clone(), config.capture.clone());
        Self::with_frames(config, Arc::new(source))
    }

    pub fn with_frames(config: PerceptionConfig, frames: Arc<dyn FrameProvider>) -> Self {
        let library = Arc::new(TemplateLibrary::new(config.template_root.clone()));
        let templates: Arc<dyn TemplateProvider> = library.clone();
        let matcher = Arc::new(MatchEngine::new(templates, config.matching.clone()));
        let gauge = Arc::new(ResourceGauge::new(config.gauges.clone(), config.resolution));
        let classifier = Arc::new(StateClassifier::new(
            Arc::clone(&matcher),
            Arc::clone(&gauge),
            config.classifier.clone(),
        ));

        log::debug!(
            "Perception engine ready (templates in {:?}, {}x{})",
            config.template_root,
            config.resolution.width,
            config.resolution.height
        );

        Self {
            config,
            frames,
            library,
            matcher,
            gauge,
            classifier,
        }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    pub fn frames(&self) -> &Arc<dyn FrameProvider> {
        &self.frames
    }

    pub fn library(&self) -> &Arc<TemplateLibrary> {
        &self.library
    }

    pub fn matcher(&self) -> &Arc<MatchEngine> {
        &self.matcher
    }

    pub fn gauge(&self) -> &Arc<ResourceGauge> {
        &self.gauge
    }

    pub fn classifier(&self) -> &Arc<StateClassifier> {
        &self.classifier
    }

    /// Current frame, possibly cached
    pub fn grab(&self) -> Arc<Frame> {
        self.frames.grab(true)
    }

    pub fn classify(&self) -> GameState {
        self.classifier.classify(&self.grab())
    }

    pub fn read_status(&self) -> ResourceReading {
        self.gauge.read_full_status(&self.grab())
    }

    pub fn find(&self, name: &str) -> Option<Match> {
        self.matcher.find(&self.grab(), name, None, None)
    }

    /// Load every template the classifier knows about
    pub fn preload(&self) -> usize {
        self.classifier.preload_templates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ScreenRect;
    use crate::resource::{Region, Resolution};
    use crate::test_support::{StaticFrames, noise, paste, write_template};
    use image::{Rgb, RgbImage};
    use std::thread;

    fn engine_over(root: &std::path::Path, frames: Arc<StaticFrames>) -> PerceptionEngine {
        let config = PerceptionConfig {
            template_root: root.to_path_buf(),
            ..PerceptionConfig::default()
        };
        PerceptionEngine::with_frames(config, frames)
    }

    #[test]
    fn test_classify_from_disk_templates() {
        let dir = tempfile::tempdir().unwrap();
        let death = noise(14, 9, 1);
        write_template(dir.path(), "screens/you_died", &death);

        let mut image = noise(160, 120, 2);
        paste(&mut image, &death, 40, 60);
        let frames = Arc::new(StaticFrames::new(image));
        let mut config = PerceptionConfig {
            template_root: dir.path().to_path_buf(),
            ..PerceptionConfig::default()
        };
        // The default death banner region lies outside this small frame
        config
            .classifier
            .search_regions
            .insert("screens/you_died".to_string(), Region::new(0, 0, 160, 120));
        let engine = PerceptionEngine::with_frames(config, frames.clone());

        assert_eq!(engine.classify(), GameState::Death);
        assert_eq!(engine.classifier().last_state(), GameState::Death);
        assert_eq!(engine.find("screens/you_died").map(|m| (m.x, m.y)), Some((40, 60)));
        assert!(frames.grabs() >= 2);
    }

    #[test]
    fn test_preload_counts_present_templates() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "hud/belt", &noise(8, 8, 3));
        write_template(dir.path(), "hud/minimap", &noise(8, 8, 4));
        let engine = engine_over(dir.path(), Arc::new(StaticFrames::new(RgbImage::new(8, 8))));

        assert_eq!(engine.preload(), 2);
        assert_eq!(
            engine.library().cached_names(),
            vec!["hud/belt".to_string(), "hud/minimap".to_string()]
        );
    }

    #[test]
    fn test_status_on_unmeasurable_frame_is_full() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_over(dir.path(), Arc::new(StaticFrames::new(RgbImage::new(64, 64))));

        let reading = engine.read_status();
        assert_eq!(reading.health_percent(), 1.0);
        assert_eq!(reading.mana_percent(), 1.0);
        assert!(!reading.is_low_health());
        assert_eq!(engine.gauge().last_reading(), Some(reading));
    }

    #[test]
    fn test_shared_between_threads() {
        let dir = tempfile::tempdir().unwrap();
        let mut image = RgbImage::new(1920, 1080);
        for y in 960..1035 {
            for x in 30..180 {
                image.put_pixel(x, y, Rgb([200, 10, 10]));
            }
        }
        let engine = Arc::new(engine_over(dir.path(), Arc::new(StaticFrames::new(image))));

        let poller = {
            let gauge = Arc::clone(engine.gauge());
            let frames = Arc::clone(engine.frames());
            thread::spawn(move || {
                (0..5)
                    .map(|_| gauge.read_health(&frames.grab(true)))
                    .collect::<Vec<_>>()
            })
        };
        // No templates on disk: the measurable health orb alone marks the HUD
        assert_eq!(engine.classify(), GameState::InGame);

        let readings = poller.join().unwrap();
        assert!(readings.iter().all(|h| (h - 0.5 / 0.65).abs() < 1e-4));
        assert_eq!(engine.classifier().player_position(), Resolution::REFERENCE.center());
    }

    #[test]
    fn test_default_provider_has_no_window() {
        let frames = StaticFrames::new(RgbImage::new(4, 4));
        assert!(frames.window_rect().is_none());
        assert!(!frames.is_target_running());
        assert_eq!(frames.grab_region(ScreenRect::new(1, 1, 2, 2)).dimensions(), (2, 2));
    }
}
