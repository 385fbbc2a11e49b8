//! Game state classification from template evidence

use super::config::ClassifierConfig;
use super::types::GameState;
use crate::capture::Frame;
use crate::resource::ResourceGauge;
use crate::template_matching::{Match, MatchEngine};
use std::sync::{Arc, PoisonError, RwLock};

/// Full-screen states, checked before anything else in this order
const SCREEN_PRIORITY: [GameState; 7] = [
    GameState::Death,
    GameState::Loading,
    GameState::MainMenu,
    GameState::CharacterSelect,
    GameState::Lobby,
    GameState::CreateGame,
    GameState::Disconnected,
];

/// Panels drawn over the world, checked once the HUD is known to be visible
const OVERLAY_PRIORITY: [GameState; 8] = [
    GameState::Inventory,
    GameState::Stash,
    GameState::Waypoint,
    GameState::NpcDialog,
    GameState::SkillTree,
    GameState::StatScreen,
    GameState::QuestLog,
    GameState::Paused,
];

/// Turns a frame into exactly one [`GameState`].
///
/// Checks run in a fixed priority order and the first state with a matching
/// template wins, so a death screen drawn over the main menu reports `Death`.
/// Absence of evidence is `Unknown`, never an error. Templates with a search
/// region are only looked for inside it, scaled to the gauge resolution.
pub struct StateClassifier {
    matcher: Arc<MatchEngine>,
    gauge: Arc<ResourceGauge>,
    config: ClassifierConfig,
    last_state: RwLock<GameState>,
}

impl StateClassifier {
    pub fn new(matcher: Arc<MatchEngine>, gauge: Arc<ResourceGauge>, config: ClassifierConfig) -> Self {
        Self {
            matcher,
            gauge,
            config,
            last_state: RwLock::new(GameState::Unknown),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a frame and remember the result.
    pub fn classify(&self, frame: &Frame) -> GameState {
        let state = self.detect(frame);

        let mut last = self
            .last_state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *last != state {
            log::info!("🎮 State changed: {} -> {}", *last, state);
            *last = state;
        }
        state
    }

    /// Result of the most recent `classify` call, without rescanning
    pub fn last_state(&self) -> GameState {
        *self
            .last_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_inventory_open(&self, frame: &Frame) -> bool {
        self.shows(frame, GameState::Inventory, self.config.overlay_threshold)
    }

    pub fn is_stash_open(&self, frame: &Frame) -> bool {
        self.shows(frame, GameState::Stash, self.config.overlay_threshold)
    }

    /// True if a town indicator is visible.
    ///
    /// When none of the town templates can be loaded the answer is `true`:
    /// callers treat town as the place where nothing dangerous happens.
    pub fn is_in_town(&self, frame: &Frame) -> bool {
        match self.town_indicator(frame) {
            Some(found) => found,
            None => {
                log::debug!("No town templates available, assuming in town");
                true
            }
        }
    }

    /// Health bars of nearby monsters
    pub fn find_enemies(&self, frame: &Frame) -> Vec<Match> {
        let search = &self.config.enemy_search;
        self.matcher.find_all(
            frame,
            &self.config.enemy_template,
            Some(search.default_threshold),
            Some(search.min_distance),
            Some(search.max_matches),
        )
    }

    /// The character is always drawn at the centre of the screen
    pub fn player_position(&self) -> (u32, u32) {
        self.gauge.resolution().center()
    }

    /// Load every template the classifier uses. Returns how many are available.
    pub fn preload_templates(&self) -> usize {
        self.matcher.preload(&self.config.all_templates())
    }

    fn detect(&self, frame: &Frame) -> GameState {
        if !frame.is_valid() {
            return GameState::Unknown;
        }

        if let Some(state) = SCREEN_PRIORITY
            .into_iter()
            .find(|state| self.shows(frame, *state, self.config.screen_threshold))
        {
            return state;
        }

        if !self.hud_visible(frame) {
            return GameState::Unknown;
        }

        if let Some(state) = OVERLAY_PRIORITY
            .into_iter()
            .find(|state| self.shows(frame, *state, self.config.overlay_threshold))
        {
            return state;
        }

        if self.config.report_town && self.town_indicator(frame) == Some(true) {
            return GameState::InTown;
        }

        GameState::InGame
    }

    fn shows(&self, frame: &Frame, state: GameState, threshold: f32) -> bool {
        match self.locate_any(frame, self.config.templates_for(state), threshold) {
            Some((name, found)) => {
                log::debug!("{} evidence: {}", state, found.describe(name));
                true
            }
            None => false,
        }
    }

    fn hud_visible(&self, frame: &Frame) -> bool {
        if self
            .locate_any(frame, &self.config.hud_templates, self.config.hud_threshold)
            .is_some()
        {
            return true;
        }

        self.gauge
            .measure_health(frame)
            .is_some_and(|health| health >= self.config.hud_min_health)
    }

    /// First template in list order found inside its search region
    fn locate_any<'a, S: AsRef<str>>(
        &self,
        frame: &Frame,
        names: &'a [S],
        threshold: f32,
    ) -> Option<(&'a str, Match)> {
        names.iter().find_map(|name| {
            let name = name.as_ref();
            self.locate(frame, name, threshold).map(|found| (name, found))
        })
    }

    fn locate(&self, frame: &Frame, name: &str, threshold: f32) -> Option<Match> {
        match self.config.region_for(name) {
            Some(region) => {
                let area = region.scaled(self.gauge.resolution());
                self.matcher.find_in_region(frame, name, area, Some(threshold))
            }
            None => self.matcher.find(frame, name, Some(threshold), None),
        }
    }

    /// `None` when no town template could be loaded at all
    fn town_indicator(&self, frame: &Frame) -> Option<bool> {
        let available: Vec<&str> = self
            .config
            .town_templates
            .iter()
            .map(String::as_str)
            .filter(|name| self.matcher.is_loaded(name))
            .collect();

        if available.is_empty() {
            return None;
        }

        Some(self.locate_any(frame, &available, self.config.town_threshold).is_some())
    }
}
