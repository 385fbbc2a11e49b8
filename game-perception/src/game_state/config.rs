//! Configuration for game state classification

use super::types::GameState;
use crate::resource::Region;
use crate::template_matching::{MatchConfig, create_game_object_config};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Templates whose presence identifies a screen or overlay
    pub state_templates: HashMap<GameState, Vec<String>>,
    /// Templates that are only visible while a character is in the world
    pub hud_templates: Vec<String>,
    /// Templates that only appear in town
    pub town_templates: Vec<String>,
    /// Health bar drawn above hostile monsters
    pub enemy_template: String,
    /// Threshold, spacing and cap for enemy searches
    pub enemy_search: MatchConfig,
    /// Where each template may appear, authored at 1920x1080. Templates
    /// without an entry are searched over the whole frame.
    pub search_regions: HashMap<String, Region>,
    /// Threshold for full-screen states (menus, loading, death)
    pub screen_threshold: f32,
    /// Threshold for in-game panels
    pub overlay_threshold: f32,
    pub hud_threshold: f32,
    pub town_threshold: f32,
    /// Measured health at or above this counts as a visible HUD when no HUD
    /// template matches
    pub hud_min_health: f32,
    /// Report `InTown` instead of `InGame` when a town indicator matches
    pub report_town: bool,
}

impl ClassifierConfig {
    pub fn templates_for(&self, state: GameState) -> &[String] {
        self.state_templates
            .get(&state)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn region_for(&self, name: &str) -> Option<Region> {
        self.search_regions.get(name).copied()
    }

    /// Every template name the classifier may ask for, without duplicates
    pub fn all_templates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .state_templates
            .values()
            .flatten()
            .chain(&self.hud_templates)
            .chain(&self.town_templates)
            .chain(std::iter::once(&self.enemy_template))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            state_templates: default_state_templates(),
            hud_templates: names(&[
                "hud/health_orb",
                "hud/mana_orb",
                "hud/belt",
                "hud/minimap",
                "hud/experience_bar",
            ]),
            town_templates: names(&["hud/town_indicator", "npcs/stash"]),
            enemy_template: "hud/enemy_health_bar".to_string(),
            enemy_search: create_game_object_config(),
            search_regions: default_search_regions(),
            screen_threshold: 0.8,
            overlay_threshold: 0.75,
            hud_threshold: 0.7,
            town_threshold: 0.7,
            hud_min_health: 0.05,
            report_town: false,
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| name.to_string()).collect()
}

fn default_state_templates() -> HashMap<GameState, Vec<String>> {
    [
        (GameState::MainMenu, names(&["screens/main_menu", "screens/play_button"])),
        (
            GameState::CharacterSelect,
            names(&["screens/character_select", "screens/char_list"]),
        ),
        (GameState::Lobby, names(&["screens/lobby", "screens/game_list"])),
        (GameState::CreateGame, names(&["screens/create_game"])),
        (GameState::Loading, names(&["screens/loading", "screens/loading_bar"])),
        (GameState::Death, names(&["screens/death", "screens/you_died"])),
        (
            GameState::Disconnected,
            names(&["screens/disconnected", "screens/connection_lost"]),
        ),
        (GameState::Paused, names(&["screens/paused", "screens/options_menu"])),
        (GameState::Inventory, names(&["hud/inventory_open", "hud/inventory_grid"])),
        (GameState::Stash, names(&["hud/stash_open", "hud/stash_tabs"])),
        (GameState::Waypoint, names(&["hud/waypoint_menu", "hud/waypoint_acts"])),
        (GameState::NpcDialog, names(&["hud/npc_dialog", "hud/dialog_box"])),
        (GameState::SkillTree, names(&["hud/skill_tree", "hud/skill_points"])),
        (GameState::StatScreen, names(&["hud/stat_screen", "hud/stat_points"])),
        (GameState::QuestLog, names(&["hud/quest_log"])),
    ]
    .into_iter()
    .collect()
}

fn default_search_regions() -> HashMap<String, Region> {
    [
        // Full-screen states: banners and buttons around the centre
        ("screens/main_menu", Region::new(660, 60, 600, 240)),
        ("screens/play_button", Region::new(760, 420, 400, 280)),
        ("screens/character_select", Region::new(660, 20, 600, 120)),
        ("screens/char_list", Region::new(40, 120, 600, 300)),
        ("screens/lobby", Region::new(600, 100, 720, 200)),
        ("screens/game_list", Region::new(1000, 150, 500, 400)),
        ("screens/create_game", Region::new(700, 150, 520, 200)),
        ("screens/loading", Region::new(660, 440, 600, 200)),
        ("screens/loading_bar", Region::new(560, 900, 800, 120)),
        ("screens/death", Region::new(560, 320, 800, 240)),
        ("screens/you_died", Region::new(560, 320, 800, 240)),
        ("screens/disconnected", Region::new(560, 380, 800, 320)),
        ("screens/connection_lost", Region::new(560, 380, 800, 320)),
        ("screens/paused", Region::new(660, 300, 600, 480)),
        ("screens/options_menu", Region::new(660, 300, 600, 480)),
        // HUD landmarks
        ("hud/health_orb", Region::new(0, 840, 240, 240)),
        ("hud/mana_orb", Region::new(1680, 840, 240, 240)),
        ("hud/belt", Region::new(760, 940, 400, 140)),
        ("hud/minimap", Region::new(1620, 0, 300, 300)),
        ("hud/experience_bar", Region::new(480, 1040, 960, 40)),
        ("hud/town_indicator", Region::new(1620, 0, 300, 300)),
        // Panels open on the left or right half
        ("hud/inventory_open", Region::new(1260, 60, 520, 100)),
        ("hud/inventory_grid", Region::new(1000, 560, 860, 300)),
        ("hud/stash_open", Region::new(140, 60, 520, 100)),
        ("hud/stash_tabs", Region::new(60, 120, 700, 80)),
        ("hud/waypoint_menu", Region::new(140, 60, 520, 100)),
        ("hud/waypoint_acts", Region::new(60, 120, 700, 80)),
        ("hud/npc_dialog", Region::new(560, 200, 800, 400)),
        ("hud/dialog_box", Region::new(560, 600, 800, 300)),
        ("hud/skill_tree", Region::new(1260, 60, 520, 100)),
        ("hud/skill_points", Region::new(1500, 120, 360, 120)),
        ("hud/stat_screen", Region::new(140, 60, 520, 100)),
        ("hud/stat_points", Region::new(60, 700, 400, 200)),
        ("hud/quest_log", Region::new(140, 60, 520, 100)),
    ]
    .into_iter()
    .map(|(name, region)| (name.to_string(), region))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates() {
        let config = ClassifierConfig::default();

        assert_eq!(
            config.templates_for(GameState::Death),
            ["screens/death", "screens/you_died"]
        );
        assert!(config.templates_for(GameState::InGame).is_empty());
        assert_eq!(config.enemy_search.max_matches, 20);
    }

    #[test]
    fn test_all_templates_deduplicated() {
        let mut config = ClassifierConfig::default();
        config.town_templates.push("hud/belt".to_string());

        let all = config.all_templates();
        assert_eq!(all.iter().filter(|name| **name == "hud/belt").count(), 1);
        assert!(all.contains(&"hud/enemy_health_bar"));
        assert!(all.contains(&"screens/create_game"));
    }

    #[test]
    fn test_default_regions_cover_screens_and_hud() {
        let config = ClassifierConfig::default();
        let reference = crate::resource::Resolution::REFERENCE;

        for name in config
            .state_templates
            .values()
            .flatten()
            .chain(&config.hud_templates)
        {
            let region = config
                .region_for(name)
                .unwrap_or_else(|| panic!("{name} has no search region"));
            assert!(region.scaled(reference).fits_within(1920, 1080), "{name}");
        }
        // NPCs can stand anywhere
        assert!(config.region_for("npcs/stash").is_none());
    }
}
