// Situational states the classifier can report
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    MainMenu,
    CharacterSelect,
    Lobby,
    CreateGame,
    Loading,
    InGame,
    InTown,
    Inventory,
    Stash,
    Waypoint,
    NpcDialog,
    SkillTree,
    StatScreen,
    QuestLog,
    Death,
    Paused,
    Disconnected,
    #[default]
    Unknown,
}

impl GameState {
    /// Panels drawn over the running game
    pub fn is_overlay(&self) -> bool {
        matches!(
            self,
            GameState::Inventory
                | GameState::Stash
                | GameState::Waypoint
                | GameState::NpcDialog
                | GameState::SkillTree
                | GameState::StatScreen
                | GameState::QuestLog
                | GameState::Paused
        )
    }

    /// True while a character is loaded into the world
    pub fn is_in_game(&self) -> bool {
        matches!(self, GameState::InGame | GameState::InTown) || self.is_overlay()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::MainMenu => "main menu",
            GameState::CharacterSelect => "character select",
            GameState::Lobby => "lobby",
            GameState::CreateGame => "create game",
            GameState::Loading => "loading",
            GameState::InGame => "in game",
            GameState::InTown => "in town",
            GameState::Inventory => "inventory",
            GameState::Stash => "stash",
            GameState::Waypoint => "waypoint",
            GameState::NpcDialog => "NPC dialog",
            GameState::SkillTree => "skill tree",
            GameState::StatScreen => "stat screen",
            GameState::QuestLog => "quest log",
            GameState::Death => "death",
            GameState::Paused => "paused",
            GameState::Disconnected => "disconnected",
            GameState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
