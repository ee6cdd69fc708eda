//! Game-wide settings, loaded from RON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::combat::CombatRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub start_node: String,
    pub seed: u64,
    /// Percent chance of a random attribute bonus after each victory.
    pub bonus_chance_percent: i32,
    pub story_path: PathBuf,
    pub enemies_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_node: "start".to_string(),
            seed: 42,
            bonus_chance_percent: 30,
            story_path: PathBuf::from("content/story.ron"),
            enemies_path: PathBuf::from("content/enemies.ron"),
        }
    }
}

impl GameConfig {
    pub fn load_from_ron(path: &Path) -> Result<GameConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<GameConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn combat_rules(&self) -> CombatRules {
        CombatRules {
            bonus_chance_percent: self.bonus_chance_percent.clamp(0, 100),
        }
    }
}
