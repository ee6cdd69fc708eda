use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::player::Attribute;

/// Newtype wrapper for enemy registry keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(pub String);

impl EnemyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EnemyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for EnemyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeReward {
    pub attribute: Attribute,
    pub amount: i32,
}

/// What a defeated enemy hands over. At most one of each kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rewards {
    #[serde(default)]
    pub attribute: Option<AttributeReward>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub health: Option<i32>,
}

impl Rewards {
    pub fn is_empty(&self) -> bool {
        self.attribute.is_none() && self.item.is_none() && self.health.is_none()
    }
}

/// An enemy stat block. `health` doubles as the enemy's maximum health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub health: i32,
    pub attack: i32,
    pub defense: i32,
    pub spirit_resistance: i32,
    #[serde(default)]
    pub rewards: Rewards,
}

impl Enemy {
    /// Stat block used when an encounter names an enemy the registry lacks.
    pub fn unknown() -> Self {
        Self {
            name: "Unknown Foe".to_string(),
            description: "A mysterious being blocks your path.".to_string(),
            health: 10,
            attack: 3,
            defense: 5,
            spirit_resistance: 5,
            rewards: Rewards::default(),
        }
    }
}
