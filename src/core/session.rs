//! Per-player session state and the JSON save snapshot.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::core::combat::Encounter;
use crate::schema::node::NodeId;
use crate::schema::player::{CharacterClass, Gender, Player};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed save: {0}")]
    Malformed(String),
}

/// One player's progress through the story.
///
/// The encounter is live state only. It is never persisted; a session
/// restored onto a battle node gets a fresh one.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub player: Player,
    pub current_node: NodeId,
    pub turn_counter: u32,
    pub encounter: Option<Encounter>,
}

impl GameSession {
    pub fn new(player: Player, start: NodeId) -> Self {
        Self {
            player,
            current_node: start,
            turn_counter: 0,
            encounter: None,
        }
    }

    pub fn in_battle(&self) -> bool {
        self.encounter.as_ref().is_some_and(|e| !e.is_over())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            player: self.player.clone(),
            current_node: self.current_node.clone(),
            turn_counter: self.turn_counter,
            saved_at: unix_now(),
        }
    }
}

/// The persisted form of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub player: Player,
    pub current_node: NodeId,
    pub turn_counter: u32,
    /// Seconds since the unix epoch.
    #[serde(default)]
    pub saved_at: u64,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and sanity-check a saved payload.
    pub fn from_json(input: &str) -> Result<Snapshot, SessionError> {
        let snapshot: Snapshot = serde_json::from_str(input)?;
        snapshot.check()?;
        Ok(snapshot)
    }

    fn check(&self) -> Result<(), SessionError> {
        let player = &self.player;
        if self.current_node.as_str().is_empty() {
            return Err(SessionError::Malformed("empty current node".to_string()));
        }
        if player.max_health < 0 {
            return Err(SessionError::Malformed(format!(
                "negative max health {}",
                player.max_health
            )));
        }
        if !(0..=player.max_health).contains(&player.current_health) {
            return Err(SessionError::Malformed(format!(
                "health {} outside 0..={}",
                player.current_health, player.max_health
            )));
        }
        Ok(())
    }

    pub fn into_session(self) -> GameSession {
        GameSession {
            player: self.player,
            current_node: self.current_node,
            turn_counter: self.turn_counter,
            encounter: None,
        }
    }

    pub fn summary(&self) -> SaveSummary {
        SaveSummary {
            name: self.player.name.clone(),
            class: self.player.class,
            gender: self.player.gender,
            current_node: self.current_node.clone(),
            turn_counter: self.turn_counter,
            saved_at: self.saved_at,
        }
    }
}

/// What a save-slot listing shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub name: String,
    pub class: CharacterClass,
    pub gender: Gender,
    pub current_node: NodeId,
    pub turn_counter: u32,
    pub saved_at: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
