//! Narrative RPG core: a story graph walked by choices and attribute tests,
//! with turn-based d20 combat at battle nodes.
//!
//! All randomness flows through one injected [`core::dice::Dice`] source, so
//! a scripted sequence replays any playthrough exactly.

pub mod core;
pub mod schema;

pub use crate::core::combat::{CombatAction, CombatEngine, EnemyRegistry, TurnResult, Verdict};
pub use crate::core::config::GameConfig;
pub use crate::core::dice::{Dice, ScriptedDice};
pub use crate::core::engine::{GameEngine, GameEngineBuilder};
pub use crate::core::graph::StoryGraph;
pub use crate::core::session::GameSession;
