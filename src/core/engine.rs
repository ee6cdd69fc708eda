//! The game loop: story traversal with battle handoff.
//!
//! Wires the story graph, the enemy registry and a single dice source.
//! Choosing an edge into a battle node opens an encounter; the encounter's
//! verdict moves the session on to the victory or defeat node.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::combat::{CombatAction, CombatEngine, CombatError, EnemyRegistry, TurnResult, Verdict};
use crate::core::config::{ConfigError, GameConfig};
use crate::core::dice::Dice;
use crate::core::graph::{GraphError, StoryGraph, TestRoll};
use crate::core::session::{GameSession, SaveSummary, SessionError, Snapshot};
use crate::schema::enemy::EnemyId;
use crate::schema::node::{NodeId, Outgoing, StoryNode};
use crate::schema::player::{CharacterClass, Gender, Player};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("story error: {0}")]
    Graph(#[from] GraphError),
    #[error("combat error: {0}")]
    Combat(#[from] CombatError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no battle in progress")]
    NoEncounter,
    #[error("a battle is in progress at {0}")]
    InBattle(NodeId),
}

/// Where a choice led.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    pub next: NodeId,
    /// Present when the choice was an attribute test.
    pub roll: Option<TestRoll>,
    /// Set when the next node opened a battle.
    pub battle: Option<EnemyId>,
}

/// The top-level engine. Built via `GameEngine::builder()`.
pub struct GameEngine {
    graph: StoryGraph,
    combat: CombatEngine,
    config: GameConfig,
    dice: Box<dyn Dice + Send>,
}

/// Builder for constructing a `GameEngine`.
pub struct GameEngineBuilder {
    config: GameConfig,
    seed: Option<u64>,
    story_path: Option<PathBuf>,
    enemies_path: Option<PathBuf>,
    /// Directly provided graph (for testing without files).
    graph: Option<StoryGraph>,
    /// Directly provided registry (for testing without files).
    enemies: Option<EnemyRegistry>,
    dice: Option<Box<dyn Dice + Send>>,
}

impl GameEngine {
    pub fn builder() -> GameEngineBuilder {
        GameEngineBuilder {
            config: GameConfig::default(),
            seed: None,
            story_path: None,
            enemies_path: None,
            graph: None,
            enemies: None,
            dice: None,
        }
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    pub fn combat(&self) -> &CombatEngine {
        &self.combat
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create a character and place them on the start node.
    pub fn new_game(
        &self,
        name: impl Into<String>,
        class: CharacterClass,
        gender: Gender,
    ) -> GameSession {
        let player = Player::new(name, class, gender);
        info!("new game for {} ({:?} {:?})", player.name, class, gender);
        let start = self.graph.start().clone();
        let mut session = GameSession::new(player, start.clone());
        self.enter(&mut session, start);
        session
    }

    pub fn current_node(&self, session: &GameSession) -> &StoryNode {
        self.graph.get_node(session.current_node.as_str())
    }

    /// Take choice `index` at the current node.
    pub fn choose(
        &mut self,
        session: &mut GameSession,
        index: usize,
    ) -> Result<ChoiceOutcome, EngineError> {
        if session.in_battle() {
            return Err(EngineError::InBattle(session.current_node.clone()));
        }
        let node = self.graph.get_node(session.current_node.as_str());
        let transition =
            self.graph
                .resolve_choice(node, index, &session.player, self.dice.as_mut())?;
        session.player.record_choice(node.id.clone(), index);
        session.turn_counter += 1;

        let next = transition.next().clone();
        let battle = self.enter(session, next.clone());
        Ok(ChoiceOutcome {
            next,
            roll: transition.roll().cloned(),
            battle,
        })
    }

    /// Follow the current node's direct link.
    pub fn advance(&mut self, session: &mut GameSession) -> Result<NodeId, EngineError> {
        if session.in_battle() {
            return Err(EngineError::InBattle(session.current_node.clone()));
        }
        let node = self.graph.get_node(session.current_node.as_str());
        let next = self.graph.resolve_direct(node)?;
        session.turn_counter += 1;
        self.enter(session, next.clone());
        Ok(next)
    }

    /// Play one combat turn. A verdict closes the encounter and moves the
    /// session to the battle node's victory or defeat target.
    pub fn fight(
        &mut self,
        session: &mut GameSession,
        action: CombatAction,
    ) -> Result<TurnResult, EngineError> {
        let encounter = session.encounter.as_mut().ok_or(EngineError::NoEncounter)?;
        let result =
            self.combat
                .resolve_turn(action, &mut session.player, encounter, self.dice.as_mut())?;

        if let Some(verdict) = result.verdict {
            session.encounter = None;
            let next = match &self.graph.get_node(session.current_node.as_str()).outgoing {
                Outgoing::Battle {
                    victory_node,
                    defeat_node,
                    ..
                } => Some(match verdict {
                    Verdict::Victory => victory_node.clone(),
                    Verdict::Defeat => defeat_node.clone(),
                }),
                _ => None,
            };
            match next {
                Some(next) => {
                    session.turn_counter += 1;
                    self.enter(session, next);
                }
                None => warn!(
                    "battle ended on non-battle node '{}', staying put",
                    session.current_node
                ),
            }
        }
        Ok(result)
    }

    pub fn save(&self, session: &GameSession) -> Result<String, SessionError> {
        let json = session.snapshot().to_json()?;
        info!(
            "saved {} at {} (turn {})",
            session.player.name, session.current_node, session.turn_counter
        );
        Ok(json)
    }

    /// Restore a session. A malformed payload is an error and leaves the
    /// caller's current session untouched.
    pub fn load(&self, payload: &str) -> Result<GameSession, SessionError> {
        let mut session = Snapshot::from_json(payload)?.into_session();
        info!(
            "loaded {} at {} (turn {})",
            session.player.name, session.current_node, session.turn_counter
        );
        let current = session.current_node.clone();
        self.enter(&mut session, current);
        Ok(session)
    }

    pub fn summary(&self, payload: &str) -> Result<SaveSummary, SessionError> {
        Ok(Snapshot::from_json(payload)?.summary())
    }

    /// Move the cursor, opening a fresh encounter on battle nodes.
    fn enter(&self, session: &mut GameSession, next: NodeId) -> Option<EnemyId> {
        let battle = match &self.graph.get_node(next.as_str()).outgoing {
            Outgoing::Battle { enemy, .. } => Some(enemy.clone()),
            _ => None,
        };
        session.current_node = next;
        session.encounter = battle
            .as_ref()
            .map(|enemy| self.combat.start_encounter(enemy.as_str()));
        battle
    }
}

impl GameEngineBuilder {
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Load config from a RON file.
    pub fn config_file(mut self, path: &Path) -> Result<Self, EngineError> {
        self.config = GameConfig::load_from_ron(path)?;
        Ok(self)
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn story_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.story_path = Some(path.into());
        self
    }

    pub fn enemies_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.enemies_path = Some(path.into());
        self
    }

    /// Provide a graph directly (for testing without files).
    pub fn with_graph(mut self, graph: StoryGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Provide enemies directly (for testing without files).
    pub fn with_enemies(mut self, enemies: EnemyRegistry) -> Self {
        self.enemies = Some(enemies);
        self
    }

    /// Replace the seeded rng, e.g. with scripted dice.
    pub fn with_dice(mut self, dice: Box<dyn Dice + Send>) -> Self {
        self.dice = Some(dice);
        self
    }

    pub fn build(self) -> Result<GameEngine, EngineError> {
        let config = self.config;

        let graph = match self.graph {
            Some(graph) => graph,
            None => {
                let path = self.story_path.unwrap_or_else(|| config.story_path.clone());
                StoryGraph::load_from_ron(&path, config.start_node.as_str())?
            }
        };

        let enemies = match self.enemies {
            Some(enemies) => enemies,
            None => {
                let path = self.enemies_path.unwrap_or_else(|| config.enemies_path.clone());
                EnemyRegistry::load_from_ron(&path)?
            }
        };

        let report = graph.validate(graph.start().as_str());
        for message in report.messages() {
            warn!("story graph: {}", message);
        }

        let dice = match self.dice {
            Some(dice) => dice,
            None => Box::new(StdRng::seed_from_u64(self.seed.unwrap_or(config.seed))),
        };

        Ok(GameEngine {
            combat: CombatEngine::new(enemies, config.combat_rules()),
            graph,
            config,
            dice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dice::ScriptedDice;
    use crate::schema::enemy::Enemy;
    use crate::schema::node::Choice;
    use crate::schema::player::Attribute;

    fn story() -> StoryGraph {
        StoryGraph::new(
            "start",
            vec![
                StoryNode::new(
                    "start",
                    "Crossroads",
                    "Two roads.",
                    Outgoing::Choices(vec![
                        Choice::link("Road to the gate", "gate"),
                        Choice::test("Read the stars", Attribute::Mental, 30, "gate", "lost"),
                    ]),
                ),
                StoryNode::new(
                    "gate",
                    "Gate",
                    "A guard.",
                    Outgoing::Battle {
                        enemy: EnemyId::from("guard"),
                        victory_node: NodeId::from("inside"),
                        defeat_node: NodeId::from("lost"),
                    },
                ),
                StoryNode::new("inside", "Inside", "", Outgoing::Direct(NodeId::from("end"))),
                StoryNode::new("end", "End", "", Outgoing::Terminal),
                StoryNode::new("lost", "Lost", "", Outgoing::Terminal),
            ],
        )
        .unwrap()
    }

    fn engine(rolls: Vec<i32>) -> GameEngine {
        let mut enemies = EnemyRegistry::new();
        enemies.register("guard", Enemy::unknown());
        GameEngine::builder()
            .with_graph(story())
            .with_enemies(enemies)
            .with_dice(Box::new(ScriptedDice::new(rolls)))
            .build()
            .unwrap()
    }

    #[test]
    fn choice_into_battle_opens_encounter() {
        let mut engine = engine(vec![]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        let outcome = engine.choose(&mut session, 0).unwrap();
        assert_eq!(outcome.next.as_str(), "gate");
        assert_eq!(outcome.battle, Some(EnemyId::from("guard")));
        assert!(session.in_battle());
        assert_eq!(session.turn_counter, 1);
        assert_eq!(session.player.choices_made.get("start"), Some(&0));
    }

    #[test]
    fn choosing_during_battle_is_refused() {
        let mut engine = engine(vec![]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        engine.choose(&mut session, 0).unwrap();
        assert!(matches!(
            engine.choose(&mut session, 0),
            Err(EngineError::InBattle(_))
        ));
        assert!(matches!(engine.advance(&mut session), Err(EngineError::InBattle(_))));
    }

    #[test]
    fn failed_test_goes_to_failure_node() {
        let mut engine = engine(vec![5]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        let outcome = engine.choose(&mut session, 1).unwrap();
        assert_eq!(outcome.next.as_str(), "lost");
        let roll = outcome.roll.unwrap();
        assert_eq!(roll.total, 15);
        assert!(!roll.passed);
        assert!(engine.current_node(&session).is_terminal());
    }

    #[test]
    fn victory_moves_to_victory_node() {
        // crit: 7*2 + 6 kills the 10-health foe; bonus roll misses
        let mut engine = engine(vec![20, 6, 100]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        engine.choose(&mut session, 0).unwrap();
        let result = engine.fight(&mut session, CombatAction::Attack).unwrap();
        assert_eq!(result.verdict, Some(Verdict::Victory));
        assert!(session.encounter.is_none());
        assert_eq!(session.current_node.as_str(), "inside");
        assert_eq!(engine.advance(&mut session).unwrap().as_str(), "end");
        assert_eq!(session.turn_counter, 3);
    }

    #[test]
    fn fight_without_battle_is_an_error() {
        let mut engine = engine(vec![]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        assert!(matches!(
            engine.fight(&mut session, CombatAction::Defend),
            Err(EngineError::NoEncounter)
        ));
    }

    #[test]
    fn load_on_battle_node_restarts_encounter() {
        let mut engine = engine(vec![10, 2, 0]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        engine.choose(&mut session, 0).unwrap();
        engine.fight(&mut session, CombatAction::Attack).unwrap();
        let saved = engine.save(&session).unwrap();

        let restored = engine.load(&saved).unwrap();
        let encounter = restored.encounter.as_ref().unwrap();
        assert_eq!(encounter.enemy_current_health, encounter.enemy_max_health());
        assert_eq!(encounter.turn, 0);
        assert_eq!(restored.player.current_health, session.player.current_health);
    }

    #[test]
    fn bad_load_keeps_nothing() {
        let engine = engine(vec![]);
        assert!(engine.load("{\"player\": 3}").is_err());
        assert!(engine.summary("").is_err());
    }

    #[test]
    fn unknown_node_recovers_through_fallback() {
        let mut engine = engine(vec![]);
        let mut session = engine.new_game("Ada", CharacterClass::Scientist, Gender::Man);
        session.current_node = NodeId::from("torn_page");
        assert!(matches!(
            engine.choose(&mut session, 0),
            Err(EngineError::Graph(GraphError::NotAChoiceNode(_)))
        ));
        assert_eq!(engine.advance(&mut session).unwrap().as_str(), "start");
    }
}
