//! Turn-based combat: one encounter from first action to victory or defeat.
//!
//! A turn is the player's action followed, unless the fight already ended,
//! by the enemy's counter-attack. Terminal checks run after every health
//! change, so an enemy dropped by the player's action never retaliates and
//! a backfire that empties the player's health ends the fight at once.

use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::dice::{Dice, RollQuality};
use crate::schema::enemy::{Enemy, EnemyId};
use crate::schema::player::{Attribute, Player};

#[derive(Debug, Error)]
pub enum CombatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("the encounter with {0} is already over")]
    EncounterOver(String),
}

/// Tunable combat constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRules {
    /// Percent chance of a random attribute bonus after a victory.
    pub bonus_chance_percent: i32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            bonus_chance_percent: 30,
        }
    }
}

/// Static enemy stat blocks keyed by id.
#[derive(Debug, Clone)]
pub struct EnemyRegistry {
    enemies: FxHashMap<EnemyId, Enemy>,
    unknown: Enemy,
}

impl Default for EnemyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EnemyRegistry {
    pub fn new() -> Self {
        Self {
            enemies: FxHashMap::default(),
            unknown: Enemy::unknown(),
        }
    }

    /// Load a registry from a RON map of id -> enemy.
    pub fn load_from_ron(path: &Path) -> Result<EnemyRegistry, CombatError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EnemyRegistry, CombatError> {
        let enemies: FxHashMap<EnemyId, Enemy> = ron::from_str(input)?;
        Ok(EnemyRegistry {
            enemies,
            unknown: Enemy::unknown(),
        })
    }

    pub fn register(&mut self, id: impl Into<String>, enemy: Enemy) {
        self.enemies.insert(EnemyId(id.into()), enemy);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.enemies.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&EnemyId> {
        let mut ids: Vec<&EnemyId> = self.enemies.keys().collect();
        ids.sort();
        ids
    }

    /// Look up an enemy, substituting the "unknown foe" block for ids the
    /// registry lacks.
    pub fn get_enemy(&self, id: &str) -> &Enemy {
        match self.enemies.get(id) {
            Some(enemy) => enemy,
            None => {
                warn!("unknown enemy '{}', using default stat block", id);
                &self.unknown
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatAction {
    Attack,
    Defend,
    Spirit,
}

impl CombatAction {
    pub const ALL: [CombatAction; 3] = [Self::Attack, Self::Defend, Self::Spirit];

    /// Accepts menu numbers as well as names.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "attack" | "a" => Some(Self::Attack),
            "2" | "defend" | "d" => Some(Self::Defend),
            "3" | "spirit" | "s" => Some(Self::Spirit),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defend => "defend",
            Self::Spirit => "spirit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterState {
    AwaitingAction,
    ResolvingPlayerAction,
    ResolvingEnemyAction,
    Victory,
    Defeat,
}

/// Which rule branch the player's action landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    CriticalHit,
    CriticalMiss,
    StrongHit,
    Hit,
    Miss,
    Defending,
    /// Natural 20 on spirit, damage half of the split.
    SpiritSurge,
    /// Natural 20 on spirit, healing half of the split.
    SpiritRenewal,
    Backfire,
    StrongSpirit,
    Spirit,
    SpiritFailed,
    /// The player had no health left to act with.
    Incapacitated,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(
            self,
            Self::CriticalMiss
                | Self::Miss
                | Self::Backfire
                | Self::SpiritFailed
                | Self::Incapacitated
        )
    }
}

/// A reward handed to the player after a victory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardGrant {
    Attribute { attribute: Attribute, amount: i32 },
    Item(String),
    Health(i32),
    Bonus { attribute: Attribute, amount: i32 },
}

/// Everything a caller needs to narrate one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub action: CombatAction,
    /// The d20, absent for defend.
    pub roll: Option<i32>,
    pub outcome: ActionOutcome,
    pub succeeded: bool,
    pub damage_dealt: i32,
    pub healed: i32,
    pub damage_taken: i32,
    /// Narration in display order.
    pub messages: Vec<String>,
    pub player_health: i32,
    pub player_max_health: i32,
    pub enemy_health: i32,
    pub enemy_max_health: i32,
    pub verdict: Option<Verdict>,
    pub rewards: Vec<RewardGrant>,
}

/// One live battle. Created at battle start, discarded once a verdict has
/// been consumed.
#[derive(Debug, Clone)]
pub struct Encounter {
    pub enemy_id: EnemyId,
    pub enemy: Enemy,
    pub enemy_current_health: i32,
    pub player_defending: bool,
    pub turn: u32,
    state: EncounterState,
    log: Vec<String>,
}

impl Encounter {
    pub fn new(enemy_id: EnemyId, enemy: Enemy) -> Self {
        let opening = format!("You face {}! {}", enemy.name, enemy.description);
        Self {
            enemy_id,
            enemy_current_health: enemy.health.max(0),
            enemy,
            player_defending: false,
            turn: 0,
            state: EncounterState::AwaitingAction,
            log: vec![opening.trim_end().to_string()],
        }
    }

    pub fn enemy_max_health(&self) -> i32 {
        self.enemy.health.max(0)
    }

    pub fn state(&self) -> EncounterState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.verdict().is_some()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self.state {
            EncounterState::Victory => Some(Verdict::Victory),
            EncounterState::Defeat => Some(Verdict::Defeat),
            _ => None,
        }
    }

    /// Narration, most recent first.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn damage_enemy(&mut self, amount: i32) -> i32 {
        let before = self.enemy_current_health;
        self.enemy_current_health = (before - amount.max(0)).clamp(0, self.enemy_max_health());
        before - self.enemy_current_health
    }

    fn record(&mut self, messages: &[String]) {
        for message in messages {
            self.log.insert(0, message.clone());
        }
    }
}

/// Resolves encounters against a registry of enemies.
#[derive(Debug, Clone, Default)]
pub struct CombatEngine {
    registry: EnemyRegistry,
    rules: CombatRules,
}

impl CombatEngine {
    pub fn new(registry: EnemyRegistry, rules: CombatRules) -> Self {
        Self { registry, rules }
    }

    pub fn registry(&self) -> &EnemyRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn start_encounter(&self, enemy_id: &str) -> Encounter {
        let enemy = self.registry.get_enemy(enemy_id).clone();
        info!("battle started against {} ({})", enemy.name, enemy_id);
        Encounter::new(EnemyId::from(enemy_id), enemy)
    }

    /// Run one turn: the player's action, then the enemy's counter-attack
    /// if both sides are still standing. Rewards are applied on the turn
    /// that produces a victory.
    pub fn resolve_turn(
        &self,
        action: CombatAction,
        player: &mut Player,
        encounter: &mut Encounter,
        dice: &mut dyn Dice,
    ) -> Result<TurnResult, CombatError> {
        if encounter.is_over() {
            return Err(CombatError::EncounterOver(encounter.enemy.name.clone()));
        }

        encounter.turn += 1;
        let mut turn = TurnBuilder::new(action);

        // A player who enters the fight with no health loses before acting.
        if !player.is_alive() {
            encounter.state = EncounterState::Defeat;
            turn.outcome = ActionOutcome::Incapacitated;
            turn.say("You are too weak to fight.");
            turn.say(format!("You were defeated by {}!", encounter.enemy.name));
            info!("defeat by {} before acting", encounter.enemy.name);
            encounter.record(&turn.messages);
            return Ok(turn.finish(player, encounter));
        }

        encounter.state = EncounterState::ResolvingPlayerAction;
        match action {
            CombatAction::Attack => player_attack(player, encounter, dice, &mut turn),
            CombatAction::Defend => {
                encounter.player_defending = true;
                turn.outcome = ActionOutcome::Defending;
                turn.say("You take a defensive stance!");
            }
            CombatAction::Spirit => player_spirit(player, encounter, dice, &mut turn),
        }

        if encounter.enemy_current_health <= 0 {
            encounter.state = EncounterState::Victory;
            turn.say(format!("You defeated {}!", encounter.enemy.name));
            turn.rewards = self.award_rewards(player, &encounter.enemy, dice, &mut turn.messages);
            info!("victory over {} on turn {}", encounter.enemy.name, encounter.turn);
        } else if !player.is_alive() {
            encounter.state = EncounterState::Defeat;
            turn.say(format!("You were defeated by {}!", encounter.enemy.name));
            info!("defeat by {} on turn {}", encounter.enemy.name, encounter.turn);
        } else {
            encounter.state = EncounterState::ResolvingEnemyAction;
            enemy_turn(player, encounter, dice, &mut turn);
            if player.is_alive() {
                encounter.state = EncounterState::AwaitingAction;
            } else {
                encounter.state = EncounterState::Defeat;
                turn.say(format!("You were defeated by {}!", encounter.enemy.name));
                info!("defeat by {} on turn {}", encounter.enemy.name, encounter.turn);
            }
        }

        encounter.record(&turn.messages);
        Ok(turn.finish(player, encounter))
    }

    /// Apply the enemy's rewards, then roll for the random bonus.
    ///
    /// Order is fixed: attribute, item, health, bonus.
    pub fn award_rewards(
        &self,
        player: &mut Player,
        enemy: &Enemy,
        dice: &mut dyn Dice,
        messages: &mut Vec<String>,
    ) -> Vec<RewardGrant> {
        let mut grants = Vec::new();
        let rewards = &enemy.rewards;

        if let Some(reward) = rewards.attribute {
            player.modify_attribute(reward.attribute, reward.amount);
            messages.push(format!(
                "Your {} increased by {}!",
                reward.attribute.name(),
                reward.amount
            ));
            grants.push(RewardGrant::Attribute {
                attribute: reward.attribute,
                amount: reward.amount,
            });
        }

        if let Some(item) = &rewards.item {
            player.add_item(item.clone());
            messages.push(format!("You found: {}", item));
            grants.push(RewardGrant::Item(item.clone()));
        }

        if let Some(amount) = rewards.health {
            let healed = player.heal(amount);
            messages.push(format!("You recovered {} health!", healed));
            grants.push(RewardGrant::Health(healed));
        }

        if dice.chance(self.rules.bonus_chance_percent) {
            let attribute = Attribute::ALL[dice.range(0, 2) as usize];
            let amount = dice.range(1, 2);
            player.modify_attribute(attribute, amount);
            messages.push(format!(
                "Bonus prize! Your {} increased by {}!",
                attribute.name(),
                amount
            ));
            grants.push(RewardGrant::Bonus { attribute, amount });
        }

        grants
    }
}

struct TurnBuilder {
    action: CombatAction,
    roll: Option<i32>,
    outcome: ActionOutcome,
    damage_dealt: i32,
    healed: i32,
    damage_taken: i32,
    messages: Vec<String>,
    rewards: Vec<RewardGrant>,
}

impl TurnBuilder {
    fn new(action: CombatAction) -> Self {
        Self {
            action,
            roll: None,
            outcome: ActionOutcome::Miss,
            damage_dealt: 0,
            healed: 0,
            damage_taken: 0,
            messages: Vec::new(),
            rewards: Vec::new(),
        }
    }

    fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn roll(&mut self, dice: &mut dyn Dice) -> i32 {
        let roll = dice.d20();
        self.roll = Some(roll);
        self.say(format!("Roll: {} ({})", roll, RollQuality::from_roll(roll).label()));
        roll
    }

    fn finish(self, player: &Player, encounter: &Encounter) -> TurnResult {
        TurnResult {
            action: self.action,
            roll: self.roll,
            succeeded: self.outcome.succeeded(),
            outcome: self.outcome,
            damage_dealt: self.damage_dealt,
            healed: self.healed,
            damage_taken: self.damage_taken,
            messages: self.messages,
            player_health: player.current_health,
            player_max_health: player.max_health,
            enemy_health: encounter.enemy_current_health,
            enemy_max_health: encounter.enemy_max_health(),
            verdict: encounter.verdict(),
            rewards: self.rewards,
        }
    }
}

fn player_attack(
    player: &Player,
    encounter: &mut Encounter,
    dice: &mut dyn Dice,
    turn: &mut TurnBuilder,
) {
    let roll = turn.roll(dice);
    let physical = player.physical;
    let defense = encounter.enemy.defense;
    let attack_value = roll.saturating_add(physical);
    debug!("attack: {} + {} = {} vs defense {}", roll, physical, attack_value, defense);

    let (outcome, damage) = if roll == 20 {
        (
            ActionOutcome::CriticalHit,
            physical.saturating_mul(2).saturating_add(dice.range(3, 6)),
        )
    } else if roll == 1 {
        (ActionOutcome::CriticalMiss, 0)
    } else if attack_value >= defense.saturating_add(5) {
        (ActionOutcome::StrongHit, physical.saturating_add(dice.range(2, 5)))
    } else if attack_value >= defense {
        let damage = physical
            .saturating_add(dice.range(0, 3))
            .saturating_sub(defense.div_euclid(2))
            .max(1);
        (ActionOutcome::Hit, damage)
    } else {
        (ActionOutcome::Miss, 0)
    };

    turn.outcome = outcome;
    turn.say(match outcome {
        ActionOutcome::CriticalHit => "Critical hit!",
        ActionOutcome::CriticalMiss => "Critical miss! You stumble and miss the attack!",
        ActionOutcome::StrongHit => "Great blow!",
        ActionOutcome::Hit => "You land the blow.",
        _ => "Your attack was blocked or dodged.",
    });

    let dealt = encounter.damage_enemy(damage);
    turn.damage_dealt = dealt;
    if dealt > 0 {
        turn.say(format!("You dealt {} damage!", dealt));
    }
}

fn player_spirit(
    player: &mut Player,
    encounter: &mut Encounter,
    dice: &mut dyn Dice,
    turn: &mut TurnBuilder,
) {
    let roll = turn.roll(dice);
    let spiritual = player.spiritual;
    let resistance = encounter.enemy.spirit_resistance;
    let spirit_value = roll.saturating_add(spiritual);
    debug!(
        "spirit: {} + {} = {} vs resistance {}",
        roll, spiritual, spirit_value, resistance
    );

    let mut damage = 0;
    if roll == 20 {
        if dice.coin() {
            turn.outcome = ActionOutcome::SpiritSurge;
            damage = spiritual.saturating_mul(2).saturating_add(dice.range(2, 8));
            turn.say("The Orisha answer your call with immense power!");
        } else {
            turn.outcome = ActionOutcome::SpiritRenewal;
            let healed = player.heal(spiritual.saturating_add(dice.range(3, 8)));
            turn.healed += healed;
            turn.say("The Orisha renew your life force!");
            turn.say(format!("You recover {} health!", healed));
        }
    } else if roll == 1 {
        turn.outcome = ActionOutcome::Backfire;
        let lost = player.take_damage(dice.range(1, 4));
        turn.damage_taken += lost;
        turn.say("The spiritual energy spirals out of control!");
        turn.say(format!("You suffer {} damage!", lost));
    } else if spirit_value >= resistance.saturating_add(5) {
        turn.outcome = ActionOutcome::StrongSpirit;
        damage = spiritual.saturating_add(dice.range(2, 5));
        turn.say("The spiritual energy strikes the enemy deeply!");
    } else if spirit_value >= resistance {
        turn.outcome = ActionOutcome::Spirit;
        damage = spiritual.saturating_sub(resistance.div_euclid(3)).max(1);
        let healed = player.heal(dice.range(1, 3));
        turn.healed += healed;
        turn.say("You channel spiritual energy.");
        turn.say(format!("You recover {} health!", healed));
    } else {
        turn.outcome = ActionOutcome::SpiritFailed;
        turn.say("You try to channel spiritual energy, but fail.");
    }

    let dealt = encounter.damage_enemy(damage);
    turn.damage_dealt = dealt;
    if dealt > 0 {
        turn.say(format!("You deal {} spiritual damage!", dealt));
    }
}

fn enemy_turn(
    player: &mut Player,
    encounter: &mut Encounter,
    dice: &mut dyn Dice,
    turn: &mut TurnBuilder,
) {
    turn.say(format!("{} attacks!", encounter.enemy.name));
    let base_damage = encounter.enemy.attack;
    let damage = if encounter.player_defending {
        turn.say("Your defense reduced the damage!");
        base_damage
            .saturating_sub(player.physical)
            .saturating_sub(dice.range(2, 5))
            .max(1)
    } else {
        base_damage.saturating_sub(dice.range(0, 2)).max(1)
    };
    encounter.player_defending = false;

    let lost = player.take_damage(damage);
    turn.damage_taken += lost;
    turn.say(format!("You took {} damage!", lost));
    debug!("enemy dealt {} (player at {})", lost, player.current_health);
}
