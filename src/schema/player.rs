use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::node::NodeId;

/// The three attributes every test and combat action is rolled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Mental,
    Physical,
    Spiritual,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Self::Mental, Self::Physical, Self::Spiritual];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mental => "mental",
            Self::Physical => "physical",
            Self::Spiritual => "spiritual",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.to_lowercase().as_str() {
            "mental" => Some(Self::Mental),
            "physical" => Some(Self::Physical),
            "spiritual" => Some(Self::Spiritual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Scientist,
    Archaeologist,
}

impl CharacterClass {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_lowercase().as_str() {
            "scientist" => Some(Self::Scientist),
            "archaeologist" => Some(Self::Archaeologist),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Scientist => "A specialist in scientific knowledge and rational analysis.",
            Self::Archaeologist => "A specialist in ancient cultures and historical artifacts.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_lowercase().as_str() {
            "man" => Some(Self::Man),
            "woman" => Some(Self::Woman),
            _ => None,
        }
    }
}

/// The player character record.
///
/// Attributes have no floor or ceiling. `current_health` is kept within
/// `0..=max_health` by every method that touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub class: CharacterClass,
    pub gender: Gender,
    pub mental: i32,
    pub physical: i32,
    pub spiritual: i32,
    pub max_health: i32,
    pub current_health: i32,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub special_abilities: BTreeSet<String>,
    /// Node id -> index of the last choice taken there.
    #[serde(default)]
    pub choices_made: BTreeMap<NodeId, usize>,
    #[serde(default)]
    pub favor: BTreeMap<String, i32>,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
}

impl Player {
    /// Create a character with the base attributes of its class and gender.
    pub fn new(name: impl Into<String>, class: CharacterClass, gender: Gender) -> Self {
        let (mut mental, mut physical, mut spiritual) = match class {
            CharacterClass::Scientist => (10, 6, 5),
            CharacterClass::Archaeologist => (8, 7, 6),
        };
        match (class, gender) {
            (CharacterClass::Scientist, Gender::Woman) => {
                mental += 1;
                physical -= 1;
            }
            (CharacterClass::Archaeologist, Gender::Woman) => spiritual += 1,
            (_, Gender::Man) => physical += 1,
        }

        let max_health = 20 + physical;
        Self {
            name: name.into(),
            class,
            gender,
            mental,
            physical,
            spiritual,
            max_health,
            current_health: max_health,
            inventory: Vec::new(),
            special_abilities: BTreeSet::new(),
            choices_made: BTreeMap::new(),
            favor: BTreeMap::new(),
            achievements: BTreeSet::new(),
        }
    }

    pub fn attribute(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Mental => self.mental,
            Attribute::Physical => self.physical,
            Attribute::Spiritual => self.spiritual,
        }
    }

    pub fn modify_attribute(&mut self, attribute: Attribute, amount: i32) {
        match attribute {
            Attribute::Mental => self.mental = self.mental.saturating_add(amount),
            Attribute::Physical => self.physical = self.physical.saturating_add(amount),
            Attribute::Spiritual => self.spiritual = self.spiritual.saturating_add(amount),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0
    }

    /// Apply a signed health change. Returns true while the player is alive.
    pub fn change_health(&mut self, delta: i32) -> bool {
        self.current_health = self
            .current_health
            .saturating_add(delta)
            .clamp(0, self.max_health.max(0));
        self.is_alive()
    }

    /// Heal up to `max_health`. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_health;
        self.change_health(amount.max(0));
        self.current_health - before
    }

    /// Lose health down to zero. Returns the amount actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.current_health;
        self.change_health(-amount.max(0));
        before - self.current_health
    }

    pub fn add_item(&mut self, item: impl Into<String>) {
        self.inventory.push(item.into());
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    pub fn add_ability(&mut self, ability: impl Into<String>) {
        self.special_abilities.insert(ability.into());
    }

    pub fn has_ability(&self, ability: &str) -> bool {
        self.special_abilities.contains(ability)
    }

    pub fn record_choice(&mut self, node: NodeId, choice_index: usize) {
        self.choices_made.insert(node, choice_index);
    }

    pub fn change_favor(&mut self, patron: impl Into<String>, amount: i32) {
        let favor = self.favor.entry(patron.into()).or_default();
        *favor = favor.saturating_add(amount);
    }

    pub fn favor(&self, patron: &str) -> i32 {
        self.favor.get(patron).copied().unwrap_or(0)
    }

    pub fn add_achievement(&mut self, achievement: impl Into<String>) {
        self.achievements.insert(achievement.into());
    }

    pub fn achievement_count(&self) -> usize {
        self.achievements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_and_gender_base_attributes() {
        let p = Player::new("Ada", CharacterClass::Scientist, Gender::Woman);
        assert_eq!((p.mental, p.physical, p.spiritual), (11, 5, 5));
        assert_eq!(p.max_health, 25);
        assert_eq!(p.current_health, 25);

        let p = Player::new("Bode", CharacterClass::Scientist, Gender::Man);
        assert_eq!((p.mental, p.physical, p.spiritual), (10, 7, 5));

        let p = Player::new("Ife", CharacterClass::Archaeologist, Gender::Woman);
        assert_eq!((p.mental, p.physical, p.spiritual), (8, 7, 7));

        let p = Player::new("Tunde", CharacterClass::Archaeologist, Gender::Man);
        assert_eq!((p.mental, p.physical, p.spiritual), (8, 8, 6));
        assert_eq!(p.max_health, 28);
    }

    #[test]
    fn health_is_clamped() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        assert_eq!(p.heal(10), 0);
        assert_eq!(p.current_health, p.max_health);

        assert_eq!(p.take_damage(5), 5);
        assert_eq!(p.heal(100), 5);

        assert_eq!(p.take_damage(1000), p.max_health);
        assert_eq!(p.current_health, 0);
        assert!(!p.is_alive());
        assert!(!p.change_health(-3));
        assert_eq!(p.current_health, 0);
    }

    #[test]
    fn negative_amounts_do_not_invert() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        p.take_damage(4);
        let hp = p.current_health;
        assert_eq!(p.heal(-3), 0);
        assert_eq!(p.take_damage(-3), 0);
        assert_eq!(p.current_health, hp);
    }

    #[test]
    fn attributes_move_freely() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        p.modify_attribute(Attribute::Spiritual, -9);
        assert_eq!(p.attribute(Attribute::Spiritual), -4);
        p.modify_attribute(Attribute::Mental, 2);
        assert_eq!(p.attribute(Attribute::Mental), 12);
    }

    #[test]
    fn inventory_keeps_duplicates_abilities_do_not() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        p.add_item("Herbs");
        p.add_item("Herbs");
        assert_eq!(p.inventory.len(), 2);
        assert!(p.has_item("Herbs"));
        assert!(!p.has_item("Sword"));

        p.add_ability("second sight");
        p.add_ability("second sight");
        assert_eq!(p.special_abilities.len(), 1);
        assert!(p.has_ability("second sight"));
    }

    #[test]
    fn abilities_serialize_in_sorted_order() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        p.add_ability("spirit walk");
        p.add_ability("animal tongue");
        p.add_ability("second sight");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json["special_abilities"],
            serde_json::json!(["animal tongue", "second sight", "spirit walk"])
        );
        let again: Player = serde_json::from_value(json).unwrap();
        assert_eq!(again, p);
    }

    #[test]
    fn attribute_changes_saturate() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        p.modify_attribute(Attribute::Spiritual, i32::MAX);
        p.modify_attribute(Attribute::Spiritual, 1);
        assert_eq!(p.spiritual, i32::MAX);
        p.modify_attribute(Attribute::Mental, i32::MIN);
        p.modify_attribute(Attribute::Mental, -1);
        assert_eq!(p.mental, i32::MIN);
        p.change_favor("Ogun", i32::MAX);
        p.change_favor("Ogun", 5);
        assert_eq!(p.favor("Ogun"), i32::MAX);
    }

    #[test]
    fn bookkeeping() {
        let mut p = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        p.record_choice(NodeId::from("gate"), 1);
        p.record_choice(NodeId::from("gate"), 0);
        assert_eq!(p.choices_made.get("gate"), Some(&0));

        p.change_favor("Ogun", 2);
        p.change_favor("Ogun", -1);
        assert_eq!(p.favor("Ogun"), 1);
        assert_eq!(p.favor("Oya"), 0);

        p.add_achievement("first blood");
        p.add_achievement("first blood");
        assert_eq!(p.achievement_count(), 1);
    }

    #[test]
    fn parse_labels() {
        assert_eq!(Attribute::parse("Spiritual"), Some(Attribute::Spiritual));
        assert_eq!(CharacterClass::parse("archaeologist"), Some(CharacterClass::Archaeologist));
        assert_eq!(Gender::parse("WOMAN"), Some(Gender::Woman));
        assert_eq!(Gender::parse("other"), None);
    }
}
