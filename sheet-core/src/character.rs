//! Character sheet types.
//!
//! The serialized shape (camelCase keys, lowercase ability keys) is the
//! interchange format for exported sheet files, so renames here are
//! load-bearing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::progression::LevelUpSnapshot;

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityKey {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl AbilityKey {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            AbilityKey::Str => "STR",
            AbilityKey::Dex => "DEX",
            AbilityKey::Con => "CON",
            AbilityKey::Int => "INT",
            AbilityKey::Wis => "WIS",
            AbilityKey::Cha => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AbilityKey::Str => "Strength",
            AbilityKey::Dex => "Dexterity",
            AbilityKey::Con => "Constitution",
            AbilityKey::Int => "Intelligence",
            AbilityKey::Wis => "Wisdom",
            AbilityKey::Cha => "Charisma",
        }
    }

    /// The SRD ability-score index (`str`, `dex`, ...).
    pub fn index(&self) -> &'static str {
        match self {
            AbilityKey::Str => "str",
            AbilityKey::Dex => "dex",
            AbilityKey::Con => "con",
            AbilityKey::Int => "int",
            AbilityKey::Wis => "wis",
            AbilityKey::Cha => "cha",
        }
    }

    pub fn from_index(index: &str) -> Option<AbilityKey> {
        match index {
            "str" => Some(AbilityKey::Str),
            "dex" => Some(AbilityKey::Dex),
            "con" => Some(AbilityKey::Con),
            "int" => Some(AbilityKey::Int),
            "wis" => Some(AbilityKey::Wis),
            "cha" => Some(AbilityKey::Cha),
            _ => None,
        }
    }

    pub fn all() -> [AbilityKey; 6] {
        [
            AbilityKey::Str,
            AbilityKey::Dex,
            AbilityKey::Con,
            AbilityKey::Int,
            AbilityKey::Wis,
            AbilityKey::Cha,
        ]
    }
}

impl fmt::Display for AbilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Standard array for ability assignment: each value used exactly once.
pub const STANDARD_ABILITY_ARRAY: [u8; 6] = [15, 14, 13, 12, 10, 8];

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(rename = "str")]
    pub strength: u8,
    #[serde(rename = "dex")]
    pub dexterity: u8,
    #[serde(rename = "con")]
    pub constitution: u8,
    #[serde(rename = "int")]
    pub intelligence: u8,
    #[serde(rename = "wis")]
    pub wisdom: u8,
    #[serde(rename = "cha")]
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    /// The standard array in its default order.
    pub fn standard_array() -> Self {
        Self::new(15, 14, 13, 12, 10, 8)
    }

    pub fn get(&self, ability: AbilityKey) -> u8 {
        match ability {
            AbilityKey::Str => self.strength,
            AbilityKey::Dex => self.dexterity,
            AbilityKey::Con => self.constitution,
            AbilityKey::Int => self.intelligence,
            AbilityKey::Wis => self.wisdom,
            AbilityKey::Cha => self.charisma,
        }
    }

    pub fn set(&mut self, ability: AbilityKey, value: u8) {
        match ability {
            AbilityKey::Str => self.strength = value,
            AbilityKey::Dex => self.dexterity = value,
            AbilityKey::Con => self.constitution = value,
            AbilityKey::Int => self.intelligence = value,
            AbilityKey::Wis => self.wisdom = value,
            AbilityKey::Cha => self.charisma = value,
        }
    }

    /// D&D 5e modifier: floor((score - 10) / 2), correct for scores below 10.
    pub fn modifier(&self, ability: AbilityKey) -> i8 {
        let score = self.get(ability) as i8;
        (score - 10).div_euclid(2)
    }

    /// Assign `value` to `ability`; if another ability already holds `value`,
    /// the two trade so no value is ever duplicated across the six scores.
    pub fn assign(&mut self, ability: AbilityKey, value: u8) {
        let old = self.get(ability);
        if old == value {
            return;
        }
        let holder = AbilityKey::all()
            .into_iter()
            .find(|k| *k != ability && self.get(*k) == value);
        if let Some(other) = holder {
            self.set(other, old);
        }
        self.set(ability, value);
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// Where a class definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassSource {
    /// An SRD API class, `index` is the API index.
    Api,
    /// A homebrew class, `index` is the custom-class id.
    Custom,
}

/// The character's chosen class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassChoice {
    #[serde(rename = "type")]
    pub source: ClassSource,
    pub index: String,
    pub name: String,
}

impl ClassChoice {
    pub fn is_custom(&self) -> bool {
        self.source == ClassSource::Custom
    }
}

/// The character's chosen race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceChoice {
    pub index: String,
    pub name: String,
}

/// The character's chosen subclass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubclassChoice {
    pub index: String,
    pub name: String,
}

/// A character sheet.
///
/// Only `level` and `abilityScores` are required on deserialize; partial
/// documents (including files written by other tools) import with defaults
/// for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub player_name: String,

    #[serde(default)]
    pub race: Option<RaceChoice>,
    #[serde(default)]
    pub class: Option<ClassChoice>,
    #[serde(default)]
    pub subclass: Option<SubclassChoice>,

    pub level: u8,
    pub ability_scores: AbilityScores,
    #[serde(default = "default_proficiency_bonus")]
    pub proficiency_bonus: u8,

    #[serde(default)]
    pub max_hp: i32,
    #[serde(default)]
    pub current_hp: i32,
    /// Total hit dice, e.g. `"5d10"`.
    #[serde(default)]
    pub hit_dice: String,
    #[serde(default)]
    pub hit_dice_used: u8,

    /// Proficiency indices, skills carry the `skill-` prefix.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Weapon, armor and tool proficiencies.
    #[serde(default)]
    pub other_proficiencies: Vec<String>,

    #[serde(default)]
    pub spells_known: Vec<String>,
    #[serde(default)]
    pub spells_prepared: Vec<String>,
    #[serde(default)]
    pub cantrips_known: Vec<String>,

    /// Equipment indices; duplicates encode quantity.
    #[serde(default)]
    pub equipment: Vec<String>,

    #[serde(default)]
    pub level_up_history: Vec<LevelUpSnapshot>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_proficiency_bonus() -> u8 {
    2
}

impl Character {
    /// A fresh level-1 character with the standard array pre-assigned.
    pub fn blank() -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: String::new(),
            player_name: String::new(),
            race: None,
            class: None,
            subclass: None,
            level: 1,
            ability_scores: AbilityScores::standard_array(),
            proficiency_bonus: 2,
            max_hp: 0,
            current_hp: 0,
            hit_dice: String::new(),
            hit_dice_used: 0,
            skills: Vec::new(),
            other_proficiencies: Vec::new(),
            spells_known: Vec::new(),
            spells_prepared: Vec::new(),
            cantrips_known: Vec::new(),
            equipment: Vec::new(),
            level_up_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A level-5 wizard with spells, for exercising the sheet and the
    /// level-up workflow without building a character first.
    pub fn demo() -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: "Merlin (demo)".to_string(),
            player_name: "You".to_string(),
            race: Some(RaceChoice {
                index: "human".to_string(),
                name: "Human".to_string(),
            }),
            class: Some(ClassChoice {
                source: ClassSource::Api,
                index: "wizard".to_string(),
                name: "Wizard".to_string(),
            }),
            subclass: Some(SubclassChoice {
                index: "evocation".to_string(),
                name: "Evocation".to_string(),
            }),
            level: 5,
            ability_scores: AbilityScores::new(8, 14, 13, 15, 12, 10),
            proficiency_bonus: 3,
            max_hp: 27,
            current_hp: 27,
            hit_dice: "5d6".to_string(),
            hit_dice_used: 0,
            skills: vec![
                "skill-arcana".to_string(),
                "skill-history".to_string(),
                "skill-insight".to_string(),
                "skill-investigation".to_string(),
            ],
            other_proficiencies: vec![
                "daggers".to_string(),
                "darts".to_string(),
                "slings".to_string(),
                "quarterstaffs".to_string(),
                "light-crossbows".to_string(),
            ],
            spells_known: vec![
                "magic-missile".to_string(),
                "shield".to_string(),
                "mage-armor".to_string(),
                "detect-magic".to_string(),
                "identify".to_string(),
                "sleep".to_string(),
                "misty-step".to_string(),
                "scorching-ray".to_string(),
                "hold-person".to_string(),
                "fireball".to_string(),
                "counterspell".to_string(),
            ],
            spells_prepared: vec![
                "magic-missile".to_string(),
                "shield".to_string(),
                "mage-armor".to_string(),
                "misty-step".to_string(),
                "fireball".to_string(),
                "counterspell".to_string(),
            ],
            cantrips_known: vec![
                "fire-bolt".to_string(),
                "light".to_string(),
                "mage-hand".to_string(),
                "prestidigitation".to_string(),
            ],
            equipment: vec![
                "quarterstaff".to_string(),
                "component-pouch".to_string(),
                "spellbook".to_string(),
                "dagger".to_string(),
            ],
            level_up_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether anything has been filled in yet.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.class.is_none()
    }

    /// Stamp the last-modified time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Set current HP, clamped to `0..=max_hp`.
    pub fn set_current_hp(&mut self, value: i32) {
        self.current_hp = value.clamp(0, self.max_hp);
    }

    /// Whether the character is proficient in a skill, tolerating both the
    /// bare skill index and the `skill-` proficiency index.
    pub fn has_skill(&self, skill_index: &str) -> bool {
        let prefixed = format!("skill-{skill_index}");
        self.skills
            .iter()
            .any(|s| s == skill_index || *s == prefixed)
    }

    /// Equipment grouped by index with quantities, sorted by index.
    pub fn equipment_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.equipment {
            *counts.entry(item.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn add_equipment(&mut self, index: impl Into<String>) {
        self.equipment.push(index.into());
    }

    /// Remove one unit of an item; the remaining duplicates stay.
    pub fn remove_equipment_one(&mut self, index: &str) {
        if let Some(pos) = self.equipment.iter().position(|e| e == index) {
            self.equipment.remove(pos);
        }
    }

    pub fn initiative_modifier(&self) -> i8 {
        self.ability_scores.modifier(AbilityKey::Dex)
    }
}

/// Turn an SRD index into a display label: `skill-sleight-of-hand` →
/// `Sleight Of Hand`.
pub fn label_from_index(index: &str) -> String {
    index
        .trim_start_matches("skill-")
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_arithmetic() {
        let scores = AbilityScores::new(8, 10, 13, 15, 20, 1);
        assert_eq!(scores.modifier(AbilityKey::Str), -1);
        assert_eq!(scores.modifier(AbilityKey::Dex), 0);
        assert_eq!(scores.modifier(AbilityKey::Con), 1);
        assert_eq!(scores.modifier(AbilityKey::Int), 2);
        assert_eq!(scores.modifier(AbilityKey::Wis), 5);
        assert_eq!(scores.modifier(AbilityKey::Cha), -5);
    }

    #[test]
    fn test_assign_swaps_duplicate_values() {
        let mut scores = AbilityScores::standard_array();
        // STR holds 15, DEX holds 14. Assigning 14 to STR must hand 15 to DEX.
        scores.assign(AbilityKey::Str, 14);
        assert_eq!(scores.strength, 14);
        assert_eq!(scores.dexterity, 15);

        // No value appears twice afterwards.
        let mut values: Vec<u8> = AbilityKey::all().iter().map(|k| scores.get(*k)).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn test_assign_same_value_is_noop() {
        let mut scores = AbilityScores::standard_array();
        let before = scores.clone();
        scores.assign(AbilityKey::Str, 15);
        assert_eq!(scores, before);
    }

    #[test]
    fn test_blank_character() {
        let character = Character::blank();
        assert_eq!(character.level, 1);
        assert_eq!(character.proficiency_bonus, 2);
        assert_eq!(character.ability_scores, AbilityScores::standard_array());
        assert!(character.is_blank());
    }

    #[test]
    fn test_current_hp_is_clamped() {
        let mut character = Character::blank();
        character.max_hp = 12;
        character.set_current_hp(20);
        assert_eq!(character.current_hp, 12);
        character.set_current_hp(-3);
        assert_eq!(character.current_hp, 0);
    }

    #[test]
    fn test_has_skill_tolerates_prefix() {
        let mut character = Character::blank();
        character.skills.push("skill-arcana".to_string());
        assert!(character.has_skill("arcana"));
        assert!(character.has_skill("skill-arcana"));
        assert!(!character.has_skill("stealth"));
    }

    #[test]
    fn test_equipment_quantities() {
        let mut character = Character::blank();
        character.add_equipment("dagger");
        character.add_equipment("dagger");
        character.add_equipment("rope");

        let counts = character.equipment_counts();
        assert_eq!(counts.get("dagger"), Some(&2));
        assert_eq!(counts.get("rope"), Some(&1));

        character.remove_equipment_one("dagger");
        assert_eq!(character.equipment_counts().get("dagger"), Some(&1));
        character.remove_equipment_one("dagger");
        assert_eq!(character.equipment_counts().get("dagger"), None);
    }

    #[test]
    fn test_wire_format_uses_camel_case_keys() {
        let character = Character::blank();
        let value = serde_json::to_value(&character).unwrap();
        assert!(value.get("abilityScores").is_some());
        assert!(value.get("levelUpHistory").is_some());
        assert!(value["abilityScores"].get("str").is_some());
        assert!(value.get("ability_scores").is_none());
    }

    #[test]
    fn test_label_from_index() {
        assert_eq!(label_from_index("skill-animal-handling"), "Animal Handling");
        assert_eq!(label_from_index("longsword"), "Longsword");
    }
}
