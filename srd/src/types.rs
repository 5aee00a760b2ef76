//! Record types for the SRD API.
//!
//! Shapes mirror the upstream JSON. The API omits fields freely, so anything
//! it may leave out carries a serde default and degrades to an empty value.

use serde::{Deserialize, Serialize};

/// A reference to another record: `{index, name, url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRef {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl ApiRef {
    pub fn new(index: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            name: name.into(),
            url: String::new(),
        }
    }
}

/// A list endpoint response: `{count, results}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiList<T> {
    #[serde(default)]
    pub count: usize,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Full class record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_hit_die")]
    pub hit_die: u8,
    #[serde(default)]
    pub proficiency_choices: Vec<ProficiencyChoice>,
    #[serde(default)]
    pub proficiencies: Vec<ApiRef>,
    #[serde(default)]
    pub saving_throws: Vec<ApiRef>,
    #[serde(default)]
    pub starting_equipment: Vec<StartingEquipment>,
    #[serde(default)]
    pub starting_equipment_options: Vec<EquipmentOptionGroup>,
    #[serde(default)]
    pub subclasses: Vec<ApiRef>,
    /// Present (as an object or a URL) only for spellcasting classes.
    #[serde(default)]
    pub spellcasting: Option<serde_json::Value>,
    #[serde(default)]
    pub spells: Option<serde_json::Value>,
}

impl ClassDetail {
    /// Whether this class gets a spell-selection step at level 1.
    pub fn has_spellcasting(&self) -> bool {
        self.spellcasting.is_some() || self.spells.is_some()
    }
}

fn default_hit_die() -> u8 {
    8
}

/// One fixed starting-equipment entry. Older dumps put the index at the top
/// level; current ones nest it under `equipment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingEquipment {
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub equipment: Option<ApiRef>,
    #[serde(default)]
    pub index: Option<String>,
}

impl StartingEquipment {
    pub fn item_index(&self) -> Option<&str> {
        self.index
            .as_deref()
            .or_else(|| self.equipment.as_ref().map(|e| e.index.as_str()))
    }
}

/// A proficiency choice group: "choose N from these options".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProficiencyChoice {
    #[serde(default)]
    pub desc: String,
    #[serde(default = "default_choose")]
    pub choose: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub from: OptionSet,
}

/// A "choose one" equipment group from `starting_equipment_options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentOptionGroup {
    #[serde(default)]
    pub desc: String,
    #[serde(default = "default_choose")]
    pub choose: u32,
    #[serde(default)]
    pub from: OptionSet,
}

fn default_choose() -> u32 {
    1
}

/// The `from` half of a choice: either explicit options or a whole category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptionSet {
    #[serde(default)]
    pub option_set_type: String,
    #[serde(default)]
    pub options: Vec<RawOption>,
    #[serde(default)]
    pub equipment_category: Option<ApiRef>,
}

/// One raw option. The API overloads this record across several
/// `option_type` shapes; only the fields for the matching shape are set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawOption {
    #[serde(default)]
    pub option_type: String,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub of: Option<ApiRef>,
    #[serde(default)]
    pub item: Option<ApiRef>,
    #[serde(default)]
    pub items: Vec<RawOption>,
    #[serde(default)]
    pub choice: Option<RawChoice>,
}

/// Nested choice inside a raw option (`option_type: "choice"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawChoice {
    #[serde(default)]
    pub choose: Option<u32>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub from: Option<OptionSet>,
}

/// One level of a class progression.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassLevel {
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub ability_score_bonuses: u8,
    #[serde(default)]
    pub prof_bonus: u8,
    #[serde(default)]
    pub features: Vec<ApiRef>,
    #[serde(default)]
    pub spellcasting: Option<LevelSpellcasting>,
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub url: String,
}

/// Spellcasting numbers attached to a class level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelSpellcasting {
    #[serde(default)]
    pub cantrips_known: Option<u32>,
    #[serde(default)]
    pub spells_known: Option<u32>,
    #[serde(default)]
    pub spell_slots_level_1: u32,
    #[serde(default)]
    pub spell_slots_level_2: u32,
    #[serde(default)]
    pub spell_slots_level_3: u32,
    #[serde(default)]
    pub spell_slots_level_4: u32,
    #[serde(default)]
    pub spell_slots_level_5: u32,
    #[serde(default)]
    pub spell_slots_level_6: u32,
    #[serde(default)]
    pub spell_slots_level_7: u32,
    #[serde(default)]
    pub spell_slots_level_8: u32,
    #[serde(default)]
    pub spell_slots_level_9: u32,
}

/// Full subclass record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubclassDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subclass_flavor: String,
    #[serde(default)]
    pub desc: Vec<String>,
    #[serde(default)]
    pub subclass_levels: String,
}

/// One level of a subclass progression.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubclassLevel {
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub features: Vec<ApiRef>,
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub url: String,
}

/// Full feature record. Missing descriptions default to an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub desc: Vec<String>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub class: Option<ApiRef>,
    #[serde(default)]
    pub subclass: Option<ApiRef>,
}

/// Full race record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub speed: u32,
    #[serde(default)]
    pub ability_bonuses: Vec<RaceAbilityBonus>,
    #[serde(default)]
    pub alignment: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub size_description: String,
    #[serde(default)]
    pub starting_proficiencies: Vec<ApiRef>,
    #[serde(default)]
    pub languages: Vec<ApiRef>,
    #[serde(default)]
    pub language_desc: String,
    #[serde(default)]
    pub traits: Vec<ApiRef>,
    #[serde(default)]
    pub subraces: Vec<ApiRef>,
}

/// A racial ability-score bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceAbilityBonus {
    pub ability_score: ApiRef,
    #[serde(default)]
    pub bonus: i8,
}

/// Entry in a per-class spell list (carries the spell level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSummary {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub url: String,
}

/// Full spell record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub school: Option<ApiRef>,
    #[serde(default)]
    pub concentration: bool,
    #[serde(default)]
    pub ritual: bool,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub casting_time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub desc: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ApiRef>,
}

/// Full skill record (indexed without the `skill-` proficiency prefix).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: Vec<String>,
    #[serde(default)]
    pub ability_score: Option<ApiRef>,
}

/// An equipment category with its member items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentCategory {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub equipment: Vec<ApiRef>,
}

/// Full proficiency record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProficiencyDetail {
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reference: Option<ApiRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_detail_tolerates_missing_fields() {
        let detail: ClassDetail = serde_json::from_value(json!({
            "index": "fighter",
            "name": "Fighter",
            "hit_die": 10
        }))
        .unwrap();

        assert_eq!(detail.hit_die, 10);
        assert!(detail.proficiency_choices.is_empty());
        assert!(detail.starting_equipment_options.is_empty());
        assert!(!detail.has_spellcasting());
    }

    #[test]
    fn spellcasting_presence_marks_casters() {
        let detail: ClassDetail = serde_json::from_value(json!({
            "index": "wizard",
            "hit_die": 6,
            "spellcasting": {"level": 1}
        }))
        .unwrap();

        assert!(detail.has_spellcasting());
    }

    #[test]
    fn starting_equipment_index_falls_back_to_nested_ref() {
        let flat: StartingEquipment =
            serde_json::from_value(json!({"index": "rations", "quantity": 10})).unwrap();
        let nested: StartingEquipment = serde_json::from_value(json!({
            "equipment": {"index": "longsword", "name": "Longsword", "url": ""},
            "quantity": 1
        }))
        .unwrap();

        assert_eq!(flat.item_index(), Some("rations"));
        assert_eq!(nested.item_index(), Some("longsword"));
    }

    #[test]
    fn class_level_parses_spellcasting_numbers() {
        let level: ClassLevel = serde_json::from_value(json!({
            "level": 2,
            "ability_score_bonuses": 0,
            "prof_bonus": 2,
            "features": [],
            "spellcasting": {
                "cantrips_known": 3,
                "spells_known": 3,
                "spell_slots_level_1": 3
            }
        }))
        .unwrap();

        let sc = level.spellcasting.unwrap();
        assert_eq!(sc.cantrips_known, Some(3));
        assert_eq!(sc.spell_slots_level_1, 3);
        assert_eq!(sc.spell_slots_level_2, 0);
    }
}
