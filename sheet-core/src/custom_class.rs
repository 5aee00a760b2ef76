//! Homebrew class definitions with a level-by-level progression.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use srd::types::{ApiRef, ClassLevel, LevelSpellcasting};

use crate::progression::{proficiency_bonus, ASI_LEVELS};

/// Hit dice a custom class may use.
pub const CUSTOM_HIT_DICE: [u8; 4] = [6, 8, 10, 12];

/// Spellcasting numbers for one custom-class level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSpellcasting {
    #[serde(default)]
    pub cantrips_known: Option<u32>,
    #[serde(default)]
    pub spells_known: Option<u32>,
    /// Slots per spell level, first entry is 1st-level slots.
    #[serde(default)]
    pub spell_slots: Vec<u32>,
}

/// One level of a custom-class progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomClassLevel {
    pub level: u8,
    /// 1 when this level grants an ability score improvement.
    #[serde(default)]
    pub ability_score_bonuses: u8,
    #[serde(default)]
    pub prof_bonus: u8,
    #[serde(default)]
    pub feature_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spellcasting: Option<CustomSpellcasting>,
}

/// A feature defined on a custom class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomClassFeature {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level: u8,
}

/// A subclass attached to a custom class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSubclass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub levels: Vec<CustomSubclassLevel>,
    #[serde(default)]
    pub features: Vec<CustomClassFeature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSubclassLevel {
    pub level: u8,
    #[serde(default)]
    pub feature_ids: Vec<String>,
}

/// A skill/proficiency choice group on a custom class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProficiencyChoice {
    #[serde(default)]
    pub desc: String,
    pub choose: u32,
    /// Skill proficiency indices (`skill-*`) or other proficiency indices.
    #[serde(default)]
    pub options: Vec<String>,
}

/// A homebrew class: fixed hit die, proficiency choices, twenty levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomClass {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub hit_die: u8,
    #[serde(default)]
    pub saving_throws: Vec<String>,
    #[serde(default)]
    pub proficiency_choices: Vec<CustomProficiencyChoice>,
    #[serde(default)]
    pub proficiencies: Vec<String>,
    #[serde(default)]
    pub levels: Vec<CustomClassLevel>,
    #[serde(default)]
    pub features: Vec<CustomClassFeature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclasses: Vec<CustomSubclass>,
    /// Level at which the class gains spellcasting; `None` for non-casters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spellcasting_by_level: Option<u8>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl CustomClass {
    /// A blank class with the full 1-20 progression scaffolded: ASI at the
    /// standard levels, proficiency bonus per the usual formula.
    pub fn blank() -> Self {
        let now = Utc::now();
        let levels = (1..=20)
            .map(|level| CustomClassLevel {
                level,
                ability_score_bonuses: u8::from(ASI_LEVELS.contains(&level)),
                prof_bonus: proficiency_bonus(level),
                feature_ids: Vec::new(),
                feature_names: Vec::new(),
                spellcasting: None,
            })
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            hit_die: 8,
            saving_throws: Vec::new(),
            proficiency_choices: Vec::new(),
            proficiencies: Vec::new(),
            levels,
            features: Vec::new(),
            subclasses: Vec::new(),
            spellcasting_by_level: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn feature(&self, id: &str) -> Option<&CustomClassFeature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Whether the class casts spells starting at level 1.
    pub fn casts_at_level_one(&self) -> bool {
        self.spellcasting_by_level == Some(1)
    }

    /// Project the custom progression onto the API `ClassLevel` shape so the
    /// level-up workflow can treat API and homebrew classes uniformly.
    pub fn class_levels(&self) -> Vec<ClassLevel> {
        self.levels
            .iter()
            .map(|l| ClassLevel {
                level: l.level,
                ability_score_bonuses: l.ability_score_bonuses,
                prof_bonus: l.prof_bonus,
                features: l
                    .feature_ids
                    .iter()
                    .map(|id| {
                        let name = self
                            .feature(id)
                            .map(|f| f.name.clone())
                            .unwrap_or_else(|| id.clone());
                        ApiRef::new(id.clone(), name)
                    })
                    .collect(),
                spellcasting: l.spellcasting.as_ref().map(|sc| LevelSpellcasting {
                    cantrips_known: sc.cantrips_known,
                    spells_known: sc.spells_known,
                    spell_slots_level_1: sc.spell_slots.first().copied().unwrap_or(0),
                    spell_slots_level_2: sc.spell_slots.get(1).copied().unwrap_or(0),
                    spell_slots_level_3: sc.spell_slots.get(2).copied().unwrap_or(0),
                    spell_slots_level_4: sc.spell_slots.get(3).copied().unwrap_or(0),
                    spell_slots_level_5: sc.spell_slots.get(4).copied().unwrap_or(0),
                    spell_slots_level_6: sc.spell_slots.get(5).copied().unwrap_or(0),
                    spell_slots_level_7: sc.spell_slots.get(6).copied().unwrap_or(0),
                    spell_slots_level_8: sc.spell_slots.get(7).copied().unwrap_or(0),
                    spell_slots_level_9: sc.spell_slots.get(8).copied().unwrap_or(0),
                }),
                index: format!("custom-{}", l.level),
                url: String::new(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_progression_covers_twenty_levels() {
        let class = CustomClass::blank();
        assert_eq!(class.levels.len(), 20);
        assert_eq!(class.hit_die, 8);

        for (i, level) in class.levels.iter().enumerate() {
            assert_eq!(level.level, (i + 1) as u8);
            assert_eq!(level.prof_bonus, proficiency_bonus(level.level));
        }

        let asi_levels: Vec<u8> = class
            .levels
            .iter()
            .filter(|l| l.ability_score_bonuses > 0)
            .map(|l| l.level)
            .collect();
        assert_eq!(asi_levels, ASI_LEVELS.to_vec());
    }

    #[test]
    fn test_class_levels_projection_resolves_feature_names() {
        let mut class = CustomClass::blank();
        class.features.push(CustomClassFeature {
            id: "feat-1".to_string(),
            name: "Battle Trance".to_string(),
            description: String::new(),
            level: 2,
        });
        class.levels[1].feature_ids = vec!["feat-1".to_string(), "missing".to_string()];

        let levels = class.class_levels();
        let level2 = &levels[1];
        assert_eq!(level2.features.len(), 2);
        assert_eq!(level2.features[0].name, "Battle Trance");
        // Unknown ids fall back to the id itself as the display name.
        assert_eq!(level2.features[1].name, "missing");
        assert_eq!(level2.index, "custom-2");
    }

    #[test]
    fn test_spell_slot_projection() {
        let mut class = CustomClass::blank();
        class.spellcasting_by_level = Some(1);
        class.levels[0].spellcasting = Some(CustomSpellcasting {
            cantrips_known: Some(2),
            spells_known: Some(4),
            spell_slots: vec![2],
        });

        let levels = class.class_levels();
        let sc = levels[0].spellcasting.unwrap();
        assert_eq!(sc.cantrips_known, Some(2));
        assert_eq!(sc.spell_slots_level_1, 2);
        assert_eq!(sc.spell_slots_level_2, 0);
        assert!(class.casts_at_level_one());
    }
}
