//! Level progression: snapshots, the level-up reducer and its arithmetic.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::{AbilityKey, Character};

/// Class levels that grant an ability score improvement.
pub const ASI_LEVELS: [u8; 8] = [4, 6, 8, 10, 12, 14, 16, 19];

/// Proficiency bonus at a given character level: `ceil(level / 4) + 1`.
pub fn proficiency_bonus(level: u8) -> u8 {
    (level + 3) / 4 + 1
}

/// A single ability increase inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScoreImprovement {
    pub ability: AbilityKey,
    pub amount: u8,
}

/// The delta applied at one level transition. Immutable once appended to a
/// character's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpSnapshot {
    pub level: u8,
    /// Rolled or fixed hit points, CON modifier already included.
    pub hp_gained: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ability_score_improvements: Vec<AbilityScoreImprovement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cantrips_known: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spells_known: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spells_prepared: Vec<String>,
    #[serde(default)]
    pub features_granted: Vec<String>,
}

impl LevelUpSnapshot {
    pub fn new(level: u8, hp_gained: i32) -> Self {
        Self {
            level,
            hp_gained,
            ability_score_improvements: Vec::new(),
            cantrips_known: Vec::new(),
            spells_known: Vec::new(),
            spells_prepared: Vec::new(),
            features_granted: Vec::new(),
        }
    }
}

/// Errors from applying a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelUpError {
    /// Snapshots must be applied in strictly increasing, contiguous order.
    /// A skipped or duplicate level is an error, not a silent merge.
    #[error("snapshot is for level {got}, expected level {expected}")]
    NonContiguous { expected: u8, got: u8 },
}

/// Split a set of chosen abilities into improvements: one ability gets +2,
/// two abilities get +1 each, anything else grants nothing.
pub fn improvements_from_selection(selected: &[AbilityKey]) -> Vec<AbilityScoreImprovement> {
    match selected {
        [ability] => vec![AbilityScoreImprovement {
            ability: *ability,
            amount: 2,
        }],
        [first, second] => vec![
            AbilityScoreImprovement {
                ability: *first,
                amount: 1,
            },
            AbilityScoreImprovement {
                ability: *second,
                amount: 1,
            },
        ],
        _ => Vec::new(),
    }
}

/// Apply one level-up snapshot to a character.
///
/// Rejects snapshots that are not for exactly `character.level + 1` and
/// leaves the character untouched in that case. On success the snapshot is
/// appended to the character's history. There is no rollback; correcting a
/// mistake means restoring from an exported backup.
pub fn apply_snapshot(
    character: &mut Character,
    snapshot: LevelUpSnapshot,
) -> Result<(), LevelUpError> {
    let expected = character.level + 1;
    if snapshot.level != expected {
        return Err(LevelUpError::NonContiguous {
            expected,
            got: snapshot.level,
        });
    }

    character.level = snapshot.level;
    character.max_hp += snapshot.hp_gained;
    character.current_hp += snapshot.hp_gained;

    for improvement in &snapshot.ability_score_improvements {
        let current = character.ability_scores.get(improvement.ability);
        character
            .ability_scores
            .set(improvement.ability, current + improvement.amount);
    }

    character.proficiency_bonus = proficiency_bonus(character.level);

    character
        .cantrips_known
        .extend(snapshot.cantrips_known.iter().cloned());
    character
        .spells_known
        .extend(snapshot.spells_known.iter().cloned());
    character
        .spells_prepared
        .extend(snapshot.spells_prepared.iter().cloned());

    character.level_up_history.push(snapshot);
    character.touch();
    Ok(())
}

/// Roll one hit die.
pub fn roll_hit_die(sides: u8) -> u8 {
    rand::thread_rng().gen_range(1..=sides.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::AbilityScores;

    fn leveled(level: u8) -> Character {
        let mut character = Character::blank();
        character.level = level;
        character.proficiency_bonus = proficiency_bonus(level);
        character.max_hp = 10;
        character.current_hp = 10;
        character
    }

    #[test]
    fn test_proficiency_bonus_table() {
        let expected = [
            (1, 2),
            (2, 2),
            (3, 2),
            (4, 2),
            (5, 3),
            (8, 3),
            (9, 4),
            (12, 4),
            (13, 5),
            (16, 5),
            (17, 6),
            (20, 6),
        ];
        for (level, bonus) in expected {
            assert_eq!(proficiency_bonus(level), bonus, "level {level}");
        }
        // Matches ceil(level / 4) + 1 across the full range.
        for level in 1..=20u8 {
            let ceil = (f64::from(level) / 4.0).ceil() as u8;
            assert_eq!(proficiency_bonus(level), ceil + 1);
        }
    }

    #[test]
    fn test_improvement_split() {
        assert!(improvements_from_selection(&[]).is_empty());

        let single = improvements_from_selection(&[AbilityKey::Str]);
        assert_eq!(
            single,
            vec![AbilityScoreImprovement {
                ability: AbilityKey::Str,
                amount: 2
            }]
        );

        let double = improvements_from_selection(&[AbilityKey::Dex, AbilityKey::Wis]);
        assert_eq!(double.len(), 2);
        assert!(double.iter().all(|i| i.amount == 1));
        assert_eq!(double[0].ability, AbilityKey::Dex);
        assert_eq!(double[1].ability, AbilityKey::Wis);
    }

    #[test]
    fn test_apply_snapshot_updates_all_pools() {
        let mut character = leveled(3);
        character.ability_scores = AbilityScores::new(15, 14, 13, 12, 10, 8);

        let mut snapshot = LevelUpSnapshot::new(4, 7);
        snapshot.ability_score_improvements = improvements_from_selection(&[AbilityKey::Str]);
        snapshot.features_granted = vec!["ability-score-improvement-4".to_string()];

        apply_snapshot(&mut character, snapshot).unwrap();

        assert_eq!(character.level, 4);
        assert_eq!(character.max_hp, 17);
        assert_eq!(character.current_hp, 17);
        assert_eq!(character.ability_scores.strength, 17);
        assert_eq!(character.proficiency_bonus, 2);
        assert_eq!(character.level_up_history.len(), 1);
    }

    #[test]
    fn test_apply_snapshot_recomputes_proficiency() {
        let mut character = leveled(4);
        apply_snapshot(&mut character, LevelUpSnapshot::new(5, 6)).unwrap();
        assert_eq!(character.proficiency_bonus, 3);
    }

    #[test]
    fn test_apply_snapshot_appends_spells() {
        let mut character = leveled(1);
        character.cantrips_known = vec!["fire-bolt".to_string()];

        let mut snapshot = LevelUpSnapshot::new(2, 5);
        snapshot.cantrips_known = vec!["light".to_string()];
        snapshot.spells_known = vec!["misty-step".to_string()];

        apply_snapshot(&mut character, snapshot).unwrap();

        assert_eq!(character.cantrips_known, vec!["fire-bolt", "light"]);
        assert_eq!(character.spells_known, vec!["misty-step"]);
    }

    #[test]
    fn test_skipped_level_is_rejected() {
        let mut character = leveled(3);
        let before = character.clone();

        let err = apply_snapshot(&mut character, LevelUpSnapshot::new(6, 7)).unwrap_err();
        assert_eq!(err, LevelUpError::NonContiguous { expected: 4, got: 6 });
        assert_eq!(character, before);
    }

    #[test]
    fn test_duplicate_level_is_rejected() {
        let mut character = leveled(3);
        apply_snapshot(&mut character, LevelUpSnapshot::new(4, 5)).unwrap();

        let err = apply_snapshot(&mut character, LevelUpSnapshot::new(4, 5)).unwrap_err();
        assert_eq!(err, LevelUpError::NonContiguous { expected: 5, got: 4 });
        assert_eq!(character.level, 4);
        assert_eq!(character.level_up_history.len(), 1);
    }

    #[test]
    fn test_roll_hit_die_stays_in_range() {
        for _ in 0..100 {
            let roll = roll_hit_die(8);
            assert!((1..=8).contains(&roll));
        }
    }
}
