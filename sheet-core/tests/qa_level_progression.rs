//! QA tests for the level-up workflow: walk a character from level 1 to 5
//! the way the UI drives it and check every intermediate state.

use sheet_core::character::{AbilityKey, Character, ClassChoice, ClassSource};
use sheet_core::progression::{
    improvements_from_selection, proficiency_bonus, LevelUpError, LevelUpSnapshot,
};
use sheet_core::store::{CharacterStore, MemoryStorage};

fn fresh_fighter() -> Character {
    let mut character = Character::blank();
    character.name = "Bruenor".to_string();
    character.class = Some(ClassChoice {
        source: ClassSource::Api,
        index: "fighter".to_string(),
        name: "Fighter".to_string(),
    });
    // d10 fighter with CON 14: 10 + 2.
    character.max_hp = 12;
    character.current_hp = 12;
    character.hit_dice = "1d10".to_string();
    character
}

#[test]
fn fighter_reaches_level_five() {
    let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
    store.replace_character(fresh_fighter());

    // Levels 2 and 3: hit points only, plus granted features.
    for (level, hp, feature) in [(2u8, 8, "action-surge-1-use"), (3, 7, "martial-archetype")] {
        let mut snapshot = LevelUpSnapshot::new(level, hp);
        snapshot.features_granted = vec![feature.to_string()];
        store.apply_level_up(snapshot).unwrap();
        assert_eq!(store.character().level, level);
    }
    assert_eq!(store.character().max_hp, 27);
    assert_eq!(store.character().current_hp, 27);
    assert_eq!(store.character().proficiency_bonus, 2);

    // Level 4: the ASI level. +2 STR via a single selection.
    let mut fourth = LevelUpSnapshot::new(4, 6);
    fourth.ability_score_improvements = improvements_from_selection(&[AbilityKey::Str]);
    fourth.features_granted = vec!["ability-score-improvement-1".to_string()];
    store.apply_level_up(fourth).unwrap();

    assert_eq!(store.character().ability_scores.strength, 17);
    assert_eq!(store.character().max_hp, 33);

    // Level 5: proficiency bonus ticks up to +3.
    store.apply_level_up(LevelUpSnapshot::new(5, 9)).unwrap();
    let character = store.character();
    assert_eq!(character.level, 5);
    assert_eq!(character.proficiency_bonus, 3);
    assert_eq!(character.max_hp, 42);
    assert_eq!(character.current_hp, 42);
    assert_eq!(character.level_up_history.len(), 4);

    // History kept the snapshots in order and untouched.
    let levels: Vec<u8> = character.level_up_history.iter().map(|s| s.level).collect();
    assert_eq!(levels, vec![2, 3, 4, 5]);
    assert_eq!(character.level_up_history[2].hp_gained, 6);
}

#[test]
fn caster_accumulates_spells_across_levels() {
    let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
    let mut wizard = Character::blank();
    wizard.class = Some(ClassChoice {
        source: ClassSource::Api,
        index: "wizard".to_string(),
        name: "Wizard".to_string(),
    });
    wizard.max_hp = 8;
    wizard.current_hp = 8;
    wizard.cantrips_known = vec!["fire-bolt".to_string()];
    wizard.spells_known = vec!["magic-missile".to_string(), "shield".to_string()];
    store.replace_character(wizard);

    let mut second = LevelUpSnapshot::new(2, 5);
    second.spells_known = vec!["misty-step".to_string()];
    second.spells_prepared = vec!["misty-step".to_string()];
    store.apply_level_up(second).unwrap();

    let mut third = LevelUpSnapshot::new(3, 4);
    third.cantrips_known = vec!["light".to_string()];
    store.apply_level_up(third).unwrap();

    let character = store.character();
    assert_eq!(
        character.spells_known,
        vec!["magic-missile", "shield", "misty-step"]
    );
    assert_eq!(character.cantrips_known, vec!["fire-bolt", "light"]);
    assert_eq!(character.spells_prepared, vec!["misty-step"]);
}

#[test]
fn two_way_split_raises_both_abilities() {
    let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
    let mut character = fresh_fighter();
    character.level = 3;
    store.replace_character(character);

    let mut snapshot = LevelUpSnapshot::new(4, 6);
    snapshot.ability_score_improvements =
        improvements_from_selection(&[AbilityKey::Dex, AbilityKey::Wis]);
    store.apply_level_up(snapshot).unwrap();

    assert_eq!(store.character().ability_scores.dexterity, 15);
    assert_eq!(store.character().ability_scores.wisdom, 11);
}

#[test]
fn out_of_order_snapshots_never_corrupt_state() {
    let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
    store.replace_character(fresh_fighter());

    // Skipping ahead fails.
    assert_eq!(
        store.apply_level_up(LevelUpSnapshot::new(3, 7)),
        Err(LevelUpError::NonContiguous {
            expected: 2,
            got: 3
        })
    );

    // Re-applying the current level fails.
    assert_eq!(
        store.apply_level_up(LevelUpSnapshot::new(1, 10)),
        Err(LevelUpError::NonContiguous {
            expected: 2,
            got: 1
        })
    );

    let character = store.character();
    assert_eq!(character.level, 1);
    assert_eq!(character.max_hp, 12);
    assert!(character.level_up_history.is_empty());
}

#[test]
fn proficiency_formula_matches_across_a_career() {
    let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
    store.replace_character(fresh_fighter());

    for level in 2..=20u8 {
        store.apply_level_up(LevelUpSnapshot::new(level, 6)).unwrap();
        assert_eq!(
            store.character().proficiency_bonus,
            proficiency_bonus(level),
            "level {level}"
        );
    }
    assert_eq!(store.character().proficiency_bonus, 6);
}
