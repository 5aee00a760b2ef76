//! QA tests for on-disk persistence: two JSON documents under a data
//! directory, rewritten in full on every mutation, read once at startup.

use tempfile::TempDir;

use sheet_core::character::Character;
use sheet_core::custom_class::CustomClass;
use sheet_core::progression::LevelUpSnapshot;
use sheet_core::store::{CharacterStore, DirStorage};

fn dir_store(dir: &TempDir) -> CharacterStore {
    CharacterStore::load(Box::new(DirStorage::new(dir.path())))
}

#[test]
fn character_survives_a_restart() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let mut store = dir_store(&dir);
        store.replace_character(Character::demo());
        store.apply_level_up(LevelUpSnapshot::new(6, 5)).unwrap();
    }

    let reloaded = dir_store(&dir);
    assert_eq!(reloaded.character().name, "Merlin (demo)");
    assert_eq!(reloaded.character().level, 6);
    assert_eq!(reloaded.character().max_hp, 32);
    assert_eq!(reloaded.character().level_up_history.len(), 1);
}

#[test]
fn documents_are_independent() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let mut store = dir_store(&dir);
        let mut class = CustomClass::blank();
        class.name = "Spellblade".to_string();
        class.hit_die = 10;
        store.save_custom_class(class);
    }

    assert!(dir.path().join("custom-classes.json").exists());

    // Corrupting the character document must not take the classes with it.
    std::fs::write(dir.path().join("character.json"), "{broken").unwrap();
    let reloaded = dir_store(&dir);
    assert!(reloaded.character().is_blank());
    assert_eq!(reloaded.custom_classes().len(), 1);
    assert_eq!(reloaded.custom_classes()[0].name, "Spellblade");
}

#[test]
fn missing_directory_degrades_to_blank_state() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let nested = dir.path().join("never").join("written");

    let store = CharacterStore::load(Box::new(DirStorage::new(&nested)));
    assert!(store.character().is_blank());

    // First write creates the directory.
    let mut store = store;
    store.update_character(|c| c.name = "Pioneer".to_string());
    assert!(nested.join("character.json").exists());
}

#[test]
fn exported_file_reimports_identically() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut store = dir_store(&dir);
    store.replace_character(Character::demo());
    store.update_character(|c| {
        c.add_equipment("dagger");
        c.set_current_hp(20);
    });
    let original = store.character().clone();

    // Export to a file, wipe, import from the file.
    let export_path = dir.path().join(store.export_file_name());
    std::fs::write(&export_path, store.export_character()).unwrap();
    store.reset_character();

    let text = std::fs::read_to_string(&export_path).unwrap();
    store.import_character(&text).unwrap();
    assert_eq!(*store.character(), original);
}

#[test]
fn import_failure_preserves_persisted_state() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut store = dir_store(&dir);
    store.update_character(|c| c.name = "Original".to_string());

    assert!(store.import_character(r#"{"name": "no level here"}"#).is_err());

    // Both the in-memory and the on-disk copies still hold the original.
    assert_eq!(store.character().name, "Original");
    let reloaded = dir_store(&dir);
    assert_eq!(reloaded.character().name, "Original");
}
