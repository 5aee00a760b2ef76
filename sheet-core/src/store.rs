//! The state store: one active character plus the homebrew class list,
//! persisted as two independent JSON documents.
//!
//! Persistence goes through an injected [`StorageBackend`] so the store's
//! lifetime is explicit: one [`DirStorage`]-backed instance for the process,
//! a [`MemoryStorage`]-backed instance per test. Every mutation rewrites the
//! affected document in full, synchronously. Load and write failures are
//! logged and swallowed; the app simply runs with in-memory state for the
//! session.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::character::Character;
use crate::custom_class::CustomClass;
use crate::progression::{apply_snapshot, LevelUpError, LevelUpSnapshot};

/// Storage key for the active character document.
pub const CHARACTER_KEY: &str = "character";
/// Storage key for the custom-class array document.
pub const CUSTOM_CLASSES_KEY: &str = "custom-classes";

/// A key-value document store. Implementations never fail loudly: absent or
/// unwritable documents degrade to `None` / a dropped write.
pub trait StorageBackend: Send {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
}

/// Documents as `<key>.json` files under a directory.
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for DirStorage {
    fn read(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path(key)) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key, error = %e, "failed to read stored document");
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(error = %e, "failed to create storage directory");
            return;
        }
        if let Err(e) = fs::write(self.path(key), value) {
            warn!(key, error = %e, "failed to persist document");
        }
    }
}

/// In-memory backend for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, as if a previous session had written it.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// Errors from importing a character file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Missing/non-numeric `level`, missing `abilityScores`, or not JSON at
    /// all. The current character is left untouched.
    #[error("not a valid character file: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Owns the single active character and the custom-class list. Views read
/// by reference and mutate only through these methods.
pub struct CharacterStore {
    character: Character,
    custom_classes: Vec<CustomClass>,
    backend: Box<dyn StorageBackend>,
}

impl CharacterStore {
    /// Load both documents from the backend. A missing or corrupt document
    /// is treated as "no saved state".
    pub fn load(backend: Box<dyn StorageBackend>) -> Self {
        let character = backend
            .read(CHARACTER_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(character) => Some(character),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable character document");
                    None
                }
            })
            .unwrap_or_else(Character::blank);

        let custom_classes = backend
            .read(CUSTOM_CLASSES_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(classes) => Some(classes),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable custom-class document");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            character,
            custom_classes,
            backend,
        }
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn custom_classes(&self) -> &[CustomClass] {
        &self.custom_classes
    }

    pub fn custom_class(&self, id: &str) -> Option<&CustomClass> {
        self.custom_classes.iter().find(|c| c.id == id)
    }

    /// Replace the active character wholesale.
    pub fn replace_character(&mut self, character: Character) {
        self.character = character;
        self.persist_character();
    }

    /// Discard the active character for a blank one.
    pub fn reset_character(&mut self) {
        self.character = Character::blank();
        self.persist_character();
    }

    /// Patch the character in place; stamps the update time and persists.
    pub fn update_character(&mut self, patch: impl FnOnce(&mut Character)) {
        patch(&mut self.character);
        self.character.touch();
        self.persist_character();
    }

    /// Apply a level-up snapshot through the reducer. Nothing is persisted
    /// when the snapshot is rejected.
    pub fn apply_level_up(&mut self, snapshot: LevelUpSnapshot) -> Result<(), LevelUpError> {
        apply_snapshot(&mut self.character, snapshot)?;
        self.persist_character();
        Ok(())
    }

    /// Insert or replace a custom class by id (last write wins).
    pub fn save_custom_class(&mut self, mut class: CustomClass) {
        class.touch();
        self.custom_classes.retain(|c| c.id != class.id);
        self.custom_classes.push(class);
        self.persist_custom_classes();
    }

    pub fn delete_custom_class(&mut self, id: &str) {
        let before = self.custom_classes.len();
        self.custom_classes.retain(|c| c.id != id);
        if self.custom_classes.len() != before {
            self.persist_custom_classes();
        }
    }

    /// The character as a pretty-printed JSON document.
    pub fn export_character(&self) -> String {
        serde_json::to_string_pretty(&self.character)
            .expect("character serialization is infallible")
    }

    /// Suggested file name for an export.
    pub fn export_file_name(&self) -> String {
        let name = if self.character.name.is_empty() {
            "character"
        } else {
            &self.character.name
        };
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("sheet-{sanitized}.json")
    }

    /// Import a character from JSON text. Documents without a numeric
    /// `level` or an `abilityScores` object are rejected without touching
    /// the current character.
    pub fn import_character(&mut self, json: &str) -> Result<(), ImportError> {
        let character: Character = serde_json::from_str(json)?;
        self.replace_character(character);
        Ok(())
    }

    fn persist_character(&mut self) {
        match serde_json::to_string(&self.character) {
            Ok(raw) => self.backend.write(CHARACTER_KEY, &raw),
            Err(e) => warn!(error = %e, "failed to serialize character"),
        }
    }

    fn persist_custom_classes(&mut self) {
        match serde_json::to_string(&self.custom_classes) {
            Ok(raw) => self.backend.write(CUSTOM_CLASSES_KEY, &raw),
            Err(e) => warn!(error = %e, "failed to serialize custom classes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::AbilityKey;
    use crate::progression::improvements_from_selection;

    fn memory_store() -> CharacterStore {
        CharacterStore::load(Box::new(MemoryStorage::new()))
    }

    #[test]
    fn test_load_without_saved_state_yields_blank() {
        let store = memory_store();
        assert!(store.character().is_blank());
        assert!(store.custom_classes().is_empty());
    }

    #[test]
    fn test_load_swallows_corrupt_documents() {
        let backend = MemoryStorage::new()
            .with_entry(CHARACTER_KEY, "{not json")
            .with_entry(CUSTOM_CLASSES_KEY, "42");
        let store = CharacterStore::load(Box::new(backend));
        assert!(store.character().is_blank());
        assert!(store.custom_classes().is_empty());
    }

    #[test]
    fn test_update_persists_and_stamps() {
        let mut store = memory_store();
        let before = store.character().updated_at;

        store.update_character(|c| c.name = "Aragorn".to_string());

        assert_eq!(store.character().name, "Aragorn");
        assert!(store.character().updated_at >= before);
    }

    #[test]
    fn test_state_survives_reload() {
        let mut store = memory_store();
        store.update_character(|c| {
            c.name = "Thorin".to_string();
            c.max_hp = 12;
            c.current_hp = 12;
        });
        store.save_custom_class(CustomClass::blank());

        let backend = MemoryStorage::new()
            .with_entry(
                CHARACTER_KEY,
                store.backend.read(CHARACTER_KEY).unwrap().as_str(),
            )
            .with_entry(
                CUSTOM_CLASSES_KEY,
                store.backend.read(CUSTOM_CLASSES_KEY).unwrap().as_str(),
            );
        let reloaded = CharacterStore::load(Box::new(backend));

        assert_eq!(reloaded.character().name, "Thorin");
        assert_eq!(reloaded.character().max_hp, 12);
        assert_eq!(reloaded.custom_classes().len(), 1);
    }

    #[test]
    fn test_custom_class_last_write_wins() {
        let mut store = memory_store();
        let mut class = CustomClass::blank();
        class.name = "Witcher".to_string();
        let id = class.id.clone();
        store.save_custom_class(class.clone());

        class.name = "Witcher, revised".to_string();
        store.save_custom_class(class);

        assert_eq!(store.custom_classes().len(), 1);
        assert_eq!(store.custom_class(&id).unwrap().name, "Witcher, revised");

        store.delete_custom_class(&id);
        assert!(store.custom_class(&id).is_none());
    }

    #[test]
    fn test_level_up_dispatch() {
        let mut store = memory_store();
        store.update_character(|c| {
            c.max_hp = 10;
            c.current_hp = 10;
        });

        let mut snapshot = LevelUpSnapshot::new(2, 7);
        snapshot.ability_score_improvements = improvements_from_selection(&[AbilityKey::Str]);
        store.apply_level_up(snapshot).unwrap();

        assert_eq!(store.character().level, 2);
        assert_eq!(store.character().max_hp, 17);
        assert_eq!(store.character().level_up_history.len(), 1);

        // Rejected snapshots leave the store (and storage) untouched.
        let persisted_before = store.backend.read(CHARACTER_KEY).unwrap();
        assert!(store.apply_level_up(LevelUpSnapshot::new(9, 5)).is_err());
        assert_eq!(store.backend.read(CHARACTER_KEY).unwrap(), persisted_before);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut store = memory_store();
        store.replace_character(Character::demo());
        let exported = store.export_character();
        let original = store.character().clone();

        store.reset_character();
        assert!(store.character().is_blank());

        store.import_character(&exported).unwrap();
        assert_eq!(*store.character(), original);
    }

    #[test]
    fn test_import_rejects_missing_level() {
        let mut store = memory_store();
        store.update_character(|c| c.name = "Keep me".to_string());

        let err = store.import_character(r#"{"abilityScores": {"str": 10, "dex": 10, "con": 10, "int": 10, "wis": 10, "cha": 10}}"#);
        assert!(err.is_err());
        assert_eq!(store.character().name, "Keep me");
    }

    #[test]
    fn test_import_rejects_missing_ability_scores() {
        let mut store = memory_store();
        store.update_character(|c| c.name = "Keep me".to_string());

        assert!(store.import_character(r#"{"level": 3}"#).is_err());
        assert!(store.import_character("not json at all").is_err());
        assert_eq!(store.character().name, "Keep me");
    }

    #[test]
    fn test_import_accepts_partial_documents() {
        let mut store = memory_store();
        store
            .import_character(
                r#"{
                    "level": 4,
                    "abilityScores": {"str": 16, "dex": 12, "con": 14, "int": 10, "wis": 10, "cha": 8}
                }"#,
            )
            .unwrap();

        assert_eq!(store.character().level, 4);
        assert_eq!(store.character().ability_scores.strength, 16);
        assert!(store.character().skills.is_empty());
    }

    #[test]
    fn test_export_file_name() {
        let mut store = memory_store();
        assert_eq!(store.export_file_name(), "sheet-character.json");
        store.update_character(|c| c.name = "Sir Reginald III".to_string());
        assert_eq!(store.export_file_name(), "sheet-Sir_Reginald_III.json");
    }
}
