//! D&D 5e character-sheet rules and state.
//!
//! This crate provides:
//! - Character and homebrew-class types in the sheet file format
//! - The level-up reducer over immutable per-level snapshots
//! - Normalization of the SRD API's starting-equipment and skill choices
//! - A store owning the active character and custom classes, persisted
//!   through an injected storage backend
//!
//! # Quick Start
//!
//! ```
//! use sheet_core::character::AbilityKey;
//! use sheet_core::progression::{improvements_from_selection, LevelUpSnapshot};
//! use sheet_core::store::{CharacterStore, MemoryStorage};
//!
//! let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
//! store.update_character(|c| {
//!     c.name = "Thorin".to_string();
//!     c.max_hp = 12;
//!     c.current_hp = 12;
//! });
//!
//! let mut snapshot = LevelUpSnapshot::new(2, 7);
//! snapshot.ability_score_improvements = improvements_from_selection(&[AbilityKey::Con]);
//! store.apply_level_up(snapshot).unwrap();
//! assert_eq!(store.character().level, 2);
//! ```

pub mod character;
pub mod choices;
pub mod custom_class;
pub mod progression;
pub mod store;

// Primary public API
pub use character::{AbilityKey, AbilityScores, Character, ClassChoice, ClassSource};
pub use custom_class::CustomClass;
pub use progression::{apply_snapshot, proficiency_bonus, LevelUpError, LevelUpSnapshot};
pub use store::{CharacterStore, DirStorage, MemoryStorage, StorageBackend};
