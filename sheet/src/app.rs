//! Main application state: the store, the active screen and the plumbing
//! to the background fetch worker.

use tokio::sync::mpsc;
use tracing::debug;

use sheet_core::store::CharacterStore;
use sheet_core::Character;

use crate::classes_view::ClassesState;
use crate::fetch::{FetchPayload, FetchRequest, Fetched};
use crate::home::HomeState;
use crate::level_up::LevelUpState;
use crate::sheet_view::SheetState;
use crate::wizard::WizardState;

/// The screens of the app. Which one is active (and all of its step state)
/// is process-local UI state, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Home,
    Wizard,
    Sheet,
    LevelUp,
    CustomClasses,
}

/// Main application state.
pub struct App {
    pub store: CharacterStore,
    pub screen: Screen,

    // Channel communication with the fetch worker
    request_tx: mpsc::Sender<(u64, FetchRequest)>,
    pub response_rx: mpsc::Receiver<Fetched>,
    /// Current fetch generation; responses from older generations are stale.
    generation: u64,

    // Per-screen state
    pub home: HomeState,
    pub wizard: WizardState,
    pub sheet: SheetState,
    pub level_up: LevelUpState,
    pub classes: ClassesState,

    status_message: Option<String>,
    pub should_quit: bool,
    /// Whether the demo-character card is shown on the home screen.
    pub show_demo: bool,
}

impl App {
    pub fn new(
        store: CharacterStore,
        request_tx: mpsc::Sender<(u64, FetchRequest)>,
        response_rx: mpsc::Receiver<Fetched>,
        show_demo: bool,
    ) -> Self {
        Self {
            store,
            screen: Screen::Home,
            request_tx,
            response_rx,
            generation: 0,
            home: HomeState::default(),
            wizard: WizardState::default(),
            sheet: SheetState::default(),
            level_up: LevelUpState::default(),
            classes: ClassesState::default(),
            status_message: None,
            should_quit: false,
            show_demo,
        }
    }

    /// Invalidate all in-flight fetches.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Send a fetch request stamped with the current generation.
    pub fn request(&mut self, request: FetchRequest) {
        if self
            .request_tx
            .try_send((self.generation, request))
            .is_err()
        {
            self.set_status("Too many requests in flight, try again");
        }
    }

    /// Switch screens; in-flight fetches for the old screen become stale.
    pub fn goto(&mut self, screen: Screen) {
        self.bump_generation();
        self.screen = screen;
        self.clear_status();
        match screen {
            Screen::Home => self.home = HomeState::default(),
            Screen::Wizard => {
                let custom = self.store.custom_classes().to_vec();
                self.wizard = WizardState::begin(custom);
                self.request(FetchRequest::RaceList);
                self.request(FetchRequest::ClassList);
                // Re-fetch details for choices kept from a previous visit.
                let character = self.store.character();
                let race = character.race.clone();
                let class = character.class.clone();
                if let Some(race) = race {
                    self.request(FetchRequest::RaceDetail { index: race.index });
                }
                if let Some(class) = class {
                    if class.is_custom() {
                        self.wizard.recompute_custom_choice_data(&class.index);
                    } else {
                        self.request(FetchRequest::ClassDetail { index: class.index });
                    }
                }
            }
            Screen::Sheet => {
                self.sheet = SheetState::default();
                let character = self.store.character();
                let wants_spells = !character.cantrips_known.is_empty()
                    || !character.spells_known.is_empty();
                if let Some(class) = &character.class {
                    if wants_spells && !class.is_custom() {
                        let index = class.index.clone();
                        self.request(FetchRequest::ClassSpells { index });
                    }
                }
            }
            Screen::LevelUp => {
                self.level_up = LevelUpState::begin(self.store.character());
                let class = self.store.character().class.clone();
                match class {
                    None => {}
                    Some(class) if class.is_custom() => {
                        if let Some(custom) = self.store.custom_class(&class.index) {
                            let levels = custom.class_levels();
                            let hit_die = custom.hit_die;
                            self.level_up.set_levels(hit_die, levels, true);
                            self.level_up.prepare_pending();
                            self.request_pending_level_data();
                        } else {
                            self.level_up.error =
                                Some(format!("Custom class {} not found", class.index));
                            self.level_up.loading = false;
                        }
                    }
                    Some(class) => {
                        self.request(FetchRequest::ClassLevels { index: class.index });
                    }
                }
            }
            Screen::CustomClasses => self.classes = ClassesState::default(),
        }
    }

    /// Load the demo character and jump to the sheet.
    pub fn load_demo(&mut self) {
        self.store.replace_character(Character::demo());
        self.set_status("Demo character loaded");
        self.goto(Screen::Sheet);
    }

    /// Fetch features (and spells, when choosable) for the next pending
    /// level of the level-up screen.
    pub fn request_pending_level_data(&mut self) {
        let Some(pending) = self.level_up.pending_level(self.store.character()) else {
            return;
        };
        let refs = self
            .level_up
            .level_data(pending)
            .map(|l| l.features.clone())
            .unwrap_or_default();
        if !refs.is_empty() {
            self.request(FetchRequest::Features { refs });
        }
        if self.level_up.has_spell_choice(pending)
            && !self.level_up.is_custom
            && self.level_up.class_spells.is_empty()
        {
            if let Some(class) = &self.store.character().class {
                let index = class.index.clone();
                self.request(FetchRequest::ClassSpells { index });
            }
        }
    }

    /// Drain the response channel, applying fresh results and dropping
    /// stale ones.
    pub fn drain_responses(&mut self) {
        while let Ok(message) = self.response_rx.try_recv() {
            self.apply_fetched(message);
        }
    }

    fn apply_fetched(&mut self, message: Fetched) {
        if message.generation != self.generation {
            debug!(
                got = message.generation,
                current = self.generation,
                "dropping stale fetch response"
            );
            return;
        }

        if let FetchPayload::Failed { what, error } = &message.payload {
            debug!(what = *what, error = %error, "fetch failed");
        }

        match self.screen {
            Screen::Wizard => self.apply_to_wizard(message.payload),
            Screen::LevelUp => self.apply_to_level_up(message.payload),
            Screen::Sheet => match message.payload {
                FetchPayload::ClassSpells(spells) => {
                    self.sheet.set_spells(spells, self.store.character());
                }
                // The sheet degrades to raw indices without spell names.
                _ => {}
            },
            Screen::Home | Screen::CustomClasses => {}
        }
    }

    fn apply_to_wizard(&mut self, payload: FetchPayload) {
        match payload {
            FetchPayload::RaceList(races) => self.wizard.set_races(races),
            FetchPayload::ClassList(classes) => self.wizard.set_classes(classes),
            FetchPayload::RaceDetail(race) => self.wizard.race_detail = Some(*race),
            FetchPayload::ClassDetail(class) => {
                self.wizard.set_class_detail(*class);
                // The skills/equipment steps derive from the class detail;
                // refresh their dependent data if the user is already there.
                let follow_ups = self.wizard.step_requests(self.store.character());
                for request in follow_ups {
                    self.request(request);
                }
            }
            FetchPayload::SkillDescriptions(descriptions) => {
                self.wizard.skill_descriptions.extend(descriptions);
            }
            FetchPayload::EquipmentCategory { index, items } => {
                self.wizard.category_items.insert(index, items);
            }
            FetchPayload::ClassSpells(spells) => self.wizard.class_spells = spells,
            FetchPayload::LevelOne(spellcasting) => {
                self.wizard.level_one = spellcasting;
                self.wizard.level_one_loaded = true;
            }
            FetchPayload::Failed { what, error } => {
                self.wizard.loading = false;
                self.set_status(format!("Failed to load {what}: {error}"));
            }
            _ => {}
        }
    }

    fn apply_to_level_up(&mut self, payload: FetchPayload) {
        match payload {
            FetchPayload::ClassLevels { hit_die, levels } => {
                self.level_up.set_levels(hit_die, levels, false);
                self.level_up.prepare_pending();
                self.request_pending_level_data();
            }
            FetchPayload::Features(features) => {
                self.level_up.features = features;
            }
            FetchPayload::ClassSpells(spells) => {
                self.level_up.class_spells = spells;
            }
            FetchPayload::Failed { what, error } => {
                self.level_up.loading = false;
                self.level_up.error = Some(format!("Failed to load {what}: {error}"));
            }
            _ => {}
        }
    }

    /// Set status message (always overwrites).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
