//! Character creation wizard.
//!
//! A multi-step interface: basics, race, class, abilities, skills,
//! equipment, and spells for casters. Choices are committed to the store as
//! they are made, so leaving and re-entering the wizard resumes where the
//! character left off.

use std::collections::HashMap;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use sheet_core::character::{
    AbilityKey, Character, ClassChoice, ClassSource, RaceChoice, STANDARD_ABILITY_ARRAY,
};
use sheet_core::choices::{
    apply_equipment_choices, custom_skill_choice_groups, equipment_choice_groups,
    fixed_skill_proficiencies, fixed_starting_equipment, skill_choice_groups,
    toggle_skill_choice, CategoryPick, EquipmentChoiceGroup, SkillChoiceGroup,
};
use sheet_core::custom_class::CustomClass;
use sheet_core::store::CharacterStore;
use srd::types::{ApiRef, ClassDetail, LevelSpellcasting, RaceDetail, SpellSummary};

use crate::fetch::FetchRequest;

/// Steps in character creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    Basics,
    Race,
    Class,
    Abilities,
    Skills,
    Equipment,
    Spells,
}

impl WizardStep {
    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Basics => "Name and Player",
            WizardStep::Race => "Choose Your Race",
            WizardStep::Class => "Choose Your Class",
            WizardStep::Abilities => "Assign Ability Scores",
            WizardStep::Skills => "Choose Skills",
            WizardStep::Equipment => "Starting Equipment",
            WizardStep::Spells => "Starting Spells",
        }
    }

    pub fn prev(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Basics => None,
            WizardStep::Race => Some(WizardStep::Basics),
            WizardStep::Class => Some(WizardStep::Race),
            WizardStep::Abilities => Some(WizardStep::Class),
            WizardStep::Skills => Some(WizardStep::Abilities),
            WizardStep::Equipment => Some(WizardStep::Skills),
            WizardStep::Spells => Some(WizardStep::Equipment),
        }
    }
}

/// Which basics field has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasicsField {
    #[default]
    Name,
    Player,
}

/// A selectable class in the class list.
#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub index: String,
    pub name: String,
    pub custom: bool,
}

/// A selectable row on the skills / equipment / spells steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardRow {
    SkillOption { group: usize, option: usize },
    EquipOption { group: usize, option: usize },
    EquipCategoryItem { group: usize, item: usize },
    Cantrip(usize),
    Spell(usize),
}

/// Character creation state.
#[derive(Default)]
pub struct WizardState {
    pub step: WizardStep,
    pub basics_field: BasicsField,

    // Fetched reference data
    pub races: Vec<ApiRef>,
    pub classes: Vec<ClassEntry>,
    pub race_detail: Option<RaceDetail>,
    pub class_detail: Option<ClassDetail>,
    pub class_spells: Vec<SpellSummary>,
    pub level_one: Option<LevelSpellcasting>,
    pub level_one_loaded: bool,
    pub skill_descriptions: HashMap<String, String>,
    pub category_items: HashMap<String, Vec<ApiRef>>,

    // Derived choice data for the selected class
    pub skill_groups: Vec<SkillChoiceGroup>,
    pub fixed_skills: Vec<String>,
    pub equipment_groups: Vec<EquipmentChoiceGroup>,
    pub fixed_equipment: Vec<String>,
    pub equipment_selection: Vec<Option<usize>>,
    pub category_picks: Vec<CategoryPick>,

    // Homebrew classes snapshot, so custom choices work offline
    custom_classes: Vec<CustomClass>,

    // UI state
    pub list_state: ListState,
    pub ability_cursor: usize,
    pub cursor: usize,
    pub loading: bool,
}

impl WizardState {
    pub fn begin(custom_classes: Vec<CustomClass>) -> Self {
        let mut state = Self {
            loading: true,
            custom_classes,
            ..Self::default()
        };
        state.list_state.select(Some(0));
        state
    }

    pub fn set_races(&mut self, races: Vec<ApiRef>) {
        self.races = races;
        self.loading = false;
    }

    pub fn set_classes(&mut self, classes: Vec<ApiRef>) {
        self.classes = classes
            .into_iter()
            .map(|c| ClassEntry {
                index: c.index,
                name: c.name,
                custom: false,
            })
            .chain(self.custom_classes.iter().map(|c| ClassEntry {
                index: c.id.clone(),
                name: format!("{} (custom)", c.name),
                custom: true,
            }))
            .collect();
        self.loading = false;
    }

    pub fn set_class_detail(&mut self, detail: ClassDetail) {
        self.class_detail = Some(detail);
        self.recompute_choice_data();
    }

    /// The homebrew class currently selected, if any.
    pub fn selected_custom<'a>(&'a self, character: &Character) -> Option<&'a CustomClass> {
        let class = character.class.as_ref()?;
        if !class.is_custom() {
            return None;
        }
        self.custom_classes.iter().find(|c| c.id == class.index)
    }

    /// Recompute skill/equipment choice groups after the class changed.
    pub fn recompute_choice_data(&mut self) {
        match &self.class_detail {
            Some(detail) => {
                self.skill_groups = skill_choice_groups(detail);
                self.fixed_skills = fixed_skill_proficiencies(detail);
                self.equipment_groups = equipment_choice_groups(detail);
                self.fixed_equipment = fixed_starting_equipment(detail);
            }
            None => {
                self.skill_groups.clear();
                self.fixed_skills.clear();
                self.equipment_groups.clear();
                self.fixed_equipment.clear();
            }
        }
        self.equipment_selection = vec![None; self.equipment_groups.len()];
        self.category_picks = vec![CategoryPick::default(); self.equipment_groups.len()];
        self.cursor = 0;
    }

    /// Recompute skill groups for a custom class selection.
    pub fn recompute_custom_choice_data(&mut self, custom_id: &str) {
        self.class_detail = None;
        self.skill_groups = self
            .custom_classes
            .iter()
            .find(|c| c.id == custom_id)
            .map(|c| custom_skill_choice_groups(c))
            .unwrap_or_default();
        self.fixed_skills.clear();
        self.equipment_groups.clear();
        self.fixed_equipment.clear();
        self.equipment_selection.clear();
        self.category_picks.clear();
        self.cursor = 0;
    }

    /// Whether the chosen class gets the spells step.
    pub fn has_spellcasting(&self, character: &Character) -> bool {
        if let Some(custom) = self.selected_custom(character) {
            return custom.casts_at_level_one();
        }
        self.class_detail
            .as_ref()
            .map(ClassDetail::has_spellcasting)
            .unwrap_or(false)
    }

    /// Number of cantrips to pick at level 1.
    pub fn cantrips_to_choose(&self) -> usize {
        self.level_one
            .and_then(|l| l.cantrips_known)
            .unwrap_or(0) as usize
    }

    /// Number of level-1 spells to pick. The SRD omits `spells_known` for
    /// wizards (spellbook casters), so they fall back to six.
    pub fn spells_to_choose(&self, character: &Character) -> usize {
        let known = self.level_one.and_then(|l| l.spells_known).unwrap_or(0) as usize;
        if known > 0 {
            return known;
        }
        match &character.class {
            Some(class) if class.index == "wizard" => 6,
            _ => 0,
        }
    }

    pub fn cantrip_list(&self) -> Vec<&SpellSummary> {
        self.class_spells.iter().filter(|s| s.level == 0).collect()
    }

    pub fn level_one_spell_list(&self) -> Vec<&SpellSummary> {
        self.class_spells.iter().filter(|s| s.level == 1).collect()
    }

    /// Outstanding fetches for the current step.
    pub fn step_requests(&self, character: &Character) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        match self.step {
            WizardStep::Skills => {
                let mut indices: Vec<String> = self
                    .skill_groups
                    .iter()
                    .flat_map(|g| g.options.iter().map(|o| o.index.clone()))
                    .filter(|index| !self.skill_descriptions.contains_key(index))
                    .collect();
                indices.sort();
                indices.dedup();
                if !indices.is_empty() {
                    requests.push(FetchRequest::SkillDescriptions { indices });
                }
            }
            WizardStep::Equipment => {
                let mut categories: Vec<String> = self
                    .equipment_groups
                    .iter()
                    .flat_map(|g| g.options.iter())
                    .filter_map(|o| o.category().map(|(index, _)| index.to_string()))
                    .filter(|index| !self.category_items.contains_key(index))
                    .collect();
                categories.sort();
                categories.dedup();
                for index in categories {
                    requests.push(FetchRequest::EquipmentCategory { index });
                }
            }
            WizardStep::Spells => {
                if let Some(class) = &character.class {
                    if !class.is_custom() {
                        if self.class_spells.is_empty() {
                            requests.push(FetchRequest::ClassSpells {
                                index: class.index.clone(),
                            });
                        }
                        if !self.level_one_loaded {
                            requests.push(FetchRequest::LevelOne {
                                index: class.index.clone(),
                            });
                        }
                    }
                }
            }
            _ => {}
        }
        requests
    }

    /// The selectable rows of the current step.
    pub fn rows(&self, character: &Character) -> Vec<WizardRow> {
        let mut rows = Vec::new();
        match self.step {
            WizardStep::Skills => {
                for (g, group) in self.skill_groups.iter().enumerate() {
                    for o in 0..group.options.len() {
                        rows.push(WizardRow::SkillOption { group: g, option: o });
                    }
                }
            }
            WizardStep::Equipment => {
                for (g, group) in self.equipment_groups.iter().enumerate() {
                    for o in 0..group.options.len() {
                        rows.push(WizardRow::EquipOption { group: g, option: o });
                    }
                    if let Some(items) = self.selected_category_items(g) {
                        for i in 0..items.len() {
                            rows.push(WizardRow::EquipCategoryItem { group: g, item: i });
                        }
                    }
                }
            }
            WizardStep::Spells => {
                if self.cantrips_to_choose() > 0 {
                    for i in 0..self.cantrip_list().len() {
                        rows.push(WizardRow::Cantrip(i));
                    }
                }
                if self.spells_to_choose(character) > 0 {
                    for i in 0..self.level_one_spell_list().len() {
                        rows.push(WizardRow::Spell(i));
                    }
                }
            }
            _ => {}
        }
        rows
    }

    /// The category item list for a group's selected option, when that
    /// option has a category part and the category has loaded.
    pub fn selected_category_items(&self, group: usize) -> Option<&Vec<ApiRef>> {
        let option_index = (*self.equipment_selection.get(group)?)?;
        let option = self.equipment_groups.get(group)?.options.get(option_index)?;
        let (category, _) = option.category()?;
        self.category_items.get(category)
    }

    pub fn move_cursor(&mut self, delta: isize, character: &Character) {
        let rows = self.rows(character).len();
        if rows == 0 {
            self.cursor = 0;
            return;
        }
        let max = rows as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    /// Select an equipment option for a group, resetting the group's
    /// category pick to the new option's choose-count.
    pub fn select_equipment_option(&mut self, group: usize, option_index: usize) {
        if self.equipment_selection.get(group).copied() == Some(Some(option_index)) {
            return;
        }
        if let Some(slot) = self.equipment_selection.get_mut(group) {
            *slot = Some(option_index);
        }
        let choose = self
            .equipment_groups
            .get(group)
            .and_then(|g| g.options.get(option_index))
            .and_then(|o| o.category())
            .map(|(_, choose)| choose)
            .unwrap_or(0);
        if let Some(pick) = self.category_picks.get_mut(group) {
            *pick = CategoryPick::new(choose);
        }
    }

    /// Commit the final derived stats and equipment to the store.
    pub fn finish(&self, store: &mut CharacterStore) {
        let custom_hit_die = self
            .selected_custom(store.character())
            .map(|c| c.hit_die);
        let hit_die = custom_hit_die
            .or_else(|| self.class_detail.as_ref().map(|c| c.hit_die))
            .unwrap_or(8);
        let has_class_data = custom_hit_die.is_some() || self.class_detail.is_some();

        let equipment = apply_equipment_choices(
            &self.fixed_equipment,
            &self.equipment_groups,
            &self.equipment_selection,
            &self.category_picks,
        );

        store.update_character(|c| {
            let con_mod = c.ability_scores.modifier(AbilityKey::Con).max(0);
            c.max_hp = if has_class_data {
                i32::from(hit_die) + i32::from(con_mod)
            } else {
                0
            };
            c.current_hp = c.max_hp;
            c.hit_dice = format!("1d{hit_die}");
            c.hit_dice_used = 0;
            c.proficiency_bonus = 2;
            c.equipment = equipment;
        });
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn render(&mut self, frame: &mut Frame, area: Rect, character: &Character) {
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        self.render_progress(frame, chunks[0], character);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        let left_block = Block::default()
            .title(format!(" {} ", self.step.title()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let left_inner = left_block.inner(columns[0]);
        frame.render_widget(left_block, columns[0]);

        match self.step {
            WizardStep::Basics => self.render_basics(frame, left_inner, character),
            WizardStep::Race => self.render_race(frame, left_inner, character),
            WizardStep::Class => self.render_class(frame, left_inner, character),
            WizardStep::Abilities => self.render_abilities(frame, left_inner, character),
            WizardStep::Skills => self.render_skills(frame, left_inner, character),
            WizardStep::Equipment => self.render_equipment(frame, left_inner, character),
            WizardStep::Spells => self.render_spells(frame, left_inner, character),
        }

        self.render_preview(frame, columns[1], character);
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let steps: &[(WizardStep, &str)] = &[
            (WizardStep::Basics, "Basics"),
            (WizardStep::Race, "Race"),
            (WizardStep::Class, "Class"),
            (WizardStep::Abilities, "Abilities"),
            (WizardStep::Skills, "Skills"),
            (WizardStep::Equipment, "Equipment"),
            (WizardStep::Spells, "Spells"),
        ];
        let mut spans = Vec::new();
        for (step, label) in steps {
            if *step == WizardStep::Spells && !self.has_spellcasting(character) {
                continue;
            }
            let style = if *step == self.step {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if !spans.is_empty() {
                spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
            }
            spans.push(Span::styled(*label, style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_basics(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        let focused = Style::default().fg(Color::Yellow);
        let blurred = Style::default().fg(Color::DarkGray);

        let name = Paragraph::new(format!(
            "{}{}",
            character.name,
            if self.basics_field == BasicsField::Name { "█" } else { "" }
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Character name ")
                .border_style(if self.basics_field == BasicsField::Name {
                    focused
                } else {
                    blurred
                }),
        );
        frame.render_widget(name, chunks[0]);

        let player = Paragraph::new(format!(
            "{}{}",
            character.player_name,
            if self.basics_field == BasicsField::Player { "█" } else { "" }
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Player name ")
                .border_style(if self.basics_field == BasicsField::Player {
                    focused
                } else {
                    blurred
                }),
        );
        frame.render_widget(player, chunks[1]);

        let help = Paragraph::new("Tab switches fields, Enter continues, Esc goes back")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }

    fn render_race(&mut self, frame: &mut Frame, area: Rect, character: &Character) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let items: Vec<ListItem> = self
            .races
            .iter()
            .map(|r| {
                let marker = if character.race.as_ref().map(|c| c.index.as_str())
                    == Some(r.index.as_str())
                {
                    "● "
                } else {
                    "  "
                };
                ListItem::new(format!("{marker}{}", r.name))
            })
            .collect();

        let title = if self.loading { " Races (loading...) " } else { " Races " };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

        let detail_text = match &self.race_detail {
            Some(race) => {
                let bonuses = race
                    .ability_bonuses
                    .iter()
                    .map(|b| format!("+{} {}", b.bonus, b.ability_score.index.to_uppercase()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{}\n\nSpeed: {} ft\nAbility bonuses: {}",
                    race.size_description,
                    race.speed,
                    if bonuses.is_empty() { "none".to_string() } else { bonuses }
                )
            }
            None => "Select a race to see its details.".to_string(),
        };
        let detail = Paragraph::new(detail_text)
            .block(Block::default().borders(Borders::ALL).title(" Details "))
            .wrap(Wrap { trim: true });
        frame.render_widget(detail, chunks[1]);
    }

    fn render_class(&mut self, frame: &mut Frame, area: Rect, character: &Character) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let items: Vec<ListItem> = self
            .classes
            .iter()
            .map(|c| {
                let marker = if character.class.as_ref().map(|x| x.index.as_str())
                    == Some(c.index.as_str())
                {
                    "● "
                } else {
                    "  "
                };
                ListItem::new(format!("{marker}{}", c.name))
            })
            .collect();

        let title = if self.loading { " Classes (loading...) " } else { " Classes " };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

        let detail_text = if let Some(custom) = self.selected_custom(character) {
            format!("Homebrew class\n\nHit die: d{}", custom.hit_die)
        } else if let Some(detail) = &self.class_detail {
            format!("Hit die: d{}", detail.hit_die)
        } else {
            "Select a class to see its details.".to_string()
        };
        let detail = Paragraph::new(detail_text)
            .block(Block::default().borders(Borders::ALL).title(" Details "))
            .wrap(Wrap { trim: true });
        frame.render_widget(detail, chunks[1]);
    }

    fn render_abilities(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Standard array: assign each value once, press 1-6 on the highlighted ability.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
        ];

        for (i, key) in AbilityKey::all().into_iter().enumerate() {
            let score = character.ability_scores.get(key);
            let bonus = self
                .race_detail
                .as_ref()
                .and_then(|r| {
                    r.ability_bonuses
                        .iter()
                        .find(|b| b.ability_score.index == key.index())
                })
                .map(|b| b.bonus)
                .unwrap_or(0);

            let mut text = format!("{:<13} {:>2}", key.name(), score);
            if bonus != 0 {
                text.push_str(&format!("  (+{bonus} racial = {})", score as i8 + bonus));
            }
            let style = if i == self.ability_cursor {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(text, style)));
        }

        lines.push(Line::from(""));
        let values = STANDARD_ABILITY_ARRAY
            .iter()
            .enumerate()
            .map(|(i, v)| format!("[{}] {v}", i + 1))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(Line::from(Span::styled(
            values,
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            "Assigning a value held by another ability swaps the two. Enter continues.",
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_skills(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let rows = self.rows(character);
        let mut lines = Vec::new();

        if self.skill_groups.is_empty() {
            lines.push(Line::from(
                "This class has no skill choices in the API (or none defined for the homebrew class).",
            ));
        }

        let mut row_index = 0usize;
        for group in &self.skill_groups {
            let selected = group.selected_in(&character.skills).len();
            lines.push(Line::from(Span::styled(
                format!("Choose {} — {selected}/{} picked:", group.choose, group.choose),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for option in &group.options {
                let checked = character.skills.iter().any(|s| *s == option.index);
                let marker = if checked { "[x]" } else { "[ ]" };
                let style = if self.cursor == row_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else if checked {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("  {marker} {}", option.name),
                    style,
                )));
                row_index += 1;
            }
            lines.push(Line::from(""));
        }

        if !self.fixed_skills.is_empty() {
            let fixed = self
                .fixed_skills
                .iter()
                .map(|s| sheet_core::character::label_from_index(s))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(Line::from(Span::styled(
                format!("Fixed class skills: {fixed}"),
                Style::default().fg(Color::DarkGray),
            )));
        }

        // Description of the skill under the cursor.
        if let Some(WizardRow::SkillOption { group, option }) = rows.get(self.cursor) {
            if let Some(opt) = self
                .skill_groups
                .get(*group)
                .and_then(|gr| gr.options.get(*option))
            {
                if let Some(desc) = self.skill_descriptions.get(&opt.index) {
                    lines.push(Line::from(""));
                    for part in desc.lines() {
                        lines.push(Line::from(Span::styled(
                            part.to_string(),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Space toggles, Tab continues, Esc goes back",
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }

    fn render_equipment(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let rows = self.rows(character);
        let mut lines = Vec::new();

        if self.equipment_groups.is_empty() {
            lines.push(Line::from(
                "This class has no starting-equipment options in the API. Items can be added on the sheet later.",
            ));
        }

        let mut row_index = 0usize;
        for (g, group) in self.equipment_groups.iter().enumerate() {
            lines.push(Line::from(Span::styled(
                group.desc.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));

            for (o, option) in group.options.iter().enumerate() {
                let selected = self.equipment_selection.get(g).copied() == Some(Some(o));
                let marker = if selected { "(o)" } else { "( )" };
                let suffix = if option.category().is_some() { " (pick below)" } else { "" };
                let style = if self.cursor == row_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else if selected {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("  {marker} {}{suffix}", option.label()),
                    style,
                )));
                row_index += 1;
            }

            if let Some(items) = self.selected_category_items(g) {
                let pick = &self.category_picks[g];
                lines.push(Line::from(Span::styled(
                    format!(
                        "  Choose {} ({}/{} picked):",
                        pick.choose(),
                        pick.picked().len(),
                        pick.choose()
                    ),
                    Style::default().fg(Color::Cyan),
                )));
                for item in items {
                    let checked = pick.contains(&item.index);
                    let marker = if checked { "[x]" } else { "[ ]" };
                    let style = if self.cursor == row_index {
                        Style::default().bg(Color::Blue).fg(Color::White)
                    } else if checked {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(Span::styled(
                        format!("    {marker} {}", item.name),
                        style,
                    )));
                    row_index += 1;
                }
            }
            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            "Space selects/toggles, Tab continues, Esc goes back",
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }

    fn render_spells(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let mut lines = Vec::new();
        let cantrips_to_choose = self.cantrips_to_choose();
        let spells_to_choose = self.spells_to_choose(character);
        let cantrips = self.cantrip_list();
        let spells = self.level_one_spell_list();

        let mut row_index = 0usize;
        if cantrips_to_choose > 0 && !cantrips.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(
                    "Cantrips — choose {} ({}/{} picked):",
                    cantrips_to_choose,
                    character.cantrips_known.len(),
                    cantrips_to_choose
                ),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for spell in &cantrips {
                let checked = character.cantrips_known.contains(&spell.index);
                let marker = if checked { "[x]" } else { "[ ]" };
                let style = if self.cursor == row_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else if checked {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("  {marker} {}", spell.name),
                    style,
                )));
                row_index += 1;
            }
            lines.push(Line::from(""));
        }

        if spells_to_choose > 0 && !spells.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(
                    "1st-level spells — choose {} ({}/{} picked):",
                    spells_to_choose,
                    character.spells_known.len(),
                    spells_to_choose
                ),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for spell in &spells {
                let checked = character.spells_known.contains(&spell.index);
                let marker = if checked { "[x]" } else { "[ ]" };
                let style = if self.cursor == row_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else if checked {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("  {marker} {}", spell.name),
                    style,
                )));
                row_index += 1;
            }
            lines.push(Line::from(""));
        }

        if cantrips_to_choose == 0 && spells_to_choose == 0 {
            lines.push(Line::from(
                "This class prepares spells from the full list (e.g. cleric); nothing to pick here.",
            ));
            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            "Space toggles, Tab finishes character creation, Esc goes back",
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }

    /// Character summary panel shown beside every step.
    fn render_preview(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let title = if character.name.is_empty() {
            " Preview ".to_string()
        } else {
            format!(" {} ", character.name)
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let race = character
            .race
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or("no race");
        let class = character
            .class
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("no class");

        let mut lines = vec![
            Line::from(Span::styled(
                format!("{race} {class}"),
                Style::default().add_modifier(Modifier::DIM),
            )),
            Line::from(""),
        ];

        for key in AbilityKey::all() {
            let score = character.ability_scores.get(key);
            let modifier = character.ability_scores.modifier(key);
            let mod_str = if modifier >= 0 {
                format!("+{modifier}")
            } else {
                format!("{modifier}")
            };
            lines.push(Line::from(format!(
                "{}: {score:2} ({mod_str})",
                key.abbreviation()
            )));
        }

        lines.push(Line::from(""));
        if !character.skills.is_empty() {
            lines.push(Line::from(Span::styled(
                "Skills:",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for skill in character.skills.iter().take(6) {
                lines.push(Line::from(format!(
                    "  {}",
                    sheet_core::character::label_from_index(skill)
                )));
            }
            if character.skills.len() > 6 {
                lines.push(Line::from(format!("  +{} more", character.skills.len() - 6)));
            }
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

/// Assign a standard-array value to an ability, committed to the store.
pub fn assign_ability(store: &mut CharacterStore, ability: AbilityKey, value: u8) {
    store.update_character(|c| c.ability_scores.assign(ability, value));
}

/// Record the race selection.
pub fn select_race(store: &mut CharacterStore, race: &ApiRef) {
    let choice = RaceChoice {
        index: race.index.clone(),
        name: race.name.clone(),
    };
    store.update_character(|c| c.race = Some(choice));
}

/// Record the class selection, clearing the subclass and the previous
/// class's spell picks.
pub fn select_class(store: &mut CharacterStore, entry: &ClassEntry) {
    let choice = ClassChoice {
        source: if entry.custom {
            ClassSource::Custom
        } else {
            ClassSource::Api
        },
        index: entry.index.clone(),
        name: entry.name.trim_end_matches(" (custom)").to_string(),
    };
    store.update_character(|c| {
        c.class = Some(choice);
        c.subclass = None;
        c.skills.clear();
        c.cantrips_known.clear();
        c.spells_known.clear();
        c.spells_prepared.clear();
    });
}

/// Toggle a skill pick, enforcing the group's choose-count.
/// Returns false when the toggle was a no-op (limit reached).
pub fn toggle_skill(
    store: &mut CharacterStore,
    groups: &[SkillChoiceGroup],
    fixed: &[String],
    group: usize,
    skill_index: &str,
) -> bool {
    let next = toggle_skill_choice(
        &store.character().skills,
        fixed,
        groups,
        group,
        skill_index,
    );
    match next {
        Some(skills) => {
            store.update_character(|c| c.skills = skills);
            true
        }
        None => false,
    }
}

/// Toggle a cantrip pick, bounded by the class's level-1 count.
pub fn toggle_cantrip(store: &mut CharacterStore, index: &str, limit: usize) -> bool {
    let known = &store.character().cantrips_known;
    if known.iter().any(|k| k == index) {
        store.update_character(|c| c.cantrips_known.retain(|k| k != index));
        true
    } else if known.len() < limit {
        let index = index.to_string();
        store.update_character(|c| c.cantrips_known.push(index));
        true
    } else {
        false
    }
}

/// Toggle a 1st-level spell pick, bounded by the class's level-1 count.
pub fn toggle_spell(store: &mut CharacterStore, index: &str, limit: usize) -> bool {
    let known = &store.character().spells_known;
    if known.iter().any(|k| k == index) {
        store.update_character(|c| c.spells_known.retain(|k| k != index));
        true
    } else if known.len() < limit {
        let index = index.to_string();
        store.update_character(|c| c.spells_known.push(index));
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_core::store::MemoryStorage;

    fn store_with_class() -> CharacterStore {
        let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
        select_class(
            &mut store,
            &ClassEntry {
                index: "wizard".to_string(),
                name: "Wizard".to_string(),
                custom: false,
            },
        );
        store
    }

    #[test]
    fn test_assign_ability_swaps_through_store() {
        let mut store = CharacterStore::load(Box::new(MemoryStorage::new()));
        assign_ability(&mut store, AbilityKey::Int, 15);
        // 15 belonged to STR; STR takes INT's old 12.
        assert_eq!(store.character().ability_scores.intelligence, 15);
        assert_eq!(store.character().ability_scores.strength, 12);
    }

    #[test]
    fn test_select_class_clears_dependent_choices() {
        let mut store = store_with_class();
        store.update_character(|c| {
            c.skills.push("skill-arcana".to_string());
            c.cantrips_known.push("fire-bolt".to_string());
        });

        select_class(
            &mut store,
            &ClassEntry {
                index: "fighter".to_string(),
                name: "Fighter".to_string(),
                custom: false,
            },
        );

        let character = store.character();
        assert_eq!(character.class.as_ref().unwrap().index, "fighter");
        assert!(character.skills.is_empty());
        assert!(character.cantrips_known.is_empty());
    }

    #[test]
    fn test_spell_toggles_enforce_limits() {
        let mut store = store_with_class();
        assert!(toggle_cantrip(&mut store, "fire-bolt", 2));
        assert!(toggle_cantrip(&mut store, "light", 2));
        assert!(!toggle_cantrip(&mut store, "mage-hand", 2));
        // Unchecking always works.
        assert!(toggle_cantrip(&mut store, "fire-bolt", 2));
        assert_eq!(store.character().cantrips_known, vec!["light"]);
    }

    #[test]
    fn test_wizard_fallback_spell_count() {
        let store = store_with_class();
        let state = WizardState::default();
        assert_eq!(state.spells_to_choose(store.character()), 6);
    }

    #[test]
    fn test_finish_computes_hit_points() {
        let mut store = store_with_class();
        // CON 13 -> +1.
        let mut state = WizardState::default();
        state.class_detail = Some(
            serde_json::from_value(serde_json::json!({
                "index": "wizard",
                "name": "Wizard",
                "hit_die": 6
            }))
            .unwrap(),
        );
        state.finish(&mut store);

        let character = store.character();
        assert_eq!(character.max_hp, 7);
        assert_eq!(character.current_hp, 7);
        assert_eq!(character.hit_dice, "1d6");
        assert_eq!(character.proficiency_bonus, 2);
    }

    #[test]
    fn test_finish_ignores_negative_con_modifier() {
        let mut store = store_with_class();
        store.update_character(|c| c.ability_scores.assign(AbilityKey::Con, 8));
        let mut state = WizardState::default();
        state.class_detail = Some(
            serde_json::from_value(serde_json::json!({
                "index": "wizard",
                "name": "Wizard",
                "hit_die": 6
            }))
            .unwrap(),
        );
        state.finish(&mut store);
        assert_eq!(store.character().max_hp, 6);
    }
}
