//! The level-up workflow.
//!
//! Shows the character's current state next to the tasks for the next
//! pending level: hit points, ability score improvement when the class
//! grants one, features, and new spells when the class's known-spell counts
//! increase. Only `current level + 1` is ever unlocked; the reducer itself
//! rejects anything else as well.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use sheet_core::character::{AbilityKey, Character};
use sheet_core::progression::{improvements_from_selection, roll_hit_die, LevelUpSnapshot};
use srd::types::{ClassLevel, FeatureDetail, SpellSummary};

/// A selectable row in the pending-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelUpRow {
    TargetLevel,
    HpInput,
    Asi(AbilityKey),
    Cantrip(usize),
    Spell(usize),
    Apply,
}

/// Level-up screen state.
#[derive(Default)]
pub struct LevelUpState {
    pub target_level: u8,
    pub levels: Vec<ClassLevel>,
    pub hit_die: u8,
    pub is_custom: bool,
    pub loading: bool,
    pub error: Option<String>,

    pub class_spells: Vec<SpellSummary>,
    /// Feature details for the pending level.
    pub features: Vec<FeatureDetail>,

    // Choices for the pending level
    pub hp_input: String,
    pub asi_selected: Vec<AbilityKey>,
    pub cantrips_chosen: Vec<String>,
    pub spells_chosen: Vec<String>,

    pub cursor: usize,
}

impl LevelUpState {
    pub fn begin(character: &Character) -> Self {
        Self {
            target_level: (character.level + 1).min(20),
            hit_die: 8,
            loading: true,
            ..Self::default()
        }
    }

    pub fn set_levels(&mut self, hit_die: u8, levels: Vec<ClassLevel>, is_custom: bool) {
        self.hit_die = hit_die;
        self.levels = levels;
        self.is_custom = is_custom;
        self.loading = false;
        self.error = None;
    }

    /// Reset the per-level choices for a fresh pending level.
    pub fn prepare_pending(&mut self) {
        self.hp_input = self.hit_die.to_string();
        self.asi_selected.clear();
        self.cantrips_chosen.clear();
        self.spells_chosen.clear();
        self.features.clear();
        self.cursor = 0;
    }

    /// The next level that can be applied, when one remains below the target.
    pub fn pending_level(&self, character: &Character) -> Option<u8> {
        let next = character.level + 1;
        (next <= 20 && next <= self.target_level).then_some(next)
    }

    pub fn level_data(&self, level: u8) -> Option<&ClassLevel> {
        self.levels.iter().find(|l| l.level == level)
    }

    /// How many new cantrips and spells this level grants, from the delta of
    /// the known-spell counts against the previous level.
    pub fn spell_deltas(&self, level: u8) -> (usize, usize) {
        let current = self.level_data(level).and_then(|l| l.spellcasting);
        let previous = self.level_data(level.saturating_sub(1)).and_then(|l| l.spellcasting);

        let cantrips_now = current.and_then(|s| s.cantrips_known).unwrap_or(0);
        let cantrips_before = previous.and_then(|s| s.cantrips_known).unwrap_or(0);
        let spells_now = current.and_then(|s| s.spells_known).unwrap_or(0);
        let spells_before = previous.and_then(|s| s.spells_known).unwrap_or(0);

        (
            cantrips_now.saturating_sub(cantrips_before) as usize,
            spells_now.saturating_sub(spells_before) as usize,
        )
    }

    pub fn has_spell_choice(&self, level: u8) -> bool {
        let (cantrips, spells) = self.spell_deltas(level);
        cantrips > 0 || spells > 0
    }

    /// Custom classes track spells on paper; API casters must finish their
    /// picks before applying.
    pub fn spell_choice_complete(&self, level: u8) -> bool {
        if self.is_custom || !self.has_spell_choice(level) {
            return true;
        }
        let (cantrips, spells) = self.spell_deltas(level);
        self.cantrips_chosen.len() == cantrips && self.spells_chosen.len() == spells
    }

    /// Whether the pending level grants an ability score improvement.
    pub fn grants_asi(&self, level: u8) -> bool {
        self.level_data(level)
            .map(|l| l.ability_score_bonuses > 0)
            .unwrap_or(false)
    }

    pub fn cantrip_options(&self) -> Vec<&SpellSummary> {
        self.class_spells.iter().filter(|s| s.level == 0).collect()
    }

    pub fn spell_options(&self) -> Vec<&SpellSummary> {
        self.class_spells.iter().filter(|s| s.level == 1).collect()
    }

    /// The selectable rows of the pending-level block.
    pub fn rows(&self, character: &Character) -> Vec<LevelUpRow> {
        let mut rows = vec![LevelUpRow::TargetLevel];
        let Some(pending) = self.pending_level(character) else {
            return rows;
        };
        if self.level_data(pending).is_none() {
            return rows;
        }

        rows.push(LevelUpRow::HpInput);
        if self.grants_asi(pending) {
            for key in AbilityKey::all() {
                rows.push(LevelUpRow::Asi(key));
            }
        }
        if self.has_spell_choice(pending) && !self.is_custom {
            let (cantrips, spells) = self.spell_deltas(pending);
            if cantrips > 0 {
                for i in 0..self.cantrip_options().len() {
                    rows.push(LevelUpRow::Cantrip(i));
                }
            }
            if spells > 0 {
                for i in 0..self.spell_options().len() {
                    rows.push(LevelUpRow::Spell(i));
                }
            }
        }
        rows.push(LevelUpRow::Apply);
        rows
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

    /// Toggle an ASI chip: at most two abilities, re-selecting removes.
    pub fn toggle_asi(&mut self, ability: AbilityKey) {
        if let Some(pos) = self.asi_selected.iter().position(|a| *a == ability) {
            self.asi_selected.remove(pos);
        } else if self.asi_selected.len() < 2 {
            self.asi_selected.push(ability);
        }
    }

    /// Bounded toggle over the new-cantrip picks.
    pub fn toggle_cantrip(&mut self, index: &str, limit: usize) {
        if let Some(pos) = self.cantrips_chosen.iter().position(|c| c == index) {
            self.cantrips_chosen.remove(pos);
        } else if self.cantrips_chosen.len() < limit {
            self.cantrips_chosen.push(index.to_string());
        }
    }

    /// Bounded toggle over the new-spell picks.
    pub fn toggle_spell(&mut self, index: &str, limit: usize) {
        if let Some(pos) = self.spells_chosen.iter().position(|s| s == index) {
            self.spells_chosen.remove(pos);
        } else if self.spells_chosen.len() < limit {
            self.spells_chosen.push(index.to_string());
        }
    }

    pub fn edit_hp(&mut self, c: char) {
        if c.is_ascii_digit() && self.hp_input.len() < 3 {
            self.hp_input.push(c);
        }
    }

    pub fn backspace_hp(&mut self) {
        self.hp_input.pop();
    }

    pub fn roll_hp(&mut self) {
        self.hp_input = roll_hit_die(self.hit_die).to_string();
    }

    /// Rolled-or-typed hit points, at least 1, before the CON modifier.
    pub fn hp_value(&self) -> i32 {
        self.hp_input.parse::<i32>().unwrap_or(1).max(1)
    }

    /// Build the snapshot for the pending level.
    pub fn build_snapshot(&self, character: &Character) -> Option<LevelUpSnapshot> {
        let pending = self.pending_level(character)?;
        let data = self.level_data(pending)?;

        let con_mod = character.ability_scores.modifier(AbilityKey::Con).max(0);
        let mut snapshot = LevelUpSnapshot::new(pending, self.hp_value() + i32::from(con_mod));
        snapshot.ability_score_improvements = improvements_from_selection(&self.asi_selected);
        snapshot.cantrips_known = self.cantrips_chosen.clone();
        snapshot.spells_known = self.spells_chosen.clone();
        snapshot.features_granted = data.features.iter().map(|f| f.index.clone()).collect();
        Some(snapshot)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn render(&self, frame: &mut Frame, area: Rect, character: &Character, show_demo: bool) {
        frame.render_widget(Clear, area);

        if character.class.is_none() {
            let mut text = vec![
                Line::from("Create a character and pick a class first."),
                Line::from(""),
            ];
            if show_demo {
                text.push(Line::from(
                    "Or press 'd' to load the demo character (a level-5 wizard).",
                ));
            }
            text.push(Line::from(Span::styled(
                "Esc returns home",
                Style::default().fg(Color::DarkGray),
            )));
            let block = Block::default().borders(Borders::ALL).title(" Level Up ");
            frame.render_widget(Paragraph::new(text).block(block), area);
            return;
        }

        if self.loading {
            let block = Block::default().borders(Borders::ALL).title(" Level Up ");
            frame.render_widget(
                Paragraph::new("Loading class progression...").block(block),
                area,
            );
            return;
        }

        if let Some(error) = &self.error {
            let block = Block::default().borders(Borders::ALL).title(" Level Up ");
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(Span::styled(
                        error.clone(),
                        Style::default().fg(Color::Red),
                    )),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Press 'R' to retry, Esc to go home",
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
                .block(block)
                .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);

        self.render_current_state(frame, columns[0], character);
        self.render_pending_block(frame, columns[1], character);
    }

    fn render_current_state(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Current — level {} ", character.level));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let class_name = character
            .class
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("");
        let mut lines = vec![
            Line::from(format!("{} — {class_name}", character.name)),
            Line::from(""),
            Line::from(format!("Max HP: {}", character.max_hp)),
            Line::from(format!("Proficiency: +{}", character.proficiency_bonus)),
            Line::from(""),
        ];
        for key in AbilityKey::all() {
            lines.push(Line::from(format!(
                "{} {:>2}",
                key.abbreviation(),
                character.ability_scores.get(key)
            )));
        }
        if !character.spells_known.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Spells known: {}",
                character.spells_known.len()
            )));
            lines.push(Line::from(format!(
                "Cantrips known: {}",
                character.cantrips_known.len()
            )));
        }
        if !character.level_up_history.is_empty() {
            lines.push(Line::from(""));
            let applied = character
                .level_up_history
                .iter()
                .map(|s| s.level.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(Line::from(Span::styled(
                format!("Applied levels: {applied}"),
                Style::default().fg(Color::DarkGray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_pending_block(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let rows = self.rows(character);
        let pending = self.pending_level(character);

        let title = match pending {
            Some(level) => format!(" Level {level} — what to do "),
            None => " Level Up ".to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let style_for = |row: LevelUpRow| {
            if rows.get(self.cursor) == Some(&row) {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default()
            }
        };

        let mut lines = Vec::new();

        // Target level selector.
        lines.push(Line::from(Span::styled(
            format!(
                "Level up to: {}  (Left/Right adjusts, 2..20)",
                self.target_level
            ),
            style_for(LevelUpRow::TargetLevel),
        )));
        lines.push(Line::from(""));

        let Some(pending) = pending else {
            lines.push(Line::from("Pick a target level above the current one."));
            frame.render_widget(Paragraph::new(lines), inner);
            return;
        };

        if self.level_data(pending).is_none() {
            lines.push(Line::from(format!(
                "Level {pending} — no progression data found"
            )));
            frame.render_widget(Paragraph::new(lines), inner);
            return;
        };

        // Hit points.
        let con_mod = character.ability_scores.modifier(AbilityKey::Con);
        lines.push(Line::from(Span::styled(
            format!(
                "1. Hit points: roll 1d{} or type a value: [{}]  ('r' rolls)",
                self.hit_die, self.hp_input
            ),
            style_for(LevelUpRow::HpInput),
        )));
        lines.push(Line::from(Span::styled(
            format!(
                "   + CON modifier ({con_mod}) = {} HP this level",
                self.hp_value() + i32::from(con_mod.max(0))
            ),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));

        // Ability score improvement.
        if self.grants_asi(pending) {
            lines.push(Line::from(
                "2. Ability score improvement: one ability (+2) or two (+1 each)",
            ));
            let mut spans = vec![Span::raw("   ")];
            for key in AbilityKey::all() {
                let chosen = self.asi_selected.contains(&key);
                let base = if chosen {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let style = if self.rows(character).get(self.cursor) == Some(&LevelUpRow::Asi(key))
                {
                    base.bg(Color::Blue)
                } else {
                    base
                };
                spans.push(Span::styled(
                    format!("[{}{}] ", if chosen { "+" } else { " " }, key.abbreviation()),
                    style,
                ));
            }
            lines.push(Line::from(spans));
            let improvements = improvements_from_selection(&self.asi_selected);
            if !improvements.is_empty() {
                let chosen = improvements
                    .iter()
                    .map(|i| format!("+{} {}", i.amount, i.ability.abbreviation()))
                    .collect::<Vec<_>>()
                    .join(" ");
                lines.push(Line::from(Span::styled(
                    format!("   Chosen: {chosen}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines.push(Line::from(""));
        }

        // Features.
        if !self.features.is_empty() {
            lines.push(Line::from("3. Features at this level:"));
            for feature in &self.features {
                lines.push(Line::from(Span::styled(
                    format!("   {}", feature.name),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                if let Some(first) = feature.desc.first() {
                    lines.push(Line::from(Span::styled(
                        format!("     {first}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            lines.push(Line::from(""));
        }

        // New spells.
        if self.has_spell_choice(pending) {
            let (new_cantrips, new_spells) = self.spell_deltas(pending);
            if self.is_custom {
                lines.push(Line::from(
                    "4. New spells: homebrew class, note them on the sheet yourself.",
                ));
            } else {
                lines.push(Line::from("4. New spells known:"));
                if new_cantrips > 0 {
                    lines.push(Line::from(format!(
                        "   Cantrips — choose {new_cantrips} ({} picked):",
                        self.cantrips_chosen.len()
                    )));
                    for (i, spell) in self.cantrip_options().iter().enumerate() {
                        let checked = self.cantrips_chosen.contains(&spell.index);
                        let marker = if checked { "[x]" } else { "[ ]" };
                        lines.push(Line::from(Span::styled(
                            format!("     {marker} {}", spell.name),
                            style_for(LevelUpRow::Cantrip(i)),
                        )));
                    }
                }
                if new_spells > 0 {
                    lines.push(Line::from(format!(
                        "   1st-level spells — choose {new_spells} ({} picked):",
                        self.spells_chosen.len()
                    )));
                    for (i, spell) in self.spell_options().iter().enumerate() {
                        let checked = self.spells_chosen.contains(&spell.index);
                        let marker = if checked { "[x]" } else { "[ ]" };
                        lines.push(Line::from(Span::styled(
                            format!("     {marker} {}", spell.name),
                            style_for(LevelUpRow::Spell(i)),
                        )));
                    }
                }
            }
            lines.push(Line::from(""));
        }

        let apply_label = if self.spell_choice_complete(pending) {
            format!("[ Apply level {pending} ]")
        } else {
            format!("[ Apply level {pending} ] (finish spell picks first)")
        };
        lines.push(Line::from(Span::styled(
            apply_label,
            style_for(LevelUpRow::Apply),
        )));

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "j/k moves, Space toggles, Enter applies, Esc goes home",
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }),
            inner,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wizard_levels() -> Vec<ClassLevel> {
        serde_json::from_value(json!([
            {
                "level": 1,
                "prof_bonus": 2,
                "features": [],
                "spellcasting": {"cantrips_known": 3, "spells_known": 6}
            },
            {
                "level": 2,
                "prof_bonus": 2,
                "features": [{"index": "arcane-tradition", "name": "Arcane Tradition", "url": ""}],
                "spellcasting": {"cantrips_known": 3, "spells_known": 8}
            },
            {
                "level": 4,
                "ability_score_bonuses": 1,
                "prof_bonus": 2,
                "features": [],
                "spellcasting": {"cantrips_known": 4, "spells_known": 10}
            }
        ]))
        .unwrap()
    }

    fn leveled_character(level: u8) -> Character {
        let mut character = Character::demo();
        character.level = level;
        character
    }

    #[test]
    fn test_spell_deltas() {
        let mut state = LevelUpState::default();
        state.set_levels(6, wizard_levels(), false);

        // Level 2: same cantrips, two new spells.
        assert_eq!(state.spell_deltas(2), (0, 2));
        // Level 4 compares against level 3, which is missing: full counts.
        assert_eq!(state.spell_deltas(4), (4, 10));
    }

    #[test]
    fn test_spell_choice_gates_apply() {
        let mut state = LevelUpState::default();
        state.set_levels(6, wizard_levels(), false);

        assert!(state.has_spell_choice(2));
        assert!(!state.spell_choice_complete(2));

        state.toggle_spell("misty-step", 2);
        state.toggle_spell("scorching-ray", 2);
        assert!(state.spell_choice_complete(2));

        // Bounded: a third pick is ignored.
        state.toggle_spell("shield", 2);
        assert_eq!(state.spells_chosen.len(), 2);
    }

    #[test]
    fn test_custom_classes_skip_spell_picks() {
        let mut state = LevelUpState::default();
        state.set_levels(10, wizard_levels(), true);
        assert!(state.spell_choice_complete(2));
    }

    #[test]
    fn test_asi_toggle_caps_at_two() {
        let mut state = LevelUpState::default();
        state.toggle_asi(AbilityKey::Str);
        state.toggle_asi(AbilityKey::Dex);
        state.toggle_asi(AbilityKey::Con);
        assert_eq!(state.asi_selected, vec![AbilityKey::Str, AbilityKey::Dex]);

        state.toggle_asi(AbilityKey::Str);
        assert_eq!(state.asi_selected, vec![AbilityKey::Dex]);
    }

    #[test]
    fn test_build_snapshot_adds_con_modifier() {
        let mut state = LevelUpState::default();
        state.set_levels(6, wizard_levels(), false);
        state.target_level = 2;
        state.hp_input = "4".to_string();
        state.toggle_spell("misty-step", 2);

        // Demo wizard has CON 13 (+1) and sits at level 1 here.
        let character = leveled_character(1);
        let snapshot = state.build_snapshot(&character).unwrap();

        assert_eq!(snapshot.level, 2);
        assert_eq!(snapshot.hp_gained, 5);
        assert_eq!(snapshot.spells_known, vec!["misty-step"]);
        assert_eq!(snapshot.features_granted, vec!["arcane-tradition"]);
    }

    #[test]
    fn test_pending_level_respects_target() {
        let mut state = LevelUpState::default();
        state.set_levels(6, wizard_levels(), false);
        state.target_level = 2;

        assert_eq!(state.pending_level(&leveled_character(1)), Some(2));
        assert_eq!(state.pending_level(&leveled_character(2)), None);
    }

    #[test]
    fn test_hp_input_floor() {
        let mut state = LevelUpState::default();
        state.hp_input = String::new();
        assert_eq!(state.hp_value(), 1);
        state.hp_input = "0".to_string();
        assert_eq!(state.hp_value(), 1);
        state.edit_hp('7');
        assert_eq!(state.hp_value(), 7);
    }
}
