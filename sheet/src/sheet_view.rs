//! The character sheet view: abilities, combat numbers, hit points,
//! skills, spells grouped by level, and the equipment inventory.

use std::collections::BTreeMap;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use sheet_core::character::{label_from_index, AbilityKey, Character};
use srd::types::SpellSummary;

/// The 18 skills of the game, in display order.
pub const ALL_SKILLS: [(&str, &str); 18] = [
    ("acrobatics", "Acrobatics"),
    ("animal-handling", "Animal Handling"),
    ("arcana", "Arcana"),
    ("athletics", "Athletics"),
    ("deception", "Deception"),
    ("history", "History"),
    ("insight", "Insight"),
    ("intimidation", "Intimidation"),
    ("investigation", "Investigation"),
    ("medicine", "Medicine"),
    ("nature", "Nature"),
    ("perception", "Perception"),
    ("performance", "Performance"),
    ("persuasion", "Persuasion"),
    ("religion", "Religion"),
    ("sleight-of-hand", "Sleight of Hand"),
    ("stealth", "Stealth"),
    ("survival", "Survival"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetMode {
    #[default]
    Normal,
    /// Typing a new inventory item index.
    AddingItem,
}

/// Sheet screen state.
#[derive(Default)]
pub struct SheetState {
    /// Known/prepared spells grouped by spell level, names resolved.
    pub spells_by_level: BTreeMap<u8, Vec<SpellSummary>>,
    pub spells_loaded: bool,
    pub mode: SheetMode,
    pub item_input: String,
    pub equipment_cursor: usize,
}

impl SheetState {
    /// Keep only the spells the character actually knows, grouped by level.
    pub fn set_spells(&mut self, spells: Vec<SpellSummary>, character: &Character) {
        let mut grouped: BTreeMap<u8, Vec<SpellSummary>> = BTreeMap::new();
        for spell in spells {
            let known = character.cantrips_known.contains(&spell.index)
                || character.spells_known.contains(&spell.index)
                || character.spells_prepared.contains(&spell.index);
            if known {
                grouped.entry(spell.level).or_default().push(spell);
            }
        }
        for list in grouped.values_mut() {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }
        self.spells_by_level = grouped;
        self.spells_loaded = true;
    }

    /// Normalize typed input into an item index: `Studded Leather` →
    /// `studded-leather`.
    pub fn normalized_item(&self) -> Option<String> {
        let index = self
            .item_input
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if index.is_empty() {
            None
        } else {
            Some(index)
        }
    }

    /// The equipment entry under the cursor.
    pub fn selected_item(&self, character: &Character) -> Option<String> {
        character
            .equipment_counts()
            .keys()
            .nth(self.equipment_cursor)
            .cloned()
    }

    pub fn clamp_cursor(&mut self, character: &Character) {
        let len = character.equipment_counts().len();
        if len == 0 {
            self.equipment_cursor = 0;
        } else {
            self.equipment_cursor = self.equipment_cursor.min(len - 1);
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, character: &Character) {
        frame.render_widget(Clear, area);

        if character.is_blank() {
            let block = Block::default().borders(Borders::ALL).title(" Sheet ");
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from("No character yet."),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Esc returns home; create a character from there.",
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
                .block(block),
                area,
            );
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(area);

        self.render_header(frame, rows[0], character);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(28),
                Constraint::Percentage(36),
                Constraint::Percentage(36),
            ])
            .split(rows[1]);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)])
            .split(columns[0]);
        self.render_abilities(frame, left[0], character);
        self.render_combat(frame, left[1], character);

        let middle = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);
        self.render_skills(frame, middle[0], character);
        self.render_spells(frame, middle[1], character);

        self.render_equipment(frame, columns[2], character);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let race = character.race.as_ref().map(|r| r.name.as_str()).unwrap_or("");
        let class = character.class.as_ref().map(|c| c.name.as_str()).unwrap_or("");
        let subclass = character
            .subclass
            .as_ref()
            .map(|s| format!(" ({})", s.name))
            .unwrap_or_default();
        let player = if character.player_name.is_empty() {
            String::new()
        } else {
            format!("{} · ", character.player_name)
        };

        let name = if character.name.is_empty() { "Unnamed" } else { &character.name };
        let lines = vec![
            Line::from(Span::styled(
                name.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "{player}{race} {class} level {}{subclass}",
                    character.level
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_abilities(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let block = Block::default().borders(Borders::ALL).title(" Abilities ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = AbilityKey::all()
            .into_iter()
            .map(|key| {
                let score = character.ability_scores.get(key);
                let modifier = character.ability_scores.modifier(key);
                let mod_str = if modifier >= 0 {
                    format!("+{modifier}")
                } else {
                    format!("{modifier}")
                };
                Line::from(format!("{} {score:>2} ({mod_str})", key.abbreviation()))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_combat(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let block = Block::default().borders(Borders::ALL).title(" Combat ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let init = character.initiative_modifier();
        let init_str = if init >= 0 { format!("+{init}") } else { format!("{init}") };

        let lines = vec![
            Line::from(format!(
                "HP: {} / {}  (+/- adjusts)",
                character.current_hp, character.max_hp
            )),
            Line::from(format!(
                "Hit dice: {} (used: {})",
                if character.hit_dice.is_empty() { "—" } else { &character.hit_dice },
                character.hit_dice_used
            )),
            Line::from(format!("Initiative: {init_str}")),
            Line::from(format!("Proficiency: +{}", character.proficiency_bonus)),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_skills(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let block = Block::default().borders(Borders::ALL).title(" Skills ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = ALL_SKILLS
            .iter()
            .map(|(index, name)| {
                if character.has_skill(index) {
                    Line::from(Span::styled(
                        format!("✓ {name}"),
                        Style::default().fg(Color::Green),
                    ))
                } else {
                    Line::from(format!("  {name}"))
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_spells(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let block = Block::default().borders(Borders::ALL).title(" Spells ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = Vec::new();
        let has_any = !character.cantrips_known.is_empty() || !character.spells_known.is_empty();

        if !has_any {
            lines.push(Line::from(Span::styled(
                "No spells recorded.",
                Style::default().fg(Color::DarkGray),
            )));
        } else if self.spells_by_level.is_empty() {
            // Names not resolved (fetch pending or failed): show raw indices.
            for index in character
                .cantrips_known
                .iter()
                .chain(character.spells_known.iter())
            {
                lines.push(Line::from(format!("  {}", label_from_index(index))));
            }
        } else {
            for (level, spells) in &self.spells_by_level {
                let label = if *level == 0 {
                    "Cantrips".to_string()
                } else {
                    format!("Level {level}")
                };
                lines.push(Line::from(Span::styled(
                    label,
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                for spell in spells {
                    let prepared = character.spells_prepared.contains(&spell.index);
                    let marker = if prepared { "◆" } else { " " };
                    lines.push(Line::from(format!(" {marker} {}", spell.name)));
                }
            }
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn render_equipment(&self, frame: &mut Frame, area: Rect, character: &Character) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Equipment ('a' adds, 'x' removes one) ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = Vec::new();
        let counts = character.equipment_counts();
        if counts.is_empty() {
            lines.push(Line::from(Span::styled(
                "No items.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for (i, (index, quantity)) in counts.iter().enumerate() {
            let name = label_from_index(index);
            let text = if *quantity > 1 {
                format!("{name} x{quantity}")
            } else {
                name
            };
            let style = if i == self.equipment_cursor && self.mode == SheetMode::Normal {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(text, style)));
        }

        if self.mode == SheetMode::AddingItem {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Add item: {}█", self.item_input),
                Style::default().fg(Color::Yellow),
            )));
            lines.push(Line::from(Span::styled(
                "Enter adds, Esc cancels",
                Style::default().fg(Color::DarkGray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_spells_filters_and_groups() {
        let character = Character::demo();
        let spells: Vec<SpellSummary> = serde_json::from_value(serde_json::json!([
            {"index": "fire-bolt", "name": "Fire Bolt", "level": 0},
            {"index": "magic-missile", "name": "Magic Missile", "level": 1},
            {"index": "fireball", "name": "Fireball", "level": 3},
            {"index": "wish", "name": "Wish", "level": 9}
        ]))
        .unwrap();

        let mut state = SheetState::default();
        state.set_spells(spells, &character);

        assert_eq!(state.spells_by_level.len(), 3);
        assert_eq!(state.spells_by_level[&0][0].name, "Fire Bolt");
        assert_eq!(state.spells_by_level[&3][0].name, "Fireball");
        // The demo wizard does not know Wish.
        assert!(!state.spells_by_level.contains_key(&9));
    }

    #[test]
    fn test_normalized_item() {
        let mut state = SheetState::default();
        state.item_input = "  Studded  Leather ".to_string();
        assert_eq!(state.normalized_item(), Some("studded-leather".to_string()));
        state.item_input = "   ".to_string();
        assert_eq!(state.normalized_item(), None);
    }

    #[test]
    fn test_selected_item_follows_sorted_order() {
        let mut character = Character::blank();
        character.add_equipment("rope");
        character.add_equipment("dagger");
        character.add_equipment("dagger");

        let mut state = SheetState::default();
        // BTreeMap order: dagger, rope.
        assert_eq!(state.selected_item(&character), Some("dagger".to_string()));
        state.equipment_cursor = 1;
        assert_eq!(state.selected_item(&character), Some("rope".to_string()));
        state.equipment_cursor = 9;
        state.clamp_cursor(&character);
        assert_eq!(state.equipment_cursor, 1);
    }
}
