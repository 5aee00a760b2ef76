//! The homebrew class manager: list, create, edit and delete custom
//! classes with their pre-filled 20-level progression.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use sheet_core::custom_class::{CustomClass, CUSTOM_HIT_DICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassesMode {
    #[default]
    List,
    Edit,
}

/// Fields of the edit form, in Tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditField {
    #[default]
    Name,
    HitDie,
    Save,
    Cancel,
}

impl EditField {
    pub fn next(&self) -> EditField {
        match self {
            EditField::Name => EditField::HitDie,
            EditField::HitDie => EditField::Save,
            EditField::Save => EditField::Cancel,
            EditField::Cancel => EditField::Name,
        }
    }

    pub fn prev(&self) -> EditField {
        match self {
            EditField::Name => EditField::Cancel,
            EditField::HitDie => EditField::Name,
            EditField::Save => EditField::HitDie,
            EditField::Cancel => EditField::Save,
        }
    }
}

/// Custom-class screen state.
#[derive(Default)]
pub struct ClassesState {
    pub list_state: ListState,
    pub mode: ClassesMode,
    pub editing: Option<CustomClass>,
    pub field: EditField,
    /// Id awaiting delete confirmation.
    pub confirm_delete: Option<String>,
}

impl ClassesState {
    pub fn start_new(&mut self) {
        self.editing = Some(CustomClass::blank());
        self.mode = ClassesMode::Edit;
        self.field = EditField::Name;
    }

    pub fn start_edit(&mut self, class: CustomClass) {
        self.editing = Some(class);
        self.mode = ClassesMode::Edit;
        self.field = EditField::Name;
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.mode = ClassesMode::List;
    }

    /// Cycle the hit die of the class being edited.
    pub fn cycle_hit_die(&mut self, forward: bool) {
        let Some(editing) = &mut self.editing else {
            return;
        };
        let position = CUSTOM_HIT_DICE
            .iter()
            .position(|d| *d == editing.hit_die)
            .unwrap_or(1);
        let next = if forward {
            (position + 1) % CUSTOM_HIT_DICE.len()
        } else {
            (position + CUSTOM_HIT_DICE.len() - 1) % CUSTOM_HIT_DICE.len()
        };
        editing.hit_die = CUSTOM_HIT_DICE[next];
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, classes: &[CustomClass]) {
        frame.render_widget(Clear, area);
        match self.mode {
            ClassesMode::List => self.render_list(frame, area, classes),
            ClassesMode::Edit => self.render_edit(frame, area),
        }
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect, classes: &[CustomClass]) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(2)])
            .split(area);

        let items: Vec<ListItem> = if classes.is_empty() {
            vec![ListItem::new("No custom classes yet — press 'n' to create one.")]
        } else {
            classes
                .iter()
                .map(|c| {
                    let name = if c.name.is_empty() { "(unnamed)" } else { &c.name };
                    ListItem::new(format!("{name}  d{}", c.hit_die))
                })
                .collect()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Custom Classes "),
            )
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
            .highlight_symbol("> ");
        if self.list_state.selected().is_none() {
            self.list_state.select(Some(0));
        }
        frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

        let help = if let Some(_id) = &self.confirm_delete {
            Paragraph::new(Span::styled(
                "Delete this class? y confirms, n cancels",
                Style::default().fg(Color::Red),
            ))
        } else {
            Paragraph::new(Span::styled(
                "n new, Enter edits, d deletes, Esc goes home",
                Style::default().fg(Color::DarkGray),
            ))
        };
        frame.render_widget(help, chunks[1]);
    }

    fn render_edit(&mut self, frame: &mut Frame, area: Rect) {
        let Some(editing) = &self.editing else {
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(4),
            ])
            .split(area);

        let focused = Style::default().fg(Color::Yellow);
        let blurred = Style::default().fg(Color::DarkGray);

        let name = Paragraph::new(format!(
            "{}{}",
            editing.name,
            if self.field == EditField::Name { "█" } else { "" }
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Class name ")
                .border_style(if self.field == EditField::Name { focused } else { blurred }),
        );
        frame.render_widget(name, chunks[0]);

        let hit_die_style = if self.field == EditField::HitDie {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("Hit die: "),
                Span::styled(format!("d{}", editing.hit_die), hit_die_style),
                Span::styled("  (Left/Right cycles)", Style::default().fg(Color::DarkGray)),
            ])),
            chunks[1],
        );

        let button = |label: &str, field: EditField| {
            if self.field == field {
                Span::styled(
                    format!("[ {label} ]"),
                    Style::default().bg(Color::Blue).fg(Color::White),
                )
            } else {
                Span::raw(format!("[ {label} ]"))
            }
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                button("Save", EditField::Save),
                Span::raw("  "),
                button("Cancel", EditField::Cancel),
            ])),
            chunks[2],
        );

        // Progression summary, first half of the table.
        let mut lines = vec![Line::from(Span::styled(
            "Progression (levels 1-10; 11-20 follow the same pattern, ASI at 12/14/16/19):",
            Style::default().fg(Color::DarkGray),
        ))];
        for level in editing.levels.iter().take(10) {
            lines.push(Line::from(format!(
                "Level {:>2}  ASI: {}  Prof: +{}  Features: {}",
                level.level,
                level.ability_score_bonuses,
                level.prof_bonus,
                level.feature_ids.len()
            )));
        }
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Levels ")),
            chunks[3],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_die_cycles_through_valid_dice() {
        let mut state = ClassesState::default();
        state.start_new();
        assert_eq!(state.editing.as_ref().unwrap().hit_die, 8);

        state.cycle_hit_die(true);
        assert_eq!(state.editing.as_ref().unwrap().hit_die, 10);
        state.cycle_hit_die(true);
        state.cycle_hit_die(true);
        assert_eq!(state.editing.as_ref().unwrap().hit_die, 6);
        state.cycle_hit_die(false);
        assert_eq!(state.editing.as_ref().unwrap().hit_die, 12);
    }

    #[test]
    fn test_edit_field_tab_order() {
        let mut field = EditField::Name;
        for expected in [
            EditField::HitDie,
            EditField::Save,
            EditField::Cancel,
            EditField::Name,
        ] {
            field = field.next();
            assert_eq!(field, expected);
        }
        assert_eq!(EditField::Name.prev(), EditField::Cancel);
    }
}
