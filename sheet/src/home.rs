//! The home screen: character summary, navigation, export/import and the
//! optional demo-character card.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use sheet_core::character::Character;

/// Actions reachable from the home menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeAction {
    CreateCharacter,
    ViewSheet,
    LevelUp,
    CustomClasses,
    Export,
    Import,
    LoadDemo,
    ResetCharacter,
    Quit,
}

impl HomeAction {
    fn label(&self) -> &'static str {
        match self {
            HomeAction::CreateCharacter => "Create character",
            HomeAction::ViewSheet => "View sheet",
            HomeAction::LevelUp => "Level up",
            HomeAction::CustomClasses => "Custom classes",
            HomeAction::Export => "Export sheet to JSON",
            HomeAction::Import => "Import sheet from JSON",
            HomeAction::LoadDemo => "Load demo character",
            HomeAction::ResetCharacter => "Reset character",
            HomeAction::Quit => "Quit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomeMode {
    #[default]
    Menu,
    /// Typing the path of a sheet file to import.
    ImportPath,
}

/// Home screen state.
#[derive(Default)]
pub struct HomeState {
    pub list_state: ListState,
    pub mode: HomeMode,
    pub path_input: String,
}

impl HomeState {
    /// The menu for the current character and configuration.
    pub fn actions(character: &Character, show_demo: bool) -> Vec<HomeAction> {
        let mut actions = Vec::new();
        if character.is_blank() {
            actions.push(HomeAction::CreateCharacter);
        } else {
            actions.push(HomeAction::ViewSheet);
            actions.push(HomeAction::LevelUp);
            actions.push(HomeAction::CreateCharacter);
        }
        actions.push(HomeAction::CustomClasses);
        actions.push(HomeAction::Export);
        actions.push(HomeAction::Import);
        if show_demo {
            actions.push(HomeAction::LoadDemo);
        }
        if !character.is_blank() {
            actions.push(HomeAction::ResetCharacter);
        }
        actions.push(HomeAction::Quit);
        actions
    }

    pub fn selected_action(&self, character: &Character, show_demo: bool) -> Option<HomeAction> {
        let actions = Self::actions(character, show_demo);
        actions.get(self.list_state.selected().unwrap_or(0)).copied()
    }

    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        character: &Character,
        show_demo: bool,
    ) {
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                "D&D 5e Sheet Helper",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Character creation and level-up, backed by the SRD API (www.dnd5eapi.co).",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(summary_line(character)),
        ]);
        frame.render_widget(header, chunks[0]);

        let items: Vec<ListItem> = Self::actions(character, show_demo)
            .iter()
            .map(|a| ListItem::new(a.label()))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" Menu "))
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
            .highlight_symbol("> ");
        if self.list_state.selected().is_none() {
            self.list_state.select(Some(0));
        }
        frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

        if self.mode == HomeMode::ImportPath {
            let input = Paragraph::new(format!("{}█", self.path_input)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Path to sheet file (Enter imports, Esc cancels) ")
                    .border_style(Style::default().fg(Color::Yellow)),
            );
            frame.render_widget(input, chunks[2]);
        } else {
            let help = Paragraph::new(Span::styled(
                "j/k moves, Enter selects, q quits",
                Style::default().fg(Color::DarkGray),
            ));
            frame.render_widget(help, chunks[2]);
        }
    }
}

fn summary_line(character: &Character) -> Span<'static> {
    if character.is_blank() {
        Span::styled(
            "No character yet.".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        let class = character
            .class
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("no class");
        let name = if character.name.is_empty() { "Unnamed" } else { &character.name };
        Span::raw(format!(
            "Current: {name} — {class} level {}",
            character.level
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_adapts_to_character() {
        let blank = Character::blank();
        let actions = HomeState::actions(&blank, false);
        assert_eq!(actions[0], HomeAction::CreateCharacter);
        assert!(!actions.contains(&HomeAction::ViewSheet));
        assert!(!actions.contains(&HomeAction::LoadDemo));
        assert!(!actions.contains(&HomeAction::ResetCharacter));

        let demo = Character::demo();
        let actions = HomeState::actions(&demo, true);
        assert_eq!(actions[0], HomeAction::ViewSheet);
        assert!(actions.contains(&HomeAction::LevelUp));
        assert!(actions.contains(&HomeAction::LoadDemo));
        assert!(actions.contains(&HomeAction::ResetCharacter));
    }
}
