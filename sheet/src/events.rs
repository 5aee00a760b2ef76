//! Event handling: one router per screen, over shared app state.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

use sheet_core::character::{AbilityKey, STANDARD_ABILITY_ARRAY};

use crate::app::{App, Screen};
use crate::classes_view::{ClassesMode, EditField};
use crate::fetch::FetchRequest;
use crate::home::{HomeAction, HomeMode};
use crate::level_up::LevelUpRow;
use crate::sheet_view::SheetMode;
use crate::wizard::{self, BasicsField, WizardRow, WizardStep};

/// Result of handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event.
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    match app.screen {
        Screen::Home => handle_home(app, key),
        Screen::Wizard => handle_wizard(app, key),
        Screen::Sheet => handle_sheet(app, key),
        Screen::LevelUp => handle_level_up(app, key),
        Screen::CustomClasses => handle_classes(app, key),
    }
}

// ============================================================================
// Home
// ============================================================================

fn handle_home(app: &mut App, key: KeyEvent) -> EventResult {
    if app.home.mode == HomeMode::ImportPath {
        match key.code {
            KeyCode::Esc => {
                app.home.mode = HomeMode::Menu;
                app.home.path_input.clear();
            }
            KeyCode::Enter => import_from_path(app),
            KeyCode::Backspace => {
                app.home.path_input.pop();
            }
            KeyCode::Char(c) => app.home.path_input.push(c),
            _ => {}
        }
        return EventResult::NeedsRedraw;
    }

    let actions_len = {
        let character = app.store.character();
        crate::home::HomeState::actions(character, app.show_demo).len()
    };

    match key.code {
        KeyCode::Char('q') => return EventResult::Quit,
        KeyCode::Up | KeyCode::Char('k') => {
            let i = app.home.list_state.selected().unwrap_or(0);
            app.home
                .list_state
                .select(Some(if i == 0 { actions_len - 1 } else { i - 1 }));
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let i = app.home.list_state.selected().unwrap_or(0);
            app.home.list_state.select(Some((i + 1) % actions_len));
        }
        KeyCode::Enter => return activate_home_action(app),
        _ => {}
    }
    EventResult::NeedsRedraw
}

fn activate_home_action(app: &mut App) -> EventResult {
    let Some(action) = app
        .home
        .selected_action(app.store.character(), app.show_demo)
    else {
        return EventResult::Continue;
    };

    match action {
        HomeAction::CreateCharacter => app.goto(Screen::Wizard),
        HomeAction::ViewSheet => app.goto(Screen::Sheet),
        HomeAction::LevelUp => app.goto(Screen::LevelUp),
        HomeAction::CustomClasses => app.goto(Screen::CustomClasses),
        HomeAction::Export => {
            let file_name = app.store.export_file_name();
            match std::fs::write(&file_name, app.store.export_character()) {
                Ok(()) => app.set_status(format!("Exported to {file_name}")),
                Err(e) => app.set_status(format!("Export failed: {e}")),
            }
        }
        HomeAction::Import => app.home.mode = HomeMode::ImportPath,
        HomeAction::LoadDemo => app.load_demo(),
        HomeAction::ResetCharacter => {
            app.store.reset_character();
            app.set_status("Character reset");
        }
        HomeAction::Quit => return EventResult::Quit,
    }
    EventResult::NeedsRedraw
}

fn import_from_path(app: &mut App) {
    let path = app.home.path_input.trim().to_string();
    app.home.mode = HomeMode::Menu;
    app.home.path_input.clear();
    if path.is_empty() {
        return;
    }
    match std::fs::read_to_string(&path) {
        Ok(text) => match app.store.import_character(&text) {
            Ok(()) => app.set_status("Sheet imported"),
            Err(e) => app.set_status(e.to_string()),
        },
        Err(e) => app.set_status(format!("Could not read {path}: {e}")),
    }
}

// ============================================================================
// Wizard
// ============================================================================

fn handle_wizard(app: &mut App, key: KeyEvent) -> EventResult {
    if key.code == KeyCode::Esc {
        match app.wizard.step.prev() {
            Some(prev) => enter_step(app, prev),
            None => app.goto(Screen::Home),
        }
        return EventResult::NeedsRedraw;
    }

    match app.wizard.step {
        WizardStep::Basics => handle_wizard_basics(app, key),
        WizardStep::Race => handle_wizard_race(app, key),
        WizardStep::Class => handle_wizard_class(app, key),
        WizardStep::Abilities => handle_wizard_abilities(app, key),
        WizardStep::Skills => handle_wizard_skills(app, key),
        WizardStep::Equipment => handle_wizard_equipment(app, key),
        WizardStep::Spells => handle_wizard_spells(app, key),
    }
    EventResult::NeedsRedraw
}

/// Move to a wizard step and kick off the fetches it depends on.
fn enter_step(app: &mut App, step: WizardStep) {
    app.wizard.step = step;
    app.wizard.cursor = 0;
    app.wizard.list_state.select(Some(0));
    let requests = app.wizard.step_requests(app.store.character());
    for request in requests {
        app.request(request);
    }
}

/// After a selection change invalidated the generation, re-request whatever
/// reference data has not arrived yet.
fn refresh_wizard_requests(app: &mut App) {
    if app.wizard.races.is_empty() {
        app.request(FetchRequest::RaceList);
    }
    if app.wizard.classes.is_empty() {
        app.request(FetchRequest::ClassList);
    }
    if app.wizard.race_detail.is_none() {
        if let Some(race) = app.store.character().race.clone() {
            app.request(FetchRequest::RaceDetail { index: race.index });
        }
    }
}

fn handle_wizard_basics(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            app.wizard.basics_field = match app.wizard.basics_field {
                BasicsField::Name => BasicsField::Player,
                BasicsField::Player => BasicsField::Name,
            };
        }
        KeyCode::Enter => enter_step(app, WizardStep::Race),
        KeyCode::Backspace => {
            let field = app.wizard.basics_field;
            app.store.update_character(|c| {
                match field {
                    BasicsField::Name => c.name.pop(),
                    BasicsField::Player => c.player_name.pop(),
                };
            });
        }
        KeyCode::Char(c) => {
            let field = app.wizard.basics_field;
            app.store.update_character(|ch| match field {
                BasicsField::Name => {
                    if ch.name.len() < 30 {
                        ch.name.push(c);
                    }
                }
                BasicsField::Player => {
                    if ch.player_name.len() < 30 {
                        ch.player_name.push(c);
                    }
                }
            });
        }
        _ => {}
    }
}

fn handle_wizard_race(app: &mut App, key: KeyEvent) {
    let len = app.wizard.races.len().max(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            let i = app.wizard.list_state.selected().unwrap_or(0);
            app.wizard
                .list_state
                .select(Some(if i == 0 { len - 1 } else { i - 1 }));
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let i = app.wizard.list_state.selected().unwrap_or(0);
            app.wizard.list_state.select(Some((i + 1) % len));
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(race) = app
                .wizard
                .list_state
                .selected()
                .and_then(|i| app.wizard.races.get(i).cloned())
            {
                wizard::select_race(&mut app.store, &race);
                app.wizard.race_detail = None;
                // The old race's detail fetch is stale now.
                app.bump_generation();
                refresh_wizard_requests(app);
                if key.code == KeyCode::Enter {
                    enter_step(app, WizardStep::Class);
                }
            }
        }
        _ => {}
    }
}

fn handle_wizard_class(app: &mut App, key: KeyEvent) {
    let len = app.wizard.classes.len().max(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            let i = app.wizard.list_state.selected().unwrap_or(0);
            app.wizard
                .list_state
                .select(Some(if i == 0 { len - 1 } else { i - 1 }));
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let i = app.wizard.list_state.selected().unwrap_or(0);
            app.wizard.list_state.select(Some((i + 1) % len));
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(entry) = app
                .wizard
                .list_state
                .selected()
                .and_then(|i| app.wizard.classes.get(i).cloned())
            {
                wizard::select_class(&mut app.store, &entry);
                app.wizard.class_detail = None;
                app.wizard.class_spells.clear();
                app.wizard.level_one = None;
                app.wizard.level_one_loaded = false;
                if entry.custom {
                    app.wizard.recompute_custom_choice_data(&entry.index);
                } else {
                    app.wizard.recompute_choice_data();
                }
                app.bump_generation();
                refresh_wizard_requests(app);
                if !entry.custom {
                    app.request(FetchRequest::ClassDetail {
                        index: entry.index.clone(),
                    });
                }
                if key.code == KeyCode::Enter {
                    enter_step(app, WizardStep::Abilities);
                }
            }
        }
        _ => {}
    }
}

fn handle_wizard_abilities(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.wizard.ability_cursor = app.wizard.ability_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.wizard.ability_cursor = (app.wizard.ability_cursor + 1).min(5);
        }
        KeyCode::Char(c @ '1'..='6') => {
            let slot = c.to_digit(10).unwrap() as usize - 1;
            let value = STANDARD_ABILITY_ARRAY[slot];
            let ability = AbilityKey::all()[app.wizard.ability_cursor];
            wizard::assign_ability(&mut app.store, ability, value);
        }
        KeyCode::Enter => enter_step(app, WizardStep::Skills),
        _ => {}
    }
}

fn handle_wizard_skills(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.wizard.move_cursor(-1, app.store.character()),
        KeyCode::Down | KeyCode::Char('j') => app.wizard.move_cursor(1, app.store.character()),
        KeyCode::Char(' ') | KeyCode::Enter => {
            let rows = app.wizard.rows(app.store.character());
            if let Some(WizardRow::SkillOption { group, option }) =
                rows.get(app.wizard.cursor).copied()
            {
                let Some(index) = app
                    .wizard
                    .skill_groups
                    .get(group)
                    .and_then(|g| g.options.get(option))
                    .map(|o| o.index.clone())
                else {
                    return;
                };
                let toggled = wizard::toggle_skill(
                    &mut app.store,
                    &app.wizard.skill_groups,
                    &app.wizard.fixed_skills,
                    group,
                    &index,
                );
                if !toggled {
                    app.set_status("This group's choice limit is reached");
                }
            }
        }
        KeyCode::Tab => enter_step(app, WizardStep::Equipment),
        _ => {}
    }
}

fn handle_wizard_equipment(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.wizard.move_cursor(-1, app.store.character()),
        KeyCode::Down | KeyCode::Char('j') => app.wizard.move_cursor(1, app.store.character()),
        KeyCode::Char(' ') | KeyCode::Enter => {
            let rows = app.wizard.rows(app.store.character());
            match rows.get(app.wizard.cursor).copied() {
                Some(WizardRow::EquipOption { group, option }) => {
                    app.wizard.select_equipment_option(group, option);
                    let category = app
                        .wizard
                        .equipment_groups
                        .get(group)
                        .and_then(|g| g.options.get(option))
                        .and_then(|o| o.category())
                        .map(|(index, _)| index.to_string());
                    if let Some(index) = category {
                        if !app.wizard.category_items.contains_key(&index) {
                            app.request(FetchRequest::EquipmentCategory { index });
                        }
                    }
                }
                Some(WizardRow::EquipCategoryItem { group, item }) => {
                    let Some(index) = app
                        .wizard
                        .selected_category_items(group)
                        .and_then(|items| items.get(item))
                        .map(|i| i.index.clone())
                    else {
                        return;
                    };
                    if let Some(pick) = app.wizard.category_picks.get_mut(group) {
                        if !pick.toggle(&index) {
                            app.set_status("This category's pick limit is reached");
                        }
                    }
                }
                _ => {}
            }
        }
        KeyCode::Tab => {
            if app.wizard.has_spellcasting(app.store.character()) {
                enter_step(app, WizardStep::Spells);
            } else {
                finish_wizard(app);
            }
        }
        _ => {}
    }
}

fn handle_wizard_spells(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.wizard.move_cursor(-1, app.store.character()),
        KeyCode::Down | KeyCode::Char('j') => app.wizard.move_cursor(1, app.store.character()),
        KeyCode::Char(' ') | KeyCode::Enter => {
            let rows = app.wizard.rows(app.store.character());
            match rows.get(app.wizard.cursor).copied() {
                Some(WizardRow::Cantrip(i)) => {
                    let Some(index) = app.wizard.cantrip_list().get(i).map(|s| s.index.clone())
                    else {
                        return;
                    };
                    let limit = app.wizard.cantrips_to_choose();
                    if !wizard::toggle_cantrip(&mut app.store, &index, limit) {
                        app.set_status("All cantrip picks are used");
                    }
                }
                Some(WizardRow::Spell(i)) => {
                    let Some(index) = app
                        .wizard
                        .level_one_spell_list()
                        .get(i)
                        .map(|s| s.index.clone())
                    else {
                        return;
                    };
                    let limit = app.wizard.spells_to_choose(app.store.character());
                    if !wizard::toggle_spell(&mut app.store, &index, limit) {
                        app.set_status("All spell picks are used");
                    }
                }
                _ => {}
            }
        }
        KeyCode::Tab => finish_wizard(app),
        _ => {}
    }
}

fn finish_wizard(app: &mut App) {
    app.wizard.finish(&mut app.store);
    app.set_status("Character created");
    app.goto(Screen::Sheet);
}

// ============================================================================
// Sheet
// ============================================================================

fn handle_sheet(app: &mut App, key: KeyEvent) -> EventResult {
    if app.sheet.mode == SheetMode::AddingItem {
        match key.code {
            KeyCode::Esc => {
                app.sheet.mode = SheetMode::Normal;
                app.sheet.item_input.clear();
            }
            KeyCode::Enter => {
                if let Some(index) = app.sheet.normalized_item() {
                    app.store.update_character(|c| c.add_equipment(index));
                }
                app.sheet.mode = SheetMode::Normal;
                app.sheet.item_input.clear();
            }
            KeyCode::Backspace => {
                app.sheet.item_input.pop();
            }
            KeyCode::Char(c) => app.sheet.item_input.push(c),
            _ => {}
        }
        return EventResult::NeedsRedraw;
    }

    match key.code {
        KeyCode::Esc => app.goto(Screen::Home),
        KeyCode::Char('u') => app.goto(Screen::LevelUp),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.store.update_character(|c| c.set_current_hp(c.current_hp + 1));
        }
        KeyCode::Char('-') => {
            app.store.update_character(|c| c.set_current_hp(c.current_hp - 1));
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.sheet.equipment_cursor = app.sheet.equipment_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.sheet.equipment_cursor += 1;
            app.sheet.clamp_cursor(app.store.character());
        }
        KeyCode::Char('a') => app.sheet.mode = SheetMode::AddingItem,
        KeyCode::Char('x') => {
            if let Some(index) = app.sheet.selected_item(app.store.character()) {
                app.store.update_character(|c| c.remove_equipment_one(&index));
                app.sheet.clamp_cursor(app.store.character());
            }
        }
        _ => {}
    }
    EventResult::NeedsRedraw
}

// ============================================================================
// Level up
// ============================================================================

fn handle_level_up(app: &mut App, key: KeyEvent) -> EventResult {
    if key.code == KeyCode::Esc {
        app.goto(Screen::Home);
        return EventResult::NeedsRedraw;
    }

    if app.store.character().class.is_none() {
        if key.code == KeyCode::Char('d') && app.show_demo {
            app.load_demo();
            app.goto(Screen::LevelUp);
        }
        return EventResult::NeedsRedraw;
    }

    if app.level_up.error.is_some() {
        if key.code == KeyCode::Char('R') {
            app.goto(Screen::LevelUp);
        }
        return EventResult::NeedsRedraw;
    }

    let rows = app.level_up.rows(app.store.character());
    let current = rows.get(app.level_up.cursor).copied();

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.level_up.move_cursor(-1, app.store.character()),
        KeyCode::Down | KeyCode::Char('j') => app.level_up.move_cursor(1, app.store.character()),
        KeyCode::Left | KeyCode::Right if current == Some(LevelUpRow::TargetLevel) => {
            let min = app.store.character().level;
            let target = app.level_up.target_level;
            app.level_up.target_level = if key.code == KeyCode::Right {
                (target + 1).min(20)
            } else {
                target.saturating_sub(1).max(min)
            };
            // Raising the target above the current level unlocks a pending
            // block; make sure its data is on the way.
            if app.level_up.target_level != target && app.level_up.features.is_empty() {
                app.request_pending_level_data();
            }
        }
        KeyCode::Char('r') if current == Some(LevelUpRow::HpInput) => app.level_up.roll_hp(),
        KeyCode::Backspace if current == Some(LevelUpRow::HpInput) => app.level_up.backspace_hp(),
        KeyCode::Char(c @ '0'..='9') if current == Some(LevelUpRow::HpInput) => {
            app.level_up.edit_hp(c);
        }
        KeyCode::Char(' ') | KeyCode::Enter => match current {
            Some(LevelUpRow::Asi(ability)) => app.level_up.toggle_asi(ability),
            Some(LevelUpRow::Cantrip(i)) => {
                let Some(pending) = app.level_up.pending_level(app.store.character()) else {
                    return EventResult::NeedsRedraw;
                };
                let (limit, _) = app.level_up.spell_deltas(pending);
                let Some(index) = app
                    .level_up
                    .cantrip_options()
                    .get(i)
                    .map(|s| s.index.clone())
                else {
                    return EventResult::NeedsRedraw;
                };
                app.level_up.toggle_cantrip(&index, limit);
            }
            Some(LevelUpRow::Spell(i)) => {
                let Some(pending) = app.level_up.pending_level(app.store.character()) else {
                    return EventResult::NeedsRedraw;
                };
                let (_, limit) = app.level_up.spell_deltas(pending);
                let Some(index) = app
                    .level_up
                    .spell_options()
                    .get(i)
                    .map(|s| s.index.clone())
                else {
                    return EventResult::NeedsRedraw;
                };
                app.level_up.toggle_spell(&index, limit);
            }
            Some(LevelUpRow::Apply) if key.code == KeyCode::Enter => apply_pending_level(app),
            _ => {}
        },
        _ => {}
    }
    EventResult::NeedsRedraw
}

fn apply_pending_level(app: &mut App) {
    let Some(pending) = app.level_up.pending_level(app.store.character()) else {
        return;
    };
    if !app.level_up.spell_choice_complete(pending) {
        app.set_status("Finish the spell picks before applying");
        return;
    }
    let Some(snapshot) = app.level_up.build_snapshot(app.store.character()) else {
        return;
    };

    match app.store.apply_level_up(snapshot) {
        Ok(()) => {
            app.set_status(format!("Level {pending} applied"));
            if app.store.character().level >= app.level_up.target_level {
                app.goto(Screen::Sheet);
            } else {
                app.level_up.prepare_pending();
                app.bump_generation();
                app.request_pending_level_data();
            }
        }
        Err(e) => app.set_status(e.to_string()),
    }
}

// ============================================================================
// Custom classes
// ============================================================================

fn handle_classes(app: &mut App, key: KeyEvent) -> EventResult {
    match app.classes.mode {
        ClassesMode::List => handle_classes_list(app, key),
        ClassesMode::Edit => handle_classes_edit(app, key),
    }
    EventResult::NeedsRedraw
}

fn handle_classes_list(app: &mut App, key: KeyEvent) {
    if let Some(id) = app.classes.confirm_delete.clone() {
        match key.code {
            KeyCode::Char('y') => {
                app.store.delete_custom_class(&id);
                app.classes.confirm_delete = None;
                app.set_status("Class deleted");
            }
            KeyCode::Char('n') | KeyCode::Esc => app.classes.confirm_delete = None,
            _ => {}
        }
        return;
    }

    let len = app.store.custom_classes().len().max(1);
    match key.code {
        KeyCode::Esc => app.goto(Screen::Home),
        KeyCode::Up | KeyCode::Char('k') => {
            let i = app.classes.list_state.selected().unwrap_or(0);
            app.classes
                .list_state
                .select(Some(if i == 0 { len - 1 } else { i - 1 }));
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let i = app.classes.list_state.selected().unwrap_or(0);
            app.classes.list_state.select(Some((i + 1) % len));
        }
        KeyCode::Char('n') => app.classes.start_new(),
        KeyCode::Enter => {
            if let Some(class) = app
                .classes
                .list_state
                .selected()
                .and_then(|i| app.store.custom_classes().get(i).cloned())
            {
                app.classes.start_edit(class);
            }
        }
        KeyCode::Char('d') => {
            if let Some(class) = app
                .classes
                .list_state
                .selected()
                .and_then(|i| app.store.custom_classes().get(i))
            {
                app.classes.confirm_delete = Some(class.id.clone());
            }
        }
        _ => {}
    }
}

fn handle_classes_edit(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.classes.cancel_edit(),
        KeyCode::Tab | KeyCode::Down => app.classes.field = app.classes.field.next(),
        KeyCode::BackTab | KeyCode::Up => app.classes.field = app.classes.field.prev(),
        KeyCode::Left | KeyCode::Right if app.classes.field == EditField::HitDie => {
            app.classes.cycle_hit_die(key.code == KeyCode::Right);
        }
        KeyCode::Backspace if app.classes.field == EditField::Name => {
            if let Some(editing) = &mut app.classes.editing {
                editing.name.pop();
            }
        }
        KeyCode::Char(c) if app.classes.field == EditField::Name => {
            if let Some(editing) = &mut app.classes.editing {
                if editing.name.len() < 40 {
                    editing.name.push(c);
                }
            }
        }
        KeyCode::Enter => match app.classes.field {
            EditField::Name => app.classes.field = EditField::HitDie,
            EditField::HitDie => app.classes.field = EditField::Save,
            EditField::Save => {
                if let Some(class) = app.classes.editing.take() {
                    app.store.save_custom_class(class);
                    app.set_status("Class saved");
                }
                app.classes.mode = ClassesMode::List;
            }
            EditField::Cancel => app.classes.cancel_edit(),
        },
        _ => {}
    }
}
