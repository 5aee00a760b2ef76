//! D&D 5e character sheet helper.
//!
//! A terminal interface for building a character step by step, leveling it
//! up against the class progression from the SRD API, and managing homebrew
//! classes. The active character and the homebrew classes persist under the
//! platform data directory.
//!
//! ```bash
//! SHEET_SHOW_DEMO=true sheet   # adds a demo wizard to the home screen
//! ```

mod app;
mod classes_view;
mod events;
mod fetch;
mod home;
mod level_up;
mod sheet_view;
mod wizard;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use ratatui::{backend::CrosstermBackend, Terminal};

use sheet_core::store::{CharacterStore, DirStorage};
use srd::SrdClient;

use app::{App, Screen};
use events::{handle_event, EventResult};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    init_logging();

    let store = CharacterStore::load(Box::new(DirStorage::new(data_dir())));
    let show_demo = std::env::var("SHEET_SHOW_DEMO")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let (request_tx, response_rx) = fetch::spawn(SrdClient::new());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(store, request_tx, response_rx, show_demo);
    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

/// Where the two persisted documents live. `SHEET_DATA_DIR` overrides the
/// platform default.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SHEET_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dnd-sheet")
}

/// Log to a file (the alternate screen owns the terminal), honoring
/// `RUST_LOG`. Without `RUST_LOG`, logging stays off.
fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create("sheet.log") else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        // Apply any finished fetches before drawing.
        app.drain_responses();

        terminal.draw(|f| render(f, &mut app))?;

        // Poll with a timeout so fetch results show up without a keypress.
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if handle_event(&mut app, ev) == EventResult::Quit {
                return Ok(());
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    match app.screen {
        Screen::Home => {
            let show_demo = app.show_demo;
            app.home
                .render(frame, chunks[0], app.store.character(), show_demo);
        }
        Screen::Wizard => app.wizard.render(frame, chunks[0], app.store.character()),
        Screen::Sheet => app.sheet.render(frame, chunks[0], app.store.character()),
        Screen::LevelUp => {
            let show_demo = app.show_demo;
            app.level_up
                .render(frame, chunks[0], app.store.character(), show_demo);
        }
        Screen::CustomClasses => app.classes.render(frame, chunks[0], app.store.custom_classes()),
    }

    let status = app
        .status_message()
        .unwrap_or("Esc goes back · Ctrl+C quits");
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );
}

fn print_help() {
    println!("D&D 5e character sheet helper");
    println!();
    println!("USAGE:");
    println!("  sheet [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help     Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("  SHEET_DATA_DIR    Directory for the persisted character and classes");
    println!("  SHEET_SHOW_DEMO   'true' shows the demo-character entry on the home screen");
    println!("  RUST_LOG          Enables logging to ./sheet.log (e.g. RUST_LOG=debug)");
}
