use std::fs::File;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use tui_webgis::app::{App, OPACITY_STEP};
use tui_webgis::config::{Cli, Settings};
use tui_webgis::data::{Fetcher, Loader};
use tui_webgis::ui;

fn main() -> Result<()> {
    let settings = Settings::from_cli(Cli::parse())?;
    init_logging(&settings)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let fetcher = Fetcher::new(settings.data_dir.clone(), settings.base_url.clone(), settings.offline);
    let mut loader = Loader::new(runtime.handle().clone(), fetcher);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &settings, &mut loader);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(settings: &Settings) -> Result<()> {
    let file = File::create(&settings.log_file)
        .with_context(|| format!("cannot create log file {}", settings.log_file.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

/// Handle mouse events for panning, zooming and feature selection
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click selects, drag pans
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
    // Cursor marker, coordinates and hover label
    app.mouse_moved(mouse.column, mouse.row);
}

fn run(terminal: &mut DefaultTerminal, settings: &Settings, loader: &mut Loader) -> Result<()> {
    let mut app = App::new(settings.registry.clone(), settings.basemap.id, settings.zoom);
    info!(layers = app.registry.len(), basemap = settings.basemap.id, "session started");

    // Main loop
    loop {
        for layer in app.take_load_requests() {
            loader.spawn(layer);
        }
        for outcome in loader.drain() {
            app.on_load_complete(outcome);
        }

        let size = terminal.size()?;
        app.set_map_area(ui::layout(Rect::new(0, 0, size.width, size.height)).map_inner);

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') => app.quit(),
                            KeyCode::Esc => {
                                if app.popup().is_some() {
                                    app.close_popup();
                                } else {
                                    app.quit();
                                }
                            }

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Layer list
                            KeyCode::Tab => app.sidebar_down(),
                            KeyCode::BackTab => app.sidebar_up(),
                            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_selected(),
                            KeyCode::Char(',') | KeyCode::Char('<') => {
                                app.adjust_selected_opacity(-OPACITY_STEP);
                            }
                            KeyCode::Char('.') | KeyCode::Char('>') => {
                                app.adjust_selected_opacity(OPACITY_STEP);
                            }

                            KeyCode::Char('b') | KeyCode::Char('B') => app.cycle_basemap(),

                            // Popup
                            KeyCode::Char('c') | KeyCode::Char('C') => app.close_popup(),
                            KeyCode::PageUp => app.scroll_popup(-5),
                            KeyCode::PageDown => app.scroll_popup(5),

                            KeyCode::Char('x') | KeyCode::Char('X') => app.dismiss_notice(),

                            // Reset view
                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(settings.zoom),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                // Layout is recomputed every frame
                Event::Resize(..) => {}
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
