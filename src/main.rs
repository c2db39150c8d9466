use anyhow::{Context, Result};
use chargepol3d::app::App;
use chargepol3d::config::{Cli, Config};
use chargepol3d::data;
use chargepol3d::map::MapRenderer;
use chargepol3d::ui;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use log::info;
use ratatui::DefaultTerminal;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::from_cli(Cli::parse())?;
    let app = build_app(&config)?;

    if let Some(target) = &config.snapshot {
        let (cols, rows) = config.snapshot_size;
        return write_snapshot(&app, target, cols, rows);
    }

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, app);

    // Disable mouse capture and restore terminal
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Load events and map data, then size the scene from them
fn build_app(config: &Config) -> Result<App> {
    let events = data::load_events(&config.data_path, config.format)
        .with_context(|| format!("Failed to read events from {}", config.data_path.display()))?;

    let mut renderer = MapRenderer::new();
    data::load_map_layers(&mut renderer, &config.map_dir, config.counties.as_deref());

    // Fall back to a built-in Gulf Coast outline if no data loaded
    if !renderer.has_data() {
        info!("No coastline data under {}, using built-in outline", config.map_dir.display());
        data::generate_gulf_coast(&mut renderer);
    }

    let bounds = config.scene_bounds(events.max_altitude());
    let window = config.time_window(events.time_span());

    let (width, height) = match crossterm::terminal::size() {
        Ok((w, h)) => (w as usize, h as usize),
        Err(_) => (config.snapshot_size.0 as usize, config.snapshot_size.1 as usize),
    };
    Ok(App::new(events, window, bounds, renderer, width, height))
}

fn write_snapshot(app: &App, target: &Path, cols: u16, rows: u16) -> Result<()> {
    let text = ui::render_snapshot(app, cols, rows);
    if target == Path::new("-") {
        io::stdout().lock().write_all(text.as_bytes())?;
    } else {
        fs::write(target, text).with_context(|| format!("Failed to write {}", target.display()))?;
        info!("Wrote snapshot to {}", target.display());
    }
    Ok(())
}

/// Handle mouse events for orbiting and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in(),
        MouseEventKind::ScrollDown => app.zoom_out(),
        // Horizontal scroll spins the scene (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.rotate_left(),
        MouseEventKind::ScrollRight => app.rotate_right(),
        // Click and drag to orbit
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Orbit with hjkl
        KeyCode::Char('h') => app.rotate_left(),
        KeyCode::Char('l') => app.rotate_right(),
        KeyCode::Char('k') => app.tilt_up(),
        KeyCode::Char('j') => app.tilt_down(),

        // Pan with arrow keys
        KeyCode::Left => app.pan(-10, 0),
        KeyCode::Right => app.pan(10, 0),
        KeyCode::Up => app.pan(0, -6),
        KeyCode::Down => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        // Time window
        KeyCode::Char(',') | KeyCode::Char('<') => app.step_window(-1),
        KeyCode::Char('.') | KeyCode::Char('>') => app.step_window(1),
        KeyCode::Char('w') => app.reset_window(),

        // Scatter
        KeyCode::Char('1') => app.toggle_positive(),
        KeyCode::Char('2') => app.toggle_negative(),
        KeyCode::Char('v') => app.cycle_altitude(),
        KeyCode::Char('m') => app.toggle_marker(),

        // Map layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => toggle(&mut app.map_renderer.settings.show_borders),
        KeyCode::Char('s') | KeyCode::Char('S') => toggle(&mut app.map_renderer.settings.show_states),
        KeyCode::Char('y') | KeyCode::Char('Y') => toggle(&mut app.map_renderer.settings.show_counties),
        KeyCode::Char('o') | KeyCode::Char('O') => toggle(&mut app.map_renderer.settings.show_coastlines),
        KeyCode::Char('f') | KeyCode::Char('F') => toggle(&mut app.map_renderer.settings.show_land),
        KeyCode::Char('c') | KeyCode::Char('C') => toggle(&mut app.map_renderer.settings.show_places),
        KeyCode::Char('a') | KeyCode::Char('A') => toggle(&mut app.map_renderer.settings.show_axes),

        _ => {}
    }
}

fn toggle(flag: &mut bool) {
    *flag = !*flag;
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    let size = terminal.size()?;
    app.resize(size.width as usize, size.height as usize);

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key.code),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
