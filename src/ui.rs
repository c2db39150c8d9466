use crate::app::App;
use crate::braille::{BrailleCanvas, BLANK};
use crate::map::{render_scatter, MapLayers, ScatterLayers, Viewport};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

const POSITIVE_COLOR: Color = Color::Rgb(255, 16, 5);
const NEGATIVE_COLOR: Color = Color::Rgb(16, 5, 255);

/// Longest label drawn before truncation
const MAX_LABEL_LEN: usize = 24;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into scene area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Scene
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_scene(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

/// Every rendered layer of one frame
struct Scene {
    map: MapLayers,
    scatter: ScatterLayers,
}

impl Scene {
    /// `viewport` is expected to be sized to the `cols` x `rows` cell area
    fn build(app: &App, viewport: &Viewport, cols: u16, rows: u16) -> Self {
        let map = app.map_renderer.render(cols as usize, rows as usize, viewport);
        let scatter = render_scatter(app.partitions(), &app.scatter, viewport, cols as usize, rows as usize);
        Self { map, scatter }
    }

    /// Canvases back to front, with their colors
    fn layers(&self) -> [(&BrailleCanvas, Color); 9] {
        [
            (&self.map.land, Color::Green),
            (&self.map.axes, Color::Gray),
            (&self.map.coastlines, Color::Cyan),
            (&self.map.counties, Color::DarkGray),
            (&self.map.borders, Color::White),
            (&self.map.states, Color::Yellow),
            (&self.map.places, Color::White),
            (&self.scatter.negative, NEGATIVE_COLOR),
            (&self.scatter.positive, POSITIVE_COLOR),
        ]
    }
}

fn render_scene(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " ChargePol 3D ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let widget = SceneWidget {
        scene: Scene::build(app, &app.viewport, inner.width, inner.height),
    };
    frame.render_widget(widget, inner);
}

/// Braille scene with text labels overlaid
struct SceneWidget {
    scene: Scene,
}

impl SceneWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                if ch == BLANK {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for SceneWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (canvas, color) in self.scene.layers() {
            Self::render_layer(canvas, color, area, buf);
        }

        let label_style = Style::default().fg(Color::White);
        for (lx, ly, text) in &self.scene.map.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let x = area.x + *lx;
            let y = area.y + *ly;

            let max_len = area.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(MAX_LABEL_LEN)).enumerate() {
                buf[(x + i as u16, y)].set_char(ch).set_style(label_style);
            }
        }
    }
}

fn toggle_span(on: bool, on_text: &'static str, off_text: &'static str) -> Span<'static> {
    Span::styled(
        if on { on_text } else { off_text },
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;
    let scatter = &app.scatter;
    let partitions = app.partitions();

    let status = Line::from(vec![
        Span::styled(format!(" +{}", partitions.positive.len()), Style::default().fg(POSITIVE_COLOR)),
        Span::styled(format!(" -{} ", partitions.negative.len()), Style::default().fg(NEGATIVE_COLOR)),
        Span::styled(app.window_label(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.view_label(), Style::default().fg(Color::Yellow)),
        Span::styled(" ", Style::default()),
        Span::styled(scatter.altitude.label(), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        toggle_span(scatter.show_positive, "[1]POS ", "[1]pos "),
        toggle_span(scatter.show_negative, "[2]NEG ", "[2]neg "),
        toggle_span(settings.show_borders, "[B]order ", "[b]order "),
        toggle_span(settings.show_states, "[S]tate ", "[s]tate "),
        toggle_span(settings.show_counties, "[Y]county ", "[y]county "),
        toggle_span(settings.show_coastlines, "c[O]ast ", "c[o]ast "),
        toggle_span(settings.show_land, "[F]ill ", "[f]ill "),
        toggle_span(settings.show_places, "[C]ities ", "[c]ities "),
        toggle_span(settings.show_axes, "[A]xes ", "[a]xes "),
        Span::styled(
            "| hjkl:orbit +/-:zoom ,/.:window v:alt r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(status);
    frame.render_widget(paragraph, area);
}

/// Render one frame as plain text: `rows` lines of scene followed by a summary line
pub fn render_snapshot(app: &App, cols: u16, rows: u16) -> String {
    let (cols, rows) = (cols.max(1), rows.max(1));
    let mut viewport = app.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = cols as usize * 2;
    viewport.height = rows as usize * 4;
    let scene = Scene::build(app, &viewport, cols, rows);
    let (width, height) = (cols as usize, rows as usize);
    let mut grid = vec![' '; width * height];

    for (canvas, _) in scene.layers() {
        for row in 0..height {
            for col in 0..width {
                if let Some(ch) = canvas.glyph(col, row) {
                    grid[row * width + col] = ch;
                }
            }
        }
    }

    for (lx, ly, text) in &scene.map.labels {
        let (col, row) = (*lx as usize, *ly as usize);
        if row >= height || col >= width {
            continue;
        }
        for (i, ch) in text.chars().take((width - col).min(MAX_LABEL_LEN)).enumerate() {
            grid[row * width + col + i] = ch;
        }
    }

    let mut out = String::with_capacity((width + 1) * (height + 1));
    for line in grid.chunks(width) {
        out.extend(line.iter().map(|c| if *c == BLANK { ' ' } else { *c }));
        out.push('\n');
    }

    let partitions = app.partitions();
    out.push_str(&format!(
        "+{} -{} | {} | {} | {}\n",
        partitions.positive.len(),
        partitions.negative.len(),
        app.window_label(),
        app.view_label(),
        app.scatter.altitude.label()
    ));
    out
}
