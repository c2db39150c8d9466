use chrono::{DateTime, NaiveTime};
use log::debug;

use crate::event::{EventSet, Partitions, TimeWindow};
use crate::map::{MapRenderer, Marker, ScatterSettings, SceneBounds, Viewport};

/// Degrees of orbit per key press
const ROTATE_STEP: f64 = 5.0;

/// Degrees of orbit per dragged terminal cell
const DRAG_DEGREES_PER_CELL: f64 = 1.5;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub scatter: ScatterSettings,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Every loaded event
    events: EventSet,
    /// Window the viewer starts with and resets to
    initial_window: TimeWindow,
    window: TimeWindow,
    /// Events in the current window, split by polarity
    partitions: Partitions,
}

impl App {
    /// `map_renderer` is prepared for `bounds` here
    pub fn new(
        events: EventSet,
        window: TimeWindow,
        bounds: SceneBounds,
        mut map_renderer: MapRenderer,
        width: usize,
        height: usize,
    ) -> Self {
        map_renderer.prepare(&bounds);
        let (pixel_width, pixel_height) = pixel_size(width, height);
        let partitions = events.within(window).partition();

        Self {
            viewport: Viewport::new(bounds, pixel_width, pixel_height),
            map_renderer,
            scatter: ScatterSettings::default(),
            should_quit: false,
            last_mouse: None,
            events,
            initial_window: window,
            window,
            partitions,
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = pixel_size(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    pub fn events(&self) -> &EventSet {
        &self.events
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    /// Replace the time window and refilter.
    /// Any window other than the initial one is treated as stepped.
    pub fn set_window(&mut self, window: TimeWindow) {
        self.window = window;
        let events = if window == self.initial_window {
            self.events.within(window)
        } else {
            self.events.within_stepped(window)
        };
        self.partitions = events.partition();
        debug!(
            "Window {:.3}..{:.3}: {} positive, {} negative",
            window.start,
            window.end,
            self.partitions.positive.len(),
            self.partitions.negative.len()
        );
    }

    /// Slide the window by whole widths
    pub fn step_window(&mut self, steps: i32) {
        self.set_window(self.window.shifted(steps));
    }

    pub fn reset_window(&mut self) {
        self.set_window(self.initial_window);
    }

    pub fn rotate_left(&mut self) {
        self.viewport.rotate(-ROTATE_STEP, 0.0);
    }

    pub fn rotate_right(&mut self) {
        self.viewport.rotate(ROTATE_STEP, 0.0);
    }

    pub fn tilt_up(&mut self) {
        self.viewport.rotate(0.0, ROTATE_STEP);
    }

    pub fn tilt_down(&mut self) {
        self.viewport.rotate(0.0, -ROTATE_STEP);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Drag to orbit: horizontal drag spins, vertical drag tilts
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = x as f64 - last_x as f64;
            let dy = y as f64 - last_y as f64;
            self.viewport
                .rotate(-dx * DRAG_DEGREES_PER_CELL, dy * DRAG_DEGREES_PER_CELL);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn toggle_positive(&mut self) {
        self.scatter.show_positive = !self.scatter.show_positive;
    }

    pub fn toggle_negative(&mut self) {
        self.scatter.show_negative = !self.scatter.show_negative;
    }

    pub fn cycle_altitude(&mut self) {
        self.scatter.altitude = self.scatter.altitude.next();
    }

    pub fn toggle_marker(&mut self) {
        self.scatter.marker = match self.scatter.marker {
            Marker::Dot => Marker::Cross,
            Marker::Cross => Marker::Dot,
        };
    }

    /// Current view as a string
    pub fn view_label(&self) -> String {
        format!(
            "az {:.0}° el {:.0}° {:.1}x",
            self.viewport.azimuth, self.viewport.elevation, self.viewport.zoom
        )
    }

    /// Current window as a string
    pub fn window_label(&self) -> String {
        if self.window.is_empty() {
            return "empty window".to_string();
        }
        format!("{} – {}", format_time(self.window.start), format_time(self.window.end))
    }
}

/// Braille gives 2x4 resolution per character.
/// Account for border (2 chars horizontal, 2 chars vertical) and the status bar.
fn pixel_size(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2);
    let inner_height = height.saturating_sub(3);
    (inner_width * 2, inner_height * 4)
}

/// Chargepol times are UT seconds of day; larger values are taken as Unix time
pub fn format_time(seconds: f64) -> String {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;

    if (0.0..SECONDS_PER_DAY).contains(&seconds) {
        if let Some(t) = NaiveTime::from_num_seconds_from_midnight_opt(whole as u32, nanos) {
            return t.format("%H:%M:%S%.3f").to_string();
        }
    } else if seconds >= SECONDS_PER_DAY {
        if let Some(dt) = DateTime::from_timestamp(whole as i64, nanos) {
            return dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        }
    }
    format!("{:.3}s", seconds)
}
