use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::event::{ChargeEvent, EventSet, Partitions};
use crate::map::geometry::{draw_line, draw_marker};
use crate::map::projection::Viewport;

/// Below this many events projection stays on the calling thread
const PARALLEL_THRESHOLD: usize = 4096;

/// Which altitude of a charge layer is plotted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AltitudeMode {
    /// Layer top, `zmin + zwidth`
    Top,
    /// Layer bottom, `zmin`
    Bottom,
    /// Vertical bar from bottom to top
    Extent,
}

impl AltitudeMode {
    pub fn next(self) -> Self {
        match self {
            AltitudeMode::Top => AltitudeMode::Bottom,
            AltitudeMode::Bottom => AltitudeMode::Extent,
            AltitudeMode::Extent => AltitudeMode::Top,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AltitudeMode::Top => "zmax",
            AltitudeMode::Bottom => "zmin",
            AltitudeMode::Extent => "zmin-zmax",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Dot,
    Cross,
}

#[derive(Clone, Debug)]
pub struct ScatterSettings {
    pub show_positive: bool,
    pub show_negative: bool,
    pub altitude: AltitudeMode,
    pub marker: Marker,
}

impl Default for ScatterSettings {
    fn default() -> Self {
        Self {
            show_positive: true,
            show_negative: true,
            altitude: AltitudeMode::Top,
            marker: Marker::Dot,
        }
    }
}

/// One canvas per polarity
pub struct ScatterLayers {
    pub positive: BrailleCanvas,
    pub negative: BrailleCanvas,
    /// Events inside the scene's lon/lat box that were drawn
    pub plotted: usize,
}

/// Screen-space shape of one event
#[derive(Clone, Copy, Debug, PartialEq)]
enum Glyph {
    Point(i32, i32),
    Bar((i32, i32), (i32, i32)),
}

/// Render both partitions. Events outside the lon/lat box are skipped.
pub fn render_scatter(
    partitions: &Partitions,
    settings: &ScatterSettings,
    viewport: &Viewport,
    cols: usize,
    rows: usize,
) -> ScatterLayers {
    let mut layers = ScatterLayers {
        positive: BrailleCanvas::new(cols, rows),
        negative: BrailleCanvas::new(cols, rows),
        plotted: 0,
    };

    if settings.show_negative {
        layers.plotted += plot(&mut layers.negative, &partitions.negative, settings, viewport);
    }
    if settings.show_positive {
        layers.plotted += plot(&mut layers.positive, &partitions.positive, settings, viewport);
    }

    layers
}

fn plot(canvas: &mut BrailleCanvas, events: &EventSet, settings: &ScatterSettings, viewport: &Viewport) -> usize {
    let glyphs = project_events(events.as_slice(), settings.altitude, viewport);

    for glyph in &glyphs {
        match *glyph {
            Glyph::Point(x, y) => match settings.marker {
                Marker::Dot => canvas.set_pixel_signed(x, y),
                Marker::Cross => draw_marker(canvas, x, y, 1),
            },
            Glyph::Bar(top, bottom) => {
                if viewport.line_might_be_visible(top, bottom) {
                    draw_line(canvas, top.0, top.1, bottom.0, bottom.1);
                }
            }
        }
    }

    glyphs.len()
}

fn project_events(events: &[ChargeEvent], mode: AltitudeMode, viewport: &Viewport) -> Vec<Glyph> {
    let project = |e: &ChargeEvent| -> Option<Glyph> {
        if !viewport.bounds.contains_geo(e.lon, e.lat) {
            return None;
        }
        Some(match mode {
            AltitudeMode::Top => {
                let (x, y) = viewport.project_geo(e.lon, e.lat, e.z_max());
                Glyph::Point(x, y)
            }
            AltitudeMode::Bottom => {
                let (x, y) = viewport.project_geo(e.lon, e.lat, e.z_min);
                Glyph::Point(x, y)
            }
            AltitudeMode::Extent => {
                // Bars are clamped to the box's altitude range
                let (alt_min, alt_max) = (viewport.bounds.alt_min, viewport.bounds.alt_max);
                let top = e.z_max().max(alt_min).min(alt_max);
                let bottom = e.z_min.max(alt_min).min(alt_max);
                Glyph::Bar(
                    viewport.project_geo(e.lon, e.lat, top),
                    viewport.project_geo(e.lon, e.lat, bottom),
                )
            }
        })
    };

    if events.len() < PARALLEL_THRESHOLD {
        events.iter().filter_map(project).collect()
    } else {
        events.par_iter().filter_map(project).collect()
    }
}
