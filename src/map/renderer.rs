use log::debug;
use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{clip_segment, draw_circle, draw_line, line_bbox, point_in_ring};
use crate::map::projection::{SceneBounds, Viewport};
use crate::map::spatial::FeatureGrid;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Spatial index cell size in degrees
const GRID_CELL_DEG: f64 = 1.0;

/// Land fill sampling resolution across the scene
const LAND_SAMPLES_X: usize = 96;
const LAND_SAMPLES_Y: usize = 64;

/// Boundary line layers, drawn on the floor of the scene
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Coastline,
    Border,
    State,
    County,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Coastline, Layer::Border, Layer::State, Layer::County];

    fn index(self) -> usize {
        match self {
            Layer::Coastline => 0,
            Layer::Border => 1,
            Layer::State => 2,
            Layer::County => 3,
        }
    }
}

/// A named reference point on the map
#[derive(Clone, Debug)]
pub struct Place {
    pub lon: f64,
    pub lat: f64,
    pub name: String,
}

/// Which map layers are drawn
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_coastlines: bool,
    pub show_borders: bool,
    pub show_states: bool,
    pub show_counties: bool,
    pub show_land: bool,
    pub show_places: bool,
    pub show_axes: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_borders: true,
            show_states: true,
            show_counties: true,
            show_land: false,
            show_places: true,
            show_axes: true,
        }
    }
}

impl DisplaySettings {
    pub fn shows(&self, layer: Layer) -> bool {
        match layer {
            Layer::Coastline => self.show_coastlines,
            Layer::Border => self.show_borders,
            Layer::State => self.show_states,
            Layer::County => self.show_counties,
        }
    }
}

/// Map layers rendered to separate canvases so the UI can color them
pub struct MapLayers {
    pub land: BrailleCanvas,
    pub axes: BrailleCanvas,
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub states: BrailleCanvas,
    pub counties: BrailleCanvas,
    pub places: BrailleCanvas,
    /// (column, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

impl MapLayers {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            land: BrailleCanvas::new(cols, rows),
            axes: BrailleCanvas::new(cols, rows),
            coastlines: BrailleCanvas::new(cols, rows),
            borders: BrailleCanvas::new(cols, rows),
            states: BrailleCanvas::new(cols, rows),
            counties: BrailleCanvas::new(cols, rows),
            places: BrailleCanvas::new(cols, rows),
            labels: Vec::new(),
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut BrailleCanvas {
        match layer {
            Layer::Coastline => &mut self.coastlines,
            Layer::Border => &mut self.borders,
            Layer::State => &mut self.states,
            Layer::County => &mut self.counties,
        }
    }
}

/// Features that intersect the prepared scene bounds
#[derive(Default)]
struct VisibleFeatures {
    bounds: Option<SceneBounds>,
    lines: [Vec<usize>; 4],
    land_samples: Vec<(f64, f64)>,
    places: Vec<usize>,
}

/// Boundary geometry plus the per-scene culling state
pub struct MapRenderer {
    lines: [Vec<LineString>; 4],
    land: Vec<LineString>,
    places: Vec<Place>,
    visible: VisibleFeatures,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            lines: Default::default(),
            land: Vec::new(),
            places: Vec::new(),
            visible: VisibleFeatures::default(),
            settings: DisplaySettings::default(),
        }
    }

    pub fn add_line(&mut self, layer: Layer, line: LineString) {
        self.lines[layer.index()].push(line);
    }

    /// Add a land polygon exterior ring
    pub fn add_land(&mut self, ring: LineString) {
        self.land.push(ring);
    }

    pub fn add_place(&mut self, lon: f64, lat: f64, name: &str) {
        self.places.push(Place {
            lon,
            lat,
            name: name.to_string(),
        });
    }

    pub fn line_count(&self, layer: Layer) -> usize {
        self.lines[layer.index()].len()
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// True once any coastline is loaded
    pub fn has_data(&self) -> bool {
        !self.lines[Layer::Coastline.index()].is_empty()
    }

    /// Cull features to `bounds` and sample the land fill.
    /// Must be called again whenever the bounds change.
    pub fn prepare(&mut self, bounds: &SceneBounds) {
        let mut visible = VisibleFeatures {
            bounds: Some(*bounds),
            ..Default::default()
        };

        for layer in Layer::ALL {
            let lines = &self.lines[layer.index()];
            let grid = FeatureGrid::build(lines.iter().map(|l| line_bbox(l)), GRID_CELL_DEG);
            visible.lines[layer.index()] = grid.query_bounds(bounds);
        }

        let land_grid = FeatureGrid::build(self.land.iter().map(|r| line_bbox(r)), GRID_CELL_DEG);
        let rings: Vec<&LineString> = land_grid
            .query_bounds(bounds)
            .into_iter()
            .map(|idx| &self.land[idx])
            .collect();
        visible.land_samples = sample_land(&rings, bounds);

        visible.places = self
            .places
            .iter()
            .enumerate()
            .filter(|(_, p)| bounds.contains_geo(p.lon, p.lat))
            .map(|(idx, _)| idx)
            .collect();

        debug!(
            "Prepared scene: {:?} lines, {} land samples, {} places",
            visible.lines.iter().map(Vec::len).collect::<Vec<_>>(),
            visible.land_samples.len(),
            visible.places.len()
        );
        self.visible = visible;
    }

    /// Render the map into a `cols` x `rows` character grid
    pub fn render(&self, cols: usize, rows: usize, viewport: &Viewport) -> MapLayers {
        let mut layers = MapLayers::new(cols, rows);
        let bounds = &viewport.bounds;
        if self.visible.bounds.as_ref() != Some(bounds) {
            debug!("Rendering with stale feature culling; call prepare() after changing bounds");
        }

        if self.settings.show_land {
            for &(lon, lat) in &self.visible.land_samples {
                let (px, py) = viewport.project_geo(lon, lat, bounds.alt_min);
                layers.land.set_pixel_signed(px, py);
            }
        }

        if self.settings.show_axes {
            draw_axes(&mut layers, viewport);
        }

        for layer in Layer::ALL {
            if !self.settings.shows(layer) {
                continue;
            }
            let lines = &self.lines[layer.index()];
            for &idx in &self.visible.lines[layer.index()] {
                draw_floor_line(layers.layer_mut(layer), &lines[idx], viewport);
            }
        }

        if self.settings.show_places {
            for &idx in &self.visible.places {
                let place = &self.places[idx];
                let (px, py) = viewport.project_geo(place.lon, place.lat, bounds.alt_min);
                if !viewport.is_visible(px, py) {
                    continue;
                }
                draw_circle(&mut layers.places, px, py, 1);
                if px >= 0 && py >= 0 {
                    let char_x = (px / 2) as u16;
                    let char_y = (py / 4) as u16;
                    if let Some(label_x) = char_x.checked_add(2) {
                        layers.labels.push((label_x, char_y, place.name.clone()));
                    }
                }
            }
        }

        layers
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lon/lat grid points inside any ring, sampled in parallel by row
fn sample_land(rings: &[&LineString], bounds: &SceneBounds) -> Vec<(f64, f64)> {
    if rings.is_empty() {
        return Vec::new();
    }
    let boxes: Vec<_> = rings.iter().map(|r| line_bbox(r)).collect();
    let step_x = (bounds.lon_max - bounds.lon_min) / LAND_SAMPLES_X as f64;
    let step_y = (bounds.lat_max - bounds.lat_min) / LAND_SAMPLES_Y as f64;

    (0..LAND_SAMPLES_Y)
        .into_par_iter()
        .flat_map_iter(|j| {
            let lat = bounds.lat_min + (j as f64 + 0.5) * step_y;
            let boxes = &boxes;
            (0..LAND_SAMPLES_X).filter_map(move |i| {
                let lon = bounds.lon_min + (i as f64 + 0.5) * step_x;
                let inside = rings.iter().zip(boxes).any(|(ring, bbox)| match bbox {
                    Some((x0, y0, x1, y1)) => {
                        lon >= *x0 && lon <= *x1 && lat >= *y0 && lat <= *y1 && point_in_ring(lon, lat, ring)
                    }
                    None => false,
                });
                inside.then_some((lon, lat))
            })
        })
        .collect()
}

/// Draw a polyline on the floor plane, clipped to the scene's lon/lat box
fn draw_floor_line(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    let b = &viewport.bounds;
    let rect = (b.lon_min, b.lat_min, b.lon_max, b.lat_max);

    for pair in line.windows(2) {
        let Some(((x0, y0), (x1, y1))) = clip_segment(pair[0], pair[1], rect) else {
            continue;
        };
        let p0 = viewport.project_geo(x0, y0, b.alt_min);
        let p1 = viewport.project_geo(x1, y1, b.alt_min);
        if viewport.line_might_be_visible(p0, p1) {
            draw_line(canvas, p0.0, p0.1, p1.0, p1.1);
        }
    }
}

/// Box wireframe edges as corner index pairs
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0), // floor
    (4, 5), (5, 6), (6, 7), (7, 4), // ceiling
    (0, 4), (1, 5), (2, 6), (3, 7), // verticals
];

/// Draw the scene box, axis titles and min/max ticks
fn draw_axes(layers: &mut MapLayers, viewport: &Viewport) {
    let b = viewport.bounds;
    let corners = b.corners();
    let projected: Vec<(i32, i32)> = corners
        .iter()
        .map(|&(lon, lat, alt)| viewport.project_geo(lon, lat, alt))
        .collect();

    for (a, c) in BOX_EDGES {
        let (p0, p1) = (projected[a], projected[c]);
        if viewport.line_might_be_visible(p0, p1) {
            draw_line(&mut layers.axes, p0.0, p0.1, p1.0, p1.1);
        }
    }

    let mid_lon = (b.lon_min + b.lon_max) / 2.0;
    let mid_lat = (b.lat_min + b.lat_max) / 2.0;
    let mid_alt = (b.alt_min + b.alt_max) / 2.0;

    let labels = [
        (viewport.project_geo(mid_lon, b.lat_min, b.alt_min), "Longitude".to_string()),
        (viewport.project_geo(b.lon_max, mid_lat, b.alt_min), "Latitude".to_string()),
        (viewport.project_geo(b.lon_min, b.lat_min, mid_alt), "Height (km)".to_string()),
        (projected[0], format!("{:.0}°", b.lon_min)),
        (projected[1], format!("{:.0}°", b.lon_max)),
        (projected[2], format!("{:.0}°", b.lat_max)),
        (projected[4], format!("{:.0} km", b.alt_max)),
    ];

    for ((px, py), text) in labels {
        if px < 0 || py < 0 || !viewport.is_visible(px, py) {
            continue;
        }
        layers.labels.push(((px / 2) as u16, (py / 4) as u16, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer_with_lines() -> MapRenderer {
        let mut renderer = MapRenderer::new();
        // Inside the scene
        renderer.add_line(Layer::County, vec![(-96.0, 29.0), (-95.0, 29.0), (-95.0, 30.0)]);
        // Crosses the western edge
        renderer.add_line(Layer::County, vec![(-100.0, 30.0), (-96.0, 30.0)]);
        // Far away
        renderer.add_line(Layer::County, vec![(-120.0, 40.0), (-119.0, 41.0)]);
        renderer.add_line(Layer::Coastline, vec![(-97.0, 28.5), (-93.0, 29.8)]);
        renderer.add_land(vec![(-98.5, 29.0), (-91.0, 29.0), (-91.0, 33.0), (-98.5, 33.0), (-98.5, 29.0)]);
        renderer.add_place(-95.37, 29.76, "Houston");
        renderer.add_place(-80.0, 25.0, "Miami");
        renderer
    }

    #[test]
    fn test_prepare_culls_to_bounds() {
        let mut renderer = renderer_with_lines();
        renderer.prepare(&SceneBounds::texas());
        assert_eq!(renderer.visible.lines[Layer::County.index()].len(), 2);
        assert_eq!(renderer.visible.lines[Layer::Coastline.index()].len(), 1);
        assert_eq!(renderer.visible.lines[Layer::State.index()].len(), 0);
        assert_eq!(renderer.visible.places, vec![0]);
    }

    #[test]
    fn test_land_samples_inside_polygon() {
        let mut renderer = renderer_with_lines();
        renderer.prepare(&SceneBounds::texas());
        let samples = &renderer.visible.land_samples;
        assert!(!samples.is_empty());
        // Polygon covers lat >= 29 of a 28..32 scene: three quarters of the rows
        assert_eq!(samples.len(), LAND_SAMPLES_X * LAND_SAMPLES_Y * 3 / 4);
        assert!(samples.iter().all(|&(_, lat)| lat >= 29.0));
    }

    #[test]
    fn test_render_draws_enabled_layers() {
        let mut renderer = renderer_with_lines();
        let bounds = SceneBounds::texas();
        renderer.prepare(&bounds);
        renderer.settings.show_land = true;

        let viewport = Viewport::new(bounds, 160, 120);
        let layers = renderer.render(80, 30, &viewport);
        assert!(!layers.counties.is_blank());
        assert!(!layers.coastlines.is_blank());
        assert!(!layers.axes.is_blank());
        assert!(!layers.land.is_blank());
        assert!(!layers.places.is_blank());
        assert!(layers.states.is_blank());
        assert!(layers.labels.iter().any(|(_, _, t)| t == "Houston"));
        assert!(layers.labels.iter().any(|(_, _, t)| t == "Height (km)"));
    }

    #[test]
    fn test_render_respects_toggles() {
        let mut renderer = renderer_with_lines();
        let bounds = SceneBounds::texas();
        renderer.prepare(&bounds);
        renderer.settings.show_counties = false;
        renderer.settings.show_axes = false;
        renderer.settings.show_places = false;

        let viewport = Viewport::new(bounds, 160, 120);
        let layers = renderer.render(80, 30, &viewport);
        assert!(layers.counties.is_blank());
        assert!(layers.axes.is_blank());
        assert!(layers.land.is_blank());
        assert!(layers.labels.is_empty());
        assert!(!layers.coastlines.is_blank());
    }

    #[test]
    fn test_empty_renderer() {
        let mut renderer = MapRenderer::new();
        assert!(!renderer.has_data());
        renderer.prepare(&SceneBounds::texas());
        let viewport = Viewport::new(SceneBounds::texas(), 40, 40);
        let layers = renderer.render(20, 10, &viewport);
        assert!(layers.coastlines.is_blank());
    }
}
