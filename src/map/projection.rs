use glam::DVec3;

/// Half-extents of the normalized plot box (x = lon, y = lat, z = altitude)
const BOX_ASPECT: DVec3 = DVec3::new(1.0, 1.0, 0.75);

pub const DEFAULT_AZIMUTH: f64 = -60.0;
pub const DEFAULT_ELEVATION: f64 = 30.0;

const MIN_ZOOM: f64 = 0.25;
const MAX_ZOOM: f64 = 20.0;
const ZOOM_STEP: f64 = 1.25;

/// Geographic and altitude limits of the plotted volume
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    /// km
    pub alt_min: f64,
    /// km
    pub alt_max: f64,
}

impl SceneBounds {
    /// Upper Texas coast around Houston, ground to 20 km
    pub fn texas() -> Self {
        Self {
            lon_min: -98.0,
            lon_max: -92.0,
            lat_min: 28.0,
            lat_max: 32.0,
            alt_min: 0.0,
            alt_max: 20.0,
        }
    }

    pub fn with_altitude(self, alt_max: f64) -> Self {
        Self { alt_max, ..self }
    }

    #[inline(always)]
    pub fn contains_geo(&self, lon: f64, lat: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }

    /// Map a geographic point into the plot box, centered on the origin
    #[inline(always)]
    pub fn normalize(&self, lon: f64, lat: f64, alt: f64) -> DVec3 {
        DVec3::new(
            unit(lon, self.lon_min, self.lon_max),
            unit(lat, self.lat_min, self.lat_max),
            unit(alt, self.alt_min, self.alt_max),
        ) * BOX_ASPECT
    }

    /// The eight corners of the plot box as (lon, lat, alt)
    pub fn corners(&self) -> [(f64, f64, f64); 8] {
        let (x0, x1) = (self.lon_min, self.lon_max);
        let (y0, y1) = (self.lat_min, self.lat_max);
        let (z0, z1) = (self.alt_min, self.alt_max);
        [
            (x0, y0, z0), (x1, y0, z0), (x1, y1, z0), (x0, y1, z0),
            (x0, y0, z1), (x1, y0, z1), (x1, y1, z1), (x0, y1, z1),
        ]
    }
}

impl Default for SceneBounds {
    fn default() -> Self {
        Self::texas()
    }
}

/// Linear map of [min, max] onto [-1, 1]; degenerate spans collapse to 0
#[inline(always)]
fn unit(v: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        0.0
    } else {
        (v - min) / span * 2.0 - 1.0
    }
}

/// Orthographic orbit camera looking at the plot box.
/// The view basis is kept as three unit vectors and rebuilt whenever the
/// azimuth or elevation changes.
#[derive(Clone)]
pub struct Viewport {
    pub bounds: SceneBounds,
    /// Degrees, wraps to (-180, 180]
    pub azimuth: f64,
    /// Degrees, clamped to [-90, 90]
    pub elevation: f64,
    pub zoom: f64,
    /// Pan offset in braille pixels
    pub offset_x: i32,
    pub offset_y: i32,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
    /// Points at the viewer
    forward: DVec3,
    right: DVec3,
    up: DVec3,
}

impl Viewport {
    pub fn new(bounds: SceneBounds, width: usize, height: usize) -> Self {
        let mut vp = Self {
            bounds,
            azimuth: DEFAULT_AZIMUTH,
            elevation: DEFAULT_ELEVATION,
            zoom: 1.0,
            offset_x: 0,
            offset_y: 0,
            width,
            height,
            forward: DVec3::X,
            right: DVec3::Y,
            up: DVec3::Z,
        };
        vp.orient();
        vp
    }

    /// Rebuild the view basis from azimuth/elevation
    fn orient(&mut self) {
        let (sin_az, cos_az) = self.azimuth.to_radians().sin_cos();
        let (sin_el, cos_el) = self.elevation.to_radians().sin_cos();

        self.forward = DVec3::new(cos_el * cos_az, cos_el * sin_az, sin_el);
        self.right = DVec3::new(-sin_az, cos_az, 0.0);
        self.up = self.forward.cross(self.right).normalize();
    }

    /// Set an absolute view direction
    pub fn set_view(&mut self, azimuth: f64, elevation: f64) {
        self.azimuth = wrap_degrees(azimuth);
        self.elevation = elevation.clamp(-90.0, 90.0);
        self.orient();
    }

    /// Orbit by degree deltas
    pub fn rotate(&mut self, d_azimuth: f64, d_elevation: f64) {
        self.set_view(self.azimuth + d_azimuth, self.elevation + d_elevation);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Shift the picture by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Back to the default view, keeping bounds and size
    pub fn reset(&mut self) {
        *self = Self::new(self.bounds, self.width, self.height);
    }

    /// Pixels per normalized box unit
    #[inline(always)]
    fn scale(&self) -> f64 {
        0.3 * self.width.min(self.height) as f64 * self.zoom
    }

    /// Project a point in normalized box space to pixel coordinates
    #[inline(always)]
    pub fn project(&self, p: DVec3) -> (i32, i32) {
        let scale = self.scale();
        let sx = p.dot(self.right);
        let sy = p.dot(self.up);

        let px = (self.width as f64 / 2.0 + sx * scale).round() as i32 + self.offset_x;
        let py = (self.height as f64 / 2.0 - sy * scale).round() as i32 + self.offset_y;

        (px, py)
    }

    /// Project a geographic point (degrees, km)
    #[inline(always)]
    pub fn project_geo(&self, lon: f64, lat: f64, alt: f64) -> (i32, i32) {
        self.project(self.bounds.normalize(lon, lat, alt))
    }

    /// Check if a projected point is near the canvas
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }

    /// Rough bounding box check for a projected segment
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0
            && min_x < self.width as i32
            && max_y >= 0
            && min_y < self.height as i32
    }
}

fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}
