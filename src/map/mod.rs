mod geometry;
mod projection;
mod renderer;
mod scatter;
mod spatial;

pub use projection::{SceneBounds, Viewport, DEFAULT_AZIMUTH, DEFAULT_ELEVATION};
pub use renderer::{DisplaySettings, Layer, LineString, MapLayers, MapRenderer, Place};
pub use scatter::{render_scatter, AltitudeMode, Marker, ScatterLayers, ScatterSettings};
