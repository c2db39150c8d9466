mod events;

pub use events::{load_events, read_chargepol_events, read_csv_events, sniff_format, InputFormat};

use crate::error::{ChargepolError, Result};
use crate::map::{Layer, MapRenderer};
use geojson::{GeoJson, Geometry, Value};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

/// Coastline files, highest resolution first; the first one present wins
const COASTLINE_FILES: [&str; 3] = [
    "ne_10m_coastline.json",
    "ne_50m_coastline.json",
    "ne_110m_coastline.json",
];

const BORDER_FILES: [&str; 2] = ["ne_10m_borders.json", "ne_50m_borders.json"];

const STATES_FILE: &str = "ne_10m_states.json";

/// County files in preference order
const COUNTY_FILES: [&str; 2] = ["Texas_County_Boundaries.json", "ne_10m_admin_2_counties.json"];

const LAND_FILE: &str = "ne_10m_land.json";

const PLACES_FILE: &str = "ne_10m_cities.json";

/// Load every boundary layer found in `data_dir` into the renderer.
/// Missing files are skipped; files that fail to parse are logged and skipped.
pub fn load_map_layers(renderer: &mut MapRenderer, data_dir: &Path, counties: Option<&Path>) {
    if !data_dir.exists() {
        debug!("Map directory {} not found", data_dir.display());
    }

    if let Some(path) = first_existing(data_dir, &COASTLINE_FILES) {
        report(&path, load_lines(renderer, &path, Layer::Coastline));
    }

    if let Some(path) = first_existing(data_dir, &BORDER_FILES) {
        report(&path, load_lines(renderer, &path, Layer::Border));
    }

    let states_path = data_dir.join(STATES_FILE);
    if states_path.exists() {
        report(&states_path, load_lines(renderer, &states_path, Layer::State));
    }

    let county_path = match counties {
        Some(path) => Some(path.to_path_buf()),
        None => first_existing(data_dir, &COUNTY_FILES),
    };
    if let Some(path) = county_path {
        report(&path, load_lines(renderer, &path, Layer::County));
    }

    let land_path = data_dir.join(LAND_FILE);
    if land_path.exists() {
        report(&land_path, load_land(renderer, &land_path));
    }

    let places_path = data_dir.join(PLACES_FILE);
    if places_path.exists() {
        report(&places_path, load_places(renderer, &places_path));
    }
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<std::path::PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|path| path.exists())
}

fn report(path: &Path, result: Result<usize>) {
    match result {
        Ok(count) => info!("Loaded {} features from {}", count, path.display()),
        Err(e) => warn!("Failed to load {}: {}", path.display(), e),
    }
}

/// Parse a GeoJSON file, trying the SIMD parser first
pub fn read_geojson(path: &Path) -> Result<GeoJson> {
    let content = fs::read_to_string(path)?;
    let mut bytes = content.as_bytes().to_vec();
    match simd_json::serde::from_slice::<GeoJson>(&mut bytes) {
        Ok(geojson) => Ok(geojson),
        Err(e) => {
            debug!("SIMD parse of {} failed ({}), retrying", path.display(), e);
            content.parse::<GeoJson>().map_err(|e| ChargepolError::GeoJson {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    }
}

/// Load boundary polylines into one layer
fn load_lines(renderer: &mut MapRenderer, path: &Path, layer: Layer) -> Result<usize> {
    let geojson = read_geojson(path)?;
    let mut count = 0;
    process_geojson_lines(&geojson, |line| {
        renderer.add_line(layer, line);
        count += 1;
    });
    Ok(count)
}

/// Load land polygons (exterior rings) for the fill layer
fn load_land(renderer: &mut MapRenderer, path: &Path) -> Result<usize> {
    let geojson = read_geojson(path)?;
    let mut count = 0;
    process_geojson_lines(&geojson, |ring| {
        renderer.add_land(ring);
        count += 1;
    });
    Ok(count)
}

/// Load named point features
fn load_places(renderer: &mut MapRenderer, path: &Path) -> Result<usize> {
    let geojson = read_geojson(path)?;
    let mut count = 0;

    if let GeoJson::FeatureCollection(fc) = geojson {
        for feature in fc.features {
            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get("name").or_else(|| p.get("NAME")))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string();

            if let Some(geometry) = feature.geometry {
                if let Value::Point(coords) = geometry.value {
                    if coords.len() >= 2 {
                        renderer.add_place(coords[0], coords[1], &name);
                        count += 1;
                    }
                }
            }
        }
    }

    Ok(count)
}

/// Walk a GeoJSON document and hand every line (or polygon exterior ring) to `add_line`
pub fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> Vec<(f64, f64)> {
        coords.iter().map(|c| (c[0], c[1])).collect()
    };

    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Coarse upper Texas / Louisiana coast used when no coastline file is available
pub fn generate_gulf_coast(renderer: &mut MapRenderer) {
    let coast = vec![
        (-97.40, 26.00), (-97.20, 26.80), (-97.30, 27.50), (-97.05, 27.85),
        (-96.80, 28.10), (-96.40, 28.40), (-95.95, 28.62), (-95.35, 28.95),
        (-95.00, 29.18), (-94.75, 29.33), (-94.40, 29.50), (-93.85, 29.68),
        (-93.35, 29.77), (-92.70, 29.60), (-92.30, 29.55), (-91.80, 29.45),
        (-91.30, 29.30), (-90.80, 29.10),
    ];

    // Close the coast northwards into a land polygon for the fill layer
    let mut land = coast.clone();
    land.extend([(-90.80, 33.50), (-99.50, 33.50), (-99.50, 26.00), (-97.40, 26.00)]);

    renderer.add_line(Layer::Coastline, coast);
    renderer.add_land(land);

    renderer.add_place(-95.37, 29.76, "Houston");
    renderer.add_place(-94.80, 29.30, "Galveston");
    renderer.add_place(-94.10, 30.08, "Beaumont");
    renderer.add_place(-96.33, 30.63, "College Station");
    renderer.add_place(-97.00, 28.80, "Victoria");
    renderer.add_place(-93.22, 30.23, "Lake Charles");
    renderer.add_place(-97.74, 30.27, "Austin");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const COUNTY_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"NAME": "Harris"},
             "geometry": {"type": "Polygon", "coordinates": [[[-95.9, 29.5], [-94.9, 29.5], [-94.9, 30.2], [-95.9, 30.2], [-95.9, 29.5]]]}},
            {"type": "Feature", "properties": {"NAME": "Split"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[-96.0, 29.0], [-95.5, 29.0], [-95.5, 29.4], [-96.0, 29.0]]],
                [[[-94.0, 29.0], [-93.5, 29.0], [-93.5, 29.4], [-94.0, 29.0]]]
             ]}}
        ]
    }"#;

    const PLACES_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "Houston"},
             "geometry": {"type": "Point", "coordinates": [-95.37, 29.76]}},
            {"type": "Feature", "properties": {"name": "Nowhere"}, "geometry": null}
        ]
    }"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_polygons_become_rings() {
        let geojson: GeoJson = COUNTY_GEOJSON.parse().unwrap();
        let mut lines = Vec::new();
        process_geojson_lines(&geojson, |line| lines.push(line));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 5);
        assert_eq!(lines[0][1], (-94.9, 29.5));
    }

    #[test]
    fn test_load_map_layers_from_dir() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Texas_County_Boundaries.json", COUNTY_GEOJSON);
        write(&dir, "ne_10m_cities.json", PLACES_GEOJSON);
        write(&dir, "ne_10m_states.json", "not json at all");

        let mut renderer = MapRenderer::new();
        load_map_layers(&mut renderer, dir.path(), None);

        assert_eq!(renderer.line_count(Layer::County), 3);
        assert_eq!(renderer.line_count(Layer::State), 0);
        assert_eq!(renderer.places().len(), 1);
        assert!(!renderer.has_data());
    }

    #[test]
    fn test_explicit_county_path() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = write(&other, "counties.geojson", COUNTY_GEOJSON);

        let mut renderer = MapRenderer::new();
        load_map_layers(&mut renderer, dir.path(), Some(&path));
        assert_eq!(renderer.line_count(Layer::County), 3);
    }

    #[test]
    fn test_read_geojson_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.json", "{\"type\": ");
        assert!(matches!(read_geojson(&path), Err(ChargepolError::GeoJson { .. })));
    }

    #[test]
    fn test_gulf_coast_fallback() {
        let mut renderer = MapRenderer::new();
        generate_gulf_coast(&mut renderer);
        assert!(renderer.has_data());
        assert!(renderer.places().iter().any(|p| p.name == "Houston"));
    }
}
