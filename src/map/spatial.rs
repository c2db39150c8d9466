use std::collections::HashMap;

use crate::map::projection::SceneBounds;

/// Spatial index over feature bounding boxes.
/// Each feature is inserted into every cell its bbox overlaps, so queries
/// never miss a feature but may return ones that only touch a shared cell.
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from (min_lon, min_lat, max_lon, max_lat) boxes; a feature's
    /// index is its position in the iterator. `None` entries are skipped.
    pub fn build(
        bboxes: impl Iterator<Item = Option<(f64, f64, f64, f64)>>,
        cell_size: f64,
    ) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, bbox) in bboxes.enumerate() {
            let Some((min_lon, min_lat, max_lon, max_lat)) = bbox else {
                continue;
            };
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Append candidate indices for the given box; may contain duplicates
    pub fn query_into(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64, results: &mut Vec<usize>) {
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }

    /// Sorted, deduplicated candidates for a scene's lon/lat box
    pub fn query_bounds(&self, bounds: &SceneBounds) -> Vec<usize> {
        let mut results = Vec::new();
        self.query_into(bounds.lon_min, bounds.lat_min, bounds.lon_max, bounds.lat_max, &mut results);
        results.sort_unstable();
        results.dedup();
        results
    }
}
