use std::collections::HashMap;

use crate::geo::Bounds;

/// Upper bound on grid cells along the longer side of a layer's extent
const TARGET_CELLS: f64 = 64.0;

/// Smallest cell edge in degrees
const MIN_CELL_SIZE: f64 = 0.001;

/// Spatial index for features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the exact geometry test downstream).
#[derive(Debug, Default)]
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
    /// Min and max occupied cell, inclusive
    occupied: Option<((i32, i32), (i32, i32))>,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size: cell_size.max(MIN_CELL_SIZE),
            occupied: None,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from `(feature index, bounding box)` pairs. Features without a
    /// box (no geometry) are never returned by queries.
    pub fn build(bboxes: impl Iterator<Item = (usize, Bounds)>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, b) in bboxes {
            let min_cell = grid.to_cell(b.min.x, b.min.y);
            let max_cell = grid.to_cell(b.max.x, b.max.y);
            grid.occupied = Some(match grid.occupied {
                Some((lo, hi)) => (
                    (lo.0.min(min_cell.0), lo.1.min(min_cell.1)),
                    (hi.0.max(max_cell.0), hi.1.max(max_cell.1)),
                ),
                None => (min_cell, max_cell),
            });
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Cell size giving roughly `TARGET_CELLS` cells across `extent`
    pub fn cell_size_for(extent: Option<Bounds>) -> f64 {
        match extent {
            Some(b) => (b.width().max(b.height()) / TARGET_CELLS).max(MIN_CELL_SIZE),
            None => 1.0,
        }
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should sort and dedup.
    pub fn query_into(&self, bounds: Bounds, results: &mut Vec<usize>) {
        let Some((lo, hi)) = self.occupied else {
            return;
        };
        // Never walk cells outside the occupied range
        let q_min = self.to_cell(bounds.min.x, bounds.min.y);
        let q_max = self.to_cell(bounds.max.x, bounds.max.y);
        let min_cell = (q_min.0.max(lo.0), q_min.1.max(lo.1));
        let max_cell = (q_max.0.min(hi.0), q_max.1.min(hi.1));
        if min_cell.0 > max_cell.0 || min_cell.1 > max_cell.1 {
            return;
        }

        let span = (i64::from(max_cell.0) - i64::from(min_cell.0) + 1)
            * (i64::from(max_cell.1) - i64::from(min_cell.1) + 1);
        if span > self.cells.len() as i64 {
            // Sparse grid: scan the occupied cells instead
            for (&(x, y), indices) in &self.cells {
                if (min_cell.0..=max_cell.0).contains(&x) && (min_cell.1..=max_cell.1).contains(&y) {
                    results.extend_from_slice(indices);
                }
            }
            return;
        }

        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }

    /// Sorted, deduplicated candidates overlapping `bounds`
    pub fn candidates(&self, bounds: Bounds) -> Vec<usize> {
        let mut results = Vec::new();
        self.query_into(bounds, &mut results);
        results.sort_unstable();
        results.dedup();
        results
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::lnglat;

    fn bounds(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Bounds {
        Bounds::new(lnglat(min_lon, min_lat), lnglat(max_lon, max_lat))
    }

    #[test]
    fn test_spanning_feature_found_from_every_cell() {
        let grid = FeatureGrid::build([(0, bounds(0.0, 0.0, 3.5, 0.5))].into_iter(), 1.0);
        for lon in [0.2, 1.5, 2.5, 3.4] {
            assert_eq!(grid.candidates(Bounds::around(lnglat(lon, 0.2), 0.01)), vec![0]);
        }
        assert!(grid.candidates(Bounds::around(lnglat(5.0, 0.2), 0.01)).is_empty());
    }

    #[test]
    fn test_candidates_sorted_and_unique() {
        let grid = FeatureGrid::build(
            [(2, bounds(0.0, 0.0, 2.0, 2.0)), (0, bounds(0.5, 0.5, 1.5, 1.5))].into_iter(),
            0.5,
        );
        assert_eq!(grid.candidates(bounds(0.0, 0.0, 2.0, 2.0)), vec![0, 2]);
    }

    #[test]
    fn test_negative_coordinates() {
        let grid = FeatureGrid::build([(0, bounds(131.0, -1.5, 131.2, -1.3))].into_iter(), 0.1);
        assert_eq!(grid.candidates(Bounds::around(lnglat(131.1, -1.4), 0.0005)), vec![0]);
    }

    #[test]
    fn test_whole_world_query_on_tiny_grid() {
        let b = bounds(131.9, -1.1, 131.9, -1.1);
        let grid = FeatureGrid::build([(0, b)].into_iter(), FeatureGrid::cell_size_for(Some(b)));
        // ~ 1.3e11 cells at the minimum cell size if walked one by one
        assert_eq!(grid.candidates(bounds(-180.0, -85.0, 180.0, 85.0)), vec![0]);
        assert!(grid.candidates(bounds(-180.0, -85.0, 100.0, 85.0)).is_empty());
        assert!(FeatureGrid::default().candidates(bounds(0.0, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_cell_size_adapts_to_extent() {
        assert_eq!(FeatureGrid::cell_size_for(Some(bounds(0.0, 0.0, 6.4, 1.0))), 0.1);
        assert_eq!(FeatureGrid::cell_size_for(Some(bounds(1.0, 1.0, 1.0, 1.0))), MIN_CELL_SIZE);
        assert_eq!(FeatureGrid::cell_size_for(None), 1.0);
    }
}
