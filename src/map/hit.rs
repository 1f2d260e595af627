//! Point-in-geometry hit testing across visible layers.

use std::collections::HashSet;

use geojson::{Feature, Value};
use rayon::prelude::*;
use tracing::debug;

use crate::data::FeatureCache;
use crate::geo::{position, Bounds, LngLat};
use crate::layers::LayerDef;

/// Line and point hit distance, in degrees (roughly 55 m at the equator)
pub const DEFAULT_TOLERANCE_DEG: f64 = 0.0005;

/// A feature under the cursor
#[derive(Clone, Copy, Debug)]
pub struct Hit<'a> {
    pub layer: &'a LayerDef,
    pub feature: &'a Feature,
    /// Position in the layer's cached feature array
    pub index: usize,
}

/// Every feature of every visible, loaded layer under `point`.
///
/// Layers come back in registry order, features in their cached order.
pub fn find_features_at<'a>(
    point: LngLat,
    registry: &'a [LayerDef],
    visible: &HashSet<String>,
    cache: &'a FeatureCache,
) -> Vec<Hit<'a>> {
    let mut hits = Vec::new();

    for layer in registry.iter().filter(|l| visible.contains(&l.id)) {
        let Some(cached) = cache.get(&layer.id) else {
            continue;
        };
        let features = &cached.collection.features;
        let candidates = cached.index.candidates(Bounds::around(point, layer.hit_tolerance));

        // Indexed filter_map keeps candidate (ascending index) order
        let matched: Vec<usize> = candidates
            .par_iter()
            .filter_map(|&idx| {
                let geometry = features.get(idx)?.geometry.as_ref()?;
                geometry_contains(&geometry.value, point, layer.hit_tolerance).then_some(idx)
            })
            .collect();

        hits.extend(matched.into_iter().map(|index| Hit {
            layer,
            feature: &features[index],
            index,
        }));
    }

    hits
}

/// Whether `point` hits a geometry. Polygons use their outer ring only;
/// lines and points match within `tolerance` degrees.
pub fn geometry_contains(value: &Value, point: LngLat, tolerance: f64) -> bool {
    match value {
        Value::Polygon(rings) => rings.first().is_some_and(|outer| point_in_ring(point, outer)),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .any(|rings| rings.first().is_some_and(|outer| point_in_ring(point, outer))),
        Value::LineString(line) => near_line(point, line, tolerance),
        Value::MultiLineString(lines) => lines.iter().any(|line| near_line(point, line, tolerance)),
        Value::Point(coords) => position(coords).is_some_and(|p| p.distance(point) < tolerance),
        Value::MultiPoint(_) => {
            debug!("MultiPoint geometry is not hit-tested");
            false
        }
        Value::GeometryCollection(_) => {
            debug!("GeometryCollection geometry is not hit-tested");
            false
        }
    }
}

/// Even-odd ray casting against one ring
pub fn point_in_ring(point: LngLat, ring: &[Vec<f64>]) -> bool {
    let ring: Vec<LngLat> = ring.iter().filter_map(|c| position(c)).collect();
    let Some(&last) = ring.last() else {
        return false;
    };

    let mut inside = false;
    let mut prev = last;
    for &curr in &ring {
        if (curr.y > point.y) != (prev.y > point.y)
            && point.x < (prev.x - curr.x) * (point.y - curr.y) / (prev.y - curr.y) + curr.x
        {
            inside = !inside;
        }
        prev = curr;
    }
    inside
}

/// Euclidean distance from `p` to segment `a`-`b`, in degrees
pub fn distance_to_segment(p: LngLat, a: LngLat, b: LngLat) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn near_line(point: LngLat, line: &[Vec<f64>], tolerance: f64) -> bool {
    let line: Vec<LngLat> = line.iter().filter_map(|c| position(c)).collect();
    line.windows(2)
        .any(|seg| distance_to_segment(point, seg[0], seg[1]) < tolerance)
}
