use geojson::{Geometry, Value};
use glam::DVec2;

/// Geographic position in degrees, `x` = longitude, `y` = latitude
pub type LngLat = DVec2;

/// Build a position from longitude/latitude degrees
#[inline(always)]
pub fn lnglat(lng: f64, lat: f64) -> LngLat {
    DVec2::new(lng, lat)
}

/// Read a GeoJSON position (`[lng, lat, ...]`), ignoring malformed ones
#[inline(always)]
pub fn position(coords: &[f64]) -> Option<LngLat> {
    match coords {
        [lng, lat, ..] => Some(lnglat(*lng, *lat)),
        _ => None,
    }
}

/// Axis-aligned bounding box in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: LngLat,
    pub max: LngLat,
}

impl Bounds {
    pub fn new(min: LngLat, max: LngLat) -> Self {
        Self { min, max }
    }

    /// Box of `radius` degrees around a point
    pub fn around(center: LngLat, radius: f64) -> Self {
        Self::new(center - DVec2::splat(radius), center + DVec2::splat(radius))
    }

    /// Grow to include a point
    pub fn extend(&mut self, p: LngLat) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Merge two boxes
    pub fn union(self, other: Bounds) -> Bounds {
        Bounds::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Bounding box of every position in a geometry (None for empty geometries)
pub fn geometry_bounds(geometry: &Geometry) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    visit_positions(&geometry.value, &mut |p| match bounds.as_mut() {
        Some(b) => b.extend(p),
        None => bounds = Some(Bounds::new(p, p)),
    });
    bounds
}

fn visit_line<F: FnMut(LngLat)>(line: &[Vec<f64>], f: &mut F) {
    for p in line.iter().filter_map(|c| position(c)) {
        f(p);
    }
}

fn visit_positions<F: FnMut(LngLat)>(value: &Value, f: &mut F) {
    match value {
        Value::Point(c) => {
            if let Some(p) = position(c) {
                f(p);
            }
        }
        Value::MultiPoint(line) | Value::LineString(line) => visit_line(line, f),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            for line in lines {
                visit_line(line, f);
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                for ring in rings {
                    visit_line(ring, f);
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                visit_positions(&g.value, f);
            }
        }
    }
}

/// Format a coordinate pair the way the info bar shows it (`lat, lng`)
pub fn format_coords(p: LngLat) -> String {
    format!("{:.6}, {:.6}", p.y, p.x)
}
