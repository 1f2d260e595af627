use geojson::Value;

use crate::app::ViewState;
use crate::braille::BrailleCanvas;
use crate::data::FeatureCache;
use crate::geo::position;
use crate::layers::LayerDef;
use crate::map::geometry::{draw_circle, draw_dashed_line, draw_line, draw_thick_line, stipple_ring, Dash};
use crate::map::projection::Viewport;
use crate::style::{self, StyleAttributes};

/// One colour pass of the map: every dot in `canvas` is drawn in `color`
#[derive(Debug)]
pub struct CanvasLayer {
    pub color: String,
    /// 0..1, used to dim the colour
    pub opacity: f64,
    pub canvas: BrailleCanvas,
}

/// Stroke settings derived from a resolved style
#[derive(Clone, Copy)]
struct Stroke {
    thick: bool,
    dash: Option<Dash>,
}

impl Stroke {
    fn from_style(style: &StyleAttributes) -> Self {
        Self {
            thick: style.weight >= 3.0,
            dash: style.dash_array.as_deref().and_then(Dash::parse),
        }
    }
}

/// Fill density for a fill opacity: dot spacing in pixels
fn fill_spacing(fill_opacity: f64) -> Option<i32> {
    if fill_opacity >= 0.6 {
        Some(2)
    } else if fill_opacity >= 0.25 {
        Some(4)
    } else if fill_opacity > 0.05 {
        Some(6)
    } else {
        None
    }
}

/// Renders visible cached layers into per-colour Braille canvases
pub struct MapRenderer<'a> {
    registry: &'a [LayerDef],
    cache: &'a FeatureCache,
}

impl<'a> MapRenderer<'a> {
    pub fn new(registry: &'a [LayerDef], cache: &'a FeatureCache) -> Self {
        Self { registry, cache }
    }

    /// Draw every visible layer in registry order. Highlighted features are
    /// drawn last, above all layers.
    pub fn render(&self, view: &ViewState, viewport: &Viewport, cols: usize, rows: usize) -> Vec<CanvasLayer> {
        let area = viewport.bounds();
        let mut passes = Vec::new();
        let mut highlighted = Vec::new();

        for layer in self.registry.iter().filter(|l| view.is_visible(&l.id)) {
            let Some(cached) = self.cache.get(&layer.id) else {
                continue;
            };
            let opacity = view.opacity(&layer.id);
            let mut groups = Vec::new();

            for idx in cached.index.candidates(area) {
                let feature = &cached.collection.features[idx];
                let Some(geometry) = feature.geometry.as_ref() else {
                    continue;
                };
                let style = style::resolve(layer, feature, opacity, &view.highlights);
                let target = if view.highlights.contains_feature(&layer.id, feature) {
                    &mut highlighted
                } else if style.opacity > 0.0 {
                    &mut groups
                } else {
                    continue;
                };
                let canvas = group_canvas(target, &style, cols, rows);
                draw_geometry(canvas, &geometry.value, &style, viewport);
            }

            passes.extend(groups);
        }

        passes.extend(highlighted);
        passes
    }
}

/// The canvas for a style's colour and opacity, created on first use
fn group_canvas<'c>(
    groups: &'c mut Vec<CanvasLayer>,
    style: &StyleAttributes,
    cols: usize,
    rows: usize,
) -> &'c mut BrailleCanvas {
    let opacity = (style.opacity * 100.0).round() / 100.0;
    let idx = match groups.iter().position(|g| g.color == style.color && g.opacity == opacity) {
        Some(idx) => idx,
        None => {
            groups.push(CanvasLayer {
                color: style.color.clone(),
                opacity,
                canvas: BrailleCanvas::new(cols, rows),
            });
            groups.len() - 1
        }
    };
    &mut groups[idx].canvas
}

fn draw_geometry(canvas: &mut BrailleCanvas, value: &Value, style: &StyleAttributes, viewport: &Viewport) {
    let stroke = Stroke::from_style(style);
    match value {
        Value::Point(coords) => draw_point(canvas, coords, style, viewport),
        Value::MultiPoint(points) => {
            for coords in points {
                draw_point(canvas, coords, style, viewport);
            }
        }
        Value::LineString(line) => draw_path(canvas, &project_line(line, viewport), stroke, viewport),
        Value::MultiLineString(lines) => {
            for line in lines {
                draw_path(canvas, &project_line(line, viewport), stroke, viewport);
            }
        }
        Value::Polygon(rings) => draw_polygon(canvas, rings, style, stroke, viewport),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                draw_polygon(canvas, rings, style, stroke, viewport);
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                draw_geometry(canvas, &g.value, style, viewport);
            }
        }
    }
}

fn project_line(line: &[Vec<f64>], viewport: &Viewport) -> Vec<(i32, i32)> {
    line.iter()
        .filter_map(|c| position(c))
        .map(|p| viewport.project(p))
        .collect()
}

fn draw_point(canvas: &mut BrailleCanvas, coords: &[f64], style: &StyleAttributes, viewport: &Viewport) {
    let Some(p) = position(coords) else {
        return;
    };
    let (px, py) = viewport.project(p);
    if viewport.is_visible(px, py) {
        let radius = if style.weight >= 3.0 { 2 } else { 1 };
        draw_circle(canvas, px, py, radius);
    }
}

fn draw_polygon(
    canvas: &mut BrailleCanvas,
    rings: &[Vec<Vec<f64>>],
    style: &StyleAttributes,
    stroke: Stroke,
    viewport: &Viewport,
) {
    for (i, ring) in rings.iter().enumerate() {
        let projected = project_line(ring, viewport);
        if i == 0 {
            if let Some(spacing) = fill_spacing(style.fill_opacity) {
                stipple_ring(canvas, &projected, spacing);
            }
        }
        draw_path(canvas, &projected, stroke, viewport);
    }
}

/// Draw a projected path with viewport culling
fn draw_path(canvas: &mut BrailleCanvas, points: &[(i32, i32)], stroke: Stroke, viewport: &Viewport) {
    let mut dash = stroke.dash;
    for seg in points.windows(2) {
        if !viewport.line_might_be_visible(seg[0], seg[1]) {
            continue;
        }
        let Some(((x0, y0), (x1, y1))) = clip_segment(seg[0], seg[1], viewport) else {
            continue;
        };
        match dash.as_mut() {
            Some(dash) => {
                let mut shadow = *dash;
                draw_dashed_line(canvas, x0, y0, x1, y1, dash);
                if stroke.thick {
                    draw_dashed_line(canvas, x0 + 1, y0 + 1, x1 + 1, y1 + 1, &mut shadow);
                }
            }
            None if stroke.thick => draw_thick_line(canvas, x0, y0, x1, y1),
            None => draw_line(canvas, x0, y0, x1, y1),
        }
    }
}

/// Liang-Barsky clip of a segment to the canvas (with a one pixel margin)
fn clip_segment(a: (i32, i32), b: (i32, i32), viewport: &Viewport) -> Option<((i32, i32), (i32, i32))> {
    let (x0, y0) = (f64::from(a.0), f64::from(a.1));
    let (dx, dy) = (f64::from(b.0) - x0, f64::from(b.1) - y0);
    let (xmin, ymin) = (-1.0, -1.0);
    let (xmax, ymax) = (viewport.width as f64, viewport.height as f64);

    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [(-dx, x0 - xmin), (dx, xmax - x0), (-dy, y0 - ymin), (dy, ymax - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let at = |t: f64| ((x0 + t * dx).round() as i32, (y0 + t * dy).round() as i32);
    Some((at(t0), at(t1)))
}
