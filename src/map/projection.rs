use std::f64::consts::PI;

use glam::DVec2;

use crate::geo::{lnglat, Bounds, LngLat};

/// Braille pixels per world width at zoom 0
pub const TILE_PIXELS: f64 = 64.0;

pub const MIN_ZOOM: u8 = 1;

/// Latitude limit of Web Mercator
const MAX_LAT: f64 = 85.051_128_78;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center in degrees
    pub center: LngLat,
    /// Integer zoom level, as slippy-map tiles use
    pub zoom: u8,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

/// Normalized Web Mercator coordinates, both axes in `0..1`
#[inline(always)]
fn mercator(p: LngLat) -> DVec2 {
    let x = (p.x + 180.0) / 360.0;
    let lat_rad = p.y.clamp(-MAX_LAT, MAX_LAT).to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    DVec2::new(x, y)
}

#[inline(always)]
fn inverse_mercator(m: DVec2) -> LngLat {
    let lon = m.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * m.y)).sinh().atan().to_degrees();
    lnglat(lon, lat)
}

impl Viewport {
    pub fn new(center: LngLat, zoom: u8, width: usize, height: usize) -> Self {
        Self {
            center,
            zoom: zoom.max(MIN_ZOOM),
            width,
            height,
        }
    }

    /// Braille pixels per world width
    pub fn scale(&self) -> f64 {
        TILE_PIXELS * 2f64.powi(i32::from(self.zoom))
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let mut m = mercator(self.center) + DVec2::new(f64::from(dx), f64::from(dy)) / self.scale();
        m.x = m.x.rem_euclid(1.0);
        m.y = m.y.clamp(0.0, 1.0);
        self.center = inverse_mercator(m);
    }

    /// One level in, capped at `max_zoom`
    pub fn zoom_in(&mut self, max_zoom: u8) {
        self.zoom = (self.zoom + 1).min(max_zoom.max(MIN_ZOOM));
    }

    /// One level out
    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32, max_zoom: u8) {
        let zoom = (self.zoom + 1).min(max_zoom.max(MIN_ZOOM));
        self.zoom_at(px, py, zoom);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        let zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
        self.zoom_at(px, py, zoom);
    }

    /// Change zoom while keeping the point under (px, py) in place
    fn zoom_at(&mut self, px: i32, py: i32, zoom: u8) {
        let anchor = self.unproject(px, py);
        self.zoom = zoom;
        let (new_px, new_py) = self.project(anchor);
        self.pan(new_px - px, new_py - py);
    }

    /// Unproject pixel coordinates back to geographic coordinates
    pub fn unproject(&self, px: i32, py: i32) -> LngLat {
        let offset = DVec2::new(
            f64::from(px) - self.width as f64 / 2.0,
            f64::from(py) - self.height as f64 / 2.0,
        );
        inverse_mercator(mercator(self.center) + offset / self.scale())
    }

    /// Project a geographic coordinate to pixel coordinates
    pub fn project(&self, p: LngLat) -> (i32, i32) {
        let d = (mercator(p) - mercator(self.center)) * self.scale();
        let px = (d.x + self.width as f64 / 2.0).floor() as i32;
        let py = (d.y + self.height as f64 / 2.0).floor() as i32;
        (px, py)
    }

    /// Geographic area covered by the canvas
    pub fn bounds(&self) -> Bounds {
        let top_left = self.unproject(0, 0);
        let bottom_right = self.unproject(self.width as i32, self.height as i32);
        let mut b = Bounds::new(top_left, top_left);
        b.extend(bottom_right);
        b
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
