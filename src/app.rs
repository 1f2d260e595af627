use std::collections::{HashMap, HashSet};

use ratatui::layout::Rect;
use tracing::{error, info};

use crate::data::{feature_key, FeatureCache, LoadOutcome};
use crate::geo::{format_coords, LngLat};
use crate::layers::basemap::{self, Basemap};
use crate::layers::LayerDef;
use crate::map::hit::find_features_at;
use crate::map::Viewport;
use crate::popup::{self, Popup};
use crate::style::HighlightSet;

/// Initial map center (Papua Barat Daya)
pub const DEFAULT_CENTER: LngLat = LngLat::new(131.5, -1.0);

pub const DEFAULT_OPACITY: u8 = 100;

/// Opacity change per key press, in percent
pub const OPACITY_STEP: i16 = 10;

/// Per-session view state
#[derive(Clone, Debug)]
pub struct ViewState {
    pub visible: HashSet<String>,
    /// Opacity percent per layer; missing means `DEFAULT_OPACITY`
    pub opacity: HashMap<String, u8>,
    pub highlights: HighlightSet,
    /// Last map coordinate under the mouse
    pub cursor: Option<LngLat>,
    pub basemap: &'static Basemap,
    /// Name of the feature under the mouse
    pub hover: Option<String>,
}

impl ViewState {
    /// Visibility from each layer's default
    pub fn new(registry: &[LayerDef], basemap_id: &str) -> Self {
        Self {
            visible: registry.iter().filter(|l| l.visible).map(|l| l.id.clone()).collect(),
            opacity: HashMap::new(),
            highlights: HighlightSet::new(),
            cursor: None,
            basemap: basemap::find_or_default(basemap_id),
            hover: None,
        }
    }

    pub fn is_visible(&self, layer_id: &str) -> bool {
        self.visible.contains(layer_id)
    }

    pub fn opacity(&self, layer_id: &str) -> u8 {
        self.opacity.get(layer_id).copied().unwrap_or(DEFAULT_OPACITY)
    }
}

/// What the popup panel shows
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Selection {
    #[default]
    Idle,
    FeatureSelected { popup: Popup, anchor: LngLat },
}

/// A failed layer load, shown until dismissed
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub layer_id: String,
    pub message: String,
}

/// Application state
pub struct App {
    pub registry: Vec<LayerDef>,
    pub cache: FeatureCache,
    /// Layers with a load requested or running
    in_flight: HashSet<String>,
    /// Requested loads not yet handed to the loader
    pending: Vec<String>,
    pub view: ViewState,
    pub selection: Selection,
    pub viewport: Viewport,
    pub notices: Vec<Notice>,
    /// Inner map area on screen, in terminal cells
    pub map_area: Rect,
    /// Highlighted row in the layer list
    pub sidebar_cursor: usize,
    pub popup_scroll: u16,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Whether the current press has moved (a drag, not a click)
    dragged: bool,
}

impl App {
    /// New session; default-visible layers are queued for loading
    pub fn new(registry: Vec<LayerDef>, basemap_id: &str, zoom: u8) -> Self {
        let view = ViewState::new(&registry, basemap_id);
        let zoom = zoom.min(view.basemap.max_zoom);
        let mut app = Self {
            in_flight: HashSet::new(),
            pending: Vec::new(),
            cache: FeatureCache::new(),
            selection: Selection::Idle,
            viewport: Viewport::new(DEFAULT_CENTER, zoom, 0, 0),
            notices: Vec::new(),
            map_area: Rect::default(),
            sidebar_cursor: 0,
            popup_scroll: 0,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragged: false,
            view,
            registry,
        };

        let initial: Vec<String> = app.registry.iter().filter(|l| l.visible).map(|l| l.id.clone()).collect();
        for id in initial {
            app.request_load(&id);
        }
        app
    }

    pub fn layer(&self, layer_id: &str) -> Option<&LayerDef> {
        self.registry.iter().find(|l| l.id == layer_id)
    }

    // ---- layers ----

    /// Show or hide a layer. Showing an unloaded layer requests its data.
    /// Hiding keeps any highlights it has.
    pub fn toggle_layer(&mut self, layer_id: &str) {
        if self.layer(layer_id).is_none() {
            return;
        }
        if !self.view.visible.remove(layer_id) {
            self.view.visible.insert(layer_id.to_string());
            self.request_load(layer_id);
        }
    }

    fn request_load(&mut self, layer_id: &str) {
        if self.cache.contains(layer_id) || self.in_flight.contains(layer_id) {
            return;
        }
        self.in_flight.insert(layer_id.to_string());
        self.pending.push(layer_id.to_string());
    }

    /// Layers to start loading, each handed out once
    pub fn take_load_requests(&mut self) -> Vec<LayerDef> {
        let pending = std::mem::take(&mut self.pending);
        pending.iter().filter_map(|id| self.layer(id).cloned()).collect()
    }

    /// Store a finished load. Failures become notices and are not cached,
    /// so showing the layer again retries.
    pub fn on_load_complete(&mut self, outcome: LoadOutcome) {
        self.in_flight.remove(&outcome.layer_id);
        match outcome.result {
            Ok(collection) => {
                self.cache.insert(&outcome.layer_id, collection);
            }
            Err(e) => {
                error!(layer = %outcome.layer_id, error = %e, "layer load failed");
                let name = self
                    .layer(&outcome.layer_id)
                    .map_or(outcome.layer_id.as_str(), |l| l.name.as_str());
                let message = format!("Gagal memuat layer {name}: {e}");
                self.notices.push(Notice {
                    layer_id: outcome.layer_id,
                    message,
                });
            }
        }
    }

    pub fn is_loading(&self, layer_id: &str) -> bool {
        self.in_flight.contains(layer_id)
    }

    pub fn loading_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dismiss_notice(&mut self) {
        if !self.notices.is_empty() {
            self.notices.remove(0);
        }
    }

    /// Set a layer's opacity, clamped to 0..=100
    pub fn set_opacity(&mut self, layer_id: &str, percent: u8) {
        self.view.opacity.insert(layer_id.to_string(), percent.min(100));
    }

    pub fn adjust_opacity(&mut self, layer_id: &str, delta: i16) {
        let current = i16::from(self.view.opacity(layer_id));
        self.set_opacity(layer_id, (current + delta).clamp(0, 100) as u8);
    }

    // ---- interaction ----

    /// Select everything under `point`. Hits from highlightable layers
    /// become the highlight set; all hits go into the popup.
    pub fn click_at(&mut self, point: LngLat) {
        let (popup, highlights) = {
            let hits = find_features_at(point, &self.registry, &self.view.visible, &self.cache);
            let mut highlights = HighlightSet::new();
            for hit in hits.iter().filter(|h| h.layer.highlightable) {
                if let Some(key) = feature_key(hit.feature) {
                    highlights.insert(&hit.layer.id, key);
                }
            }
            let popup = (!hits.is_empty()).then(|| popup::compose(&hits));
            (popup, highlights)
        };

        info!(lng = point.x, lat = point.y, hits = popup.as_ref().map_or(0, |p| p.sections.len()), "map click");

        self.view.highlights = highlights;
        self.popup_scroll = 0;
        self.selection = match popup {
            Some(popup) => Selection::FeatureSelected { popup, anchor: point },
            None => Selection::Idle,
        };
    }

    /// Track the cursor and label the topmost feature under it
    pub fn hover_at(&mut self, point: LngLat) {
        let label = find_features_at(point, &self.registry, &self.view.visible, &self.cache)
            .last()
            .map(|hit| popup::hover_label(hit.layer, hit.feature));
        self.view.cursor = Some(point);
        self.view.hover = label;
    }

    pub fn close_popup(&mut self) {
        self.selection = Selection::Idle;
        self.view.highlights.clear();
        self.popup_scroll = 0;
    }

    pub fn popup(&self) -> Option<&Popup> {
        match &self.selection {
            Selection::FeatureSelected { popup, .. } => Some(popup),
            Selection::Idle => None,
        }
    }

    pub fn scroll_popup(&mut self, delta: i32) {
        let max = self.popup().map_or(0, |p| p.line_count().saturating_sub(1)) as i32;
        self.popup_scroll = (i32::from(self.popup_scroll) + delta).clamp(0, max) as u16;
    }

    // ---- basemap & viewport ----

    /// Switch basemap; the zoom is capped to its max zoom
    pub fn select_basemap(&mut self, id: &str) -> bool {
        match basemap::find(id) {
            Some(b) => {
                self.view.basemap = b;
                self.viewport.zoom = self.viewport.zoom.min(b.max_zoom);
                true
            }
            None => false,
        }
    }

    pub fn cycle_basemap(&mut self) {
        let next = basemap::next(self.view.basemap.id);
        self.select_basemap(next.id);
    }

    /// Record where the map is drawn and resize the viewport to match
    pub fn set_map_area(&mut self, area: Rect) {
        self.map_area = area;
        self.viewport.resize(area.width as usize * 2, area.height as usize * 4);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.view.basemap.max_zoom);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.screen_to_pixel(col, row) {
            self.viewport.zoom_in_at(px, py, self.view.basemap.max_zoom);
        }
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.screen_to_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Terminal cell to Braille pixel, if inside the map
    pub fn screen_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        let inside = col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height;
        // Aim at the middle of the cell's 2x4 dot block
        inside.then(|| (i32::from(col - area.x) * 2 + 1, i32::from(row - area.y) * 4 + 2))
    }

    /// Terminal cell to map coordinate, if inside the map
    pub fn screen_to_lnglat(&self, col: u16, row: u16) -> Option<LngLat> {
        self.screen_to_pixel(col, row).map(|(px, py)| self.viewport.unproject(px, py))
    }

    // ---- sidebar ----

    pub fn sidebar_up(&mut self) {
        self.sidebar_cursor = self.sidebar_cursor.saturating_sub(1);
    }

    pub fn sidebar_down(&mut self) {
        if self.sidebar_cursor + 1 < self.registry.len() {
            self.sidebar_cursor += 1;
        }
    }

    pub fn selected_layer_id(&self) -> Option<String> {
        self.registry.get(self.sidebar_cursor).map(|l| l.id.clone())
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_layer_id() {
            self.toggle_layer(&id);
        }
    }

    pub fn adjust_selected_opacity(&mut self, delta: i16) {
        if let Some(id) = self.selected_layer_id() {
            self.adjust_opacity(&id, delta);
        }
    }

    // ---- mouse ----

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Pan so the map follows the pointer
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = i32::from(last_x) - i32::from(col);
            let dy = i32::from(last_y) - i32::from(row);
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// A release without movement is a click on the map
    pub fn mouse_up(&mut self, col: u16, row: u16) {
        if self.last_mouse.is_some() && !self.dragged {
            if let Some(point) = self.screen_to_lnglat(col, row) {
                self.click_at(point);
            }
        }
        self.last_mouse = None;
        self.dragged = false;
    }

    /// Update mouse cursor position and hover label
    pub fn mouse_moved(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        match self.screen_to_lnglat(col, row) {
            Some(point) => self.hover_at(point),
            None => self.view.hover = None,
        }
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.and_then(|(col, row)| self.screen_to_pixel(col, row))
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ---- status text ----

    pub fn zoom_level(&self) -> String {
        format!("z{}", self.viewport.zoom)
    }

    /// Cursor position, or the map center when the mouse is elsewhere
    pub fn cursor_coords(&self) -> String {
        format_coords(self.view.cursor.unwrap_or(self.viewport.center))
    }

    /// Reset pan and zoom to the startup view
    pub fn reset_view(&mut self, zoom: u8) {
        self.viewport.center = DEFAULT_CENTER;
        self.viewport.zoom = zoom.min(self.view.basemap.max_zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::geo::lnglat;
    use crate::layers::registry;
    use geojson::{Feature, FeatureCollection, Geometry, Value};
    use serde_json::json;

    fn square(min: (f64, f64), max: (f64, f64), props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![vec![
                vec![min.0, min.1],
                vec![max.0, min.1],
                vec![max.0, max.1],
                vec![min.0, max.1],
                vec![min.0, min.1],
            ]]))),
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn loaded(layer_id: &str, features: Vec<Feature>) -> LoadOutcome {
        let mut collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        crate::data::assign_ids(&mut collection);
        LoadOutcome {
            layer_id: layer_id.to_string(),
            result: Ok(collection),
        }
    }

    fn failed(layer_id: &str) -> LoadOutcome {
        LoadOutcome {
            layer_id: layer_id.to_string(),
            result: Err(LoadError::fetch("/data/x.js", "HTTP 404 Not Found")),
        }
    }

    fn ids(layers: Vec<LayerDef>) -> Vec<String> {
        layers.into_iter().map(|l| l.id).collect()
    }

    /// Village boundary and flood zone overlapping at (131.5, -1.0)
    fn scenario() -> App {
        let mut app = App::new(registry(), "osm", 9);
        app.take_load_requests();
        app.on_load_complete(loaded(
            "bts_desa",
            vec![square((131.4, -1.1), (131.6, -0.9), json!({"DESA": "Remu", "KECAMATAN": "Sorong Manoi"}))],
        ));
        app.toggle_layer("dis_banjir");
        app.take_load_requests();
        app.on_load_complete(loaded(
            "dis_banjir",
            vec![square((131.45, -1.05), (131.55, -0.95), json!({"RESIKO": "Tinggi"}))],
        ));
        app
    }

    #[test]
    fn test_default_layers_requested_once() {
        let mut app = App::new(registry(), "osm", 9);
        assert_eq!(ids(app.take_load_requests()), vec!["bts_desa", "bts_kab"]);
        assert!(app.take_load_requests().is_empty());
        assert!(app.is_loading("bts_desa"));
    }

    #[test]
    fn test_toggle_while_in_flight_does_not_refetch() {
        let mut app = App::new(registry(), "osm", 9);
        app.take_load_requests();
        app.toggle_layer("bts_desa");
        app.toggle_layer("bts_desa");
        assert!(app.take_load_requests().is_empty());
        assert!(app.view.is_visible("bts_desa"));
    }

    #[test]
    fn test_cached_layer_is_never_refetched() {
        let mut app = App::new(registry(), "osm", 9);
        app.take_load_requests();
        app.on_load_complete(loaded("bts_desa", vec![]));
        app.toggle_layer("bts_desa");
        app.toggle_layer("bts_desa");
        assert!(app.take_load_requests().is_empty());
        assert!(!app.is_loading("bts_desa"));
    }

    #[test]
    fn test_duplicate_completion_does_not_overwrite() {
        let mut app = App::new(registry(), "osm", 9);
        app.on_load_complete(loaded("bts_desa", vec![square((0.0, 0.0), (1.0, 1.0), json!({}))]));
        app.on_load_complete(loaded("bts_desa", vec![]));
        assert_eq!(app.cache.get("bts_desa").unwrap().len(), 1);
    }

    #[test]
    fn test_failed_load_notifies_and_retries() {
        let mut app = App::new(registry(), "osm", 9);
        app.take_load_requests();
        app.on_load_complete(failed("bts_desa"));

        assert_eq!(app.notices.len(), 1);
        assert!(app.notices[0].message.contains("Batas Desa"));
        assert!(app.view.is_visible("bts_desa"));
        assert!(!app.cache.contains("bts_desa"));

        app.toggle_layer("bts_desa");
        app.toggle_layer("bts_desa");
        assert_eq!(ids(app.take_load_requests()), vec!["bts_desa"]);

        app.dismiss_notice();
        assert!(app.notices.is_empty());
    }

    #[test]
    fn test_click_on_two_layers() {
        let mut app = scenario();
        app.click_at(lnglat(131.5, -1.0));

        let popup = app.popup().unwrap();
        let layers: Vec<_> = popup.sections.iter().map(|s| s.layer_id.as_str()).collect();
        assert_eq!(layers, vec!["bts_desa", "dis_banjir"]);
        let body = popup.body();
        assert!(body.contains("KELURAHAN/KAMPUNG: Remu"));
        assert!(body.contains("TINGKAT RESIKO: Tinggi"));

        assert_eq!(app.view.highlights.len(), 2);
        assert!(app.view.highlights.contains("bts_desa", "0"));
        assert!(app.view.highlights.contains("dis_banjir", "0"));
    }

    #[test]
    fn test_click_outside_clears_selection() {
        let mut app = scenario();
        app.click_at(lnglat(131.5, -1.0));
        app.click_at(lnglat(140.0, 5.0));
        assert_eq!(app.selection, Selection::Idle);
        assert!(app.view.highlights.is_empty());
    }

    #[test]
    fn test_click_only_inside_outer_layer() {
        let mut app = scenario();
        app.click_at(lnglat(131.41, -1.09));
        assert_eq!(app.popup().unwrap().sections.len(), 1);
        assert_eq!(app.view.highlights.len(), 1);
    }

    #[test]
    fn test_non_highlightable_hits_only_in_popup() {
        let mut app = App::new(registry(), "osm", 9);
        app.toggle_layer("kontur");
        app.on_load_complete(loaded("kontur", vec![square((0.0, 0.0), (1.0, 1.0), json!({"ELEV": 500}))]));
        app.click_at(lnglat(0.5, 0.5));
        assert_eq!(app.popup().unwrap().sections.len(), 1);
        assert!(app.view.highlights.is_empty());
    }

    #[test]
    fn test_close_popup() {
        let mut app = scenario();
        app.click_at(lnglat(131.5, -1.0));
        app.close_popup();
        assert_eq!(app.selection, Selection::Idle);
        assert!(app.view.highlights.is_empty());
    }

    #[test]
    fn test_hover_leaves_selection_alone() {
        let mut app = scenario();
        app.click_at(lnglat(131.5, -1.0));
        let before = app.view.highlights.clone();

        app.hover_at(lnglat(131.5, -1.0));
        assert_eq!(app.view.hover.as_deref(), Some("Daerah Rawan Banjir"));
        app.hover_at(lnglat(150.0, 0.0));
        assert!(app.view.hover.is_none());

        assert_eq!(app.view.highlights, before);
        assert!(app.popup().is_some());
    }

    #[test]
    fn test_hiding_layer_keeps_highlights() {
        let mut app = scenario();
        app.click_at(lnglat(131.5, -1.0));
        app.toggle_layer("dis_banjir");
        assert!(!app.view.is_visible("dis_banjir"));
        assert!(app.view.highlights.contains("dis_banjir", "0"));
    }

    #[test]
    fn test_opacity_defaults_and_clamps() {
        let mut app = App::new(registry(), "osm", 9);
        assert_eq!(app.view.opacity("bts_desa"), 100);
        app.adjust_opacity("bts_desa", OPACITY_STEP);
        assert_eq!(app.view.opacity("bts_desa"), 100);
        app.set_opacity("bts_desa", 0);
        app.adjust_opacity("bts_desa", -OPACITY_STEP);
        assert_eq!(app.view.opacity("bts_desa"), 0);
        app.set_opacity("bts_desa", 250);
        assert_eq!(app.view.opacity("bts_desa"), 100);
    }

    #[test]
    fn test_basemap_caps_zoom() {
        let mut app = App::new(registry(), "osm", 19);
        assert_eq!(app.viewport.zoom, 19);
        app.cycle_basemap();
        assert_eq!(app.view.basemap.id, "topo");
        assert_eq!(app.viewport.zoom, 17);
        app.zoom_in();
        assert_eq!(app.viewport.zoom, 17);
        assert!(!app.select_basemap("nope"));
    }

    #[test]
    fn test_screen_to_pixel() {
        let mut app = App::new(registry(), "osm", 9);
        app.set_map_area(Rect::new(30, 1, 50, 20));
        assert_eq!(app.viewport.width, 100);
        assert_eq!(app.screen_to_pixel(30, 1), Some((1, 2)));
        assert_eq!(app.screen_to_pixel(29, 1), None);
        assert_eq!(app.screen_to_pixel(80, 5), None);
    }

    #[test]
    fn test_mouse_click_without_drag_selects() {
        let mut app = scenario();
        app.set_map_area(Rect::new(0, 0, 80, 40));
        // Center cell sits on the default center
        app.mouse_down(40, 20);
        app.mouse_up(40, 20);
        assert!(app.popup().is_some());

        app.close_popup();
        app.mouse_down(40, 20);
        app.handle_drag(45, 20);
        app.mouse_up(45, 20);
        assert!(app.popup().is_none());
    }

    #[test]
    fn test_popup_scroll_is_bounded() {
        let mut app = scenario();
        app.scroll_popup(5);
        assert_eq!(app.popup_scroll, 0);
        app.click_at(lnglat(131.5, -1.0));
        app.scroll_popup(-3);
        assert_eq!(app.popup_scroll, 0);
        app.scroll_popup(1000);
        assert_eq!(app.popup_scroll as usize, app.popup().unwrap().line_count() - 1);
    }
}
