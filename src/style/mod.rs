//! Per-feature style resolution.
//!
//! Styles are recomputed on every render: highlight and opacity change far
//! more often than geometry does.

pub mod classify;

use std::collections::{HashMap, HashSet};

use geojson::Feature;

use crate::data::{feature_key, FeatureKey};
use crate::layers::{Category, LayerDef};

pub const HIGHLIGHT_COLOR: &str = "#00FFFF";

/// Resolved rendering attributes for one feature
#[derive(Clone, Debug, PartialEq)]
pub struct StyleAttributes {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
    pub dash_array: Option<String>,
}

/// Partial style returned by a classifier; unset fields keep the defaults
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StylePatch {
    pub color: Option<String>,
    pub weight: Option<f64>,
    pub opacity: Option<f64>,
    pub fill_opacity: Option<f64>,
    pub dash_array: Option<String>,
}

impl StylePatch {
    pub fn color(color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..Self::default()
        }
    }

    /// Colour, weight, opacity and fill in one go
    pub fn full(color: &str, weight: f64, opacity: f64, fill_opacity: f64) -> Self {
        Self {
            color: Some(color.to_string()),
            weight: Some(weight),
            opacity: Some(opacity),
            fill_opacity: Some(fill_opacity),
            dash_array: None,
        }
    }
}

/// Set of `(layer id, feature key)` pairs drawn with emphasis
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightSet {
    by_layer: HashMap<String, HashSet<FeatureKey>>,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer_id: &str, key: FeatureKey) {
        self.by_layer.entry(layer_id.to_string()).or_default().insert(key);
    }

    pub fn contains(&self, layer_id: &str, key: &str) -> bool {
        self.by_layer.get(layer_id).is_some_and(|keys| keys.contains(key))
    }

    pub fn contains_feature(&self, layer_id: &str, feature: &Feature) -> bool {
        self.by_layer.contains_key(layer_id)
            && feature_key(feature).is_some_and(|key| self.contains(layer_id, &key))
    }

    pub fn clear(&mut self) {
        self.by_layer.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_layer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_layer.values().map(HashSet::len).sum()
    }
}

/// Emphasis style for a clicked feature, by layer category
pub fn highlight_style(category: Option<Category>) -> StyleAttributes {
    let (weight, fill_opacity, dash_array) = match category {
        Some(Category::Administrative) => (4.0, 0.5, Some("10, 5".to_string())),
        Some(Category::Risk) => (4.0, 0.9, Some("10, 5".to_string())),
        _ => (6.0, 0.6, None),
    };
    StyleAttributes {
        color: HIGHLIGHT_COLOR.to_string(),
        weight,
        opacity: 1.0,
        fill_opacity,
        dash_array,
    }
}

/// Resolve the style of `feature` in `layer`.
///
/// Highlight wins outright and ignores the opacity slider. Otherwise the
/// classifier (if any) is merged over the layer defaults and scaled by
/// `opacity_percent`.
pub fn resolve(
    layer: &LayerDef,
    feature: &Feature,
    opacity_percent: u8,
    highlights: &HighlightSet,
) -> StyleAttributes {
    if highlights.contains_feature(&layer.id, feature) {
        return highlight_style(layer.category);
    }

    let scale = f64::from(opacity_percent.min(100)) / 100.0;

    match &layer.classify {
        Some(classifier) => {
            let patch = classifier.classify(feature);
            StyleAttributes {
                color: patch.color.unwrap_or_else(|| layer.color.clone()),
                weight: patch.weight.unwrap_or(3.0),
                opacity: patch.opacity.unwrap_or(1.0) * scale,
                fill_opacity: patch.fill_opacity.unwrap_or(0.3) * scale,
                dash_array: patch.dash_array,
            }
        }
        None => StyleAttributes {
            color: layer.color.clone(),
            weight: 2.0,
            opacity: scale,
            fill_opacity: 0.3 * scale,
            dash_array: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::SourceLocator;
    use crate::style::classify::{Classifier, MatchRule};
    use geojson::feature::Id;
    use serde_json::json;

    fn feature(id: &str, props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: Some(Id::String(id.to_string())),
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn layer(id: &str) -> LayerDef {
        LayerDef::new(id, id, SourceLocator::new("/a.json", "a.json"), "#0f0")
    }

    fn risk_layer() -> LayerDef {
        layer("A").classify(Classifier::Match {
            keys: vec!["risk".to_string()],
            rules: vec![MatchRule {
                value: "high".to_string(),
                color: "#f00".to_string(),
            }],
            default_color: Some("#0f0".to_string()),
        })
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_style() {
        let style = resolve(&layer("roads"), &feature("1", json!({})), 100, &HighlightSet::new());
        assert_eq!(style.color, "#0f0");
        assert_eq!(style.weight, 2.0);
        assert!(approx(style.opacity, 1.0));
        assert!(approx(style.fill_opacity, 0.3));
    }

    #[test]
    fn test_opacity_scales_linearly() {
        let none = HighlightSet::new();
        let f = feature("1", json!({"risk": "low"}));
        for l in [layer("flat"), risk_layer()] {
            let full = resolve(&l, &f, 100, &none);
            let half = resolve(&l, &f, 50, &none);
            assert!(approx(half.opacity, full.opacity / 2.0));
            assert!(approx(half.fill_opacity, full.fill_opacity / 2.0));
        }
    }

    #[test]
    fn test_classified_high_risk_at_half_opacity() {
        let style = resolve(&risk_layer(), &feature("7", json!({"risk": "high"})), 50, &HighlightSet::new());
        assert_eq!(style.color, "#f00");
        assert!(approx(style.fill_opacity, 0.15));
        assert!(approx(style.opacity, 0.5));

        let other = resolve(&risk_layer(), &feature("8", json!({"risk": "low"})), 50, &HighlightSet::new());
        assert_eq!(other.color, "#0f0");
    }

    #[test]
    fn test_highlight_overrides_everything() {
        let mut highlights = HighlightSet::new();
        highlights.insert("A", "7".to_string());
        let f = feature("7", json!({"risk": "high"}));
        for opacity in [0, 30, 100] {
            let style = resolve(&risk_layer(), &f, opacity, &highlights);
            assert_eq!(style, highlight_style(None));
        }
        // Same feature key in another layer is not highlighted
        let style = resolve(&layer("B"), &f, 100, &highlights);
        assert_eq!(style.color, "#0f0");
    }

    #[test]
    fn test_highlight_by_category() {
        let admin = highlight_style(Some(Category::Administrative));
        let risk = highlight_style(Some(Category::Risk));
        let other = highlight_style(Some(Category::Infrastructure));
        assert_eq!(admin.fill_opacity, 0.5);
        assert_eq!(risk.fill_opacity, 0.9);
        assert!(admin.dash_array.is_some() && risk.dash_array.is_some());
        assert_eq!(other.weight, 6.0);
        assert!(other.dash_array.is_none());
        assert!([admin, risk, other].iter().all(|s| s.color == HIGHLIGHT_COLOR));
    }

    #[test]
    fn test_highlight_matches_property_id() {
        let mut highlights = HighlightSet::new();
        highlights.insert("A", "42".to_string());
        let f = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: json!({"id": 42}).as_object().cloned(),
            foreign_members: None,
        };
        assert!(highlights.contains_feature("A", &f));
    }

    #[test]
    fn test_highlights_are_keyed_per_layer() {
        let mut highlights = HighlightSet::new();
        highlights.insert("A", "1".to_string());
        highlights.insert("A", "2".to_string());
        highlights.insert("B", "1".to_string());
        assert_eq!(highlights.len(), 3);
        assert!(highlights.contains("B", "1"));
        assert!(!highlights.contains("B", "2"));
        assert!(!highlights.contains("C", "1"));
        highlights.clear();
        assert!(highlights.is_empty());
    }
}
