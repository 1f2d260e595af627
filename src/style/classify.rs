//! Data-driven style strategies.
//!
//! Each variant maps a feature's properties to a partial style. New layer
//! types get a new variant, or a `Match` rule in the registry file.

use geojson::{Feature, JsonObject, JsonValue};
use serde::Deserialize;

use super::StylePatch;
use crate::data::props::{self, KeyChain};
use crate::hash::palette_color;
use crate::layers::LegendEntry;

const FOREST_NAME: KeyChain = KeyChain(&["NAMOBJ", "NAMA_KAWASAN", "NAMA"]);
const FOREST_FUNCTION: KeyChain = KeyChain(&["FUNGSI_KWS", "FUNGSI"]);
const FLOOD_AREA: KeyChain = KeyChain(&["NAMOBJ", "NAMA_KAWASAN", "DESA", "LOKASI", "REMARK"]);
const FLOOD_LEVEL: KeyChain = KeyChain(&["rwn_banjir", "RESIKO", "TINGKAT", "LEVEL", "KELAS"]);
const FLOOD_VALUE: KeyChain = KeyChain(&["NILAI", "VALUE"]);
const ELEVATION: KeyChain = KeyChain(&["ELEV", "ELEVATION", "CONTOUR", "HEIGHT"]);
const CAPABILITY_CLASS: KeyChain = KeyChain(&["KELAS", "KEMAMPUAN", "NAMOBJ", "KETERANGAN"]);
const RISK_LEVEL: KeyChain = KeyChain(&["RESIKO", "TINGKAT", "LEVEL", "KELAS", "NAMOBJ"]);
const WATERSHED_NAME: KeyChain = KeyChain(&["nama_das", "NAMA_DAS", "DAS", "NAMOBJ"]);

/// Style strategy attached to a layer
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    /// Forest decree areas: colour per area name, else per function
    ForestZone,
    /// Flood risk: colour per location, else per risk tier or score
    FloodRisk,
    /// Elevation contours: heavier lines on major intervals
    Contour,
    /// Land capability: colour per capability class
    LandCapability,
    /// Landslide risk tiers
    LandslideRisk,
    /// Flash-flood risk tiers
    FlashFloodRisk,
    /// Watershed: colour per watershed name
    Watershed,
    /// Outline only, layer colour
    Transparent,
    /// Categorical colours from the first present key in `keys`
    Match {
        keys: Vec<String>,
        rules: Vec<MatchRule>,
        #[serde(default)]
        default_color: Option<String>,
    },
}

/// `value` (case-insensitive) maps to `color`
#[derive(Clone, Debug, Deserialize)]
pub struct MatchRule {
    pub value: String,
    pub color: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskTier {
    VeryHigh,
    High,
    Medium,
    Low,
}

/// Classify a free-text risk level ("SANGAT TINGGI", "Sedang", "low", ...)
pub fn risk_tier(level: &str) -> Option<RiskTier> {
    let level = level.to_uppercase();
    let has = |words: &[&str]| words.iter().any(|w| level.contains(w));

    if has(&["SANGAT TINGGI", "VERY HIGH"]) {
        Some(RiskTier::VeryHigh)
    } else if has(&["TINGGI", "HIGH"]) {
        Some(RiskTier::High)
    } else if has(&["SEDANG", "MEDIUM", "MODERATE"]) {
        Some(RiskTier::Medium)
    } else if has(&["RENDAH", "LOW"]) {
        Some(RiskTier::Low)
    } else {
        None
    }
}

struct TierPalette {
    very_high: &'static str,
    high: &'static str,
    medium: &'static str,
    low: &'static str,
    fallback: &'static str,
}

impl TierPalette {
    fn pick(&self, tier: Option<RiskTier>) -> &'static str {
        match tier {
            Some(RiskTier::VeryHigh) => self.very_high,
            Some(RiskTier::High) => self.high,
            Some(RiskTier::Medium) => self.medium,
            Some(RiskTier::Low) => self.low,
            None => self.fallback,
        }
    }
}

const FLOOD_TIERS: TierPalette = TierPalette {
    very_high: "#D50000",
    high: "#D50000",
    medium: "#FFD600",
    low: "#00C853",
    fallback: "#00C853",
};

const LANDSLIDE_TIERS: TierPalette = TierPalette {
    very_high: "#B71C1C",
    high: "#D32F2F",
    medium: "#F57C00",
    low: "#8BC34A",
    fallback: "#795548",
};

const FLASH_FLOOD_TIERS: TierPalette = TierPalette {
    very_high: "#B71C1C",
    high: "#C62828",
    medium: "#F9A825",
    low: "#2E7D32",
    fallback: "#0D47A1",
};

impl Classifier {
    /// Partial style for one feature
    pub fn classify(&self, feature: &Feature) -> StylePatch {
        let p = props::properties(feature);
        match self {
            Classifier::ForestZone => forest_zone(p),
            Classifier::FloodRisk => flood_risk(p),
            Classifier::Contour => contour(p),
            Classifier::LandCapability => {
                let color = named_color(CAPABILITY_CLASS.text(p)).unwrap_or("#8BC34A");
                StylePatch::full(color, 1.0, 0.8, 0.6)
            }
            Classifier::LandslideRisk => tiered(p, &LANDSLIDE_TIERS),
            Classifier::FlashFloodRisk => tiered(p, &FLASH_FLOOD_TIERS),
            Classifier::Watershed => {
                let color = named_color(WATERSHED_NAME.text(p)).unwrap_or("#2196F3");
                StylePatch::full(color, 2.0, 0.8, 0.4)
            }
            Classifier::Transparent => StylePatch {
                weight: Some(2.0),
                opacity: Some(1.0),
                fill_opacity: Some(0.0),
                ..StylePatch::default()
            },
            Classifier::Match {
                keys,
                rules,
                default_color,
            } => {
                let value = keys
                    .iter()
                    .filter_map(|k| p.get(k))
                    .find(|v| !v.is_null())
                    .map(props::display_value);
                let color = value
                    .and_then(|v| rules.iter().find(|r| r.value.eq_ignore_ascii_case(&v)))
                    .map(|r| r.color.as_str())
                    .or(default_color.as_deref());
                color.map(StylePatch::color).unwrap_or_default()
            }
        }
    }

    /// Legend rows describing this classifier's classes
    pub fn legend(&self) -> Vec<LegendEntry> {
        let rows: &[(&str, &str)] = match self {
            Classifier::ForestZone => &[
                ("#1B5E20", "Hutan Konservasi"),
                ("#2E7D32", "Hutan Lindung"),
                ("#66BB6A", "Hutan Produksi"),
                ("#81C784", "Hutan Produksi Terbatas"),
                ("#FFF9C4", "APL (Area Penggunaan Lain)"),
            ],
            Classifier::FloodRisk => &[
                ("#4CAF50", "Resiko Rendah"),
                ("#FFC107", "Resiko Sedang"),
                ("#F44336", "Resiko Tinggi"),
                ("#B71C1C", "Resiko Sangat Tinggi"),
            ],
            Classifier::Contour => &[
                ("#333333", "Kontur 500m (Tebal)"),
                ("#555555", "Kontur 250m"),
                ("#777777", "Kontur 100m"),
                ("#999999", "Kontur 50m (Tipis)"),
            ],
            Classifier::LandCapability => &[
                ("#4CAF50", "Kelas I - Sangat Baik"),
                ("#8BC34A", "Kelas II - Baik"),
                ("#CDDC39", "Kelas III - Sedang"),
                ("#FFEB3B", "Kelas IV - Terbatas"),
                ("#FFC107", "Kelas V - Agak Buruk"),
                ("#FF9800", "Kelas VI - Buruk"),
                ("#E65100", "Kelas VII - Sangat Buruk"),
                ("#B71C1C", "Kelas VIII - Ekstrim"),
            ],
            Classifier::LandslideRisk => &[
                ("#8BC34A", "Resiko Rendah"),
                ("#F57C00", "Resiko Sedang"),
                ("#D32F2F", "Resiko Tinggi"),
                ("#B71C1C", "Resiko Sangat Tinggi"),
            ],
            Classifier::FlashFloodRisk => &[
                ("#2E7D32", "Resiko Rendah"),
                ("#F9A825", "Resiko Sedang"),
                ("#C62828", "Resiko Tinggi"),
                ("#B71C1C", "Resiko Sangat Tinggi"),
            ],
            Classifier::Watershed => &[("#2196F3", "Batas DAS")],
            Classifier::Transparent => &[],
            Classifier::Match { rules, .. } => {
                return rules
                    .iter()
                    .map(|r| LegendEntry::new(&r.color, &r.value))
                    .collect();
            }
        };
        rows.iter().map(|(color, label)| LegendEntry::new(color, label)).collect()
    }
}

/// Palette colour for a meaningful name; `-` and empty names do not count
fn named_color(name: Option<String>) -> Option<&'static str> {
    name.filter(|n| n != "-").map(|n| palette_color(&n))
}

fn forest_zone(p: &JsonObject) -> StylePatch {
    let color = named_color(FOREST_NAME.text(p)).unwrap_or_else(|| {
        let function = FOREST_FUNCTION.text(p).unwrap_or_default().to_uppercase();
        if function.contains("LINDUNG") {
            "#2E7D32"
        } else if function.contains("PRODUKSI TERBATAS") {
            "#81C784"
        } else if function.contains("PRODUKSI") {
            "#66BB6A"
        } else if function.contains("KONSERVASI") {
            "#1B5E20"
        } else if function.contains("APL") || function.contains("PENGGUNAAN LAIN") {
            "#FFF9C4"
        } else {
            "#2E7D32"
        }
    });
    StylePatch::full(color, 2.0, 0.8, 0.5)
}

fn flood_risk(p: &JsonObject) -> StylePatch {
    // Named areas get a categorical colour; single-character keys are codes
    let area = FLOOD_AREA.find(p).and_then(JsonValue::as_str).filter(|s| *s != "-" && s.chars().count() > 1);
    if let Some(area) = area {
        return StylePatch::full(palette_color(area), 1.0, 0.9, 0.6);
    }

    let color = match FLOOD_LEVEL.find(p) {
        Some(JsonValue::String(level)) => FLOOD_TIERS.pick(risk_tier(level)),
        None => FLOOD_TIERS.fallback,
        Some(_) => {
            let score = FLOOD_VALUE.number(p).unwrap_or(0.0);
            if score >= 3.0 {
                FLOOD_TIERS.high
            } else if score >= 2.0 {
                FLOOD_TIERS.medium
            } else {
                FLOOD_TIERS.low
            }
        }
    };
    StylePatch::full(color, 1.0, 0.9, 0.7)
}

fn contour(p: &JsonObject) -> StylePatch {
    let elevation = ELEVATION.number(p).unwrap_or(0.0);
    let (weight, color) = if elevation % 500.0 == 0.0 {
        (3.0, "#333333")
    } else if elevation % 250.0 == 0.0 {
        (2.0, "#555555")
    } else if elevation % 100.0 == 0.0 {
        (1.5, "#777777")
    } else {
        (1.0, "#999999")
    };
    StylePatch::full(color, weight, 0.7, 0.0)
}

fn tiered(p: &JsonObject, palette: &TierPalette) -> StylePatch {
    let tier = RISK_LEVEL.find(p).and_then(JsonValue::as_str).and_then(risk_tier);
    StylePatch::full(palette.pick(tier), 1.0, 0.8, 0.6)
}
