//! Popup and attribute formatting for clicked features.
//!
//! A popup is a list of sections, one per hit, each rendered as plain
//! markup: a title line, the template's highlighted fields, then the full
//! attribute table.

use std::fmt;

use geojson::{Feature, JsonObject};
use serde::Deserialize;

use crate::data::props::{self, KeyChain, PLACEHOLDER};
use crate::layers::LayerDef;
use crate::map::hit::Hit;
use crate::style::classify::{risk_tier, RiskTier};

const VILLAGE: KeyChain = KeyChain(&["DESA", "NAMOBJ", "NAMA_DESA", "KELURAHAN", "KAMPUNG"]);
const DISTRICT: KeyChain = KeyChain(&["KECAMATAN", "DISTRIK", "NAMA_KEC"]);
const REGENCY: KeyChain = KeyChain(&["KABUPATEN", "KAB_KOTA", "NAMA_KAB"]);
const AREA_NAME: KeyChain = KeyChain(&["NAMOBJ", "NAMA_KAWASAN", "NAMA"]);
const AREA_FUNCTION: KeyChain = KeyChain(&["FUNGSI_KWS", "FUNGSI", "JENIS"]);
const AREA_SIZE: KeyChain = KeyChain(&["LUAS", "SHAPE_AREA", "AREA"]);
const RISK_LEVEL: KeyChain = KeyChain(&["RESIKO", "TINGKAT", "LEVEL", "KELAS"]);
const LOCATION: KeyChain = KeyChain(&["LOKASI", "DESA", "NAMOBJ"]);
const ROAD_NAME: KeyChain = KeyChain(&["NAMRJL", "NAMA_JALAN", "NAMOBJ"]);
const ROAD_STATUS: KeyChain = KeyChain(&["STATUS", "FUNGSI", "KELAS"]);
const ROAD_LENGTH: KeyChain = KeyChain(&["PANJANG", "LENGTH", "SHAPE_LEN"]);
const ANY_NAME: KeyChain = KeyChain(&["NAMOBJ", "NAMA", "NAME", "name", "REMARK"]);

/// Which set of highlighted fields a layer's popup shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupTemplate {
    Administrative,
    ForestZone,
    FloodRisk,
    Road,
    /// Attribute table only
    #[default]
    Generic,
}

impl PopupTemplate {
    fn title(self) -> Option<&'static str> {
        match self {
            PopupTemplate::Administrative => Some("Informasi Wilayah Administratif"),
            PopupTemplate::ForestZone => Some("SK Kawasan Hutan"),
            PopupTemplate::FloodRisk => Some("Daerah Rawan Banjir"),
            PopupTemplate::Road | PopupTemplate::Generic => None,
        }
    }

    /// Key chain naming the feature in hover text
    fn primary(self) -> KeyChain {
        match self {
            PopupTemplate::Administrative => VILLAGE,
            PopupTemplate::ForestZone => AREA_NAME,
            PopupTemplate::FloodRisk => LOCATION,
            PopupTemplate::Road => ROAD_NAME,
            PopupTemplate::Generic => ANY_NAME,
        }
    }
}

/// One highlighted field of a section
#[derive(Clone, Debug, PartialEq)]
pub struct PopupField {
    pub label: &'static str,
    pub value: String,
    /// Hex colour for the value swatch
    pub accent: Option<&'static str>,
}

impl PopupField {
    fn new(label: &'static str, value: String) -> Self {
        Self {
            label,
            value,
            accent: None,
        }
    }

    fn accent(mut self, color: &'static str) -> Self {
        self.accent = Some(color);
        self
    }
}

/// Popup content for one hit
#[derive(Clone, Debug, PartialEq)]
pub struct PopupSection {
    pub layer_id: String,
    pub layer_name: String,
    pub title: String,
    pub fields: Vec<PopupField>,
    /// Every property as `(key, display value)`, sorted by key
    pub attributes: Vec<(String, String)>,
}

impl fmt::Display for PopupSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        if self.title != self.layer_name {
            writeln!(f, "({})", self.layer_name)?;
        }
        for field in &self.fields {
            match field.accent {
                Some(color) => writeln!(f, "{}: {} [{}]", field.label, field.value, color)?,
                None => writeln!(f, "{}: {}", field.label, field.value)?,
            }
        }
        write!(f, "-- Detail Atribut --")?;
        for (key, value) in &self.attributes {
            write!(f, "\n  {key} = {value}")?;
        }
        Ok(())
    }
}

/// Sections for every hit, in hit order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Popup {
    pub sections: Vec<PopupSection>,
}

impl Popup {
    /// The whole popup as one scrollable body
    pub fn body(&self) -> String {
        self.sections
            .iter()
            .map(PopupSection::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn line_count(&self) -> usize {
        self.body().lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Build the popup section for one feature of `layer`
pub fn section(layer: &LayerDef, feature: &Feature) -> PopupSection {
    let p = props::properties(feature);

    let fields = match layer.popup {
        PopupTemplate::Administrative => vec![
            PopupField::new("KELURAHAN/KAMPUNG", VILLAGE.text_or_placeholder(p)),
            PopupField::new("DISTRIK", DISTRICT.text_or_placeholder(p)),
            PopupField::new("KABUPATEN", REGENCY.text_or_placeholder(p)),
        ],
        PopupTemplate::ForestZone => {
            let function = AREA_FUNCTION.text_or_placeholder(p);
            let accent = function_accent(&function);
            let mut fields = vec![
                PopupField::new("NAMA KAWASAN", AREA_NAME.text_or_placeholder(p)),
                PopupField::new("FUNGSI KAWASAN", function).accent(accent),
            ];
            fields.extend(optional("LUAS", AREA_SIZE, p));
            fields
        }
        PopupTemplate::FloodRisk => {
            let level = RISK_LEVEL.text_or_placeholder(p);
            let accent = tier_accent(risk_tier(&level));
            let mut fields = vec![PopupField::new("TINGKAT RESIKO", level).accent(accent)];
            fields.extend(optional("LOKASI", LOCATION, p));
            fields
        }
        PopupTemplate::Road => {
            let mut fields = vec![PopupField::new("NAMA JALAN", ROAD_NAME.text_or_placeholder(p))];
            fields.extend(optional("STATUS", ROAD_STATUS, p));
            fields.extend(optional("PANJANG", ROAD_LENGTH, p));
            fields
        }
        PopupTemplate::Generic => Vec::new(),
    };

    PopupSection {
        layer_id: layer.id.clone(),
        layer_name: layer.name.clone(),
        title: layer.popup.title().unwrap_or(layer.name.as_str()).to_string(),
        fields,
        attributes: attribute_table(p),
    }
}

/// Popup markup for one feature
pub fn format(layer: &LayerDef, feature: &Feature) -> String {
    section(layer, feature).to_string()
}

/// Concatenate sections for every hit
pub fn compose(hits: &[Hit<'_>]) -> Popup {
    Popup {
        sections: hits.iter().map(|hit| section(hit.layer, hit.feature)).collect(),
    }
}

/// Short text for the info bar while hovering a feature
pub fn hover_label(layer: &LayerDef, feature: &Feature) -> String {
    match layer.popup.primary().text(props::properties(feature)) {
        Some(name) => format!("{}: {}", layer.name, name),
        None => layer.name.clone(),
    }
}

fn optional(label: &'static str, chain: KeyChain, p: &JsonObject) -> Option<PopupField> {
    chain.text(p).filter(|v| v != PLACEHOLDER).map(|v| PopupField::new(label, v))
}

fn attribute_table(p: &JsonObject) -> Vec<(String, String)> {
    let mut rows: Vec<_> = p.iter().map(|(k, v)| (k.clone(), props::display_value(v))).collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

fn function_accent(function: &str) -> &'static str {
    let function = function.to_uppercase();
    if function.contains("LINDUNG") {
        "#2E7D32"
    } else if function.contains("PRODUKSI TERBATAS") {
        "#81C784"
    } else if function.contains("PRODUKSI") {
        "#66BB6A"
    } else if function.contains("KONSERVASI") {
        "#1B5E20"
    } else if function.contains("APL") {
        "#FBC02D"
    } else {
        "#43A047"
    }
}

fn tier_accent(tier: Option<RiskTier>) -> &'static str {
    match tier {
        Some(RiskTier::VeryHigh) => "#7F1D1D",
        Some(RiskTier::High) => "#DC2626",
        Some(RiskTier::Medium) => "#EAB308",
        _ => "#16A34A",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{registry, SourceLocator};
    use serde_json::json;

    fn feature(props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn layer(id: &str) -> LayerDef {
        registry().into_iter().find(|l| l.id == id).unwrap()
    }

    #[test]
    fn test_administrative_fields() {
        let f = feature(json!({"NAMOBJ": "Remu", "KECAMATAN": "Sorong Manoi"}));
        let s = section(&layer("bts_desa"), &f);
        let values: Vec<_> = s.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["Remu", "Sorong Manoi", "-"]);
        assert_eq!(s.title, "Informasi Wilayah Administratif");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let s = section(&layer("jln_prov_pbd"), &feature(json!({"NAMRJL": "Jl. Klamono"})));
        assert_eq!(s.fields.len(), 1);

        let s = section(&layer("jln_prov_pbd"), &feature(json!({"NAMRJL": "Jl. Klamono", "PANJANG": 12.5})));
        assert_eq!(s.fields[1].label, "PANJANG");
        assert_eq!(s.fields[1].value, "12.5");
    }

    #[test]
    fn test_flood_accent_follows_tier() {
        let s = section(&layer("dis_banjir"), &feature(json!({"RESIKO": "Sangat Tinggi"})));
        assert_eq!(s.fields[0].accent, Some("#7F1D1D"));
        let s = section(&layer("dis_banjir"), &feature(json!({})));
        assert_eq!(s.fields[0].value, "-");
        assert_eq!(s.fields[0].accent, Some("#16A34A"));
    }

    #[test]
    fn test_attribute_table_sorted_with_placeholders() {
        let f = feature(json!({"b": null, "a": [1, 2], "c": ""}));
        let s = section(&layer("lokasi_tpa"), &f);
        assert_eq!(
            s.attributes,
            vec![
                ("a".to_string(), "[1,2]".to_string()),
                ("b".to_string(), "-".to_string()),
                ("c".to_string(), "-".to_string()),
            ]
        );
        assert!(s.fields.is_empty());
        assert_eq!(s.title, "Lokasi TPA");
    }

    #[test]
    fn test_format_markup() {
        let text = format(&layer("bts_desa"), &feature(json!({"DESA": "Remu"})));
        assert!(text.starts_with("# Informasi Wilayah Administratif\n(Batas Desa)\n"));
        assert!(text.contains("KELURAHAN/KAMPUNG: Remu"));
        assert!(text.contains("  DESA = Remu"));
    }

    #[test]
    fn test_feature_without_properties() {
        let f = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        let plain = LayerDef::new("x", "X", SourceLocator::new("/x.json", "x.json"), "#000");
        assert!(section(&plain, &f).attributes.is_empty());
        assert_eq!(hover_label(&plain, &f), "X");
    }

    #[test]
    fn test_hover_label_uses_primary_name() {
        let f = feature(json!({"NAMA_DESA": "Malaingkedi"}));
        assert_eq!(hover_label(&layer("bts_desa"), &f), "Batas Desa: Malaingkedi");
    }
}
