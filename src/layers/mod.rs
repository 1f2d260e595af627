//! Layer registry: the static catalog of map layers.
//!
//! Order matters: it is the draw order and the hit-test order.

pub mod basemap;
pub mod file;

use serde::Deserialize;

use crate::map::hit::DEFAULT_TOLERANCE_DEG;
use crate::popup::PopupTemplate;
use crate::style::classify::Classifier;

const STORAGE_URL: &str = "https://qbvlqrjewdetjkvvszjq.supabase.co/storage/v1/object/public/webgis-data";

/// How a source file wraps its GeoJSON
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    /// Plain `.json`
    PureJson,
    /// `.js` with one object in an assignment (`var x = {...};`)
    AssignmentWrapped,
}

/// Where a layer's data lives
#[derive(Clone, Debug, Deserialize)]
pub struct SourceLocator {
    /// Absolute URL or root-relative path
    pub url: String,
    /// Source file name; decides the format and names the local copy
    pub file: String,
}

impl SourceLocator {
    pub fn new(url: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file: file.into(),
        }
    }

    pub fn format(&self) -> SourceFormat {
        if self.file.to_ascii_lowercase().ends_with(".json") {
            SourceFormat::PureJson
        } else {
            SourceFormat::AssignmentWrapped
        }
    }

    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Thematic grouping; selects the highlight treatment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Administrative,
    Risk,
    Environment,
    Topography,
    Infrastructure,
}

/// One manual legend row
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
}

impl LegendEntry {
    pub fn new(color: &str, label: &str) -> Self {
        Self {
            color: color.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_DEG
}

/// Static definition of one map layer
#[derive(Clone, Debug, Deserialize)]
pub struct LayerDef {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub source: SourceLocator,
    /// Visibility at startup
    #[serde(default)]
    pub visible: bool,
    pub color: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default = "default_true")]
    pub highlightable: bool,
    /// Data-driven style; replaces the flat `color` default when set
    #[serde(default)]
    pub classify: Option<Classifier>,
    #[serde(default)]
    pub legend: Vec<LegendEntry>,
    #[serde(default)]
    pub popup: PopupTemplate,
    /// Line/point hit distance in degrees
    #[serde(default = "default_tolerance")]
    pub hit_tolerance: f64,
}

impl LayerDef {
    /// Flat-coloured layer with no classifier
    pub fn new(id: &str, name: &str, source: SourceLocator, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source,
            visible: false,
            color: color.to_string(),
            category: None,
            highlightable: true,
            classify: None,
            legend: Vec::new(),
            popup: PopupTemplate::Generic,
            hit_tolerance: DEFAULT_TOLERANCE_DEG,
        }
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn highlightable(mut self, highlightable: bool) -> Self {
        self.highlightable = highlightable;
        self
    }

    pub fn classify(mut self, classifier: Classifier) -> Self {
        self.classify = Some(classifier);
        self
    }

    pub fn popup(mut self, template: PopupTemplate) -> Self {
        self.popup = template;
        self
    }

    /// Manual legend when given, else whatever the classifier declares.
    /// Empty means a single swatch of `color`.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        if !self.legend.is_empty() {
            return self.legend.clone();
        }
        self.classify
            .as_ref()
            .map(Classifier::legend)
            .unwrap_or_default()
    }
}

fn remote(file: &str) -> SourceLocator {
    SourceLocator::new(format!("{STORAGE_URL}/{file}"), file)
}

fn local(file: &str) -> SourceLocator {
    SourceLocator::new(format!("/data/{}", file.replace(' ', "%20")), file)
}

/// Built-in layer catalog for Papua Barat Daya
pub fn registry() -> Vec<LayerDef> {
    use Category::*;

    vec![
        LayerDef::new("das_pbd", "Daerah Aliran Sungai (DAS)", remote("DASPBD_2.js"), "#0000FF")
            .category(Environment)
            .classify(Classifier::Watershed),
        LayerDef::new("dis_banjir", "Daerah Rawan Banjir", remote("dis_banjir_1.js"), "#FFA500")
            .category(Risk)
            .classify(Classifier::FloodRisk)
            .popup(PopupTemplate::FloodRisk),
        LayerDef::new("kelerengan", "Kelerengan Lahan", remote("KELERENGANPBD_3.js"), "#008000")
            .category(Environment),
        LayerDef::new("kontur", "Kontur Wilayah", remote("topopbd_4.js"), "#808080")
            .category(Topography)
            .highlightable(false)
            .classify(Classifier::Contour),
        LayerDef::new("bts_desa", "Batas Desa", local("batasdesapbd_new.js"), "#FF6F00")
            .visible(true)
            .category(Administrative)
            .classify(Classifier::Transparent)
            .popup(PopupTemplate::Administrative),
        LayerDef::new("bts_kab", "Batas Kabupaten", local("btskab_0.js"), "#FF6F00")
            .visible(true)
            .category(Administrative)
            .classify(Classifier::Transparent),
        LayerDef::new(
            "resiko_banjir_bandang",
            "Indeks Resiko Banjir Bandang",
            local("INDEKS RESIKO BANJIR BANDANG.json"),
            "#D32F2F",
        )
        .category(Risk)
        .classify(Classifier::FlashFloodRisk),
        LayerDef::new("resiko_banjir_pbd", "Indeks Resiko Banjir", local("INDEKS RESIKO BANJIR.json"), "#C62828")
            .category(Risk)
            .classify(Classifier::FloodRisk),
        LayerDef::new("resiko_longsor", "Indeks Resiko Longsor", local("INDEKS RESIKO LONGSOR.json"), "#795548")
            .category(Risk)
            .classify(Classifier::LandslideRisk),
        LayerDef::new("lokasi_iplt", "Lokasi IPLT", local("LOKASI IPLT.json"), "#8D6E63").category(Infrastructure),
        LayerDef::new("lokasi_tpa", "Lokasi TPA", local("LOKASI TPA.json"), "#5D4037").category(Infrastructure),
        LayerDef::new("lokasi_ipal", "Lokasi IPAL", local("lokasi IPAL.json"), "#4E342E").category(Infrastructure),
        LayerDef::new("bendungan_pbd", "Bendungan", local("bendungan pbd.json"), "#0288D1").category(Infrastructure),
        LayerDef::new("jalan_nasional", "Jalan Nasional", local("jalan nasional.json"), "#F44336")
            .category(Infrastructure)
            .popup(PopupTemplate::Road),
        LayerDef::new("jembatan_nasional", "Jembatan Nasional", local("jembatan nasional.json"), "#FF5722")
            .category(Infrastructure),
        LayerDef::new("jln_prov_pbd", "Jalan Provinsi (PBD)", local("jlnprov.json"), "#D50000")
            .category(Infrastructure)
            .popup(PopupTemplate::Road),
        LayerDef::new("irigasi_pbd", "Jaringan Irigasi", local("jaringan irigasi pbd.json"), "#03A9F4")
            .category(Infrastructure),
        LayerDef::new("pengendali_banjir", "Pengendali Banjir", local("pengendali banjir pbd.json"), "#0277BD")
            .category(Infrastructure),
        LayerDef::new("kemampuan_lahan_pbd", "Kemampuan Lahan", local("kemampuan lahan.json"), "#8BC34A")
            .category(Environment)
            .classify(Classifier::LandCapability),
        LayerDef::new("kwsn_hutan_new", "Kawasan Hutan (Update)", local("kwsnhtn.json"), "#388E3C")
            .category(Environment)
            .classify(Classifier::ForestZone)
            .popup(PopupTemplate::ForestZone),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_ids_are_unique() {
        let layers = registry();
        let ids: HashSet<_> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids.len(), layers.len());
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(SourceLocator::new("/data/a.js", "a.js").format(), SourceFormat::AssignmentWrapped);
        assert_eq!(SourceLocator::new("/data/a.json", "a.JSON").format(), SourceFormat::PureJson);
    }

    #[test]
    fn test_boundaries_start_visible() {
        let visible: Vec<_> = registry().into_iter().filter(|l| l.visible).map(|l| l.id).collect();
        assert_eq!(visible, vec!["bts_desa", "bts_kab"]);
    }

    #[test]
    fn test_legend_falls_back_to_classifier() {
        let layers = registry();
        let flood = layers.iter().find(|l| l.id == "dis_banjir").unwrap();
        assert_eq!(flood.legend_entries().len(), 4);
        let roads = layers.iter().find(|l| l.id == "jln_prov_pbd").unwrap();
        assert!(roads.legend_entries().is_empty());
    }

    #[test]
    fn test_local_urls_are_encoded() {
        let layers = registry();
        let tpa = layers.iter().find(|l| l.id == "lokasi_tpa").unwrap();
        assert_eq!(tpa.source.url, "/data/LOKASI%20TPA.json");
        assert!(!tpa.source.is_remote());
    }
}
