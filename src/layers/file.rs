//! TOML layer registry, replacing the built-in catalog at startup.
//!
//! ```toml
//! [[layers]]
//! id = "bts_desa"
//! name = "Batas Desa"
//! url = "/data/batasdesapbd_new.js"
//! file = "batasdesapbd_new.js"
//! visible = true
//! color = "#FF6F00"
//! category = "administrative"
//! classify = { kind = "transparent" }
//! popup = "administrative"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::LayerDef;
use crate::error::RegistryError;

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    layers: Vec<LayerDef>,
}

/// Read and validate a registry file
pub fn load_registry(path: &Path) -> Result<Vec<LayerDef>, RegistryError> {
    let content = fs::read_to_string(path).map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
    let layers = parse_registry(&content).map_err(|e| match e {
        ParseFailure::Toml(e) => RegistryError::Toml(path.to_path_buf(), e),
        ParseFailure::Invalid(e) => e,
    })?;
    info!(path = %path.display(), layers = layers.len(), "loaded layer registry");
    Ok(layers)
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(RegistryError),
}

fn parse_registry(content: &str) -> Result<Vec<LayerDef>, ParseFailure> {
    let file: RegistryFile = toml::from_str(content).map_err(ParseFailure::Toml)?;
    validate(&file.layers).map_err(ParseFailure::Invalid)?;
    Ok(file.layers)
}

fn validate(layers: &[LayerDef]) -> Result<(), RegistryError> {
    if layers.is_empty() {
        return Err(RegistryError::Empty);
    }
    let mut seen = HashSet::new();
    for layer in layers {
        if layer.id.trim().is_empty() {
            return Err(RegistryError::EmptyId(layer.name.clone()));
        }
        if !seen.insert(layer.id.as_str()) {
            return Err(RegistryError::DuplicateId(layer.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Category, SourceFormat};
    use crate::map::hit::DEFAULT_TOLERANCE_DEG;
    use crate::popup::PopupTemplate;
    use crate::style::classify::Classifier;
    use std::io::Write;

    const SAMPLE: &str = r##"
[[layers]]
id = "bts_desa"
name = "Batas Desa"
url = "/data/batasdesapbd_new.js"
file = "batasdesapbd_new.js"
visible = true
color = "#FF6F00"
category = "administrative"
classify = { kind = "transparent" }
popup = "administrative"

[[layers]]
id = "risk"
name = "Risk"
url = "https://example.com/risk.json"
file = "risk.json"
color = "#0f0"
hit_tolerance = 0.001

[layers.classify]
kind = "match"
keys = ["risk", "RESIKO"]
rules = [{ value = "high", color = "#f00" }]
default_color = "#0f0"
"##;

    #[test]
    fn test_parse_sample() {
        let layers = parse_registry(SAMPLE).ok().unwrap();
        assert_eq!(layers.len(), 2);

        let desa = &layers[0];
        assert!(desa.visible);
        assert!(desa.highlightable);
        assert_eq!(desa.category, Some(Category::Administrative));
        assert_eq!(desa.popup, PopupTemplate::Administrative);
        assert_eq!(desa.source.format(), SourceFormat::AssignmentWrapped);
        assert_eq!(desa.hit_tolerance, DEFAULT_TOLERANCE_DEG);
        assert!(matches!(desa.classify, Some(Classifier::Transparent)));

        let risk = &layers[1];
        assert!(!risk.visible);
        assert_eq!(risk.hit_tolerance, 0.001);
        assert!(risk.source.is_remote());
        assert!(matches!(risk.classify, Some(Classifier::Match { .. })));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doubled = format!("{SAMPLE}\n[[layers]]\nid = \"risk\"\nname = \"again\"\nurl = \"/a.json\"\nfile = \"a.json\"\ncolor = \"#000\"\n");
        match parse_registry(&doubled) {
            Err(ParseFailure::Invalid(RegistryError::DuplicateId(id))) => assert_eq!(id, "risk"),
            _ => panic!("expected duplicate id error"),
        }
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(matches!(parse_registry(""), Err(ParseFailure::Invalid(RegistryError::Empty))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let layers = load_registry(file.path()).unwrap();
        assert_eq!(layers[1].id, "risk");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_registry(Path::new("/nonexistent/layers.toml")).unwrap_err();
        assert!(matches!(err, RegistryError::Io(..)));
    }
}
