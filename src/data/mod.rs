//! Layer payload parsing and normalization.
//!
//! Source files arrive in several GeoJSON-ish shapes. Everything is turned
//! into a canonical `FeatureCollection` whose features all carry an id.

pub mod cache;
pub mod fetch;
pub mod props;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use tracing::debug;

use crate::error::LoadError;
use crate::layers::SourceFormat;

pub use cache::{CachedLayer, FeatureCache};
pub use fetch::{load_layer, Fetcher, LoadOutcome, Loader};

/// Stable per-layer feature identifier, compared as text
pub type FeatureKey = String;

/// Parse raw source text into JSON.
///
/// `AssignmentWrapped` sources (`var x = {...};`) are cut down to the span
/// from the first `{` to the last `}` before parsing.
pub fn parse_payload(text: &str, format: SourceFormat) -> Result<JsonValue, LoadError> {
    let body = match format {
        SourceFormat::PureJson => text,
        SourceFormat::AssignmentWrapped => extract_object(text)?,
    };

    let mut bytes = body.as_bytes().to_vec();
    simd_json::serde::from_slice::<JsonValue>(&mut bytes).map_err(|e| LoadError::Parse(e.to_string()))
}

/// Slice out the outermost `{ ... }` of a wrapped source
fn extract_object(text: &str) -> Result<&str, LoadError> {
    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if first < last => Ok(&text[first..=last]),
        _ => Err(LoadError::Parse("could not find JSON object structure".to_string())),
    }
}

/// Normalize a parsed payload to a FeatureCollection.
///
/// Precedence: `FeatureCollection`, `Feature`, `GeometryCollection`, bare
/// array of features, then any object carrying a `features` array.
pub fn normalize(value: JsonValue) -> Result<FeatureCollection, LoadError> {
    let features = match value {
        JsonValue::Array(items) => features_from_values(items)?,
        JsonValue::Object(mut object) => {
            let kind = object.get("type").and_then(JsonValue::as_str).map(str::to_owned);
            match kind.as_deref() {
                Some("FeatureCollection") => match object.remove("features") {
                    Some(JsonValue::Array(items)) => features_from_values(items)?,
                    _ => {
                        return Err(LoadError::Parse(
                            "FeatureCollection has no features array".to_string(),
                        ))
                    }
                },
                Some("Feature") => vec![feature_from_value(JsonValue::Object(object), 0)?],
                Some("GeometryCollection") => match object.remove("geometries") {
                    Some(JsonValue::Array(geometries)) => features_from_geometries(geometries)?,
                    _ => {
                        return Err(LoadError::Parse(
                            "GeometryCollection has no geometries array".to_string(),
                        ))
                    }
                },
                _ => match object.remove("features") {
                    Some(JsonValue::Array(items)) => features_from_values(items)?,
                    _ => {
                        return Err(LoadError::UnsupportedFormat(
                            kind.unwrap_or_else(|| "unknown".to_string()),
                        ))
                    }
                },
            }
        }
        _ => return Err(LoadError::UnsupportedFormat("unknown".to_string())),
    };

    debug!(features = features.len(), "normalized payload");

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn features_from_values(items: Vec<JsonValue>) -> Result<Vec<Feature>, LoadError> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| feature_from_value(item, idx))
        .collect()
}

fn feature_from_value(mut value: JsonValue, idx: usize) -> Result<Feature, LoadError> {
    // Bare feature objects sometimes omit their type tag
    if let JsonValue::Object(object) = &mut value {
        object
            .entry("type")
            .or_insert_with(|| JsonValue::String("Feature".to_string()));
        // Ids other than strings and numbers fall back to the array index
        if object.get("id").is_some_and(|id| !id.is_string() && !id.is_number()) {
            debug!(feature = idx, "dropping non-scalar feature id");
            object.remove("id");
        }
        if object.get("properties").is_some_and(|p| !p.is_object() && !p.is_null()) {
            object.remove("properties");
        }
    }
    Feature::from_json_value(value).map_err(|e| LoadError::Parse(format!("feature {idx}: {e}")))
}

fn features_from_geometries(geometries: Vec<JsonValue>) -> Result<Vec<Feature>, LoadError> {
    geometries
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            let geometry = Geometry::from_json_value(value)
                .map_err(|e| LoadError::Parse(format!("geometry {idx}: {e}")))?;
            Ok(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(Id::Number(idx.into())),
                properties: Some(JsonObject::new()),
                foreign_members: None,
            })
        })
        .collect()
}

/// Give every feature without `id` or `properties.id` its array index as id
pub fn assign_ids(collection: &mut FeatureCollection) {
    for (idx, feature) in collection.features.iter_mut().enumerate() {
        if feature_key(feature).is_none() {
            feature.id = Some(Id::Number(idx.into()));
        }
    }
}

/// Parse, normalize and id-stamp a source in one step
pub fn decode(text: &str, format: SourceFormat) -> Result<FeatureCollection, LoadError> {
    let mut collection = normalize(parse_payload(text, format)?)?;
    assign_ids(&mut collection);
    Ok(collection)
}

/// The feature's identifier: its own `id`, else `properties.id`
pub fn feature_key(feature: &Feature) -> Option<FeatureKey> {
    match &feature.id {
        Some(Id::String(s)) => Some(s.clone()),
        Some(Id::Number(n)) => Some(n.to_string()),
        None => feature
            .properties
            .as_ref()
            .and_then(|p| p.get("id"))
            .filter(|v| !v.is_null())
            .map(props::display_value),
    }
}
