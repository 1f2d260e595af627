use std::collections::HashMap;

use geojson::FeatureCollection;
use tracing::{info, warn};

use crate::geo::{geometry_bounds, Bounds};
use crate::map::spatial::FeatureGrid;

/// A loaded layer: its features plus a bbox index over them
#[derive(Debug)]
pub struct CachedLayer {
    pub collection: FeatureCollection,
    pub index: FeatureGrid,
    /// Per-feature bounding boxes, `None` for features without geometry
    pub bounds: Vec<Option<Bounds>>,
    /// Union of all feature boxes
    pub extent: Option<Bounds>,
}

impl CachedLayer {
    pub fn new(collection: FeatureCollection) -> Self {
        let bounds: Vec<Option<Bounds>> = collection
            .features
            .iter()
            .map(|f| f.geometry.as_ref().and_then(geometry_bounds))
            .collect();
        let extent = bounds.iter().flatten().copied().reduce(Bounds::union);
        let index = FeatureGrid::build(
            bounds.iter().enumerate().filter_map(|(idx, b)| b.map(|b| (idx, b))),
            FeatureGrid::cell_size_for(extent),
        );
        Self {
            collection,
            index,
            bounds,
            extent,
        }
    }

    pub fn len(&self) -> usize {
        self.collection.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.features.is_empty()
    }
}

/// Loaded layers by id. Entries are written once and never replaced.
#[derive(Debug, Default)]
pub struct FeatureCache {
    layers: HashMap<String, CachedLayer>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, layer_id: &str) -> Option<&CachedLayer> {
        self.layers.get(layer_id)
    }

    pub fn contains(&self, layer_id: &str) -> bool {
        self.layers.contains_key(layer_id)
    }

    /// Store a layer's features. Returns false, leaving the existing entry
    /// untouched, when the layer is already cached.
    pub fn insert(&mut self, layer_id: &str, collection: FeatureCollection) -> bool {
        if self.layers.contains_key(layer_id) {
            warn!(layer = layer_id, "layer already cached, ignoring duplicate load");
            return false;
        }
        let layer = CachedLayer::new(collection);
        info!(layer = layer_id, features = layer.len(), "cached layer");
        self.layers.insert(layer_id.to_string(), layer);
        true
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total features across all cached layers
    pub fn feature_count(&self) -> usize {
        self.layers.values().map(CachedLayer::len).sum()
    }
}
