// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory map canvas.
//!
//! Keeps the attached layers in attachment order, the way a map keeps its
//! overlay stack, and can dump them as a single GeoJSON document.

use std::sync::{Mutex, MutexGuard, PoisonError};

use layer_toggle::{CanvasError, MapCanvas};
use log::info;
use serde_json::{json, Map, Value};

use crate::layer::{feature_collection, Layer, LayerKind};

#[derive(Debug, Default)]
pub struct HeadlessCanvas {
    layers: Mutex<Vec<Layer>>,
}

impl HeadlessCanvas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Layer>> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the attached layers, bottom first.
    #[must_use]
    pub fn layers(&self) -> Vec<Layer> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every attached feature in one collection.
    ///
    /// Features are tagged with the title and id of their layer. Image
    /// overlays are exported as their bounding polygon.
    #[must_use]
    pub fn to_feature_collection(&self) -> Value {
        let mut features = Vec::new();
        for layer in self.lock().iter() {
            match &layer.kind {
                LayerKind::ImageOverlay {
                    url,
                    bounds,
                    opacity,
                } => features.push(json!({
                    "type": "Feature",
                    "geometry": bounds.to_polygon(),
                    "properties": {
                        "layer": layer.title,
                        "layerId": layer.id,
                        "imageUrl": url,
                        "opacity": opacity,
                    },
                })),
                LayerKind::GeoJson { collection, .. } => {
                    let Some(items) = collection.get("features").and_then(Value::as_array) else {
                        continue;
                    };
                    for feature in items {
                        features.push(tag_feature(feature.clone(), layer));
                    }
                }
            }
        }
        feature_collection(features)
    }
}

fn tag_feature(mut feature: Value, layer: &Layer) -> Value {
    if let Some(object) = feature.as_object_mut() {
        let properties = object
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if !properties.is_object() {
            *properties = Value::Object(Map::new());
        }
        if let Some(properties) = properties.as_object_mut() {
            properties.insert("layer".to_string(), json!(layer.title));
            properties.insert("layerId".to_string(), json!(layer.id));
        }
    }
    feature
}

impl MapCanvas for HeadlessCanvas {
    type Layer = Layer;

    fn add_layer(&self, layer: &Layer) -> Result<(), CanvasError> {
        let mut layers = self.lock();
        if layers.iter().any(|l| l.id == layer.id) {
            return Err(CanvasError::AlreadyAttached);
        }
        info!("Map: + {}", layer.summary());
        layers.push(layer.clone());
        Ok(())
    }

    fn remove_layer(&self, layer: &Layer) -> Result<(), CanvasError> {
        let mut layers = self.lock();
        let index = layers
            .iter()
            .position(|l| l.id == layer.id)
            .ok_or(CanvasError::NotAttached)?;
        let removed = layers.remove(index);
        info!("Map: - {}", removed.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{geojson_layer, image_overlay, point_feature, Bounds};

    fn stations() -> Layer {
        let data = feature_collection(vec![
            point_feature(25.03, 121.56, json!({ "siteId": "C0AC70" })),
            point_feature(23.50, 120.81, Value::Null),
        ]);
        geojson_layer("Rain stations", data).unwrap().unwrap()
    }

    #[test]
    fn test_attach_and_detach() {
        let canvas = HeadlessCanvas::new();
        let layer = stations();

        canvas.add_layer(&layer).unwrap();
        assert_eq!(canvas.add_layer(&layer), Err(CanvasError::AlreadyAttached));
        assert_eq!(canvas.len(), 1);

        canvas.remove_layer(&layer).unwrap();
        assert_eq!(canvas.remove_layer(&layer), Err(CanvasError::NotAttached));
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_export_tags_features() {
        let canvas = HeadlessCanvas::new();
        let radar = image_overlay(
            "Radar echo",
            "https://example.test/8",
            Bounds::from_corners((27.2, 115.0), (19.2, 129.2)),
            0.7,
        );
        let stations = stations();
        canvas.add_layer(&radar).unwrap();
        canvas.add_layer(&stations).unwrap();

        let export = canvas.to_feature_collection();
        let features = export["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);

        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["properties"]["imageUrl"], "https://example.test/8");
        assert_eq!(features[1]["properties"]["layer"], "Rain stations");
        assert_eq!(features[1]["properties"]["siteId"], "C0AC70");
        assert_eq!(features[2]["properties"]["layerId"], json!(stations.id));
    }
}
