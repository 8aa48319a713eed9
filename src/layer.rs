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

//! Drawable layers and the factories that build them.
//!
//! A [`Layer`] is what the map canvas attaches: either a georeferenced image
//! or a GeoJSON feature collection, optionally drawn as marker clusters.
//! Every factory call mints a fresh layer id.

use chrono::{DateTime, Utc};
use layer_toggle::ActionError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

/// Reasons a payload is not usable GeoJSON.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeoJsonError {
    #[error("GeoJSON must be a JSON object")]
    NotAnObject,

    #[error("GeoJSON object has no type")]
    MissingType,

    #[error("unsupported GeoJSON type '{0}'")]
    UnsupportedType(String),

    #[error("FeatureCollection has no features array")]
    MissingFeatures,
}

impl From<GeoJsonError> for ActionError {
    fn from(e: GeoJsonError) -> Self {
        ActionError::Transform(e.to_string())
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Build from two opposite `(lat, lon)` corners in any order.
    #[must_use]
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            south: a.0.min(b.0),
            west: a.1.min(b.1),
            north: a.0.max(b.0),
            east: a.1.max(b.1),
        }
    }

    /// Closed GeoJSON polygon ring tracing the box.
    #[must_use]
    pub fn to_polygon(&self) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [self.west, self.south],
                [self.east, self.south],
                [self.east, self.north],
                [self.west, self.north],
                [self.west, self.south],
            ]],
        })
    }
}

/// Marker clustering behaviour for dense point layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterOptions {
    pub chunked_loading: bool,
    pub spiderfy_on_max_zoom: bool,
    pub show_coverage_on_hover: bool,
    pub zoom_to_bounds_on_click: bool,
    /// Maximum cluster radius in pixels.
    pub max_cluster_radius: u32,
    /// Zoom level at and above which points are never clustered.
    pub disable_clustering_at_zoom: u8,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            chunked_loading: true,
            spiderfy_on_max_zoom: false,
            show_coverage_on_hover: false,
            zoom_to_bounds_on_click: true,
            max_cluster_radius: 80,
            disable_clustering_at_zoom: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    ImageOverlay {
        url: String,
        bounds: Bounds,
        opacity: f32,
    },
    GeoJson {
        collection: Value,
        cluster: Option<ClusterOptions>,
    },
}

/// An overlay that can be attached to the map.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub id: Uuid,
    pub title: String,
    pub kind: LayerKind,
    pub created_at: DateTime<Utc>,
}

impl Layer {
    fn new(title: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Number of features drawn (an image counts as one).
    #[must_use]
    pub fn feature_count(&self) -> usize {
        match &self.kind {
            LayerKind::ImageOverlay { .. } => 1,
            LayerKind::GeoJson { collection, .. } => features(collection).map_or(0, <[Value]>::len),
        }
    }

    /// One-line description for logs and the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.kind {
            LayerKind::ImageOverlay { url, opacity, .. } => {
                format!("{} [image {} @ {:.0}%]", self.title, url, opacity * 100.0)
            }
            LayerKind::GeoJson { cluster, .. } => format!(
                "{} [{} feature(s){}]",
                self.title,
                self.feature_count(),
                if cluster.is_some() { ", clustered" } else { "" }
            ),
        }
    }
}

fn features(collection: &Value) -> Option<&[Value]> {
    collection
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

/// Georeferenced image stretched over `bounds`.
#[must_use]
pub fn image_overlay(title: &str, url: &str, bounds: Bounds, opacity: f32) -> Layer {
    Layer::new(
        title,
        LayerKind::ImageOverlay {
            url: url.to_string(),
            bounds,
            opacity: opacity.clamp(0.0, 1.0),
        },
    )
}

/// GeoJSON layer. Returns `None` when the data has no features.
pub fn geojson_layer(title: &str, data: Value) -> Result<Option<Layer>, GeoJsonError> {
    build_geojson(title, data, None)
}

/// GeoJSON points drawn as marker clusters.
pub fn marker_cluster(
    title: &str,
    data: Value,
    options: ClusterOptions,
) -> Result<Option<Layer>, GeoJsonError> {
    build_geojson(title, data, Some(options))
}

fn build_geojson(
    title: &str,
    data: Value,
    cluster: Option<ClusterOptions>,
) -> Result<Option<Layer>, GeoJsonError> {
    let collection = normalize_geojson(data)?;
    if features(&collection).map_or(true, <[Value]>::is_empty) {
        return Ok(None);
    }
    Ok(Some(Layer::new(
        title,
        LayerKind::GeoJson {
            collection,
            cluster,
        },
    )))
}

/// Validate a GeoJSON payload and return it as a `FeatureCollection`.
///
/// A bare `Feature` is wrapped in a single-element collection.
pub fn normalize_geojson(data: Value) -> Result<Value, GeoJsonError> {
    let geo_type = data
        .as_object()
        .ok_or(GeoJsonError::NotAnObject)?
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(GeoJsonError::MissingType)?
        .to_string();

    match geo_type.as_str() {
        "FeatureCollection" => {
            if features(&data).is_none() {
                return Err(GeoJsonError::MissingFeatures);
            }
            Ok(data)
        }
        "Feature" => Ok(json!({ "type": "FeatureCollection", "features": [data] })),
        _ => Err(GeoJsonError::UnsupportedType(geo_type)),
    }
}

/// GeoJSON point feature. Coordinates are `[lon, lat]`.
#[must_use]
pub fn point_feature(lat: f64, lon: f64, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [lon, lat] },
        "properties": properties,
    })
}

/// Wrap features in a `FeatureCollection`.
#[must_use]
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_corners() {
        let bounds = Bounds::from_corners((25.33, 120.02), (21.87, 122.03));
        assert!((bounds.north - 25.33).abs() < 1e-9);
        assert!((bounds.south - 21.87).abs() < 1e-9);
        assert!((bounds.west - 120.02).abs() < 1e-9);
        assert!((bounds.east - 122.03).abs() < 1e-9);
        assert_eq!(bounds.to_polygon()["coordinates"][0].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_each_factory_call_is_fresh() {
        let bounds = Bounds::from_corners((1.0, 1.0), (2.0, 2.0));
        let a = image_overlay("Radar", "https://example.test/8", bounds, 0.7);
        let b = image_overlay("Radar", "https://example.test/8", bounds, 0.7);
        assert_ne!(a.id, b.id);
        assert_eq!(a.feature_count(), 1);
    }

    #[test]
    fn test_feature_is_wrapped() {
        let feature = point_feature(25.03, 121.56, json!({ "name": "Taipei" }));
        let layer = geojson_layer("Single", feature).unwrap().unwrap();
        assert_eq!(layer.feature_count(), 1);
        match &layer.kind {
            LayerKind::GeoJson { collection, cluster } => {
                assert_eq!(collection["type"], "FeatureCollection");
                assert_eq!(collection["features"][0]["geometry"]["coordinates"][0], 121.56);
                assert!(cluster.is_none());
            }
            LayerKind::ImageOverlay { .. } => panic!("expected GeoJSON"),
        }
    }

    #[test]
    fn test_empty_collection_is_no_layer() {
        assert!(geojson_layer("Empty", feature_collection(Vec::new())).unwrap().is_none());
    }

    #[test]
    fn test_invalid_geojson() {
        assert_eq!(
            normalize_geojson(json!([1, 2])).unwrap_err(),
            GeoJsonError::NotAnObject
        );
        assert_eq!(
            normalize_geojson(json!({ "features": [] })).unwrap_err(),
            GeoJsonError::MissingType
        );
        assert_eq!(
            normalize_geojson(json!({ "type": "Point", "coordinates": [0, 0] })).unwrap_err(),
            GeoJsonError::UnsupportedType("Point".to_string())
        );
        assert_eq!(
            normalize_geojson(json!({ "type": "FeatureCollection" })).unwrap_err(),
            GeoJsonError::MissingFeatures
        );
    }

    #[test]
    fn test_cluster_summary() {
        let data = feature_collection(vec![
            point_feature(25.0, 121.5, json!({})),
            point_feature(24.0, 120.5, json!({})),
        ]);
        let layer = marker_cluster("Stations", data, ClusterOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(layer.summary(), "Stations [2 feature(s), clustered]");
    }
}
