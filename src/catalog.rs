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

//! The toolbar: every category's sub-buttons and the action behind each.

use std::future::Future;
use std::sync::Arc;

use layer_toggle::{ActionRegistry, ActionResult, Category, LayerAction};
use log::warn;

use crate::config::{AppConfig, CWA_API_KEY_ENV, NCDR_API_KEY_ENV};
use crate::layer::{geojson_layer, image_overlay, marker_cluster, Bounds, ClusterOptions, Layer};
use crate::providers::{cap_alerts, geojson_source, rain_stations, DataClient};

const DAILY_RAINFALL: &str = "Daily accumulated rainfall";
const RADAR_ECHO: &str = "Radar echo";
const RAIN_STATIONS: &str = "Rain stations";
const DEBRIS_FLOW: &str = "Debris-flow potential streams";
const DEBRIS_IMPACT: &str = "Debris-flow impact range";
const PREVIOUSLY_ISOLATED: &str = "Villages previously isolated by disasters";
const CAP_ALERTS: &str = "CAP road alerts";
const ROAD_BREAKS: &str = "Road break points";
const ISOLATED_VILLAGES: &str = "Isolated villages";

/// Coverage of the daily rainfall image, as `(lat, lon)` corners.
const DAILY_RAINFALL_BOUNDS: [(f64, f64); 2] = [
    (25.334_330_965_431_1, 120.016_611_031_922),
    (21.868_275_653_647_1, 122.034_749_689_268),
];

/// Coverage of the radar composite image.
const RADAR_ECHO_BOUNDS: [(f64, f64); 2] = [
    (27.203_707_136_237_2, 114.996_294_366_279),
    (19.192_127_035_231_4, 129.225_927_854_919),
];

/// Toolbar label and icon of a category.
#[must_use]
pub fn category_label(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Weather => ("Weather", "cloud-sun"),
        Category::DisasterPotential => ("Disaster potential", "triangle-exclamation"),
        Category::IsolatedDisaster => ("Isolated-area disasters", "house-flood-water"),
        Category::RainfallAnalysis => ("Rainfall analysis", "cloud-rain"),
        Category::Traffic => ("Traffic", "car"),
        Category::MathModel => ("Mathematical models", "square-root-variable"),
        Category::MachineLearning => ("Machine learning", "microchip"),
        Category::DisasterPrediction => ("Disaster prediction", "chart-line"),
        Category::HistoricalDisaster => ("Historical disasters", "landmark"),
    }
}

/// What the remote actions need at run time.
#[derive(Debug)]
struct Sources {
    client: DataClient,
    config: AppConfig,
}

impl Sources {
    async fn rain_stations(&self) -> ActionResult<Layer> {
        let Some(api_key) = self.config.cwa_api_key() else {
            warn!("{} needs a CWA key (set {} or cwa_api_key)", RAIN_STATIONS, CWA_API_KEY_ENV);
            return Ok(None);
        };

        let response =
            rain_stations::fetch(&self.client, &self.config.rain_station_url, &api_key).await?;
        let collection = rain_stations::to_feature_collection(&response);
        Ok(marker_cluster(RAIN_STATIONS, collection, ClusterOptions::default())?)
    }

    async fn cap_alerts(&self) -> ActionResult<Layer> {
        let Some(api_key) = self.config.ncdr_api_key() else {
            warn!("{} needs an NCDR key (set {} or ncdr_api_key)", CAP_ALERTS, NCDR_API_KEY_ENV);
            return Ok(None);
        };

        let alerts = cap_alerts::fetch(
            &self.client,
            &self.config.cap_list_url,
            &self.config.cap_detail_url,
            &api_key,
            &self.config.cap_code,
        )
        .await?;
        Ok(geojson_layer(CAP_ALERTS, cap_alerts::to_feature_collection(&alerts))?)
    }

    async fn geojson(&self, title: &str, url: Option<&str>) -> ActionResult<Layer> {
        let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
            warn!("No source URL configured for '{}'", title);
            return Ok(None);
        };

        let data = geojson_source::fetch(&self.client, url).await?;
        Ok(geojson_layer(title, data)?)
    }
}

/// Action that runs `run` against the shared sources on every invocation.
fn remote<F, Fut>(sources: &Arc<Sources>, title: &str, icon: &str, run: F) -> LayerAction<Layer>
where
    F: Fn(Arc<Sources>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult<Layer>> + Send + 'static,
{
    let sources = Arc::clone(sources);
    LayerAction::new(title, icon, move || run(Arc::clone(&sources)))
}

/// Action that stretches a fixed image over `corners`.
fn image(
    title: &'static str,
    icon: &str,
    url: &str,
    corners: [(f64, f64); 2],
    opacity: f32,
) -> LayerAction<Layer> {
    let url = url.to_string();
    let bounds = Bounds::from_corners(corners[0], corners[1]);
    LayerAction::ready(title, icon, move || {
        Ok(Some(image_overlay(title, &url, bounds, opacity)))
    })
}

/// Build the full toolbar.
#[must_use]
pub fn build_registry(config: &AppConfig, client: DataClient) -> ActionRegistry<Layer> {
    let sources = Arc::new(Sources {
        client,
        config: config.clone(),
    });
    let opacity = config.overlay_opacity();

    ActionRegistry::builder()
        // Weather
        .with(
            Category::Weather,
            image(
                DAILY_RAINFALL,
                "cloud-showers-heavy",
                &config.daily_rainfall_image_url,
                DAILY_RAINFALL_BOUNDS,
                opacity,
            ),
        )
        .with(
            Category::Weather,
            image(
                RADAR_ECHO,
                "satellite-dish",
                &config.radar_image_url,
                RADAR_ECHO_BOUNDS,
                opacity,
            ),
        )
        .with(
            Category::Weather,
            remote(&sources, RAIN_STATIONS, "tint", |s| async move {
                s.rain_stations().await
            }),
        )
        // Disaster potential
        .with(
            Category::DisasterPotential,
            remote(&sources, DEBRIS_FLOW, "water", |s| async move {
                s.geojson(DEBRIS_FLOW, s.config.debris_flow_url.as_deref()).await
            }),
        )
        .with(
            Category::DisasterPotential,
            remote(&sources, DEBRIS_IMPACT, "mountain", |s| async move {
                s.geojson(DEBRIS_IMPACT, s.config.debris_impact_url.as_deref()).await
            }),
        )
        .with(
            Category::DisasterPotential,
            remote(&sources, PREVIOUSLY_ISOLATED, "house-circle-exclamation", |s| async move {
                s.geojson(PREVIOUSLY_ISOLATED, s.config.isolated_village_url.as_deref())
                    .await
            }),
        )
        // Isolated-area disasters
        .with(
            Category::IsolatedDisaster,
            LayerAction::unimplemented("Resilience index", "shield-halved"),
        )
        .with(
            Category::IsolatedDisaster,
            LayerAction::unimplemented("Vulnerability index", "glass-water-droplet"),
        )
        .with(
            Category::IsolatedDisaster,
            LayerAction::unimplemented("Composite index", "scale-balanced"),
        )
        // Rainfall analysis
        .with(
            Category::RainfallAnalysis,
            LayerAction::unimplemented("IDW interpolation", "wind"),
        )
        .with(
            Category::RainfallAnalysis,
            LayerAction::unimplemented("TIN interpolation", "draw-polygon"),
        )
        .with(
            Category::RainfallAnalysis,
            LayerAction::unimplemented("Hourly rainfall forecast", "clock-rotate-left"),
        )
        // Traffic
        .with(
            Category::Traffic,
            remote(&sources, CAP_ALERTS, "exclamation-triangle", |s| async move {
                s.cap_alerts().await
            }),
        )
        .with(
            Category::Traffic,
            LayerAction::new(ROAD_BREAKS, "road", || async { Ok(None) }),
        )
        .with(
            Category::Traffic,
            remote(&sources, ISOLATED_VILLAGES, "house-circle-exclamation", |s| async move {
                s.geojson(ISOLATED_VILLAGES, s.config.isolated_village_url.as_deref())
                    .await
            }),
        )
        .build()
}
