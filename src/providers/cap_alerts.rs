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

//! Road-related CAP (Common Alerting Protocol) alerts from the NCDR alert
//! datastore.
//!
//! The datastore is queried in two steps: a list of alert ids for one CAP
//! code, then one detail document per id.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{DataClient, ProviderError};
use crate::layer::{feature_collection, point_feature};

#[derive(Debug, Deserialize)]
pub struct CapListResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub result: Vec<CapSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CapSummary {
    pub capid: String,
}

/// One CAP alert document.
#[derive(Debug, Deserialize)]
pub struct CapAlert {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub info: Vec<CapInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapInfo {
    pub event: String,
    pub headline: String,
    pub sender_name: String,
    pub description: String,
    pub effective: String,
    pub expires: String,
    pub instruction: String,
    pub severity: Option<String>,
    pub area: Vec<CapArea>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapArea {
    pub area_desc: String,
    pub circle: Option<String>,
}

/// Centre of a CAP circle, `"lat,lon radius"`, as `(lat, lon)`.
#[must_use]
pub fn parse_circle(circle: &str) -> Option<(f64, f64)> {
    let centre = circle.split_whitespace().next()?;
    let (lat, lon) = centre.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

impl CapAlert {
    /// Point feature at the first parseable circle of the first info block.
    #[must_use]
    pub fn to_feature(&self) -> Option<Value> {
        let info = self.info.first()?;
        let (area, circle, (lat, lon)) = info.area.iter().find_map(|area| {
            let circle = area.circle.as_deref()?;
            Some((area, circle, parse_circle(circle)?))
        })?;

        Some(point_feature(
            lat,
            lon,
            json!({
                "identifier": self.identifier,
                "event": info.event,
                "headline": info.headline,
                "senderName": info.sender_name,
                "description": info.description,
                "areaDesc": area.area_desc,
                "circle": circle,
                "effective": info.effective,
                "expires": info.expires,
                "instruction": info.instruction,
                "severity": info.severity.as_deref().filter(|s| !s.is_empty()).unwrap_or("Unknown"),
            }),
        ))
    }
}

/// Fetch every alert for `cap_code`. Failing detail requests are skipped.
pub async fn fetch(
    client: &DataClient,
    list_url: &str,
    detail_url: &str,
    api_key: &str,
    cap_code: &str,
) -> Result<Vec<CapAlert>, ProviderError> {
    let list: CapListResponse = client
        .get_json(
            list_url,
            &[("apikey", api_key), ("format", "json"), ("capcode", cap_code)],
        )
        .await?;

    if list.success == Some(false) {
        return Err(ProviderError::Invalid(format!(
            "alert list for cap code {cap_code} was not successful"
        )));
    }

    debug!("{} {} alert(s) listed", list.result.len(), cap_code);

    let mut alerts = Vec::with_capacity(list.result.len());
    for summary in &list.result {
        match client
            .get_json::<CapAlert>(
                detail_url,
                &[("apikey", api_key), ("format", "json"), ("capid", summary.capid.as_str())],
            )
            .await
        {
            Ok(alert) => alerts.push(alert),
            Err(e) => warn!("Skipping CAP alert {}: {}", summary.capid, e),
        }
    }

    Ok(alerts)
}

/// Point features for every alert with a usable location.
#[must_use]
pub fn to_feature_collection(alerts: &[CapAlert]) -> Value {
    feature_collection(alerts.iter().filter_map(CapAlert::to_feature).collect())
}
